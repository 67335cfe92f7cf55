// SPDX-License-Identifier: Apache-2.0
//! marble-cli: developer CLI for the marble-track tick engine.
//!
//! Owns a single [`marble_core::Engine`] per invocation. Each subcommand
//! loads a board exchange file, drives the engine through its public control
//! surface, and prints a human-readable summary of the resulting snapshot
//! and diagnostics. The CLI carries no determinism obligations of its own;
//! it never mutates gameplay-observable state beyond calling the engine.

#![deny(rust_2018_idioms)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]
#![allow(clippy::print_stdout, clippy::print_stderr, clippy::multiple_crate_versions)]

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marble_core::{Engine, EngineConfig};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Load, step, and inspect marble-track boards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a board file and report the placements it contains.
    Load {
        /// Path to a board exchange JSON (optionally gzip-framed) file.
        board: PathBuf,
    },
    /// Load a board and advance it by a fixed number of ticks.
    Step {
        /// Path to a board exchange file.
        board: PathBuf,
        /// Number of ticks to advance.
        #[arg(long, default_value_t = 1)]
        ticks: u32,
    },
    /// Load a board and run it until a target tick, respecting the
    /// configured overrun ceiling.
    Run {
        /// Path to a board exchange file.
        board: PathBuf,
        /// Target tick to reach.
        #[arg(long)]
        until: u64,
    },
    /// Load a board, step it once, then reset and confirm the tick counter
    /// returns to zero.
    Reset {
        /// Path to a board exchange file.
        board: PathBuf,
    },
    /// Load a board and print its graph/module summary without stepping.
    Inspect {
        /// Path to a board exchange file.
        board: PathBuf,
    },
}

fn load_engine(board_path: &PathBuf) -> Result<Engine> {
    let bytes = fs::read(board_path)
        .with_context(|| format!("reading board file {}", board_path.display()))?;
    let mut engine = Engine::new(EngineConfig::default());
    engine.load_board(&bytes).with_context(|| "loading board")?;
    Ok(engine)
}

fn report_snapshot(engine: &Engine) {
    let snapshot = engine.snapshot();
    info!(
        tick = snapshot.tick,
        version = snapshot.version,
        marbles = snapshot.marbles.len(),
        modules = snapshot.modules.len(),
        "snapshot published"
    );
    let diagnostics = engine.diagnostics();
    debug!(
        collisions = diagnostics.collisions,
        marbles_terminated = diagnostics.marbles_terminated,
        interactions_dropped = diagnostics.interactions_dropped,
        interactions_applied = diagnostics.interactions_applied,
        overruns = diagnostics.overruns,
        "diagnostics"
    );
    println!(
        "tick={} marbles={} modules={} collisions={} terminated={}",
        snapshot.tick,
        snapshot.marbles.len(),
        snapshot.modules.len(),
        diagnostics.collisions,
        diagnostics.marbles_terminated
    );
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Load { board } => {
            let engine = load_engine(&board)?;
            println!("loaded {} placements", engine.board().len());
        }
        Command::Step { board, ticks } => {
            let mut engine = load_engine(&board)?;
            for _ in 0..ticks {
                if let Err(fault) = engine.step() {
                    error!(%fault, "engine fault");
                    anyhow::bail!(fault);
                }
            }
            report_snapshot(&engine);
        }
        Command::Run { board, until } => {
            let mut engine = load_engine(&board)?;
            if let Err(fault) = engine.run_until(until) {
                error!(%fault, "engine fault");
                anyhow::bail!(fault);
            }
            report_snapshot(&engine);
        }
        Command::Reset { board } => {
            let mut engine = load_engine(&board)?;
            engine.step().context("stepping before reset")?;
            engine.reset();
            println!("tick after reset: {}", engine.tick());
        }
        Command::Inspect { board } => {
            let engine = load_engine(&board)?;
            println!(
                "placements={} tick_hz={} max_placements={}",
                engine.board().len(),
                engine.config().tick_hz,
                engine.config().max_placements
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    run(cli)
}
