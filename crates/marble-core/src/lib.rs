// SPDX-License-Identifier: Apache-2.0
//! marble-core: deterministic fixed-point marble-track tick engine.
//!
//! Everything observable from a tick is Q32.32 fixed-point arithmetic over
//! integer cell coordinates; there is no floating-point state anywhere on the
//! hot path. The engine owns a board, a derived track graph, a
//! structure-of-arrays marble store, a bounded interaction queue, and a
//! versioned snapshot publisher, and advances all of it through the strict
//! five-phase pipeline in [`Engine::step`].
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
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
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::multiple_crate_versions
)]

pub mod board;
pub mod cell;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod interaction_queue;
/// Board exchange I/O, gated behind the `serde` feature.
#[cfg(feature = "serde")]
pub mod io;
pub mod marble_store;
/// Deterministic fixed-point numerics (`Fixed`, `Slope`).
pub mod math;
pub mod modules;
pub mod snapshot;
pub mod spatial_index;
pub mod track_graph;

/// Board model: part kinds, placements, and the placement-edit rules.
pub use board::{Board, ConnectorKind, ModuleKind, PartKind, Placement};
/// Cell coordinates, headings, and rotations.
pub use cell::{Cell, Direction, Rotation, GRID_BOUND};
/// Immutable engine configuration.
pub use config::{EngineConfig, TICK_HZ};
/// Per-reset counters surfaced alongside each snapshot.
pub use diagnostics::Diagnostics;
/// The tick engine itself.
pub use engine::Engine;
/// The error taxonomy for every fallible boundary.
pub use error::{BoardLoadError, EngineFault, PlacementError};
/// The operator-facing interaction queue and its action codes.
pub use interaction_queue::{ActionCode, EnqueueOutcome, Interaction, InteractionQueue};
/// The marble population store and its stable identifiers.
pub use marble_store::{MarbleId, MarbleStore, RowChunkMut};
pub use math::{Fixed, Slope};
/// Module state machines (splitter, collector, lift, cannon, gate).
pub use modules::{CollectorMode, ModuleState, ModuleTable};
/// The read-only published view of engine state.
pub use snapshot::{MarbleSnapshot, ModuleObservable, ModuleSnapshot, Snapshot, SnapshotPublisher};
/// The per-tick occupancy index used by collision resolution.
pub use spatial_index::{Occupant, SpatialIndex};
/// The derived, rebuildable routing view of the board.
pub use track_graph::{CellAttrs, GraphInconsistentError, TrackGraph};
