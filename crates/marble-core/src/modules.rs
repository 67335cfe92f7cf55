// SPDX-License-Identifier: Apache-2.0
//! Module state machines (C8).
//!
//! Each module variant is a closed sum type; upgrade level selects
//! parameterisation, not identity. Adding a new module is a matter of
//! extending [`ModuleState`] and its Phase D dispatch arm; no tick-pipeline
//! code changes, matching the "dynamic dispatch → tagged union" design note.

use std::collections::BTreeMap;

use crate::cell::Cell;
use crate::interaction_queue::ActionCode;
use crate::marble_store::MarbleId;
use crate::math::Fixed;

/// A collector's drain policy.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CollectorMode {
    /// Release the entire queue every tick.
    Basic,
    /// Release at most one marble per tick.
    Fifo,
    /// Release up to `burst_size` marbles per tick.
    Burst,
}

/// Per-module tagged state record.
///
/// Invariants:
/// - Exactly one variant is active per module cell, matching the part kind
///   the board recorded there; the engine never constructs a mismatched
///   pair (e.g. a `Splitter` state at a `Gate` placement).
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleState {
    /// `{ current-exit ∈ {A,B}, pending-toggle }`.
    Splitter {
        /// `true` selects exit A, `false` selects exit B.
        current_exit_a: bool,
        /// Set by a toggle interaction; consumed the next time a marble is
        /// actually dispatched, suppressing that dispatch's automatic
        /// round-robin alternation.
        pending_toggle: bool,
    },
    /// `{ queue, mode, burst-size }`.
    Collector {
        /// Marbles captured and awaiting release, in FIFO order.
        queue: Vec<MarbleId>,
        /// Drain policy.
        mode: CollectorMode,
        /// Cap used when `mode == Burst`.
        burst_size: u16,
    },
    /// `{ running, step-cursor }`.
    Lift {
        /// Whether the lift currently advances queued marbles.
        running: bool,
        /// Reserved for staggering multi-marble ascents; unused while only
        /// one marble occupies a lift shaft at a time.
        step_cursor: u16,
    },
    /// `{ cooldown-ticks-remaining, force }`.
    Cannon {
        /// Ticks remaining before the cannon may fire again.
        cooldown_ticks_remaining: u16,
        /// Velocity imparted to a marble on firing.
        force: Fixed,
        /// Cooldown duration restored after firing.
        cooldown_max: u16,
    },
    /// `{ open }`.
    Gate {
        /// Whether the gate currently permits entry.
        open: bool,
    },
}

impl ModuleState {
    /// Constructs the default (base-upgrade) state for a freshly placed
    /// module of `kind`.
    #[must_use]
    pub fn default_for(kind: crate::board::ModuleKind, default_force: Fixed) -> Self {
        use crate::board::ModuleKind;
        match kind {
            ModuleKind::Splitter => Self::Splitter {
                current_exit_a: true,
                pending_toggle: false,
            },
            ModuleKind::Collector => Self::Collector {
                queue: Vec::new(),
                mode: CollectorMode::Basic,
                burst_size: 1,
            },
            ModuleKind::Lift => Self::Lift {
                running: false,
                step_cursor: 0,
            },
            ModuleKind::Cannon => Self::Cannon {
                cooldown_ticks_remaining: 0,
                force: default_force,
                cooldown_max: 60,
            },
            ModuleKind::Gate => Self::Gate { open: true },
        }
    }

    /// Applies a Phase A interaction. Action codes that do not target this
    /// module's kind are silently ignored.
    pub fn apply_interaction(&mut self, action: ActionCode) {
        match (self, action) {
            (Self::Splitter { current_exit_a, pending_toggle }, ActionCode::ToggleSplitter) => {
                *current_exit_a = !*current_exit_a;
                *pending_toggle = true;
            }
            (Self::Lift { running, .. }, ActionCode::StartLift) => *running = true,
            (Self::Lift { running, .. }, ActionCode::StopLift) => *running = false,
            (Self::Cannon { cooldown_ticks_remaining, .. }, ActionCode::ArmCannon) => {
                *cooldown_ticks_remaining = 0;
            }
            (Self::Gate { open }, ActionCode::OpenGate) => *open = true,
            (Self::Gate { open }, ActionCode::CloseGate) => *open = false,
            (Self::Collector { mode, queue: _, burst_size: _ }, ActionCode::SetCollectorMode(new_mode)) => {
                *mode = new_mode;
            }
            _ => {}
        }
    }

    /// Returns whether this module currently blocks marble entry (only
    /// meaningful for [`Self::Gate`]; every other variant always permits
    /// entry and leaves routing to the track graph).
    #[must_use]
    pub const fn blocks_entry(&self) -> bool {
        matches!(self, Self::Gate { open: false })
    }
}

/// Up to `k` marbles drained from a collector's queue this tick, in FIFO
/// order.
#[must_use]
pub fn drain_collector(queue: &mut Vec<MarbleId>, mode: CollectorMode, burst_size: u16) -> Vec<MarbleId> {
    let take = match mode {
        CollectorMode::Basic => queue.len(),
        CollectorMode::Fifo => queue.len().min(1),
        CollectorMode::Burst => queue.len().min(burst_size as usize),
    };
    queue.drain(..take).collect()
}

/// Advances a cannon's cooldown by one tick. Returns `true` if the cannon
/// is ready to fire (cooldown already at zero).
pub fn cannon_tick(cooldown_ticks_remaining: &mut u16) -> bool {
    if *cooldown_ticks_remaining == 0 {
        true
    } else {
        *cooldown_ticks_remaining -= 1;
        false
    }
}

/// The board's module states, keyed by cell, iterated in cell lexicographic
/// order for Phase D (matches `BTreeMap`'s natural iteration order, which
/// mirrors `Cell`'s derived field-order `Ord`).
pub type ModuleTable = BTreeMap<Cell, ModuleState>;
