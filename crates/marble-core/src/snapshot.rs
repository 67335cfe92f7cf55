// SPDX-License-Identifier: Apache-2.0
//! Snapshot publisher (C9): a read-only, versioned view of engine state
//! published once per tick at the end of Phase E.
//!
//! Readers never observe a torn snapshot: [`SnapshotPublisher::publish`]
//! swaps in a freshly built, fully-formed [`Snapshot`] behind a lock whose
//! critical section is only the pointer swap itself.

use std::sync::{Arc, RwLock};

use crate::board::ModuleKind;
use crate::cell::{Cell, Direction};
use crate::diagnostics::Diagnostics;
use crate::marble_store::MarbleId;
use crate::math::Fixed;

/// One marble's externally observable state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MarbleSnapshot {
    /// Stable marble identity.
    pub id: MarbleId,
    /// Occupied cell.
    pub cell: Cell,
    /// Sub-cell position, in `[0, 1)` along `heading`.
    pub offset: Fixed,
    /// Current direction of travel.
    pub heading: Direction,
}

/// One module's externally observable state, kind-tagged so readers don't
/// need to cross-reference the board.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSnapshot {
    /// The module's cell.
    pub cell: Cell,
    /// The module's kind.
    pub kind: ModuleKind,
    /// A compact, kind-specific observable summary.
    pub observable: ModuleObservable,
}

/// Kind-specific observable fields, mirroring [`crate::modules::ModuleState`]
/// minus anything that is purely an internal scheduling detail.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleObservable {
    /// Splitter: which exit the next marble will take.
    Splitter {
        /// `true` if the next release uses exit A.
        current_exit_a: bool,
    },
    /// Collector: queue depth and drain policy.
    Collector {
        /// Number of marbles currently held.
        queue_len: usize,
        /// Drain policy.
        mode: crate::modules::CollectorMode,
    },
    /// Lift: whether it is currently advancing marbles.
    Lift {
        /// Running state.
        running: bool,
    },
    /// Cannon: ticks remaining before it can fire again.
    Cannon {
        /// Cooldown remaining.
        cooldown_ticks_remaining: u16,
    },
    /// Gate: whether it currently admits marbles.
    Gate {
        /// Open state.
        open: bool,
    },
}

/// A fully-formed, immutable view of engine state as of the end of one
/// tick's Phase E.
///
/// Invariants:
/// - `version` increases by exactly one between consecutive published
///   snapshots; a reader can detect a missed publish by a gap.
/// - `debris_delta` lists only cells that became debris since the
///   previously published snapshot (debris is permanent, so this is
///   strictly additive and never needs a removal list).
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Monotonically increasing publish version.
    pub version: u64,
    /// The tick this snapshot was published for.
    pub tick: u64,
    /// Every live marble.
    pub marbles: Vec<MarbleSnapshot>,
    /// Cells that newly became debris since the previous snapshot.
    pub debris_delta: Vec<Cell>,
    /// Every module's observable state.
    pub modules: Vec<ModuleSnapshot>,
    /// Normal-but-notable per-tick outcomes accumulated since the last
    /// `reset()`, per `spec.md` §7 ("observable in the snapshot's
    /// diagnostics block, never raised").
    pub diagnostics: Diagnostics,
}

impl Snapshot {
    /// The empty, version-0, tick-0 snapshot a fresh engine publishes before
    /// its first `step`.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: 0,
            tick: 0,
            marbles: Vec::new(),
            debris_delta: Vec::new(),
            modules: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Double-buffered snapshot publisher. Writers call [`Self::publish`] once
/// per tick; readers call [`Self::current`] at any time without blocking
/// the next publish beyond a pointer swap.
#[derive(Debug)]
pub struct SnapshotPublisher {
    current: RwLock<Arc<Snapshot>>,
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }
}

impl SnapshotPublisher {
    /// Constructs a publisher seeded with the empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a new snapshot, replacing the previously visible one.
    pub fn publish(&self, snapshot: Snapshot) {
        let mut guard = self.current.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Arc::new(snapshot);
    }

    /// Returns the most recently published snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
