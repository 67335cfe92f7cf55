// SPDX-License-Identifier: Apache-2.0
//! Spatial index (C2): `Cell → Occupant`.
//!
//! Expected occupancy per cell is 0 or 1 marble; a transient two-marble
//! state during collision resolution is represented by [`SpatialIndex::conflicts`]
//! rather than by storing more than one marble per cell.

use rustc_hash::FxHashMap;

use crate::cell::Cell;
use crate::marble_store::MarbleId;

/// What currently occupies a cell.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Occupant {
    /// A live marble.
    Marble(MarbleId),
    /// A permanent obstacle cleared only by Reset.
    Debris,
    /// A module's origin cell (the module's own placement).
    Module,
}

/// Open-addressing cell occupancy index (`FxHashMap` backed, matching this
/// codebase's deterministic non-cryptographic hashing convention).
///
/// Invariant: at the end of any phase, no cell lists more than one marble;
/// [`SpatialIndex::conflicts`] exists precisely to surface violations of
/// that invariant *during* Phase C before they are resolved.
#[derive(Debug, Default, Clone)]
pub struct SpatialIndex {
    occupancy: FxHashMap<Cell, Occupant>,
    conflicted: Vec<Cell>,
}

impl SpatialIndex {
    /// Returns the occupant of `cell`, if any.
    #[must_use]
    pub fn get(&self, cell: Cell) -> Option<Occupant> {
        self.occupancy.get(&cell).copied()
    }

    /// Unconditionally inserts `occupant` at `cell`, overwriting any prior
    /// value. Used for module/debris installation, which never conflicts.
    pub fn insert(&mut self, cell: Cell, occupant: Occupant) {
        self.occupancy.insert(cell, occupant);
    }

    /// Removes any occupant at `cell`.
    pub fn evict(&mut self, cell: Cell) {
        self.occupancy.remove(&cell);
    }

    /// Attempts to install `id` at `new_cell`:
    /// - empty → installs, returns `true`;
    /// - already claimed this phase by another marble → records a conflict
    ///   at `new_cell` and returns `false` without installing;
    /// - holds debris or a module → returns `false` without installing,
    ///   leaving the distinction to the caller (Phase C interprets this).
    pub fn try_install_marble(&mut self, new_cell: Cell, id: MarbleId) -> bool {
        match self.occupancy.get(&new_cell) {
            None => {
                self.occupancy.insert(new_cell, Occupant::Marble(id));
                true
            }
            Some(Occupant::Marble(_)) => {
                self.conflicted.push(new_cell);
                false
            }
            Some(Occupant::Debris | Occupant::Module) => false,
        }
    }

    /// Moves an occupant from `old` to `new`, evicting `old` first. Used
    /// outside collision resolution (e.g. module-driven repositioning).
    pub fn move_occupant(&mut self, old: Cell, new: Cell) {
        if let Some(occupant) = self.occupancy.remove(&old) {
            self.occupancy.insert(new, occupant);
        }
    }

    /// Returns the cells where installation attempts collided during the
    /// current phase, then clears the record (it is transient, discarded
    /// before the phase ends).
    pub fn take_conflicts(&mut self) -> Vec<Cell> {
        std::mem::take(&mut self.conflicted)
    }

    /// Removes all occupancy. Used by `reset()`; module placements must be
    /// re-installed by the caller afterward.
    pub fn clear(&mut self) {
        self.occupancy.clear();
        self.conflicted.clear();
    }

    /// Rebuilds the index from scratch given an authoritative list of
    /// `(cell, occupant)` pairs, used after compaction (Phase E) to
    /// reconcile stale marble entries.
    pub fn reconcile(&mut self, entries: impl IntoIterator<Item = (Cell, Occupant)>) {
        self.occupancy.clear();
        self.occupancy.extend(entries);
    }
}
