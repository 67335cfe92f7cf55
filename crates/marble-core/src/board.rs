// SPDX-License-Identifier: Apache-2.0
//! Board model (C3): the authoritative placement map.
//!
//! Structural edits are only accepted between ticks; `Board` itself has no
//! notion of a tick. `place`/`remove`/`upgrade` validate bounds,
//! single-occupancy, and the Module/Connector alternation invariant before
//! applying anything, and leave the board untouched on rejection.

use std::collections::BTreeMap;

use crate::cell::{Cell, Rotation};
use crate::error::PlacementError;

/// A stateless geometry part. Carries track attributes but no click-actions.
///
/// Invariants:
/// - A `Connector`'s attributes are a pure function of its kind, rotation,
///   and upgrade level; it owns no per-tick state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectorKind {
    /// Flat run, no elevation change.
    Straight,
    /// Flat turn onto a perpendicular axis.
    Curve,
    /// One-cell rise per cell of run (the only representable slope).
    Ramp,
    /// Combined curve + rise.
    Spiral,
}

/// A stateful interactive part. Exposes click-actions consumed in Phase A
/// and owns a [`crate::modules::ModuleState`] record dispatched in Phase D.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModuleKind {
    /// Routes inbound marbles to one of two exits, round-robin by default.
    Splitter,
    /// Accumulates inbound marbles and releases them per its drain mode.
    Collector,
    /// Advances queued marbles one cell up per tick along its axis.
    Lift,
    /// Imparts velocity to an inbound marble, then cools down.
    Cannon,
    /// Gate/sensor: open or closed.
    Gate,
}

/// The two disjoint part kinds a placement may carry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PartKind {
    /// A stateful module.
    Module(ModuleKind),
    /// Stateless geometry.
    Connector(ConnectorKind),
}

impl PartKind {
    /// Returns whether this part is a [`ModuleKind`] (used by the
    /// Alternation invariant: adjacent occupied cells must differ in this
    /// classification).
    #[must_use]
    pub const fn is_module(self) -> bool {
        matches!(self, Self::Module(_))
    }
}

/// One occupied cell's content: part identity, orientation, and upgrade
/// level.
///
/// Invariants:
/// - `cell` always matches the key this placement is stored under in
///   [`Board`]; the two are never allowed to disagree.
/// - `upgrade` is bounded by [`PartKind`]-specific maxima, enforced at
///   [`Board::upgrade`] time.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placement {
    /// The part occupying this cell.
    pub part: PartKind,
    /// Orientation about the vertical axis.
    pub rotation: Rotation,
    /// The cell this placement occupies.
    pub cell: Cell,
    /// Upgrade level, `0` meaning base.
    pub upgrade: u8,
}

const fn max_upgrade_for(part: PartKind) -> u8 {
    match part {
        PartKind::Module(ModuleKind::Cannon | ModuleKind::Lift) => 3,
        PartKind::Module(_) => 2,
        PartKind::Connector(ConnectorKind::Ramp | ConnectorKind::Spiral) => 2,
        PartKind::Connector(_) => 1,
    }
}

/// The authoritative placement map, `C → Placement`.
///
/// Invariant (Alternation): for every pair of 6-adjacent occupied cells,
/// their part kinds differ (one [`ModuleKind`], one [`ConnectorKind`]).
#[derive(Debug, Clone)]
pub struct Board {
    size: (i32, i32, i32),
    placements: BTreeMap<Cell, Placement>,
    max_placements: usize,
}

impl Board {
    /// Constructs an empty board of the given size, accepting up to
    /// `max_placements` placements.
    #[must_use]
    pub fn new(size: (i32, i32, i32), max_placements: usize) -> Self {
        Self {
            size,
            placements: BTreeMap::new(),
            max_placements,
        }
    }

    /// Returns the board's declared size along each axis.
    #[must_use]
    pub const fn size(&self) -> (i32, i32, i32) {
        self.size
    }

    /// Returns the placement occupying `cell`, if any.
    #[must_use]
    pub fn get(&self, cell: Cell) -> Option<&Placement> {
        self.placements.get(&cell)
    }

    /// Iterates all placements in cell lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &Placement> {
        self.placements.values()
    }

    /// Returns the number of occupied cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Returns whether the board has no placements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    fn adjacency_conflict(&self, cell: Cell, part: PartKind) -> Option<(Cell, Cell)> {
        for neighbour in cell.neighbours() {
            if let Some(existing) = self.placements.get(&neighbour) {
                if existing.part.is_module() == part.is_module() {
                    return Some((cell, neighbour));
                }
            }
        }
        None
    }

    /// Validates and applies a new placement. Rejected edits leave the
    /// board unchanged.
    pub fn place(
        &mut self,
        part: PartKind,
        cell: Cell,
        rotation: Rotation,
        upgrade: u8,
    ) -> Result<(), PlacementError> {
        if !cell.in_bounds() {
            return Err(PlacementError::OutOfBounds { cell });
        }
        if self.placements.contains_key(&cell) {
            return Err(PlacementError::CellOccupied { cell });
        }
        if self.placements.len() >= self.max_placements {
            return Err(PlacementError::TooManyPlacements {
                max: self.max_placements,
            });
        }
        let max = max_upgrade_for(part);
        if upgrade > max {
            return Err(PlacementError::UpgradeLevelExceeded { level: upgrade, max });
        }
        if let Some(cells) = self.adjacency_conflict(cell, part) {
            return Err(PlacementError::AdjacencyViolation { cells });
        }

        self.placements.insert(
            cell,
            Placement {
                part,
                rotation,
                cell,
                upgrade,
            },
        );
        Ok(())
    }

    /// Validates and removes the placement at `cell`. Rejects if doing so
    /// would leave two Modules 6-adjacent through the vacated cell.
    pub fn remove(&mut self, cell: Cell) -> Result<(), PlacementError> {
        let Some(placement) = self.placements.get(&cell) else {
            return Err(PlacementError::CellEmpty { cell });
        };

        if !placement.part.is_module() {
            let module_neighbours = cell
                .neighbours()
                .into_iter()
                .filter(|n| {
                    self.placements
                        .get(n)
                        .is_some_and(|p| p.part.is_module())
                })
                .count();
            if module_neighbours >= 2 {
                return Err(PlacementError::WouldCreateAdjacencyViolation { cell });
            }
        }

        self.placements.remove(&cell);
        Ok(())
    }

    /// Validates and applies an upgrade-level change at `cell`.
    pub fn upgrade(&mut self, cell: Cell, level: u8) -> Result<(), PlacementError> {
        let Some(placement) = self.placements.get(&cell) else {
            return Err(PlacementError::CellEmpty { cell });
        };
        let max = max_upgrade_for(placement.part);
        if level > max {
            return Err(PlacementError::UpgradeLevelExceeded { level, max });
        }
        if let Some(existing) = self.placements.get_mut(&cell) {
            existing.upgrade = level;
        }
        Ok(())
    }
}
