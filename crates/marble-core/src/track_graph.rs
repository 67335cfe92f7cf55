// SPDX-License-Identifier: Apache-2.0
//! Track graph (C4): a pure, derived view of the board.
//!
//! Rebuilt whenever placements change and otherwise treated as invalidated;
//! `rebuild` refuses to complete (and reports the offending cell) if it
//! discovers a placement whose rotated sockets contradict its neighbours —
//! the caller must not advance a tick until the board is repaired.

use std::collections::BTreeMap;

use crate::board::{Board, ConnectorKind, ModuleKind, PartKind};
use crate::cell::{Cell, Direction, Rotation};
use crate::math::{Fixed, Slope};

/// Per-cell derived track attributes.
///
/// Invariants:
/// - `routes` contains at most two `(entry, exit)` pairs for connectors
///   (the two directions of travel through the same geometry) and exactly
///   one for modules that do not branch.
/// - `splitter_exits`, when present, gives the two directions a
///   [`ModuleKind::Splitter`] may route to; the active choice lives in
///   module state, not here.
#[derive(Debug, Clone)]
pub struct CellAttrs {
    /// Legal `(entering heading, resulting heading)` pairs for this cell.
    pub routes: Vec<(Direction, Direction)>,
    /// For a splitter cell, the `(A, B)` exit directions it may route to.
    pub splitter_exits: Option<(Direction, Direction)>,
    /// This cell's slope, used by Phase B's acceleration term.
    pub slope: Slope,
    /// Terminal speed cap in effect for this cell.
    pub vmax: Fixed,
    /// The module kind occupying this cell, if any.
    pub module: Option<ModuleKind>,
    /// The placement's rotation, retained for diagnostics/snapshotting.
    pub rotation: Rotation,
}

impl CellAttrs {
    /// Returns the resulting heading after entering this cell moving
    /// `entering`, consulting the splitter's current exit when relevant.
    #[must_use]
    pub fn exit_heading(&self, entering: Direction, splitter_current_exit_a: bool) -> Option<Direction> {
        if let Some((a, b)) = self.splitter_exits {
            let expected_entry = self.routes.first().map(|(e, _)| *e);
            if expected_entry == Some(entering) {
                return Some(if splitter_current_exit_a { a } else { b });
            }
            return None;
        }
        self.routes
            .iter()
            .find(|(entry, _)| *entry == entering)
            .map(|(_, exit)| *exit)
    }
}

/// A derived, rebuildable view of [`Board`].
#[derive(Debug, Clone, Default)]
pub struct TrackGraph {
    cells: BTreeMap<Cell, CellAttrs>,
    dirty: bool,
}

/// A placement's rotated sockets contradicted a neighbour's during rebuild.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("graph inconsistent at {cell:?}: {reason}")]
pub struct GraphInconsistentError {
    /// The offending cell.
    pub cell: Cell,
    /// Human-readable contradiction description.
    pub reason: String,
}

fn rotate_pair(base: (Direction, Direction), rotation: Rotation) -> (Direction, Direction) {
    (base.0.rotate(rotation), base.1.rotate(rotation))
}

fn connector_routes(kind: ConnectorKind, rotation: Rotation) -> (Vec<(Direction, Direction)>, Slope) {
    use ConnectorKind::{Curve, Ramp, Spiral, Straight};
    use Direction::{NegX, NegY, NegZ, PosX, PosY, PosZ};

    match kind {
        Straight => {
            let forward = rotate_pair((PosX, PosX), rotation);
            let backward = rotate_pair((NegX, NegX), rotation);
            (vec![forward, backward], Slope::Flat)
        }
        Curve => {
            let forward = rotate_pair((PosX, PosZ), rotation);
            let backward = rotate_pair((NegZ, NegX), rotation);
            (vec![forward, backward], Slope::Flat)
        }
        Ramp => {
            let ascend = rotate_pair((PosX, PosY), rotation);
            let descend = rotate_pair((NegY, NegX), rotation);
            (vec![ascend, descend], Slope::Ramp)
        }
        Spiral => {
            // Combined bend + rise: horizontal routing of a Curve, slope of a Ramp.
            let forward = rotate_pair((PosX, PosZ), rotation);
            let backward = rotate_pair((NegZ, NegX), rotation);
            (vec![forward, backward], Slope::Ramp)
        }
    }
}

fn module_routes(
    kind: ModuleKind,
    rotation: Rotation,
) -> (Vec<(Direction, Direction)>, Option<(Direction, Direction)>) {
    use Direction::{NegX, NegY, PosX, PosY, PosZ};
    match kind {
        ModuleKind::Splitter => {
            let entry = NegX.rotate(rotation);
            let exit_a = PosX.rotate(rotation);
            let exit_b = PosZ.rotate(rotation);
            (vec![(entry, exit_a)], Some((exit_a, exit_b)))
        }
        // Lifts always run vertically; `rotation` (which only spins the
        // horizontal facing) does not apply to their shaft axis.
        ModuleKind::Lift => (vec![(NegY, PosY)], None),
        ModuleKind::Collector | ModuleKind::Cannon | ModuleKind::Gate => {
            let forward = rotate_pair((PosX, PosX), rotation);
            let backward = rotate_pair((NegX, NegX), rotation);
            (vec![forward, backward], None)
        }
    }
}

impl TrackGraph {
    /// Returns the attributes for `cell`, if the board has a placement (and
    /// thus derived attributes) there.
    #[must_use]
    pub fn get(&self, cell: Cell) -> Option<&CellAttrs> {
        self.cells.get(&cell)
    }

    /// Marks the graph dirty; it must be rebuilt before the next tick.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether the graph must be rebuilt before the next tick.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuilds the graph from `board`. Cost is proportional to the number
    /// of placements. Fails (without partially applying) if any placement's
    /// rotated sockets contradict a neighbour's.
    pub fn rebuild(&mut self, board: &Board, default_vmax: Fixed) -> Result<(), GraphInconsistentError> {
        let mut cells = BTreeMap::new();

        for placement in board.iter() {
            let (routes, slope, splitter_exits, module) = match placement.part {
                PartKind::Connector(kind) => {
                    let (routes, slope) = connector_routes(kind, placement.rotation);
                    (routes, slope, None, None)
                }
                PartKind::Module(kind) => {
                    let (routes, splitter_exits) = module_routes(kind, placement.rotation);
                    (routes, Slope::Flat, splitter_exits, Some(kind))
                }
            };

            cells.insert(
                placement.cell,
                CellAttrs {
                    routes,
                    splitter_exits,
                    slope,
                    vmax: default_vmax,
                    module,
                    rotation: placement.rotation,
                },
            );
        }

        for placement in board.iter() {
            let Some(attrs) = cells.get(&placement.cell) else {
                continue;
            };
            for &(entry, _) in &attrs.routes {
                let neighbour_cell = placement.cell.step(entry.opposite());
                if let Some(neighbour) = cells.get(&neighbour_cell) {
                    let neighbour_exits_here = neighbour
                        .routes
                        .iter()
                        .any(|&(_, exit)| exit == entry)
                        || neighbour
                            .splitter_exits
                            .is_some_and(|(a, b)| a == entry || b == entry);
                    if !neighbour_exits_here && !neighbour.routes.iter().any(|&(e, _)| e == entry.opposite())
                    {
                        return Err(GraphInconsistentError {
                            cell: placement.cell,
                            reason: format!(
                                "entry {entry:?} at {:?} has no matching socket at neighbour {neighbour_cell:?}",
                                placement.cell
                            ),
                        });
                    }
                }
            }
        }

        self.cells = cells;
        self.dirty = false;
        Ok(())
    }
}
