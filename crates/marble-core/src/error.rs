// SPDX-License-Identifier: Apache-2.0
//! Typed error taxonomy. Every fault the engine can raise is a value, never
//! a panic: structural and fatal faults return synchronously from the
//! triggering call; transient faults accumulate into [`crate::diagnostics::Diagnostics`].

use crate::cell::Cell;

/// Structural faults raised by [`crate::Engine::load_board`].
#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum BoardLoadError {
    /// The board blob was not valid UTF-8 JSON in the expected shape.
    #[error("invalid board blob: {reason}")]
    InvalidBlob {
        /// Human-readable parse failure description.
        reason: String,
    },
    /// A placement's cell lies outside the grid bound.
    #[error("placement at {cell:?} is out of bounds")]
    OutOfBounds {
        /// The offending cell.
        cell: Cell,
    },
    /// The board declares more placements than `max_placements` allows.
    #[error("board has {count} placements, exceeding the maximum of {max}")]
    TooManyPlacements {
        /// Declared placement count.
        count: usize,
        /// Configured ceiling.
        max: usize,
    },
    /// Two 6-adjacent occupied cells share a part kind.
    #[error("adjacency violation between {cells:?}")]
    AdjacencyViolation {
        /// The two offending cells.
        cells: (Cell, Cell),
    },
    /// Two placements claim the same cell.
    #[error("cell {cell:?} is occupied by more than one placement")]
    DuplicateCell {
        /// The offending cell.
        cell: Cell,
    },
    /// The track graph could not be derived from the accepted placements.
    #[error("graph inconsistent at {cell:?}: {reason}")]
    GraphInconsistent {
        /// The offending cell.
        cell: Cell,
        /// Human-readable contradiction description.
        reason: String,
    },
}

/// Structural faults raised by board edits made between ticks
/// ([`crate::Engine::place`], [`crate::Engine::remove`], [`crate::Engine::upgrade`]).
#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum PlacementError {
    /// The target cell lies outside the grid bound.
    #[error("cell {cell:?} is out of bounds")]
    OutOfBounds {
        /// The offending cell.
        cell: Cell,
    },
    /// The target cell already holds a placement.
    #[error("cell {cell:?} is already occupied")]
    CellOccupied {
        /// The offending cell.
        cell: Cell,
    },
    /// The target cell is empty; there is nothing to remove or upgrade.
    #[error("cell {cell:?} is empty")]
    CellEmpty {
        /// The offending cell.
        cell: Cell,
    },
    /// Accepting this edit would place two 6-adjacent occupied cells of the
    /// same part kind.
    #[error("adjacency violation between {cells:?}")]
    AdjacencyViolation {
        /// The two offending cells.
        cells: (Cell, Cell),
    },
    /// Removing this Connector would leave two Modules 6-adjacent.
    #[error("removing {cell:?} would create a module-module adjacency")]
    WouldCreateAdjacencyViolation {
        /// The cell whose removal was rejected.
        cell: Cell,
    },
    /// The requested upgrade level exceeds the part's maximum.
    #[error("upgrade level {level} exceeds the maximum of {max} for this part")]
    UpgradeLevelExceeded {
        /// Requested level.
        level: u8,
        /// Part-specific ceiling.
        max: u8,
    },
    /// The board already holds the configured maximum number of placements.
    #[error("board already holds the maximum of {max} placements")]
    TooManyPlacements {
        /// Configured ceiling.
        max: usize,
    },
}

/// Fatal faults raised by [`crate::Engine::step`] / [`crate::Engine::run_until`].
///
/// A fatal fault aborts the tick before any mutation is committed; `T` is not
/// advanced and the engine transitions to `Faulted`. Only `reset()` or
/// `load_board()` recovers.
#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum EngineFault {
    /// A fixed-point operation would have required more than 31 integer
    /// bits, i.e. it is outside the range this engine is willing to trust.
    #[error("fixed-point overflow at {cell:?}")]
    FixedPointOverflow {
        /// The cell where the overflow was detected.
        cell: Cell,
    },
    /// The track graph was found to be internally contradictory while
    /// servicing a tick (should be unreachable if `load_board`/edits are
    /// correctly validated; treated as fatal rather than silently ignored).
    #[error("graph inconsistent at {cell:?}: {reason}")]
    GraphInconsistent {
        /// The offending cell.
        cell: Cell,
        /// Human-readable contradiction description.
        reason: String,
    },
    /// `step`/`run_until` was called while a previous fatal fault left the
    /// engine in `Faulted`; only `reset()`/`load_board()` recover.
    #[error("engine is faulted; call reset() or load_board() before stepping again")]
    Faulted,
}
