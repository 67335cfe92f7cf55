// SPDX-License-Identifier: Apache-2.0
//! Immutable engine configuration.
//!
//! Every quantity the repository's host framework used to keep as a global
//! "ScriptableObject" asset (gravity, friction, default terminal speed, ring
//! buffer sizing) is instead an explicit field here, passed in once at
//! construction. The engine holds no process-wide singletons.

use crate::math::Fixed;

/// Tick rate, fixed by `spec.md` §6 and not configurable.
pub const TICK_HZ: u32 = 120;

/// Immutable configuration for an [`crate::Engine`] instance.
///
/// Invariants:
/// - `tick_hz` is always [`TICK_HZ`]; it is carried here (rather than being
///   a bare constant) so `delta_t` is always derived from a single source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Ticks per second. Always [`TICK_HZ`].
    pub tick_hz: u32,
    /// Gravity-driven acceleration term, `g` in `spec.md` §4.7 Phase B step 1.
    pub gravity: Fixed,
    /// Friction deceleration applied on flat track, `μ` in the same step.
    pub friction: Fixed,
    /// Terminal speed cap applied when a cell does not override it.
    pub default_vmax: Fixed,
    /// Per-axis grid bound; cells outside `[-grid_bound, grid_bound]` are
    /// rejected.
    pub grid_bound: i32,
    /// Maximum number of placements a board may declare.
    pub max_placements: usize,
    /// Capacity of the interaction ring buffer.
    pub interaction_queue_capacity: usize,
    /// Maximum number of catch-up ticks `run_until` will execute
    /// back-to-back before dropping the remaining accumulated time.
    pub overrun_ceiling: u32,
}

impl EngineConfig {
    /// Returns `Δt = 1 / tick_hz` as an exact fixed-point constant.
    #[must_use]
    pub fn delta_t(&self) -> Fixed {
        Fixed::from_ratio(1, i64::from(self.tick_hz))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_hz: TICK_HZ,
            gravity: Fixed::from_ratio(1, 10),
            friction: Fixed::from_ratio(1, 20),
            default_vmax: Fixed::from_int(5),
            grid_bound: crate::cell::GRID_BOUND,
            max_placements: 32_768,
            interaction_queue_capacity: 1024,
            overrun_ceiling: 8,
        }
    }
}
