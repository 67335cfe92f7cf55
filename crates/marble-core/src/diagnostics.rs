// SPDX-License-Identifier: Apache-2.0
//! Diagnostics counters (C14): monotone tick-pipeline observability, reset
//! only by [`Diagnostics::reset`] (i.e. by the engine's `reset()`).

/// Monotone counters accumulated across ticks.
///
/// Invariants:
/// - Every field only increases between resets; a decreasing counter would
///   indicate a pipeline bug, not a legitimate state.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostics {
    /// Number of Phase C collisions resolved (both-die events), counted once
    /// per colliding cell, not once per marble.
    pub collisions: u64,
    /// Number of marbles terminated, by collision or marble-into-debris.
    pub marbles_terminated: u64,
    /// Number of interactions dropped because the queue was full.
    pub interactions_dropped: u64,
    /// Number of interactions applied in Phase A.
    pub interactions_applied: u64,
    /// Number of ticks where `step` was invoked while a previous tick's
    /// deadline had already elapsed (scheduling overrun).
    pub overruns: u64,
}

impl Diagnostics {
    /// Returns a zeroed counter set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            collisions: 0,
            marbles_terminated: 0,
            interactions_dropped: 0,
            interactions_applied: 0,
            overruns: 0,
        }
    }

    /// Resets every counter to zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
