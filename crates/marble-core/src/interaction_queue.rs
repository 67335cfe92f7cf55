// SPDX-License-Identifier: Apache-2.0
//! Interaction queue (C6): a bounded, single-producer single-consumer ring
//! of player click-actions tagged with the tick they should apply on.

use crate::cell::Cell;

/// A player click-action code. Interpretation is module-kind-specific (e.g.
/// `Toggle` flips a splitter's exit, `Arm`/`Open`/`Close` target other
/// module kinds); unrecognised codes for a given module are ignored.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionCode {
    /// Splitter: flip `current-exit` for exactly one release.
    ToggleSplitter,
    /// Lift: start advancing queued marbles.
    StartLift,
    /// Lift: stop advancing queued marbles.
    StopLift,
    /// Cannon: arm regardless of cooldown (still bounded by the cooldown
    /// check in Phase D; see [`crate::modules::ModuleState`]).
    ArmCannon,
    /// Gate: open.
    OpenGate,
    /// Gate: close.
    CloseGate,
    /// Collector: change drain mode.
    SetCollectorMode(crate::modules::CollectorMode),
}

/// One queued interaction.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Interaction {
    /// The module cell this interaction targets.
    pub cell: Cell,
    /// The action to apply.
    pub action: ActionCode,
    /// The tick on which this interaction becomes eligible to apply.
    pub apply_at_tick: u64,
}

/// Outcome of [`InteractionQueue::enqueue`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EnqueueOutcome {
    /// Accepted.
    Ok,
    /// The ring was full; the oldest entry was dropped to make room.
    DroppedOldest,
}

/// Bounded ring buffer of pending interactions.
///
/// Ordering contract: entries are applied in enqueue order; ties (equal
/// `apply_at_tick`) are broken by cell lexicographic order then action
/// code, applied by [`InteractionQueue::drain_due`]'s sort, not by
/// insertion order alone.
#[derive(Debug, Clone)]
pub struct InteractionQueue {
    capacity: usize,
    entries: std::collections::VecDeque<Interaction>,
}

impl InteractionQueue {
    /// Constructs an empty queue with the given ring capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: std::collections::VecDeque::with_capacity(capacity),
        }
    }

    /// Appends an interaction, dropping the oldest entry if the ring is
    /// full.
    pub fn enqueue(&mut self, interaction: Interaction) -> EnqueueOutcome {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.entries.push_back(interaction);
            EnqueueOutcome::DroppedOldest
        } else {
            self.entries.push_back(interaction);
            EnqueueOutcome::Ok
        }
    }

    /// Drains and returns all entries whose `apply_at_tick <= current_tick`,
    /// in the ordering contract's order: enqueue order, with ties (equal
    /// `apply_at_tick`) broken by cell lexicographic order then action code.
    pub fn drain_due(&mut self, current_tick: u64) -> Vec<Interaction> {
        let mut due = Vec::new();
        let mut remaining = std::collections::VecDeque::with_capacity(self.entries.len());
        for (seq, entry) in self.entries.drain(..).enumerate() {
            if entry.apply_at_tick <= current_tick {
                due.push((seq, entry));
            } else {
                remaining.push_back(entry);
            }
        }
        self.entries = remaining;
        due.sort_by(|(seq_a, a), (seq_b, b)| {
            a.apply_at_tick
                .cmp(&b.apply_at_tick)
                .then_with(|| a.cell.cmp(&b.cell))
                .then_with(|| seq_a.cmp(seq_b))
                .then_with(|| a.action.cmp(&b.action))
        });
        due.into_iter().map(|(_, entry)| entry).collect()
    }

    /// Discards every pending interaction. Used by `reset()`.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of pending (not-yet-due) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the queue holds no pending entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
