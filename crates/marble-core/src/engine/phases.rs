// SPDX-License-Identifier: Apache-2.0
//! The five tick phases (C7), invoked in strict order by [`super::Engine::step`].
//!
//! Each phase is a free function over the engine's component parts rather
//! than a method on [`super::Engine`] itself, so the phase boundary (and the
//! barrier between them) stays visible at every call site.

use std::collections::BTreeMap;

use crate::board::ModuleKind;
use crate::cell::{Cell, Direction};
use crate::config::EngineConfig;
use crate::diagnostics::Diagnostics;
use crate::error::EngineFault;
use crate::interaction_queue::InteractionQueue;
use crate::marble_store::MarbleStore;
use crate::math::Fixed;
use crate::modules::{cannon_tick, drain_collector, ModuleState, ModuleTable};
use crate::spatial_index::{Occupant, SpatialIndex};
use crate::track_graph::{CellAttrs, TrackGraph};

/// Phase A: apply every interaction whose `apply_at_tick <= tick`, in the
/// queue's ordering contract, to the module it targets.
pub fn apply_interactions(
    queue: &mut InteractionQueue,
    modules: &mut ModuleTable,
    tick: u64,
    diagnostics: &mut Diagnostics,
) {
    for interaction in queue.drain_due(tick) {
        if let Some(state) = modules.get_mut(&interaction.cell) {
            state.apply_interaction(interaction.action);
            diagnostics.interactions_applied += 1;
        }
    }
}

/// Computes a cell's contribution to a resident marble's velocity for one
/// tick, returning `None` on genuine Q32.32 overflow rather than saturating.
/// Shared by [`validate_tick_preconditions`] (a read-only check) and
/// [`integrate_marbles`] (the real, mutating pass), so the two can never
/// disagree about which marbles fault.
fn integrate_velocity(attrs: &CellAttrs, velocity: Fixed, gravity: Fixed, friction: Fixed, dt: Fixed) -> Option<Fixed> {
    let accel = gravity * attrs.slope.sin() + if attrs.slope.is_flat() { -friction } else { Fixed::ZERO };
    let delta = accel.checked_mul(dt)?;
    let raw = velocity.checked_add(delta)?;
    Some(raw.clamp(-attrs.vmax, attrs.vmax))
}

/// Read-only precondition check for Phase B, run before Phase A commits any
/// mutation. `EngineFault` is documented as aborting the tick before any
/// mutation is committed, so every fault Phase B can raise must be
/// detectable from the state as of the start of the tick.
pub fn validate_tick_preconditions(store: &MarbleStore, graph: &TrackGraph, cfg: &EngineConfig) -> Result<(), EngineFault> {
    let dt = cfg.delta_t();
    for id in store.live_ids_snapshot() {
        let Some(cell) = store.cell(id) else { continue };
        let Some(attrs) = graph.get(cell) else {
            return Err(EngineFault::GraphInconsistent {
                cell,
                reason: "marble occupies a cell absent from the track graph".to_owned(),
            });
        };
        let velocity = store.velocity(id).unwrap_or(Fixed::ZERO);
        if integrate_velocity(attrs, velocity, cfg.gravity, cfg.friction, dt).is_none() {
            return Err(EngineFault::FixedPointOverflow { cell });
        }
    }
    Ok(())
}

/// Phase B: integrate every marble not spawned this tick one step forward,
/// crossing cell boundaries along connector routes. Marbles resident on a
/// module cell are held in place (offset pinned at zero); Phase D alone
/// decides their fate.
///
/// Parallelised across disjoint physical-row chunks via `std::thread::scope`,
/// matching `spec.md` §5's "Phase B is the only phase that may run across
/// threads" contract: each worker only ever reads `graph`/`cfg` and writes
/// its own chunk's rows.
pub fn integrate_marbles(
    store: &mut MarbleStore,
    graph: &TrackGraph,
    cfg: &EngineConfig,
) -> Result<(), EngineFault> {
    let available = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    let chunk_count = available.min(8);
    let dt = cfg.delta_t();
    let gravity = cfg.gravity;
    let friction = cfg.friction;

    let fault = std::sync::Mutex::new(None::<EngineFault>);

    std::thread::scope(|scope| {
        for chunk in store.row_chunks_mut(chunk_count) {
            let fault = &fault;
            scope.spawn(move || {
                for local in 0..chunk.len() {
                    if !chunk.alive[local] {
                        continue;
                    }
                    let cell = Cell::new(chunk.cell_x[local], chunk.cell_y[local], chunk.cell_z[local]);
                    let Some(attrs) = graph.get(cell) else {
                        *fault.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(EngineFault::GraphInconsistent {
                            cell,
                            reason: "marble occupies a cell absent from the track graph".to_owned(),
                        });
                        continue;
                    };

                    let Some(velocity) = integrate_velocity(attrs, chunk.velocity[local], gravity, friction, dt) else {
                        *fault.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
                            Some(EngineFault::FixedPointOverflow { cell });
                        continue;
                    };
                    chunk.velocity[local] = velocity;

                    if attrs.module.is_some() {
                        // Parked on a module cell; Phase D owns its exit.
                        continue;
                    }

                    let mut offset = chunk.offset[local] + velocity * dt;
                    let mut heading = chunk.heading[local];
                    let mut cur = cell;
                    while offset >= Fixed::ONE {
                        let Some(next_heading) = graph
                            .get(cur)
                            .and_then(|a| a.exit_heading(heading, true))
                        else {
                            offset = Fixed::ONE;
                            break;
                        };
                        offset = offset - Fixed::ONE;
                        heading = next_heading;
                        cur = cur.step(next_heading);
                        let Some(landed) = graph.get(cur) else {
                            // Dead end: pin at the boundary rather than
                            // stepping onto an undefined cell.
                            offset = Fixed::ONE;
                            cur = cell;
                            heading = chunk.heading[local];
                            break;
                        };
                        if landed.module.is_some() {
                            // Modules are one-tick resident points; never
                            // cross through in the same step that enters.
                            offset = Fixed::ONE;
                            break;
                        }
                    }
                    while offset <= -Fixed::ONE {
                        let Some(prev_heading) = graph
                            .get(cur)
                            .and_then(|a| a.exit_heading(heading.opposite(), true))
                        else {
                            offset = -Fixed::ONE;
                            break;
                        };
                        offset = offset + Fixed::ONE;
                        heading = prev_heading.opposite();
                        cur = cur.step(prev_heading);
                        let Some(landed) = graph.get(cur) else {
                            // Dead end: pin at the boundary rather than
                            // stepping onto an undefined cell.
                            offset = -Fixed::ONE;
                            cur = cell;
                            heading = chunk.heading[local];
                            break;
                        };
                        if landed.module.is_some() {
                            // Modules are one-tick resident points; never
                            // cross through in the same step that enters.
                            offset = Fixed::ONE;
                            break;
                        }
                    }
                    chunk.cell_x[local] = cur.x;
                    chunk.cell_y[local] = cur.y;
                    chunk.cell_z[local] = cur.z;
                    chunk.offset[local] = offset;
                    chunk.heading[local] = heading;
                }
            });
        }
    });

    match fault.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take() {
        Some(f) => Err(f),
        None => Ok(()),
    }
}

/// Phase C: resolve collisions among this tick's candidate positions.
///
/// - A marble landing on a debris cell dies; the debris is unaffected.
/// - Two or more marbles landing on the same cell all die and that cell
///   becomes (or remains) debris.
/// - Otherwise the marble's candidate position is committed to the index.
pub fn resolve_collisions(
    store: &mut MarbleStore,
    index: &mut SpatialIndex,
    debris: &mut std::collections::BTreeSet<Cell>,
    new_debris_this_tick: &mut Vec<Cell>,
    diagnostics: &mut Diagnostics,
) {
    index.clear();
    for &d in debris.iter() {
        index.insert(d, Occupant::Debris);
    }

    let mut to_kill = Vec::new();
    let mut attempts: Vec<(Cell, crate::marble_store::MarbleId)> = Vec::new();

    for id in store.live_ids_snapshot() {
        let Some(cell) = store.cell(id) else { continue };
        if debris.contains(&cell) {
            to_kill.push(id);
            diagnostics.collisions += 1;
            continue;
        }
        attempts.push((cell, id));
    }

    for &(cell, id) in &attempts {
        index.try_install_marble(cell, id);
    }

    let mut conflicted = index.take_conflicts();
    conflicted.sort_by_key(|c| (c.x, c.y, c.z));
    conflicted.dedup();

    for cell in conflicted {
        for &(c, id) in &attempts {
            if c == cell {
                to_kill.push(id);
            }
        }
        debris.insert(cell);
        new_debris_this_tick.push(cell);
        index.insert(cell, Occupant::Debris);
        diagnostics.collisions += 1;
    }

    for id in to_kill {
        store.kill(id);
        diagnostics.marbles_terminated += 1;
    }
}

/// Phase D: dispatch every module's state machine, in cell lexicographic
/// order (the [`ModuleTable`]'s natural `BTreeMap` iteration order).
pub fn dispatch_modules(
    store: &mut MarbleStore,
    graph: &TrackGraph,
    index: &mut SpatialIndex,
    modules: &mut ModuleTable,
) {
    let order: Vec<Cell> = modules.keys().copied().collect();
    for cell in order {
        let Some(state) = modules.get_mut(&cell) else { continue };
        let resident = match index.get(cell) {
            Some(Occupant::Marble(id)) if store.is_alive(id) => Some(id),
            _ => None,
        };

        match state {
            ModuleState::Splitter { current_exit_a, pending_toggle } => {
                let Some(id) = resident else { continue };
                let Some(attrs) = graph.get(cell) else { continue };
                let heading = store.heading(id).unwrap_or(Direction::PosX);
                let Some(exit) = attrs.exit_heading(heading, *current_exit_a) else { continue };
                let velocity = store.velocity(id).unwrap_or(Fixed::ZERO);
                let new_cell = cell.step(exit);
                let new_id = store.spawn(new_cell, exit, velocity);
                store.kill(id);
                index.evict(cell);
                index.insert(new_cell, Occupant::Marble(new_id));

                if *pending_toggle {
                    *pending_toggle = false;
                } else {
                    *current_exit_a = !*current_exit_a;
                }
            }
            ModuleState::Collector { queue, mode, burst_size } => {
                if let Some(id) = resident {
                    queue.push(id);
                    store.kill(id);
                    index.evict(cell);
                }
                let released = drain_collector(queue, *mode, *burst_size);
                if released.is_empty() {
                    continue;
                }
                let Some(attrs) = graph.get(cell) else { continue };
                let Some(exit) = attrs.routes.first().map(|(_, e)| *e) else { continue };
                for _ in released {
                    let out_cell = cell.step(exit);
                    let new_id = store.spawn(out_cell, exit, Fixed::ZERO);
                    index.insert(out_cell, Occupant::Marble(new_id));
                }
            }
            ModuleState::Lift { running, .. } => {
                if !*running {
                    continue;
                }
                let Some(id) = resident else { continue };
                let Some(attrs) = graph.get(cell) else { continue };
                let heading = store.heading(id).unwrap_or(Direction::PosY);
                let Some(exit) = attrs.exit_heading(heading, true) else { continue };
                let next_cell = cell.step(exit);
                if index.get(next_cell).is_some() {
                    continue; // stall: destination occupied
                }
                let velocity = store.velocity(id).unwrap_or(Fixed::ZERO);
                store.set_cell(id, next_cell);
                store.set_heading(id, exit);
                store.set_velocity(id, velocity);
                // The marble's offset was pinned at `ONE` while parked on
                // this module (Phase B never advances a module-resident
                // marble's offset); starting the new cell at zero avoids an
                // unaccounted extra crossing next Phase B.
                store.set_offset(id, Fixed::ZERO);
                index.evict(cell);
                index.insert(next_cell, Occupant::Marble(id));
            }
            ModuleState::Cannon { cooldown_ticks_remaining, force, cooldown_max } => {
                let ready = cannon_tick(cooldown_ticks_remaining);
                if ready {
                    if let Some(id) = resident {
                        store.set_velocity(id, *force);
                        *cooldown_ticks_remaining = *cooldown_max;
                    }
                }
            }
            ModuleState::Gate { .. } => {
                if state.blocks_entry() {
                    continue;
                }
                let Some(id) = resident else { continue };
                let Some(attrs) = graph.get(cell) else { continue };
                let heading = store.heading(id).unwrap_or(Direction::PosX);
                let Some(exit) = attrs.exit_heading(heading, true) else { continue };
                let next_cell = cell.step(exit);
                if index.get(next_cell).is_some() {
                    continue;
                }
                let velocity = store.velocity(id).unwrap_or(Fixed::ZERO);
                store.set_cell(id, next_cell);
                store.set_heading(id, exit);
                store.set_velocity(id, velocity);
                store.set_offset(id, Fixed::ZERO);
                index.evict(cell);
                index.insert(next_cell, Occupant::Marble(id));
            }
        }
    }
}

/// Phase E: compact the marble store (recycling dead slots) and return the
/// module observable summaries snapshot publication needs.
pub fn compact_and_summarize(
    store: &mut MarbleStore,
    modules: &BTreeMap<Cell, ModuleState>,
    module_kind_of: impl Fn(Cell) -> Option<ModuleKind>,
) -> Vec<(Cell, ModuleKind, crate::snapshot::ModuleObservable)> {
    store.compact();

    modules
        .iter()
        .filter_map(|(&cell, state)| {
            let kind = module_kind_of(cell)?;
            let observable = match state {
                ModuleState::Splitter { current_exit_a, .. } => {
                    crate::snapshot::ModuleObservable::Splitter { current_exit_a: *current_exit_a }
                }
                ModuleState::Collector { queue, mode, .. } => crate::snapshot::ModuleObservable::Collector {
                    queue_len: queue.len(),
                    mode: *mode,
                },
                ModuleState::Lift { running, .. } => crate::snapshot::ModuleObservable::Lift { running: *running },
                ModuleState::Cannon { cooldown_ticks_remaining, .. } => {
                    crate::snapshot::ModuleObservable::Cannon { cooldown_ticks_remaining: *cooldown_ticks_remaining }
                }
                ModuleState::Gate { open } => crate::snapshot::ModuleObservable::Gate { open: *open },
            };
            Some((cell, kind, observable))
        })
        .collect()
}
