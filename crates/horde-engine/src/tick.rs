//! Tick engine: runs the validated pass schedule once per tick.
//!
//! [`TickEngine`] owns the passes, their [`SchedulePlan`], the worker pool
//! and the diagnostics state. World state (grid, fields, agents) is lent
//! to it per tick through [`TickState`], so the world can rebuild fields
//! between ticks without the engine holding stale borrows.
//!
//! # Rollback
//!
//! Agent positions and directions are copied at the start of every tick.
//! If any pass fails, or leaves a non-finite position behind, both arrays
//! are restored and the tick counter does not advance. The pressure field
//! is derived data and is not rolled back.

use std::time::Instant;

use glam::Vec2;
use horde_core::{AgentStore, PassError, Resource, ResourceSet, StepError, TickId};
use horde_crowd::{
    validate_schedule, CrowdPass, Diagnostics, PassContext, PassCounters, SchedulePlan,
    WorkerPool,
};
use horde_field::{GoalRegion, NavField, PressureField};
use horde_space::WalkableGrid;
use tracing::{trace, warn};

use crate::config::{ConfigError, ScheduleConfig};

/// Resources the world provides before the first pass runs.
///
/// Pressure is not among them: some pass must write it before anything
/// reads it.
pub fn engine_inputs() -> ResourceSet {
    [
        Resource::Walkable,
        Resource::WallField,
        Resource::FlowField,
        Resource::Speeds,
        Resource::Positions,
        Resource::Directions,
    ]
    .into_iter()
    .collect()
}

// ── TickState ────────────────────────────────────────────────────

/// World state lent to the engine for one tick.
pub struct TickState<'a> {
    /// Current walkable grid.
    pub grid: &'a WalkableGrid,
    /// Current goal disk.
    pub goal: GoalRegion,
    /// Flow field snapshot, if built.
    pub flow: Option<&'a NavField>,
    /// Wall field snapshot, if built.
    pub wall: Option<&'a NavField>,
    /// The pressure field.
    pub pressure: &'a mut PressureField,
    /// Agent storage.
    pub agents: &'a mut AgentStore,
}

// ── TickReport ───────────────────────────────────────────────────

/// Result of a successful tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The tick that just completed.
    pub tick_id: TickId,
    /// Per-pass execution times: `(name, microseconds)`.
    pub pass_us: Vec<(String, u64)>,
    /// Counters the passes reported.
    pub counters: PassCounters,
}

// ── TickEngine ───────────────────────────────────────────────────

/// Runs a fixed pass schedule over lent world state.
pub struct TickEngine {
    passes: Vec<Box<dyn CrowdPass>>,
    plan: SchedulePlan,
    pool: WorkerPool,
    diagnostics: Diagnostics,
    dt: f32,
    current_tick: TickId,
    saved_positions: Vec<Vec2>,
    saved_directions: Vec<Vec2>,
}

impl TickEngine {
    /// Validate `passes` against [`engine_inputs`] and start the worker
    /// pool.
    pub fn new(
        passes: Vec<Box<dyn CrowdPass>>,
        schedule: &ScheduleConfig,
    ) -> Result<Self, ConfigError> {
        let schedule = schedule.sanitized();
        let plan = validate_schedule(&passes, engine_inputs())?;
        let pool = WorkerPool::new(schedule.workers).map_err(|e| ConfigError::WorkerPool {
            reason: e.to_string(),
        })?;
        Ok(Self {
            passes,
            plan,
            pool,
            diagnostics: Diagnostics::new(),
            dt: schedule.dt,
            current_tick: TickId(0),
            saved_positions: Vec::new(),
            saved_directions: Vec::new(),
        })
    }

    /// Run every pass once, in schedule order.
    ///
    /// On failure the agent arrays are restored to their state at the
    /// start of the tick and the error names the failing pass.
    pub fn execute_tick(&mut self, state: TickState<'_>) -> Result<TickReport, StepError> {
        let TickState {
            grid,
            goal,
            flow,
            wall,
            pressure,
            agents,
        } = state;

        if agents.positions().len() != agents.speeds().len() {
            return Err(StepError::AgentStorageCorrupt {
                positions: agents.positions().len(),
                speeds: agents.speeds().len(),
            });
        }

        let next_tick = TickId(self.current_tick.0 + 1);
        self.saved_positions.clear();
        self.saved_positions.extend_from_slice(agents.positions());
        self.saved_directions.clear();
        self.saved_directions.extend_from_slice(agents.directions());

        let mut counters = PassCounters::default();
        let mut pass_us = Vec::with_capacity(self.passes.len());
        for pass in self.passes.iter_mut() {
            let pass_start = Instant::now();
            let result = {
                let mut ctx = PassContext::new(
                    grid,
                    goal,
                    flow,
                    wall,
                    &mut *pressure,
                    agents.split_mut(),
                    &self.pool,
                    &self.diagnostics,
                    &mut counters,
                    next_tick,
                    self.dt,
                );
                pass.step(&mut ctx)
            };
            let result = result.and_then(|()| {
                if pass.writes().contains(Resource::Positions) {
                    check_finite(agents)
                } else {
                    Ok(())
                }
            });

            if let Err(reason) = result {
                restore(&self.saved_positions, &self.saved_directions, agents);
                let name = pass.name().to_string();
                warn!(pass = %name, tick = %next_tick, error = %reason, "pass failed, tick rolled back");
                return Err(StepError::PassFailed { name, reason });
            }
            pass_us.push((
                pass.name().to_string(),
                pass_start.elapsed().as_micros() as u64,
            ));
        }

        self.current_tick = next_tick;
        trace!(
            tick = %next_tick,
            overlaps = counters.overlap_hits,
            jams = counters.jam_hits,
            blocked = counters.blocked_moves,
            "tick complete"
        );
        Ok(TickReport {
            tick_id: next_tick,
            pass_us,
            counters,
        })
    }

    /// Last completed tick (`TickId(0)` before the first).
    pub fn current_tick(&self) -> TickId {
        self.current_tick
    }

    /// Simulated seconds per tick, after sanitizing.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// The validated read routing.
    pub fn plan(&self) -> &SchedulePlan {
        &self.plan
    }

    /// Pass names in schedule order.
    pub fn pass_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.passes.iter().map(|p| p.name())
    }

    /// Logged-once warning state shared with the passes.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Worker threads in the pool.
    pub fn workers(&self) -> usize {
        self.pool.workers()
    }
}

fn check_finite(agents: &AgentStore) -> Result<(), PassError> {
    let bad = agents
        .positions()
        .iter()
        .zip(agents.active())
        .position(|(p, &live)| live && !p.is_finite());
    match bad {
        Some(agent_index) => Err(PassError::NanDetected { agent_index }),
        None => Ok(()),
    }
}

fn restore(positions: &[Vec2], directions: &[Vec2], agents: &mut AgentStore) {
    let arrays = agents.split_mut();
    arrays.positions.copy_from_slice(positions);
    arrays.directions.copy_from_slice(directions);
}
