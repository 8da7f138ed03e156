//! Reusable pass fixtures and a harness for running single passes.
//!
//! - [`NudgePass`]: shifts every active agent by a constant offset.
//! - [`RecordingPass`]: declares arbitrary resources and logs each call.
//! - [`FailingPass`]: fails deterministically after N calls.
//! - [`PoisonPass`]: writes a non-finite position into one slot.
//! - [`PassHarness`]: owns everything a [`PassContext`] borrows.

use std::sync::{Arc, Mutex};

use glam::Vec2;
use horde_core::{AgentStore, PassError, Resource, ResourceSet, TickId};
use horde_crowd::{CrowdPass, Diagnostics, PassContext, PassCounters, WorkerPool};
use horde_field::{build_flow_field, build_wall_field, GoalRegion, NavField, PressureField};
use horde_space::WalkableGrid;

/// Moves every active agent by `offset` (reads and writes positions).
pub struct NudgePass {
    pub name: String,
    pub offset: Vec2,
}

impl NudgePass {
    pub fn new(name: impl Into<String>, offset: Vec2) -> Self {
        Self {
            name: name.into(),
            offset,
        }
    }
}

impl CrowdPass for NudgePass {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> ResourceSet {
        [Resource::Positions].into_iter().collect()
    }

    fn writes(&self) -> ResourceSet {
        [Resource::Positions].into_iter().collect()
    }

    fn step(&mut self, ctx: &mut PassContext<'_>) -> Result<(), PassError> {
        let (agents, _) = ctx.agents_mut();
        for (p, _) in agents
            .positions
            .iter_mut()
            .zip(agents.active)
            .filter(|(_, &live)| live)
        {
            *p += self.offset;
        }
        Ok(())
    }
}

/// Declares the given resources, does nothing, and appends its name to a
/// shared log on every call.
pub struct RecordingPass {
    pub name: String,
    pub reads: ResourceSet,
    pub writes: ResourceSet,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl RecordingPass {
    pub fn new(
        name: impl Into<String>,
        reads: &[Resource],
        writes: &[Resource],
        log: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            name: name.into(),
            reads: reads.iter().copied().collect(),
            writes: writes.iter().copied().collect(),
            log,
        }
    }
}

impl CrowdPass for RecordingPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> ResourceSet {
        self.reads
    }

    fn writes(&self) -> ResourceSet {
        self.writes
    }

    fn step(&mut self, _ctx: &mut PassContext<'_>) -> Result<(), PassError> {
        if let Ok(mut log) = self.log.lock() {
            log.push(self.name.clone());
        }
        Ok(())
    }
}

/// Succeeds `succeed_count` times, then fails every call.
pub struct FailingPass {
    pub name: String,
    pub succeed_count: usize,
    call_count: usize,
}

impl FailingPass {
    pub fn new(name: impl Into<String>, succeed_count: usize) -> Self {
        Self {
            name: name.into(),
            succeed_count,
            call_count: 0,
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count
    }
}

impl CrowdPass for FailingPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> ResourceSet {
        ResourceSet::empty()
    }

    fn writes(&self) -> ResourceSet {
        [Resource::Positions].into_iter().collect()
    }

    fn step(&mut self, _ctx: &mut PassContext<'_>) -> Result<(), PassError> {
        let n = self.call_count;
        self.call_count += 1;
        if n >= self.succeed_count {
            Err(PassError::ExecutionFailed {
                reason: format!("deliberate failure on call {n}"),
            })
        } else {
            Ok(())
        }
    }
}

/// Writes `NaN` into the position of slot `slot`.
pub struct PoisonPass {
    pub slot: usize,
}

impl CrowdPass for PoisonPass {
    fn name(&self) -> &str {
        "poison"
    }

    fn reads(&self) -> ResourceSet {
        ResourceSet::empty()
    }

    fn writes(&self) -> ResourceSet {
        [Resource::Positions].into_iter().collect()
    }

    fn step(&mut self, ctx: &mut PassContext<'_>) -> Result<(), PassError> {
        let (agents, _) = ctx.agents_mut();
        if let Some(p) = agents.positions.get_mut(self.slot) {
            *p = Vec2::NAN;
        }
        Ok(())
    }
}

/// Owns a grid, its fields, agents and a pool, and runs passes against
/// them one at a time.
pub struct PassHarness {
    pub grid: WalkableGrid,
    pub goal: GoalRegion,
    pub flow: Option<NavField>,
    pub wall: Option<NavField>,
    pub pressure: PressureField,
    pub store: AgentStore,
    pub pool: WorkerPool,
    pub diagnostics: Diagnostics,
    pub counters: PassCounters,
    pub tick: u64,
    pub dt: f32,
}

impl PassHarness {
    /// Harness with both navigation fields built, no agents, an unbuilt
    /// pressure field and `workers` threads.
    pub fn new(grid: WalkableGrid, goal: GoalRegion, workers: usize) -> Self {
        let flow = build_flow_field(&grid, &goal).expect("fixture goal must be valid");
        let wall = build_wall_field(&grid);
        Self {
            pressure: PressureField::new(*grid.spec()),
            flow: Some(flow),
            wall: Some(wall),
            grid,
            goal,
            store: AgentStore::new(),
            pool: WorkerPool::new(Some(workers)).expect("thread pool"),
            diagnostics: Diagnostics::new(),
            counters: PassCounters::default(),
            tick: 0,
            dt: 0.1,
        }
    }

    /// Same, but with neither navigation field built.
    pub fn without_fields(grid: WalkableGrid, goal: GoalRegion) -> Self {
        let mut h = Self::new(grid, goal, 1);
        h.flow = None;
        h.wall = None;
        h
    }

    /// Spawn agents at `positions` with a shared `speed`.
    pub fn spawn(&mut self, positions: &[Vec2], speed: f32) {
        crate::spawn_all(&mut self.store, positions, speed);
    }

    /// Run one pass and advance the tick counter.
    pub fn run(&mut self, pass: &mut dyn CrowdPass) -> Result<(), PassError> {
        let mut ctx = PassContext::new(
            &self.grid,
            self.goal,
            self.flow.as_ref(),
            self.wall.as_ref(),
            &mut self.pressure,
            self.store.split_mut(),
            &self.pool,
            &self.diagnostics,
            &mut self.counters,
            TickId(self.tick),
            self.dt,
        );
        let result = pass.step(&mut ctx);
        self.tick += 1;
        result
    }

    pub fn positions(&self) -> &[Vec2] {
        self.store.positions()
    }

    pub fn directions(&self) -> &[Vec2] {
        self.store.directions()
    }
}
