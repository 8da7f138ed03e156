//! Lockstep crowd world.
//!
//! [`CrowdWorld`] is the user-facing API. It owns the walkable grid, the
//! goal, agent storage, the navigation field snapshots and the pressure
//! field, and drives a [`TickEngine`] one tick per [`step()`] call.
//!
//! # Field rebuilds
//!
//! Changing the grid or the goal only marks the affected fields dirty.
//! Dirty fields are rebuilt at the start of the next [`step()`], before any
//! pass runs, and published into a [`FieldSlot`]. Handles obtained from
//! [`flow_field()`] or [`wall_field()`] keep the buffer they were cloned
//! from alive after a newer one is published. A rebuild that fails leaves
//! its dirty flag set and the previous snapshot (if any) published, and is
//! retried on the next step.
//!
//! [`step()`]: CrowdWorld::step
//! [`flow_field()`]: CrowdWorld::flow_field
//! [`wall_field()`]: CrowdWorld::wall_field

use std::time::Instant;

use glam::Vec2;
use horde_core::{AgentId, AgentStore, StepError, TickId};
use horde_crowd::{CrowdPass, Diagnostics, Warning};
use horde_field::{
    build_flow_field, build_wall_field, FieldHandle, FieldSlot, GoalRegion, NavField,
    PressureField,
};
use horde_space::{GridError, WalkableGrid};
use tracing::{debug, info, trace};

use crate::config::{ConfigError, CrowdConfig};
use crate::metrics::StepMetrics;
use crate::tick::{TickEngine, TickState};

// Compile-time assertion: CrowdWorld can move to another thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<CrowdWorld>();
    }
};

/// A grid, a goal and a crowd, stepped in lockstep.
///
/// # Example
///
/// ```
/// use horde_engine::{CrowdConfig, CrowdWorld};
/// use horde_space::{GridSpec, WalkableGrid};
/// use glam::Vec2;
///
/// let spec = GridSpec::new(16, 16, 1.0, Vec2::ZERO).unwrap();
/// let mut world = CrowdWorld::new(WalkableGrid::open(spec), CrowdConfig::default()).unwrap();
/// world.set_goal(Vec2::new(12.0, 12.0), 2.0);
/// let id = world.spawn(Vec2::new(2.5, 2.5), 1.5).unwrap();
/// for _ in 0..10 {
///     world.step().unwrap();
/// }
/// assert!(world.agents().position(id).unwrap().x > 2.5);
/// ```
pub struct CrowdWorld {
    grid: WalkableGrid,
    goal: GoalRegion,
    config: CrowdConfig,
    agents: AgentStore,
    flow: FieldSlot<NavField>,
    wall: FieldSlot<NavField>,
    pressure: PressureField,
    engine: TickEngine,
    flow_dirty: bool,
    wall_dirty: bool,
    blocked_moves: u64,
    rebuild_failures: u64,
    last_metrics: StepMetrics,
}

impl CrowdWorld {
    /// World running the standard pass pipeline built from `config`.
    pub fn new(grid: WalkableGrid, config: CrowdConfig) -> Result<Self, ConfigError> {
        let passes = config.passes();
        Self::with_passes(grid, config, passes)
    }

    /// World running a custom pass list. The list is validated against
    /// [`engine_inputs`](crate::tick::engine_inputs).
    pub fn with_passes(
        grid: WalkableGrid,
        config: CrowdConfig,
        passes: Vec<Box<dyn CrowdPass>>,
    ) -> Result<Self, ConfigError> {
        let engine = TickEngine::new(passes, &config.schedule)?;
        let spec = *grid.spec();
        info!(
            width = spec.width(),
            height = spec.height(),
            cell_size = spec.cell_size(),
            workers = engine.workers(),
            dt = engine.dt(),
            "crowd world created"
        );
        Ok(Self {
            goal: config.goal,
            pressure: PressureField::new(spec),
            grid,
            config,
            agents: AgentStore::new(),
            flow: FieldSlot::new(),
            wall: FieldSlot::new(),
            engine,
            flow_dirty: true,
            wall_dirty: true,
            blocked_moves: 0,
            rebuild_failures: 0,
            last_metrics: StepMetrics::default(),
        })
    }

    // ── Agents ───────────────────────────────────────────────────

    /// Add an agent. Takes effect from the next tick.
    ///
    /// A non-finite `position` is refused: nothing is stored, a warning is
    /// logged once, and `None` is returned.
    pub fn spawn(&mut self, position: Vec2, speed: f32) -> Option<AgentId> {
        let id = self.agents.spawn(position, speed);
        if id.is_none() {
            self.engine.diagnostics().warn_once(Warning::SpawnRejected);
        }
        id
    }

    /// Remove an agent; its id may be reused by a later spawn. Returns
    /// `false` if the id was not live.
    pub fn despawn(&mut self, id: AgentId) -> bool {
        self.agents.despawn(id)
    }

    /// Agent storage.
    pub fn agents(&self) -> &AgentStore {
        &self.agents
    }

    /// Positions by slot; inactive slots hold stale values.
    pub fn positions(&self) -> &[Vec2] {
        self.agents.positions()
    }

    /// Last steering direction by slot (zero when stopped or blocked).
    pub fn directions(&self) -> &[Vec2] {
        self.agents.directions()
    }

    // ── Grid and goal ────────────────────────────────────────────

    /// Change one cell. Marks both navigation fields dirty if the state
    /// actually changed, and returns whether it did.
    pub fn set_walkable(&mut self, x: i32, y: i32, walkable: bool) -> bool {
        let changed = self.grid.set_walkable(x, y, walkable);
        if changed {
            self.mark_grid_dirty();
        }
        changed
    }

    /// Replace every cell's walkable state, keeping the geometry.
    pub fn replace_walkable(&mut self, walkable: Vec<bool>) -> Result<(), GridError> {
        self.grid.replace(walkable)?;
        self.mark_grid_dirty();
        Ok(())
    }

    /// Swap in a new grid, possibly with different geometry. Agents keep
    /// their world positions; the pressure field reallocates on its next
    /// rebuild. The new grid's version is moved past the old one.
    pub fn replace_grid(&mut self, grid: WalkableGrid) {
        let previous = self.grid.version();
        self.grid = grid;
        self.grid.advance_past(previous);
        self.mark_grid_dirty();
    }

    /// Move the goal disk. Marks the flow field dirty.
    pub fn set_goal(&mut self, center: Vec2, radius: f32) {
        self.goal = GoalRegion::new(center, radius);
        self.flow_dirty = true;
    }

    fn mark_grid_dirty(&mut self) {
        self.flow_dirty = true;
        self.wall_dirty = true;
    }

    /// The walkable grid.
    pub fn grid(&self) -> &WalkableGrid {
        &self.grid
    }

    /// The goal disk.
    pub fn goal(&self) -> GoalRegion {
        self.goal
    }

    /// Whether a field rebuild is pending.
    pub fn fields_dirty(&self) -> bool {
        self.flow_dirty || self.wall_dirty
    }

    // ── Fields ───────────────────────────────────────────────────

    /// Rebuild whichever navigation fields are dirty. Returns whether any
    /// field was published.
    ///
    /// [`step()`](Self::step) calls this first; call it directly to have
    /// fields ready before the first tick.
    pub fn rebuild_fields(&mut self) -> bool {
        let mut published = false;
        let version = self.grid.version();

        if self.wall_dirty {
            let start = Instant::now();
            let field = build_wall_field(&self.grid);
            self.wall.publish(field, version);
            self.wall_dirty = false;
            published = true;
            debug!(
                %version,
                elapsed_us = start.elapsed().as_micros() as u64,
                "wall field published"
            );
        }

        if self.flow_dirty {
            let start = Instant::now();
            match build_flow_field(&self.grid, &self.goal) {
                Ok(field) => {
                    self.flow.publish(field, version);
                    self.flow_dirty = false;
                    published = true;
                    debug!(
                        %version,
                        elapsed_us = start.elapsed().as_micros() as u64,
                        "flow field published"
                    );
                }
                Err(e) => {
                    self.rebuild_failures += 1;
                    self.engine.diagnostics().warn_once(Warning::RebuildFailed);
                    debug!(error = %e, failures = self.rebuild_failures, "flow field rebuild skipped");
                }
            }
        }
        published
    }

    /// Current flow field snapshot, if one has been built.
    pub fn flow_field(&self) -> Option<FieldHandle<NavField>> {
        self.flow.load()
    }

    /// Current wall field snapshot, if one has been built.
    pub fn wall_field(&self) -> Option<FieldHandle<NavField>> {
        self.wall.load()
    }

    /// The pressure field (unbuilt until the first pressure pass).
    pub fn pressure(&self) -> &PressureField {
        &self.pressure
    }

    // ── Stepping ─────────────────────────────────────────────────

    /// Rebuild dirty fields, then run one tick of the pass pipeline.
    ///
    /// # Errors
    ///
    /// [`StepError::PassFailed`] if a pass fails or produces a non-finite
    /// position. Agent state is rolled back and the tick does not count.
    pub fn step(&mut self) -> Result<StepMetrics, StepError> {
        let tick_start = Instant::now();
        let fields_rebuilt = self.rebuild_fields();
        let field_rebuild_us = tick_start.elapsed().as_micros() as u64;

        let flow = self.flow.load();
        let wall = self.wall.load();
        let report = self.engine.execute_tick(TickState {
            grid: &self.grid,
            goal: self.goal,
            flow: flow.as_deref(),
            wall: wall.as_deref(),
            pressure: &mut self.pressure,
            agents: &mut self.agents,
        })?;

        let counters = report.counters;
        self.blocked_moves += counters.blocked_moves;
        let metrics = StepMetrics {
            total_us: tick_start.elapsed().as_micros() as u64,
            field_rebuild_us,
            pass_us: report.pass_us,
            fields_rebuilt,
            pressure_rebuilt: counters.pressure_rebuilt,
            active_agents: self.agents.active_count(),
            sampled: counters.sampled,
            overlap_hits: counters.overlap_hits,
            jam_hits: counters.jam_hits,
            projections: counters.projections,
            blocked_moves: self.blocked_moves,
            rebuild_failures: self.rebuild_failures,
        };
        trace!(
            tick = %report.tick_id,
            total_us = metrics.total_us,
            agents = metrics.active_agents,
            "step"
        );
        self.last_metrics = metrics.clone();
        Ok(metrics)
    }

    /// Last completed tick (`TickId(0)` before the first).
    pub fn current_tick(&self) -> TickId {
        self.engine.current_tick()
    }

    /// Metrics from the most recent successful step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// The configuration the world was created with.
    pub fn config(&self) -> &CrowdConfig {
        &self.config
    }

    /// Logged-once warning state.
    pub fn diagnostics(&self) -> &Diagnostics {
        self.engine.diagnostics()
    }

    /// The tick engine.
    pub fn engine(&self) -> &TickEngine {
        &self.engine
    }
}
