//! Execution context passed to passes during a tick.

use glam::Vec2;
use horde_core::{AgentArraysMut, TickId};
use horde_field::{GoalRegion, NavField, PressureField};
use horde_space::WalkableGrid;

use crate::diagnostics::Diagnostics;
use crate::pool::WorkerPool;

/// Aggregate counters a tick's passes report through the context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassCounters {
    /// Agents examined by hard separation, summed over its iterations.
    pub sampled: u64,
    /// Overlapping (agent, neighbour) pairs hard separation corrected.
    pub overlap_hits: u64,
    /// Agents hard separation left overlapping, or whose neighbour cap
    /// cut its final check short.
    pub jam_hits: u64,
    /// Steering moves refused because the destination cell was blocked.
    pub blocked_moves: u64,
    /// Agents wall repulsion snapped out of a blocked cell.
    pub projections: u64,
    /// Whether the pressure field was rebuilt this tick.
    pub pressure_rebuilt: bool,
}

/// Everything a [`CrowdPass`](crate::CrowdPass) can see during `step()`.
///
/// Field snapshots are read-only; the pressure field and agent
/// positions/directions are the only writable state, and only one pass
/// holds the context at a time.
pub struct PassContext<'a> {
    grid: &'a WalkableGrid,
    goal: GoalRegion,
    flow: Option<&'a NavField>,
    wall: Option<&'a NavField>,
    pressure: &'a mut PressureField,
    agents: AgentArraysMut<'a>,
    pool: &'a WorkerPool,
    diagnostics: &'a Diagnostics,
    counters: &'a mut PassCounters,
    tick_id: TickId,
    dt: f32,
}

impl<'a> PassContext<'a> {
    /// Construct a context.
    ///
    /// Typically called by the engine, not by passes directly.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        grid: &'a WalkableGrid,
        goal: GoalRegion,
        flow: Option<&'a NavField>,
        wall: Option<&'a NavField>,
        pressure: &'a mut PressureField,
        agents: AgentArraysMut<'a>,
        pool: &'a WorkerPool,
        diagnostics: &'a Diagnostics,
        counters: &'a mut PassCounters,
        tick_id: TickId,
        dt: f32,
    ) -> Self {
        Self {
            grid,
            goal,
            flow,
            wall,
            pressure,
            agents,
            pool,
            diagnostics,
            counters,
            tick_id,
            dt,
        }
    }

    /// Walkable grid.
    pub fn grid(&self) -> &'a WalkableGrid {
        self.grid
    }

    /// Goal region the flow field was built toward.
    pub fn goal(&self) -> GoalRegion {
        self.goal
    }

    /// Flow field, if built.
    pub fn flow(&self) -> Option<&'a NavField> {
        self.flow
    }

    /// Wall field, if built.
    pub fn wall(&self) -> Option<&'a NavField> {
        self.wall
    }

    /// Pressure field (possibly unbuilt).
    pub fn pressure(&self) -> &PressureField {
        &*self.pressure
    }

    /// Pressure field, writable.
    pub fn pressure_mut(&mut self) -> &mut PressureField {
        &mut *self.pressure
    }

    /// Agent positions.
    pub fn positions(&self) -> &[Vec2] {
        &*self.agents.positions
    }

    /// Agent speeds.
    pub fn speeds(&self) -> &'a [f32] {
        self.agents.speeds
    }

    /// Agent activity mask.
    pub fn active(&self) -> &'a [bool] {
        self.agents.active
    }

    /// Agent last-chosen directions.
    pub fn directions(&self) -> &[Vec2] {
        &*self.agents.directions
    }

    /// Split borrow of everything agent-related plus the pool: positions
    /// and directions writable, the rest shared.
    pub fn agents_mut(&mut self) -> (&mut AgentArraysMut<'a>, &'a WorkerPool) {
        (&mut self.agents, self.pool)
    }

    /// Split borrow of the pressure field alongside read-only agent data.
    pub fn pressure_and_agents(&mut self) -> (&mut PressureField, &[Vec2], &'a [bool]) {
        (&mut *self.pressure, &*self.agents.positions, self.agents.active)
    }

    /// Worker pool.
    pub fn pool(&self) -> &'a WorkerPool {
        self.pool
    }

    /// Logged-once diagnostics.
    pub fn diagnostics(&self) -> &'a Diagnostics {
        self.diagnostics
    }

    /// Tick counters.
    pub fn counters(&mut self) -> &mut PassCounters {
        &mut *self.counters
    }

    /// Current tick.
    pub fn tick_id(&self) -> TickId {
        self.tick_id
    }

    /// Tick duration in seconds.
    pub fn dt(&self) -> f32 {
        self.dt
    }
}
