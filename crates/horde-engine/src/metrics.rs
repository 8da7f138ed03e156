//! Per-tick metrics for the crowd world.
//!
//! [`StepMetrics`] captures timing and the aggregate pass counters for a
//! single tick, for telemetry and visualization. Nothing in the simulation
//! reads them back.

/// Timing and counters collected during a single tick.
///
/// All durations are in microseconds. Fields marked cumulative count
/// since the world was created; the rest describe this tick only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepMetrics {
    /// Wall-clock time for the entire tick, in microseconds.
    pub total_us: u64,
    /// Time spent rebuilding dirty navigation fields, in microseconds.
    pub field_rebuild_us: u64,
    /// Per-pass execution times: `(name, microseconds)`, in schedule order.
    pub pass_us: Vec<(String, u64)>,
    /// Whether a navigation field was rebuilt at the start of this tick.
    pub fields_rebuilt: bool,
    /// Whether the pressure field was rebuilt this tick.
    pub pressure_rebuilt: bool,
    /// Live agents during this tick.
    pub active_agents: usize,
    /// Agents examined by hard separation, summed over its iterations.
    pub sampled: u64,
    /// Overlapping (agent, neighbour) pairs hard separation corrected.
    pub overlap_hits: u64,
    /// Agents hard separation left overlapping, or whose neighbour cap
    /// cut its final check short.
    pub jam_hits: u64,
    /// Agents snapped out of blocked cells by wall repulsion.
    pub projections: u64,
    /// Cumulative number of steering moves refused by a blocked
    /// destination.
    pub blocked_moves: u64,
    /// Cumulative number of skipped field rebuilds.
    pub rebuild_failures: u64,
}

impl StepMetrics {
    /// Time spent in the named pass, if it ran.
    pub fn pass_time(&self, name: &str) -> Option<u64> {
        self.pass_us
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, us)| us)
    }
}
