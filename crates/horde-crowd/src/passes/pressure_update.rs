//! Density count and diffusion, on a configurable cadence.

use horde_core::{PassError, Resource, ResourceSet};
use horde_field::PressureConfig;
use tracing::trace;

use crate::context::PassContext;
use crate::diagnostics::Warning;
use crate::pass::CrowdPass;

/// Rebuilds the pressure field every `rebuild_every` ticks.
///
/// Between rebuilds the previous buffer stays published, so congestion
/// awareness lags agent movement by up to `rebuild_every - 1` ticks. A
/// grid edit (geometry or walkable version), or a field never built,
/// forces a rebuild regardless of the cadence.
#[derive(Debug)]
pub struct PressureUpdatePass {
    config: PressureConfig,
    rebuild_every: u32,
    countdown: u32,
}

impl PressureUpdatePass {
    /// Create the pass. `rebuild_every` is floored to 1.
    pub fn new(config: PressureConfig, rebuild_every: u32) -> Self {
        Self {
            config,
            rebuild_every: rebuild_every.max(1),
            countdown: 0,
        }
    }

    /// Rebuild cadence in ticks.
    pub fn rebuild_every(&self) -> u32 {
        self.rebuild_every
    }

    /// Pressure parameters.
    pub fn config(&self) -> &PressureConfig {
        &self.config
    }
}

impl CrowdPass for PressureUpdatePass {
    fn name(&self) -> &str {
        "pressure"
    }

    fn reads(&self) -> ResourceSet {
        [Resource::Walkable, Resource::FlowField, Resource::Positions]
            .into_iter()
            .collect()
    }

    fn writes(&self) -> ResourceSet {
        [Resource::Pressure].into_iter().collect()
    }

    fn step(&mut self, ctx: &mut PassContext<'_>) -> Result<(), PassError> {
        let grid = ctx.grid();
        let Some(flow) = ctx.flow() else {
            ctx.diagnostics().warn_once(Warning::FlowFieldPending);
            return Ok(());
        };

        let stale = !ctx.pressure().is_current(grid);
        if self.countdown > 0 && !stale {
            self.countdown -= 1;
            return Ok(());
        }

        let config = self.config.sanitized();
        let (pressure, positions, active) = ctx.pressure_and_agents();
        pressure
            .rebuild(grid, Some(flow), positions, active, &config)
            .map_err(|e| PassError::ExecutionFailed {
                reason: e.to_string(),
            })?;
        trace!(
            tick = ctx.tick_id().0,
            rebuilds = ctx.pressure().rebuild_count(),
            "pressure rebuilt"
        );

        self.countdown = self.rebuild_every - 1;
        ctx.counters().pressure_rebuilt = true;
        Ok(())
    }
}
