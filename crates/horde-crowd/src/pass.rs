//! The [`CrowdPass`] trait.

use horde_core::{PassError, ResourceSet};

use crate::context::PassContext;

/// One stage of the per-tick crowd pipeline.
///
/// # Contract
///
/// - `step()` MUST be deterministic: same inputs produce identical outputs,
///   whatever the worker count.
/// - `reads()` and `writes()` are called once at startup, not per tick.
/// - A pass never creates or destroys agents and skips inactive slots.
/// - A pass whose input field is not built yet returns `Ok(())` without
///   touching agent state.
///
/// Passes take `&mut self` so they can keep scratch buffers (hash tables,
/// ping/pong position arrays) between ticks.
///
/// # Object safety
///
/// This trait is object-safe; the engine stores passes as
/// `Vec<Box<dyn CrowdPass>>`.
pub trait CrowdPass: Send + 'static {
    /// Human-readable name for errors, logs and metrics.
    fn name(&self) -> &str;

    /// Resources this pass reads.
    fn reads(&self) -> ResourceSet;

    /// Resources this pass writes.
    fn writes(&self) -> ResourceSet;

    /// Run the pass for one tick.
    fn step(&mut self, ctx: &mut PassContext<'_>) -> Result<(), PassError>;
}
