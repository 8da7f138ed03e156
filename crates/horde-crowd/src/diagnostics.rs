//! Logged-once diagnostic state.
//!
//! Some conditions (a field still pending its first build, a rebuild that
//! keeps failing) would otherwise log every tick. [`Diagnostics`] is owned
//! by the world, handed to passes through the context, and remembers which
//! warnings have fired. It never influences simulation results.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

/// Conditions that are logged at most once per [`Diagnostics`] lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Warning {
    /// A pass needed the flow field before its first build.
    FlowFieldPending = 0,
    /// A pass needed the wall field before its first build.
    WallFieldPending = 1,
    /// Steering ran before any pressure rebuild.
    PressurePending = 2,
    /// A field rebuild was skipped because of a structural error.
    RebuildFailed = 3,
    /// An agent inside a wall had no walkable cell within search range.
    ProjectionFailed = 4,
    /// A spawn with a non-finite position was refused.
    SpawnRejected = 5,
}

impl Warning {
    const COUNT: usize = 6;

    fn describe(self) -> &'static str {
        match self {
            Self::FlowFieldPending => "flow field not built yet, dependent passes skipped",
            Self::WallFieldPending => "wall field not built yet, wall push skipped",
            Self::PressurePending => "pressure field not built yet, steering unthrottled",
            Self::RebuildFailed => "field rebuild skipped, retrying on next tick",
            Self::ProjectionFailed => "agent inside wall with no walkable cell in range",
            Self::SpawnRejected => "spawn with non-finite position refused",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Which [`Warning`]s have already been logged.
#[derive(Debug, Default)]
pub struct Diagnostics {
    fired: [AtomicBool; Warning::COUNT],
}

impl Diagnostics {
    /// Fresh state: nothing logged yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `warning` at `warn` level unless it fired before. Returns
    /// whether this call logged.
    pub fn warn_once(&self, warning: Warning) -> bool {
        let first = !self.fired[warning as usize].swap(true, Ordering::Relaxed);
        if first {
            warn!(%warning, "horde diagnostic");
        }
        first
    }

    /// Whether `warning` has fired.
    pub fn has_fired(&self, warning: Warning) -> bool {
        self.fired[warning as usize].load(Ordering::Relaxed)
    }

    /// Re-arm every warning.
    pub fn reset(&self) {
        for flag in &self.fired {
            flag.store(false, Ordering::Relaxed);
        }
    }
}
