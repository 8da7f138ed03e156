//! World configuration, loading, and error types.
//!
//! [`CrowdConfig`] aggregates one sub-config per component. Every struct
//! deserializes with `#[serde(default)]`, so a TOML document only needs
//! the values it overrides. Values are not validated on load: each
//! component sanitizes its own config at the point of use, so out-of-range
//! input degrades to the nearest valid value instead of failing.

use std::error::Error;
use std::fmt;
use std::path::Path;

use horde_crowd::{
    CrowdPass, HardSeparationConfig, HardSeparationPass, PressureUpdatePass, ScheduleError,
    SoftSeparationConfig, SoftSeparationPass, SteeringConfig, SteeringPass, WallConfig,
    WallRepulsionPass,
};
use horde_field::{GoalRegion, PressureConfig};
use serde::Deserialize;

/// Smallest accepted tick duration, in seconds.
pub const MIN_DT: f32 = 1e-4;
/// Largest accepted tick duration, in seconds.
pub const MAX_DT: f32 = 1.0;

/// The initial goal disk. Changed at runtime with
/// [`CrowdWorld::set_goal`](crate::CrowdWorld::set_goal).
pub type GoalConfig = GoalRegion;

// ── ScheduleConfig ─────────────────────────────────────────────────

/// Tick timing, worker pool size and pressure cadence.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Simulated seconds per tick, clamped to `[MIN_DT, MAX_DT]`.
    /// Default: 0.1.
    pub dt: f32,
    /// Worker threads. `None` = `available_parallelism`; explicit values
    /// are clamped to `[1, 64]`. Default: `None`.
    pub workers: Option<usize>,
    /// Ticks between pressure rebuilds, floored to 1. The previous buffer
    /// stays published in between, so congestion awareness lags by up to
    /// `pressure_rebuild_every - 1` ticks. Default: 2.
    pub pressure_rebuild_every: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            workers: None,
            pressure_rebuild_every: 2,
        }
    }
}

impl ScheduleConfig {
    /// Copy with values clamped into range; a non-finite `dt` takes the
    /// default.
    pub fn sanitized(&self) -> Self {
        let dt = if self.dt.is_finite() {
            self.dt
        } else {
            Self::default().dt
        };
        Self {
            dt: dt.clamp(MIN_DT, MAX_DT),
            workers: self.workers,
            pressure_rebuild_every: self.pressure_rebuild_every.max(1),
        }
    }
}

// ── CrowdConfig ────────────────────────────────────────────────────

/// Everything a [`CrowdWorld`](crate::CrowdWorld) needs besides the grid.
///
/// # Example
///
/// ```
/// use horde_engine::CrowdConfig;
///
/// let cfg = CrowdConfig::from_toml_str(
///     r#"
///     [schedule]
///     dt = 0.05
///
///     [goal]
///     center = [12.0, 4.0]
///     radius = 2.0
///     "#,
/// )
/// .unwrap();
/// assert_eq!(cfg.schedule.dt, 0.05);
/// assert_eq!(cfg.hard_separation.iterations, 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CrowdConfig {
    /// Tick timing and worker count.
    pub schedule: ScheduleConfig,
    /// Initial goal disk.
    pub goal: GoalConfig,
    /// Flow-following movement.
    pub steering: SteeringConfig,
    /// Density, diffusion, push and throttle.
    pub pressure: PressureConfig,
    /// Bounded overlap relief.
    pub soft_separation: SoftSeparationConfig,
    /// Residual overlap removal.
    pub hard_separation: HardSeparationConfig,
    /// Wall push and projection.
    pub wall: WallConfig,
}

impl CrowdConfig {
    /// Parse a (possibly partial) TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(ConfigError::Parse)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    /// Copy with every sub-config sanitized.
    pub fn sanitized(&self) -> Self {
        Self {
            schedule: self.schedule.sanitized(),
            goal: self.goal,
            steering: self.steering.sanitized(),
            pressure: self.pressure.sanitized(),
            soft_separation: self.soft_separation.sanitized(),
            hard_separation: self.hard_separation.sanitized(),
            wall: self.wall.sanitized(),
        }
    }

    /// The standard pipeline: pressure, steering, soft separation, hard
    /// separation, wall repulsion.
    pub fn passes(&self) -> Vec<Box<dyn CrowdPass>> {
        vec![
            Box::new(PressureUpdatePass::new(
                self.pressure.clone(),
                self.schedule.pressure_rebuild_every,
            )),
            Box::new(SteeringPass::new(
                self.steering.clone(),
                self.pressure.clone(),
            )),
            Box::new(SoftSeparationPass::new(self.soft_separation.clone())),
            Box::new(HardSeparationPass::new(self.hard_separation.clone())),
            Box::new(WallRepulsionPass::new(self.wall.clone())),
        ]
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors constructing a world or loading its configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The TOML document did not parse or had mistyped values.
    Parse(toml::de::Error),
    /// The configuration file could not be read.
    Io {
        /// Path that was read.
        path: String,
        /// Description of the failure.
        reason: String,
    },
    /// The pass list failed schedule validation.
    Schedule(ScheduleError),
    /// The worker pool could not be started.
    WorkerPool {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "config parse: {e}"),
            Self::Io { path, reason } => write!(f, "cannot read {path}: {reason}"),
            Self::Schedule(e) => write!(f, "schedule: {e}"),
            Self::WorkerPool { reason } => write!(f, "worker pool: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Schedule(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ScheduleError> for ConfigError {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use proptest::prelude::*;

    #[test]
    fn empty_document_is_default() {
        let cfg = CrowdConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, CrowdConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = CrowdConfig::from_toml_str(
            r#"
            [schedule]
            workers = 3
            pressure_rebuild_every = 5

            [hard_separation]
            min_distance = 0.8
            jam_only = true

            [goal]
            center = [5.0, 5.0]
            radius = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.schedule.workers, Some(3));
        assert_eq!(cfg.schedule.pressure_rebuild_every, 5);
        assert_eq!(cfg.schedule.dt, 0.1);
        assert_eq!(cfg.hard_separation.min_distance, 0.8);
        assert!(cfg.hard_separation.jam_only);
        assert_eq!(cfg.hard_separation.slop, 0.01);
        assert_eq!(cfg.goal, GoalRegion::new(Vec2::splat(5.0), 2.0));
        assert_eq!(cfg.wall, WallConfig::default());
    }

    #[test]
    fn mistyped_value_is_a_parse_error() {
        let err = CrowdConfig::from_toml_str("[schedule]\ndt = \"fast\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = CrowdConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(format!("{err}").contains("/definitely/not/here.toml"));
    }

    #[test]
    fn schedule_sanitizing() {
        let s = ScheduleConfig {
            dt: f32::NAN,
            workers: Some(0),
            pressure_rebuild_every: 0,
        }
        .sanitized();
        assert_eq!(s.dt, 0.1);
        assert_eq!(s.pressure_rebuild_every, 1);
        assert_eq!(ScheduleConfig { dt: 50.0, ..s.clone() }.sanitized().dt, MAX_DT);
        assert_eq!(ScheduleConfig { dt: -1.0, ..s }.sanitized().dt, MIN_DT);
    }

    #[test]
    fn default_sanitizes_to_itself() {
        let cfg = CrowdConfig::default();
        assert_eq!(cfg.sanitized(), cfg);
    }

    #[test]
    fn standard_pipeline_order() {
        let names: Vec<String> = CrowdConfig::default()
            .passes()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(
            names,
            [
                "pressure",
                "steering",
                "soft_separation",
                "hard_separation",
                "wall_repulsion"
            ]
        );
    }

    proptest! {
        #[test]
        fn sanitized_schedule_is_in_range(
            dt in prop::num::f32::ANY,
            every in any::<u32>(),
        ) {
            let s = ScheduleConfig { dt, workers: None, pressure_rebuild_every: every }.sanitized();
            prop_assert!((MIN_DT..=MAX_DT).contains(&s.dt));
            prop_assert!(s.pressure_rebuild_every >= 1);
            prop_assert_eq!(s.sanitized(), s);
        }
    }
}
