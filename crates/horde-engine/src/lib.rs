//! Lockstep crowd world for Horde.
//!
//! [`CrowdWorld`] owns a walkable grid, a goal disk and a crowd of agents,
//! keeps the wall and flow fields in sync with the grid, and runs the pass
//! pipeline through a [`TickEngine`] once per [`step()`](CrowdWorld::step).
//! Configuration is a single [`CrowdConfig`], loadable from TOML.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod tick;
pub mod world;

pub use config::{ConfigError, CrowdConfig, GoalConfig, ScheduleConfig};
pub use metrics::StepMetrics;
pub use tick::{engine_inputs, TickEngine, TickReport, TickState};
pub use world::CrowdWorld;
