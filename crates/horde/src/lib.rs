//! Horde: grid-based crowd navigation for games and simulations.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Horde sub-crates. For most users, adding `horde` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use horde::prelude::*;
//!
//! // A 16×16 room with a wall down the middle and a gap at the bottom.
//! let spec = GridSpec::new(16, 16, 1.0, Vec2::ZERO).unwrap();
//! let mut grid = WalkableGrid::open(spec);
//! for y in 3..16 {
//!     grid.set_walkable(8, y, false);
//! }
//!
//! let mut config = CrowdConfig::default();
//! config.goal = GoalRegion::new(Vec2::new(13.5, 13.5), 1.5);
//! let mut world = CrowdWorld::new(grid, config).unwrap();
//!
//! let id = world.spawn(Vec2::new(2.5, 13.5), 1.0).unwrap();
//! let metrics = world.step().unwrap();
//! assert_eq!(metrics.active_agents, 1);
//! assert_eq!(world.current_tick(), TickId(1));
//!
//! // The route leads down through the gap, not straight at the wall.
//! let dir = world.agents().direction(id).unwrap();
//! assert!(dir.y < 0.0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `horde-core` | Agent storage, IDs, resources, error types |
//! | [`space`] | `horde-space` | Walkable grid, neighbour offsets, spatial hash |
//! | [`field`] | `horde-field` | Wall and flow nav fields, pressure, snapshots |
//! | [`crowd`] | `horde-crowd` | Pass trait, scheduling, reference passes |
//! | [`engine`] | `horde-engine` | Configuration, tick engine, `CrowdWorld` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and agent storage (`horde-core`).
///
/// Contains [`types::AgentStore`], the ID newtypes, [`types::Resource`]
/// sets used for scheduling, and the pass and step error types.
pub use horde_core as types;

/// Grid geometry and neighbour lookup (`horde-space`).
///
/// Provides [`space::GridSpec`], [`space::WalkableGrid`] and the
/// [`space::SpatialHash`] used by the separation passes.
pub use horde_space as space;

/// Navigation and pressure fields (`horde-field`).
///
/// [`field::build_flow_field`] and [`field::build_wall_field`] produce
/// [`field::NavField`]s; [`field::PressureField`] tracks crowd density.
pub use horde_field as field;

/// Crowd passes and scheduling (`horde-crowd`).
///
/// The [`crowd::CrowdPass`] trait is the main extension point for
/// user-defined movement logic.
pub use horde_crowd as crowd;

/// World orchestration (`horde-engine`).
///
/// [`engine::CrowdWorld`] owns the grid, fields and agents and steps the
/// pass pipeline.
pub use horde_engine as engine;

/// Common imports for typical Horde usage.
///
/// ```rust
/// use horde::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use horde_core::{AgentId, AgentStore, GridVersion, Resource, ResourceSet, TickId, Vec2};

    // Errors
    pub use horde_core::{PassError, StepError};

    // Space
    pub use horde_space::{GridError, GridSpec, SpatialHash, WalkableGrid};

    // Fields
    pub use horde_field::{FieldError, GoalRegion, NavField, PressureConfig, PressureField};

    // Passes
    pub use horde_crowd::{CrowdPass, PassContext, ScheduleError};

    // Engine
    pub use horde_engine::{ConfigError, CrowdConfig, CrowdWorld, StepMetrics};
}
