//! Derived per-cell fields over a [`WalkableGrid`](horde_space::WalkableGrid).
//!
//! - [`NavField`]: BFS distance plus a quantized direction per cell. Two
//!   builders share one construction: [`build_wall_field`] (away from
//!   blocked cells) and [`build_flow_field`] (toward a [`GoalRegion`]).
//! - [`DirectionTable`]: the 32 evenly spaced unit vectors directions are
//!   quantized to.
//! - [`PressureField`]: per-cell crowd density turned into a diffused,
//!   non-negative congestion value with steering-bias and throttle helpers.
//! - [`FieldHandle`] / [`FieldSlot`]: versioned, reference-counted read-only
//!   snapshots replaced wholesale on rebuild.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod direction;
pub mod error;
pub mod flow;
pub mod nav;
pub mod pressure;
pub mod snapshot;
pub mod wall;

pub use direction::{DirectionTable, DIRECTION_COUNT, DIR_NONE};
pub use error::FieldError;
pub use flow::{build_flow_field, GoalRegion};
pub use nav::{FieldKind, NavField, NavSample, UNREACHABLE};
pub use pressure::{PressureConfig, PressureField, BLOCKED_PRESSURE};
pub use snapshot::{FieldHandle, FieldSlot};
pub use wall::build_wall_field;
