//! Spatial data structures for Horde crowd simulations.
//!
//! - [`GridSpec`] and [`WalkableGrid`]: the map producer's view of the
//!   world (dimensions, cell size, origin, per-cell walkable state) plus
//!   world↔cell conversion.
//! - [`offsets`]: 4- and 8-connected neighbourhoods and the diagonal
//!   corner-cutting rule shared by every field builder.
//! - [`SpatialHash`]: a uniform-cell bucketing structure for 3×3
//!   neighbour queries over agent positions.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod grid;
pub mod offsets;
pub mod spatial_hash;

pub use error::GridError;
pub use grid::{GridSpec, WalkableGrid};
pub use spatial_hash::SpatialHash;
