//! Core types for the Horde crowd simulation framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Horde workspace:
//! strongly-typed IDs, the resource bitset used for pass scheduling,
//! error types, struct-of-arrays agent storage, and the deterministic
//! hashing helpers shared by spatial bucketing and jitter generation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod agents;
pub mod error;
pub mod hash;
pub mod id;
pub mod resource;

pub use agents::{AgentArraysMut, AgentStore};
pub use error::{PassError, StepError};
pub use id::{AgentId, GridVersion, TickId};
pub use resource::{Resource, ResourceSet};

/// Re-exported 2D vector type used for every position and direction.
pub use glam::Vec2;
