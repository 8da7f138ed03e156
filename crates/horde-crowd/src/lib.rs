//! Per-tick crowd passes for Horde.
//!
//! A tick is a fixed sequence of [`CrowdPass`] stages, each a data-parallel
//! function of the buffers it reads to the buffers it writes:
//!
//! 1. [`PressureUpdatePass`]: density count and diffusion (on its cadence).
//! 2. [`SteeringPass`]: move along the flow field, throttled and pushed by
//!    congestion.
//! 3. [`SoftSeparationPass`]: bounded pairwise overlap relief.
//! 4. [`HardSeparationPass`]: double-buffered overlap removal.
//! 5. [`WallRepulsionPass`]: push away from walls, project out of them.
//!
//! Passes declare the [`Resource`](horde_core::Resource)s they read and
//! write; [`validate_schedule`] checks the order once at startup. Work is
//! spread over a [`WorkerPool`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod diagnostics;
pub mod pass;
pub mod passes;
pub mod pool;
pub mod schedule;

pub use context::{PassContext, PassCounters};
pub use diagnostics::{Diagnostics, Warning};
pub use pass::CrowdPass;
pub use passes::{
    HardSeparationConfig, HardSeparationPass, PressureUpdatePass, SoftSeparationConfig,
    SoftSeparationPass, SteeringConfig, SteeringPass, WallConfig, WallRepulsionPass,
};
pub use pool::WorkerPool;
pub use schedule::{validate_schedule, ReadSource, ScheduleError, SchedulePlan, WriteConflict};
