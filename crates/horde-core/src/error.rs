//! Error types shared by passes and the tick engine.
//!
//! Expected edge cases (off-grid agents, fields not yet built, empty
//! neighbourhoods) never surface here: they degrade to safe defaults
//! inside the passes. These variants cover structural failures only.

use std::error::Error;
use std::fmt;

use crate::resource::Resource;

/// Errors from the tick engine during `step()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepError {
    /// A pass returned an error during execution.
    PassFailed {
        /// Name of the failing pass.
        name: String,
        /// The underlying pass error.
        reason: PassError,
    },
    /// Agent storage arrays disagree in length.
    AgentStorageCorrupt {
        /// Number of position slots.
        positions: usize,
        /// Number of speed slots.
        speeds: usize,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PassFailed { name, reason } => {
                write!(f, "pass '{name}' failed: {reason}")
            }
            Self::AgentStorageCorrupt { positions, speeds } => {
                write!(
                    f,
                    "agent storage corrupt: {positions} positions vs {speeds} speeds"
                )
            }
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PassFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Errors from individual pass execution.
///
/// Returned by `CrowdPass::step()` and wrapped in
/// [`StepError::PassFailed`] by the tick engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PassError {
    /// The pass could not run.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A resource the pass declared as a write target was not provided.
    MissingResource {
        /// The missing resource.
        resource: Resource,
    },
    /// A non-finite position was produced.
    NanDetected {
        /// Index of the first offending agent slot.
        agent_index: usize,
    },
}

impl fmt::Display for PassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::MissingResource { resource } => {
                write!(f, "resource {resource} not available")
            }
            Self::NanDetected { agent_index } => {
                write!(f, "non-finite position at agent slot {agent_index}")
            }
        }
    }
}

impl Error for PassError {}
