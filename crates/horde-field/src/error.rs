//! Error types for field construction.

use std::error::Error;
use std::fmt;

use horde_space::GridError;

/// A field rebuild that had to be skipped.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldError {
    /// The grid description itself is invalid.
    Grid(GridError),
    /// Goal center or radius is not finite.
    InvalidGoal,
    /// Two parallel input arrays disagree in length.
    LengthMismatch {
        /// Length of the leading array.
        expected: usize,
        /// Length of the other array.
        actual: usize,
    },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(e) => write!(f, "invalid grid: {e}"),
            Self::InvalidGoal => write!(f, "goal center and radius must be finite"),
            Self::LengthMismatch { expected, actual } => {
                write!(f, "input arrays disagree in length: {expected} vs {actual}")
            }
        }
    }
}

impl Error for FieldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for FieldError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}
