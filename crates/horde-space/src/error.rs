//! Error types for grid construction.

use std::fmt;

/// Structural problems with a grid description.
///
/// These are the only hard failures in the system: a rebuild that sees
/// one is skipped and retried on the next change signal.
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// Width or height is zero.
    EmptyGrid,
    /// Cell size is NaN, infinite, zero or negative.
    InvalidCellSize {
        /// The offending value.
        value: f32,
    },
    /// Origin has a non-finite component.
    InvalidOrigin,
    /// A dimension does not fit in `i32` cell coordinates.
    DimensionTooLarge {
        /// Which dimension.
        name: &'static str,
        /// The value provided.
        value: u32,
    },
    /// The walkable array does not have `width * height` entries.
    WalkableSizeMismatch {
        /// Expected number of cells.
        expected: usize,
        /// Length of the array supplied.
        actual: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid => write!(f, "grid must have at least one cell"),
            Self::InvalidCellSize { value } => {
                write!(f, "cell size must be finite and positive, got {value}")
            }
            Self::InvalidOrigin => write!(f, "grid origin must be finite"),
            Self::DimensionTooLarge { name, value } => {
                write!(f, "{name} = {value} exceeds i32::MAX")
            }
            Self::WalkableSizeMismatch { expected, actual } => {
                write!(
                    f,
                    "walkable array has {actual} entries, grid has {expected} cells"
                )
            }
        }
    }
}

impl std::error::Error for GridError {}
