//! Error types for kernr
//!
//! Errors exist only at the launch boundary: every check runs once, before a
//! kernel starts. The kernels themselves have no failure path.

use thiserror::Error;

/// Result type alias using kernr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when validating a kernel launch
#[derive(Error, Debug)]
pub enum Error {
    /// Shape and stride sequences of a layout have different lengths
    #[error("Rank mismatch: shape has {shape} dimensions, strides have {strides}")]
    RankMismatch {
        /// Number of shape entries
        shape: usize,
        /// Number of stride entries
        strides: usize,
    },

    /// Logical shapes of two operands disagree
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Shapes cannot be broadcast together
    #[error("Cannot broadcast shapes {lhs:?} and {rhs:?}")]
    BroadcastError {
        /// Left-hand side shape
        lhs: Vec<usize>,
        /// Right-hand side shape
        rhs: Vec<usize>,
    },

    /// A buffer is shorter than the span its layout can reach
    #[error("Buffer '{name}' holds {got} elements, layout requires {needed}")]
    BufferTooSmall {
        /// Which buffer failed the check
        name: &'static str,
        /// Elements the layout can address
        needed: usize,
        /// Elements actually provided
        got: usize,
    },

    /// A pooling descriptor is internally inconsistent
    #[error("Invalid pooling descriptor: {reason}")]
    InvalidDescriptor {
        /// What is wrong with the descriptor
        reason: String,
    },

    /// Invalid argument provided to a launch
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create a broadcast error
    pub fn broadcast(lhs: &[usize], rhs: &[usize]) -> Self {
        Self::BroadcastError {
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
    }

    /// Create an invalid-descriptor error
    pub fn descriptor(reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            reason: reason.into(),
        }
    }
}
