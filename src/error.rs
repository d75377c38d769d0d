//! Error types for sparr

use crate::scalar::TypeCode;
use thiserror::Error;

/// Result type alias using sparr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sparr operations
#[derive(Error, Debug)]
pub enum Error {
    /// Shape incompatibility between operands of a multiply or apply
    #[error("Dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: Vec<usize>,
        /// Actual dimensions
        got: Vec<usize>,
    },

    /// Element type incompatible with an operator, monoid, or semiring
    #[error("Domain mismatch: type {code:?} is not valid for operation '{op}'")]
    DomainMismatch {
        /// The offending type code
        code: TypeCode,
        /// The operation name
        op: &'static str,
    },

    /// Allocator returned failure or the configured memory limit was hit
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Index out of bounds
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Size of the dimension
        size: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a dimension mismatch error
    pub fn dim_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::DimensionMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create a domain mismatch error
    pub fn domain_mismatch(code: TypeCode, op: &'static str) -> Self {
        Self::DomainMismatch { code, op }
    }

    /// Create an invalid argument error
    pub fn invalid_arg(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}
