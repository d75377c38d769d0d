//! # sparr
//!
//! **Sparse matrix/vector algebra over arbitrary semirings.**
//!
//! sparr is a generalized sparse linear-algebra engine: matrix-matrix and
//! matrix-vector multiplication, elementwise apply, and monoid reductions,
//! all parameterized by a runtime-composable algebra (semirings built from
//! monoids and binary operators). Graph algorithms such as PageRank are
//! expressed as repeated generalized products instead of explicit traversal.
//!
//! ## Why sparr?
//!
//! - **Arbitrary semirings**: built-in catalog (plus-times, min-plus,
//!   or-and, ...) plus fully user-defined element types and operators
//! - **Multiple multiply algorithms**: Gustavson, hash, heap, dot-product,
//!   and saxpy strategies, selected automatically or by hint
//! - **Deferred updates**: element updates are queued and materialized
//!   lazily (non-blocking mode) or eagerly (blocking mode)
//! - **Parallel**: deterministic work-balanced slicing over a fork-join
//!   thread pool
//!
//! ## Quick Start
//!
//! ```
//! use sparr::prelude::*;
//!
//! let ctx = Context::new();
//! let a = SparseMatrix::<f64>::from_tuples(
//!     &ctx, 2, 2, &[0, 0, 1, 1], &[0, 1, 0, 1],
//!     &[1.0, 2.0, 3.0, 4.0], &BinaryOp::plus(),
//! )?;
//! let b = a.dup()?;
//! let c = SparseMatrix::<f64>::new(&ctx, 2, 2);
//!
//! let semiring = Semiring::plus_times();
//! mxm(&c, None, None, &semiring, &a, &b, &Descriptor::default())?;
//! # Ok::<(), sparr::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded kernels; without it every operation
//!   runs on the calling thread with identical results

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod algebra;
pub mod context;
pub mod error;
pub mod kernel;
pub mod matrix;
pub mod mult;
pub mod ops;
pub mod reduce;
pub mod scalar;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algebra::{BinaryOp, Monoid, Semiring, UnaryOp};
    pub use crate::context::{Context, Mode};
    pub use crate::error::{Error, Result};
    pub use crate::matrix::{Orientation, SparseMatrix, SparseVector};
    pub use crate::mult::{Descriptor, Method};
    pub use crate::ops::*;
    pub use crate::scalar::{NumericScalar, Scalar, TypeCode};
}
