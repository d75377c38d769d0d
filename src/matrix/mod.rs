//! Sparse matrix and vector handles
//!
//! A [`SparseMatrix`] owns compressed storage plus a queue of pending
//! element updates; reads that need the full structure materialize the
//! queue first. [`SparseVector`] is a thin wrapper over an n-by-1 matrix.

#[allow(clippy::module_inception)]
mod matrix;
mod storage;
mod vector;

pub use matrix::SparseMatrix;
pub use storage::Orientation;
pub use vector::SparseVector;

pub(crate) use storage::Compressed;
