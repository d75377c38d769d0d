//! The operation entry points, re-exported in one place
//!
//! Everything callable lives in its home module; this module is the flat
//! surface the prelude pulls in.

pub use crate::kernel::{apply, scale_cols, scale_rows, transpose};
pub use crate::mult::{mxm, mxv};
pub use crate::reduce::{reduce_rows, reduce_scalar, reduce_vector};
