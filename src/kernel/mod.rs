//! Shared computational kernels
//!
//! Work partitioning for every parallel operation, the masked and
//! accumulated output stage, plus the kernels that are not multiplies:
//! elementwise apply, two-phase transpose, and diagonal row/column
//! scaling.

mod apply;
mod output;
pub(crate) mod partition;
mod scale;
mod transpose;

pub use apply::apply;
pub use scale::{scale_cols, scale_rows};
pub use transpose::transpose;

pub(crate) use output::{snapshot_lines_as_rows, write_output};
pub(crate) use transpose::{reorient, swap_axes};
