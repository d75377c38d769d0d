//! Elementwise apply

use super::output::{snapshot_lines_as_rows, write_output};
use super::partition::{chunk_ranges, run_slices, slice_count};
use crate::algebra::{BinaryOp, UnaryOp};
use crate::error::{Error, Result};
use crate::matrix::{Compressed, SparseMatrix};
use crate::scalar::Scalar;

/// C\<mask\> (accum)= op(A), entrywise over the stored entries
///
/// Only stored entries are mapped; absent entries stay absent, they are
/// not `op(0)`. Values are transformed in parallel by contiguous chunks,
/// then the result goes through the same masked/accumulated output stage
/// as the multiply engine. Built-in operators run through their
/// monomorphized function pointer unless the context disables kernel
/// specialization, in which case the boxed indirect path runs with
/// identical output.
pub fn apply<T: Scalar>(
    c: &SparseMatrix<T>,
    mask: Option<&SparseMatrix<T>>,
    accum: Option<&BinaryOp<T>>,
    op: &UnaryOp<T>,
    a: &SparseMatrix<T>,
) -> Result<()> {
    if c.nrows() != a.nrows() || c.ncols() != a.ncols() {
        return Err(Error::dim_mismatch(
            &[a.nrows(), a.ncols()],
            &[c.nrows(), c.ncols()],
        ));
    }
    if let Some(m) = mask {
        if m.nrows() != a.nrows() || m.ncols() != a.ncols() {
            return Err(Error::dim_mismatch(
                &[a.nrows(), a.ncols()],
                &[m.nrows(), m.ncols()],
            ));
        }
    }
    let ctx = c.context().clone();
    for other in std::iter::once(a.context()).chain(mask.map(|m| m.context())) {
        if !ctx.same_as(other) {
            return Err(Error::invalid_arg(
                "context",
                "all operands must share one context",
            ));
        }
    }

    let degraded;
    let op = if ctx.kernel_specialization() {
        op
    } else {
        degraded = op.degraded();
        &degraded
    };
    let degraded_accum;
    let accum = match accum {
        Some(acc) if !ctx.kernel_specialization() => {
            degraded_accum = acc.degraded();
            Some(&degraded_accum)
        }
        other => other,
    };

    let store = snapshot_lines_as_rows(a, false, &ctx)?;
    let values = if store.is_pattern() {
        Vec::new()
    } else {
        let n = store.values.len();
        let ranges = chunk_ranges(n, slice_count(n, ctx.chunk(), ctx.nthreads()));
        let chunks: Vec<Vec<T>> = run_slices(ranges, |_, r| {
            store.values[r].iter().map(|&v| op.call(v)).collect()
        });
        chunks.concat()
    };
    let mapped = Compressed {
        orientation: store.orientation,
        nmajor: store.nmajor,
        nminor: store.nminor,
        lines: store.lines.clone(),
        minor: store.minor.clone(),
        values,
        iso: store.iso.map(|v| op.call(v)),
    };
    let mask_rows = match mask {
        Some(m) => Some(snapshot_lines_as_rows(m, false, &ctx)?),
        None => None,
    };
    write_output(c, mapped, mask_rows.as_ref(), false, false, accum, &ctx)
}
