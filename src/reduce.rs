//! Monoid reductions
//!
//! Full reduction to a scalar, and per-row reduction into a sparse
//! vector. Both honor the monoid's terminal value: a slice (or row) stops
//! folding as soon as the accumulator can no longer change.

use crate::algebra::Monoid;
use crate::error::Result;
use crate::kernel::partition::{balanced_ranges, chunk_ranges, run_slices, slice_count};
use crate::kernel::reorient;
use crate::matrix::{Compressed, SparseMatrix, SparseVector};
use crate::scalar::Scalar;

/// Reduce every stored entry of `a` into one value
///
/// Absent entries contribute nothing (not the identity of some other
/// algebra); an empty matrix reduces to the monoid identity.
pub fn reduce_scalar<T: Scalar>(monoid: &Monoid<T>, a: &SparseMatrix<T>) -> Result<T> {
    let ctx = a.context().clone();
    let degraded;
    let monoid = if ctx.kernel_specialization() {
        monoid
    } else {
        degraded = monoid.degraded();
        &degraded
    };
    let mut core = a.lock();
    core.materialize()?;
    let store = &core.store;
    let nnz = store.nnz();
    let ranges = chunk_ranges(nnz, slice_count(nnz, ctx.chunk(), ctx.nthreads()));
    let partials: Vec<T> = run_slices(ranges, |_, r| {
        let mut acc = monoid.identity();
        for p in r {
            acc = monoid.fold(acc, store.val(p));
            if monoid.is_terminal(acc) {
                break;
            }
        }
        acc
    });
    let mut acc = monoid.identity();
    for v in partials {
        acc = monoid.fold(acc, v);
        if monoid.is_terminal(acc) {
            break;
        }
    }
    Ok(acc)
}

/// Reduce every stored entry of a vector into one value
///
/// The vector form of [`reduce_scalar`]; an empty vector reduces to the
/// monoid identity.
pub fn reduce_vector<T: Scalar>(monoid: &Monoid<T>, v: &SparseVector<T>) -> Result<T> {
    reduce_scalar(monoid, v.as_matrix())
}

/// Reduce each row of `a` into a sparse vector entry
///
/// Rows with no stored entries produce no entry in the result.
pub fn reduce_rows<T: Scalar>(monoid: &Monoid<T>, a: &SparseMatrix<T>) -> Result<SparseVector<T>> {
    let ctx = a.context().clone();
    let degraded;
    let monoid = if ctx.kernel_specialization() {
        monoid
    } else {
        degraded = monoid.degraded();
        &degraded
    };
    let mut core = a.lock();
    core.materialize()?;
    let rows = if core.store.orientation.is_row_major() {
        core.store.clone()
    } else {
        reorient(&core.store, &ctx)
    };
    drop(core);

    let nslices = slice_count(rows.nnz(), ctx.chunk(), ctx.nthreads());
    let ranges = balanced_ranges(rows.ptrs(), nslices);
    let partials: Vec<Vec<(usize, T)>> = run_slices(ranges, |_, r| {
        let p = rows.ptrs();
        let mut out = Vec::new();
        for k in r {
            if p[k] == p[k + 1] {
                continue;
            }
            let mut acc = rows.val(p[k]);
            for e in p[k] + 1..p[k + 1] {
                if monoid.is_terminal(acc) {
                    break;
                }
                acc = monoid.fold(acc, rows.val(e));
            }
            out.push((rows.line_id(k), acc));
        }
        out
    });

    let entries: Vec<(usize, T)> = partials.concat();
    let store = Compressed::from_parts(
        crate::matrix::Orientation::ColMajor,
        1,
        a.nrows(),
        vec![0, entries.len()],
        entries.iter().map(|e| e.0).collect(),
        entries.iter().map(|e| e.1).collect(),
        None,
        0.0,
    );
    Ok(SparseVector::from_matrix(SparseMatrix::wrap(
        &ctx,
        a.nrows(),
        1,
        store,
    )))
}
