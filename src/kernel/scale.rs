//! Diagonal scaling: multiply a matrix by a diagonal operand

use crate::algebra::BinaryOp;
use crate::error::{Error, Result};
use crate::matrix::{Compressed, Orientation, SparseMatrix, SparseVector};
use crate::scalar::Scalar;

/// C = diag(d) * A under `op`: `C(i,j) = op(d(i), A(i,j))`
///
/// Rows with no diagonal entry are dropped (multiplication by an absent
/// entry produces nothing). Pattern-only operands contribute their iso
/// value.
pub fn scale_rows<T: Scalar>(
    d: &SparseVector<T>,
    a: &SparseMatrix<T>,
    op: &BinaryOp<T>,
) -> Result<SparseMatrix<T>> {
    if d.size() != a.nrows() {
        return Err(Error::dim_mismatch(&[a.nrows()], &[d.size()]));
    }
    scale(d, a, op, true)
}

/// C = A * diag(d) under `op`: `C(i,j) = op(A(i,j), d(j))`
///
/// Columns with no diagonal entry are dropped.
pub fn scale_cols<T: Scalar>(
    a: &SparseMatrix<T>,
    d: &SparseVector<T>,
    op: &BinaryOp<T>,
) -> Result<SparseMatrix<T>> {
    if d.size() != a.ncols() {
        return Err(Error::dim_mismatch(&[a.ncols()], &[d.size()]));
    }
    scale(d, a, op, false)
}

fn scale<T: Scalar>(
    d: &SparseVector<T>,
    a: &SparseMatrix<T>,
    op: &BinaryOp<T>,
    by_rows: bool,
) -> Result<SparseMatrix<T>> {
    let ctx = a.context().clone();
    let degraded;
    let op = if ctx.kernel_specialization() {
        op
    } else {
        degraded = op.degraded();
        &degraded
    };
    let mut diag: Vec<Option<T>> = vec![None; d.size()];
    {
        let mut dcore = d.as_matrix().lock();
        dcore.materialize()?;
        let store = &dcore.store;
        for (_, range) in store.lines() {
            for p in range {
                diag[store.minor[p]] = Some(store.val(p));
            }
        }
    }

    let mut core = a.lock();
    core.materialize()?;
    let store = &core.store;
    // the scaled axis is the major axis for row scaling of row-major
    // storage (and col scaling of col-major), the minor axis otherwise
    let along_major = by_rows == (store.orientation == Orientation::RowMajor);

    let mut ptrs = vec![0usize; store.nmajor + 1];
    let mut minor = Vec::with_capacity(store.nnz());
    let mut values = Vec::with_capacity(store.nnz());
    for major in 0..store.nmajor {
        let range = store.line_range(major);
        if along_major {
            if let Some(dv) = diag[major] {
                for p in range {
                    minor.push(store.minor[p]);
                    values.push(combine(op, dv, store.val(p), by_rows));
                }
            }
        } else {
            for p in range {
                if let Some(dv) = diag[store.minor[p]] {
                    minor.push(store.minor[p]);
                    values.push(combine(op, dv, store.val(p), by_rows));
                }
            }
        }
        ptrs[major + 1] = minor.len();
    }
    let out = Compressed::from_parts(
        store.orientation,
        store.nmajor,
        store.nminor,
        ptrs,
        minor,
        values,
        None,
        ctx.hyper_threshold(),
    );
    drop(core);
    Ok(SparseMatrix::from_store(&ctx, out))
}

// Row scaling puts the diagonal value on the left, column scaling on the
// right; order matters for non-commutative ops.
#[inline]
fn combine<T: Scalar>(op: &BinaryOp<T>, dv: T, av: T, by_rows: bool) -> T {
    if by_rows {
        op.call(dv, av)
    } else {
        op.call(av, dv)
    }
}
