//! The shared masked/accumulated output stage
//!
//! Every operation that writes into an existing destination (the multiply
//! engine, elementwise apply) produces an unmasked row-major result first
//! and hands it to [`write_output`], which folds in the accumulator,
//! applies the structural mask with its complement and replace options,
//! and restores the destination's storage orientation.

use super::transpose::{reorient, swap_axes};
use crate::algebra::BinaryOp;
use crate::context::Context;
use crate::error::Result;
use crate::matrix::{Compressed, Orientation, SparseMatrix};
use crate::scalar::Scalar;

/// Materialize and snapshot an operand with its storage lines aligned to
/// the rows of the (possibly transposed) effective operand
pub(crate) fn snapshot_lines_as_rows<T: Scalar>(
    m: &SparseMatrix<T>,
    transpose: bool,
    ctx: &Context,
) -> Result<Compressed<T>> {
    let mut core = m.lock();
    core.materialize()?;
    let store = &core.store;
    let rows_are_lines = store.orientation.is_row_major() != transpose;
    Ok(if rows_are_lines {
        let mut s = store.clone();
        s.orientation = Orientation::RowMajor;
        s
    } else {
        swap_axes(
            store,
            Orientation::RowMajor,
            None,
            ctx.hyper_threshold(),
            ctx.chunk(),
            ctx.nthreads(),
        )
    })
}

/// Merge a finished result into the destination: accumulate, mask,
/// replace, and restore the destination's orientation
pub(crate) fn write_output<T: Scalar>(
    c: &SparseMatrix<T>,
    product: Compressed<T>,
    mask: Option<&Compressed<T>>,
    complement: bool,
    replace: bool,
    accum: Option<&BinaryOp<T>>,
    ctx: &Context,
) -> Result<()> {
    let mut core = c.lock();
    core.materialize()?;
    let old = if core.store.orientation.is_row_major() {
        core.store.clone()
    } else {
        reorient(&core.store, ctx)
    };
    let nrows = product.nmajor;
    let ncols = product.nminor;

    let in_mask = |i: usize, j: usize| match mask {
        None => true,
        Some(m) => m.find(i, j).is_some() != complement,
    };

    let mut ptrs = vec![0usize; nrows + 1];
    let mut minor = Vec::with_capacity(product.nnz().max(old.nnz()));
    let mut values = Vec::with_capacity(product.nnz().max(old.nnz()));
    let mut zline: Vec<(usize, T)> = Vec::new();
    for i in 0..nrows {
        // Z(i,:) = accum ? union(C_old, T) : T
        zline.clear();
        let trange = product.line_range(i);
        match accum {
            None => {
                for p in trange {
                    zline.push((product.minor[p], product.val(p)));
                }
            }
            Some(op) => {
                let orange = old.line_range(i);
                let mut op_idx = orange.start;
                let mut tp = trange.start;
                while op_idx < orange.end || tp < trange.end {
                    if tp >= trange.end {
                        zline.push((old.minor[op_idx], old.val(op_idx)));
                        op_idx += 1;
                    } else if op_idx >= orange.end {
                        zline.push((product.minor[tp], product.val(tp)));
                        tp += 1;
                    } else if old.minor[op_idx] < product.minor[tp] {
                        zline.push((old.minor[op_idx], old.val(op_idx)));
                        op_idx += 1;
                    } else if old.minor[op_idx] > product.minor[tp] {
                        zline.push((product.minor[tp], product.val(tp)));
                        tp += 1;
                    } else {
                        zline.push((
                            old.minor[op_idx],
                            op.call(old.val(op_idx), product.val(tp)),
                        ));
                        op_idx += 1;
                        tp += 1;
                    }
                }
            }
        }
        // inside the mask the row becomes Z; outside it keeps the old
        // entries unless replace clears them
        let mut z = zline.iter().peekable();
        let orange = old.line_range(i);
        let mut op_idx = orange.start;
        loop {
            let znext = z.peek().map(|e| **e);
            let onext = if op_idx < orange.end {
                Some(old.minor[op_idx])
            } else {
                None
            };
            match (znext, onext) {
                (None, None) => break,
                (Some((j, v)), oj) if oj.map_or(true, |o| j < o) => {
                    if in_mask(i, j) {
                        minor.push(j);
                        values.push(v);
                    }
                    z.next();
                }
                (zj, Some(j)) if zj.map_or(true, |(zc, _)| zc > j) => {
                    if !in_mask(i, j) && !replace {
                        minor.push(j);
                        values.push(old.val(op_idx));
                    }
                    op_idx += 1;
                }
                (Some((j, v)), Some(_)) => {
                    if in_mask(i, j) {
                        minor.push(j);
                        values.push(v);
                    } else if !replace {
                        minor.push(j);
                        values.push(old.val(op_idx));
                    }
                    z.next();
                    op_idx += 1;
                }
                (None, Some(_)) | (Some(_), None) => unreachable!("covered by guards"),
            }
        }
        ptrs[i + 1] = minor.len();
    }

    let mut out = Compressed::from_parts(
        Orientation::RowMajor,
        nrows,
        ncols,
        ptrs,
        minor,
        values,
        None,
        ctx.hyper_threshold(),
    );
    if !core.store.orientation.is_row_major() {
        out = reorient(&out, ctx);
    }
    core.store = out;
    Ok(())
}
