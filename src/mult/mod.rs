//! The multiply engine: `C<mask> (accum)= A * B` over a semiring
//!
//! Five interchangeable algorithms compute the unmasked product of two
//! lines-as-rows operands; a shared output stage then applies the mask,
//! the accumulator, and the replace flag. All methods produce the same
//! structural pattern and, for exact arithmetic, identical values; the
//! auto heuristic picks one from the operands' sparsity and the method
//! actually run is returned to the caller.

mod dot;
mod gustavson;
mod hash;
mod heap;
mod saxpy;

use crate::algebra::{BinaryOp, Semiring};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::kernel::partition::{balanced_ranges, slice_count};
use crate::kernel::{snapshot_lines_as_rows, swap_axes, write_output};
use crate::matrix::{Compressed, Orientation, SparseMatrix, SparseVector};
use crate::scalar::Scalar;

/// Multiply algorithm selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// Pick from the operands' sparsity (the default)
    #[default]
    Auto,
    /// Dense scatter workspace per output line
    Gustavson,
    /// Two-phase symbolic count plus per-line hash accumulation
    Hash,
    /// K-way priority merge of the selected B lines
    Heap,
    /// Per-entry sparse dot products, mask-driven when possible
    Dot,
    /// Successive sorted merges of scaled lines
    Saxpy,
}

/// Options controlling one multiply call
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    /// Use A-transpose as the first operand
    pub transpose_a: bool,
    /// Use B-transpose as the second operand
    pub transpose_b: bool,
    /// Invert the mask: write where the mask has no entry
    pub complement_mask: bool,
    /// Clear destination entries outside the mask instead of keeping them
    pub replace_output: bool,
    /// Algorithm hint; a concrete method is obeyed unconditionally
    pub method: Method,
}

/// One parallel slice's share of a product: entry counts per stored
/// output line, plus the concatenated sorted entries.
pub(crate) struct SliceOut<T> {
    pub sizes: Vec<usize>,
    pub minor: Vec<usize>,
    pub values: Vec<T>,
}

/// C\<mask\> (accum)= A * B over `semiring`
///
/// Preconditions are checked before any work: operator/type compatibility
/// (`DomainMismatch`), inner and output dimensions after the descriptor's
/// transpositions (`DimensionMismatch`), and a single owning context.
/// Pending updates on every operand (and the mask and destination) are
/// materialized first. Returns the method actually run.
///
/// The mask is structural: any stored entry means "write here", its value
/// is ignored. On error the destination is left untouched.
pub fn mxm<T: Scalar>(
    c: &SparseMatrix<T>,
    mask: Option<&SparseMatrix<T>>,
    accum: Option<&BinaryOp<T>>,
    semiring: &Semiring<T>,
    a: &SparseMatrix<T>,
    b: &SparseMatrix<T>,
    desc: &Descriptor,
) -> Result<Method> {
    semiring.validate()?;
    let (am, ak) = effective_dims(a, desc.transpose_a);
    let (bk, bn) = effective_dims(b, desc.transpose_b);
    if ak != bk {
        return Err(Error::dim_mismatch(&[am, ak, bn], &[am, bk, bn]));
    }
    if c.nrows() != am || c.ncols() != bn {
        return Err(Error::dim_mismatch(&[am, bn], &[c.nrows(), c.ncols()]));
    }
    if let Some(m) = mask {
        if m.nrows() != am || m.ncols() != bn {
            return Err(Error::dim_mismatch(&[am, bn], &[m.nrows(), m.ncols()]));
        }
    }
    let ctx = c.context().clone();
    for other in [a.context(), b.context()]
        .into_iter()
        .chain(mask.map(|m| m.context()))
    {
        if !ctx.same_as(other) {
            return Err(Error::invalid_arg(
                "context",
                "all operands must share one context",
            ));
        }
    }

    let degraded;
    let semiring = if ctx.kernel_specialization() {
        semiring
    } else {
        degraded = semiring.degraded();
        &degraded
    };
    let degraded_accum;
    let accum = match accum {
        Some(op) if !ctx.kernel_specialization() => {
            degraded_accum = op.degraded();
            Some(&degraded_accum)
        }
        other => other,
    };

    // operands are snapshotted one lock at a time, so A*A and C=C*B
    // aliasing cannot deadlock
    let a_rows = snapshot_lines_as_rows(a, desc.transpose_a, &ctx)?;
    let b_rows = snapshot_lines_as_rows(b, desc.transpose_b, &ctx)?;
    let mask_rows = match mask {
        Some(m) => Some(snapshot_lines_as_rows(m, false, &ctx)?),
        None => None,
    };

    let method = match desc.method {
        Method::Auto => choose_method(
            &a_rows,
            &b_rows,
            mask_rows.as_ref().filter(|_| !desc.complement_mask),
        ),
        hint => hint,
    };

    let product = match method {
        Method::Gustavson => gustavson::multiply(&ctx, &a_rows, &b_rows, semiring)?,
        Method::Hash => hash::multiply(&ctx, &a_rows, &b_rows, semiring)?,
        Method::Heap => heap::multiply(&ctx, &a_rows, &b_rows, semiring)?,
        Method::Saxpy => saxpy::multiply(&ctx, &a_rows, &b_rows, semiring)?,
        Method::Dot => {
            let b_cols = swap_axes(
                &b_rows,
                Orientation::ColMajor,
                None,
                ctx.hyper_threshold(),
                ctx.chunk(),
                ctx.nthreads(),
            );
            let dot_mask = mask_rows.as_ref().filter(|_| !desc.complement_mask);
            dot::multiply(&ctx, &a_rows, &b_cols, semiring, dot_mask)?
        }
        Method::Auto => unreachable!("resolved above"),
    };

    write_output(
        c,
        product,
        mask_rows.as_ref(),
        desc.complement_mask,
        desc.replace_output,
        accum,
        &ctx,
    )?;
    Ok(method)
}

/// C\<mask\> (accum)= A * x, the matrix-vector form of [`mxm`]
///
/// `transpose_b` in the descriptor is ignored.
pub fn mxv<T: Scalar>(
    c: &SparseVector<T>,
    mask: Option<&SparseVector<T>>,
    accum: Option<&BinaryOp<T>>,
    semiring: &Semiring<T>,
    a: &SparseMatrix<T>,
    x: &SparseVector<T>,
    desc: &Descriptor,
) -> Result<Method> {
    let desc = Descriptor {
        transpose_b: false,
        ..desc.clone()
    };
    mxm(
        c.as_matrix(),
        mask.map(|m| m.as_matrix()),
        accum,
        semiring,
        a,
        x.as_matrix(),
        &desc,
    )
}

fn effective_dims<T: Scalar>(a: &SparseMatrix<T>, transpose: bool) -> (usize, usize) {
    if transpose {
        (a.ncols(), a.nrows())
    } else {
        (a.nrows(), a.ncols())
    }
}

/// Exact multiply work: one unit per semiring multiply
pub(crate) fn count_flops<T: Scalar>(a: &Compressed<T>, b: &Compressed<T>) -> usize {
    a.minor.iter().map(|&k| b.line_range(k).len()).sum()
}

fn choose_method<T: Scalar>(
    a: &Compressed<T>,
    b: &Compressed<T>,
    mask: Option<&Compressed<T>>,
) -> Method {
    let flops = count_flops(a, b);
    if let Some(m) = mask {
        // a sparse mask prunes most of the product: compute only the
        // requested dot products
        if m.nnz().saturating_mul(4) <= flops {
            return Method::Dot;
        }
    }
    if flops == 0 {
        return Method::Hash;
    }
    let avg = flops / a.nonempty_lines().max(1);
    let n = b.nminor;
    if avg.saturating_mul(16) >= n {
        Method::Gustavson
    } else if avg <= 4 {
        Method::Heap
    } else {
        Method::Hash
    }
}

/// Parallel slice ranges over an operand's stored lines, balanced by the
/// operand's nonzero count
pub(crate) fn product_slices<T: Scalar>(
    ctx: &Context,
    a: &Compressed<T>,
) -> Vec<std::ops::Range<usize>> {
    let nslices = slice_count(a.nnz(), ctx.chunk(), ctx.nthreads());
    balanced_ranges(a.ptrs(), nslices)
}

/// Assemble per-slice outputs into one row-major product store
pub(crate) fn stitch<T: Scalar>(
    ctx: &Context,
    a: &Compressed<T>,
    ncols: usize,
    slices: Vec<SliceOut<T>>,
) -> Compressed<T> {
    let mut ptrs = vec![0usize; a.nmajor + 1];
    let mut k = 0;
    for s in &slices {
        for &sz in &s.sizes {
            ptrs[a.line_id(k) + 1] = sz;
            k += 1;
        }
    }
    debug_assert_eq!(k, a.nlines());
    for i in 0..a.nmajor {
        ptrs[i + 1] += ptrs[i];
    }
    let total = ptrs[a.nmajor];
    let mut minor = Vec::with_capacity(total);
    let mut values = Vec::with_capacity(total);
    for s in slices {
        minor.extend(s.minor);
        values.extend(s.values);
    }
    Compressed::from_parts(
        Orientation::RowMajor,
        a.nmajor,
        ncols,
        ptrs,
        minor,
        values,
        None,
        ctx.hyper_threshold(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn dense_mxm(
        ctx: &Context,
        a: &[f64],
        b: &[f64],
        m: usize,
        k: usize,
        n: usize,
        method: Method,
    ) -> Vec<f64> {
        let am = SparseMatrix::from_dense(ctx, m, k, a).unwrap();
        let bm = SparseMatrix::from_dense(ctx, k, n, b).unwrap();
        let cm = SparseMatrix::<f64>::new(ctx, m, n);
        let desc = Descriptor {
            method,
            ..Descriptor::default()
        };
        let ran = mxm(&cm, None, None, &Semiring::plus_times(), &am, &bm, &desc).unwrap();
        if method != Method::Auto {
            assert_eq!(ran, method);
        }
        cm.to_dense().unwrap()
    }

    #[test]
    fn test_all_methods_agree_on_plus_times() {
        let ctx = Context::new();
        let a = vec![1.0, 2.0, 0.0, 0.0, 3.0, 4.0];
        let b = vec![5.0, 0.0, 6.0, 7.0, 0.0, 8.0, 9.0, 0.0, 1.0];
        // reference: [[19, 0, 22], [57, 0, 28]]
        let expect = vec![19.0, 0.0, 22.0, 57.0, 0.0, 28.0];
        for method in [
            Method::Gustavson,
            Method::Hash,
            Method::Heap,
            Method::Dot,
            Method::Saxpy,
            Method::Auto,
        ] {
            assert_eq!(dense_mxm(&ctx, &a, &b, 2, 3, 3, method), expect, "{method:?}");
        }
    }

    #[test]
    fn test_workspace_methods_honor_allocator_limit() {
        let ctx = Context::new();
        ctx.set_allocator(
            std::sync::Arc::new(crate::context::SystemAllocator::with_limit(16)),
            true,
        );
        let a = SparseMatrix::from_dense(&ctx, 8, 8, &[1.0; 64]).unwrap();
        let b = SparseMatrix::from_dense(&ctx, 8, 8, &[1.0; 64]).unwrap();
        for method in [Method::Gustavson, Method::Hash, Method::Heap, Method::Saxpy] {
            let c = SparseMatrix::<f64>::new(&ctx, 8, 8);
            let desc = Descriptor {
                method,
                ..Descriptor::default()
            };
            let r = mxm(&c, None, None, &Semiring::plus_times(), &a, &b, &desc);
            assert!(matches!(r, Err(Error::OutOfMemory { .. })), "{method:?}");
            assert_eq!(c.nvals().unwrap(), 0, "{method:?}");
        }
        // dot keeps only constant per-entry state; nothing to charge
        let c = SparseMatrix::<f64>::new(&ctx, 8, 8);
        let desc = Descriptor {
            method: Method::Dot,
            ..Descriptor::default()
        };
        mxm(&c, None, None, &Semiring::plus_times(), &a, &b, &desc).unwrap();
        assert_eq!(c.to_dense().unwrap(), vec![8.0; 64]);
        assert_eq!(ctx.allocator().allocated_bytes(), 0);
    }

    #[test]
    fn test_dimension_mismatch_before_work() {
        let ctx = Context::new();
        let a = SparseMatrix::<f64>::new(&ctx, 2, 3);
        let b = SparseMatrix::<f64>::new(&ctx, 4, 2);
        let c = SparseMatrix::<f64>::new(&ctx, 2, 2);
        let r = mxm(
            &c,
            None,
            None,
            &Semiring::plus_times(),
            &a,
            &b,
            &Descriptor::default(),
        );
        assert!(matches!(r, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_transpose_flags() {
        let ctx = Context::new();
        let a = SparseMatrix::from_dense(&ctx, 3, 2, &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]).unwrap();
        let b = SparseMatrix::from_dense(&ctx, 3, 2, &[7.0, 10.0, 8.0, 11.0, 9.0, 12.0]).unwrap();
        let c = SparseMatrix::<f64>::new(&ctx, 2, 2);
        // C = A' * B
        let desc = Descriptor {
            transpose_a: true,
            ..Descriptor::default()
        };
        mxm(&c, None, None, &Semiring::plus_times(), &a, &b, &desc).unwrap();
        assert_eq!(c.to_dense().unwrap(), vec![50.0, 68.0, 122.0, 167.0]);

        // C = A' * B'' == A' * B via both flags on a transposed copy
        let bt = crate::kernel::transpose(&b, None).unwrap();
        let c2 = SparseMatrix::<f64>::new(&ctx, 2, 2);
        let desc2 = Descriptor {
            transpose_a: true,
            transpose_b: true,
            ..Descriptor::default()
        };
        mxm(&c2, None, None, &Semiring::plus_times(), &a, &bt, &desc2).unwrap();
        assert_eq!(c2.to_dense().unwrap(), c.to_dense().unwrap());
    }

    #[test]
    fn test_mask_keeps_and_replaces() {
        let ctx = Context::new();
        let a = SparseMatrix::from_dense(&ctx, 2, 2, &[1.0, 1.0, 1.0, 1.0]).unwrap();
        let b = SparseMatrix::from_dense(&ctx, 2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        // mask selects only column 0
        let mask =
            SparseMatrix::pattern_from_tuples(&ctx, 2, 2, &[0, 1], &[0, 0], 1.0).unwrap();

        // pre-existing content outside the mask survives without replace
        let c = SparseMatrix::from_dense(&ctx, 2, 2, &[0.0, 9.0, 0.0, 9.0]).unwrap();
        mxm(
            &c,
            Some(&mask),
            None,
            &Semiring::plus_times(),
            &a,
            &b,
            &Descriptor::default(),
        )
        .unwrap();
        assert_eq!(c.to_dense().unwrap(), vec![4.0, 9.0, 4.0, 9.0]);

        // with replace it is cleared
        let c2 = SparseMatrix::from_dense(&ctx, 2, 2, &[0.0, 9.0, 0.0, 9.0]).unwrap();
        let desc = Descriptor {
            replace_output: true,
            ..Descriptor::default()
        };
        mxm(
            &c2,
            Some(&mask),
            None,
            &Semiring::plus_times(),
            &a,
            &b,
            &desc,
        )
        .unwrap();
        assert_eq!(c2.to_dense().unwrap(), vec![4.0, 0.0, 4.0, 0.0]);
    }

    #[test]
    fn test_complement_mask() {
        let ctx = Context::new();
        let a = SparseMatrix::from_dense(&ctx, 2, 2, &[1.0, 1.0, 1.0, 1.0]).unwrap();
        let b = SparseMatrix::from_dense(&ctx, 2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mask =
            SparseMatrix::pattern_from_tuples(&ctx, 2, 2, &[0, 1], &[0, 0], 1.0).unwrap();
        let c = SparseMatrix::<f64>::new(&ctx, 2, 2);
        let desc = Descriptor {
            complement_mask: true,
            ..Descriptor::default()
        };
        mxm(
            &c,
            Some(&mask),
            None,
            &Semiring::plus_times(),
            &a,
            &b,
            &desc,
        )
        .unwrap();
        // only column 1 is written
        assert_eq!(c.to_dense().unwrap(), vec![0.0, 6.0, 0.0, 6.0]);
    }

    #[test]
    fn test_accumulate_into_existing() {
        let ctx = Context::new();
        let a = SparseMatrix::from_dense(&ctx, 2, 2, &[1.0, 0.0, 0.0, 1.0]).unwrap();
        let b = SparseMatrix::from_dense(&ctx, 2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let c = SparseMatrix::from_dense(&ctx, 2, 2, &[100.0, 0.0, 0.0, 100.0]).unwrap();
        mxm(
            &c,
            None,
            Some(&BinaryOp::plus()),
            &Semiring::plus_times(),
            &a,
            &b,
            &Descriptor::default(),
        )
        .unwrap();
        assert_eq!(c.to_dense().unwrap(), vec![101.0, 2.0, 3.0, 104.0]);
    }

    #[test]
    fn test_aliasing_squares_a_matrix() {
        let ctx = Context::new();
        let a = SparseMatrix::from_dense(&ctx, 2, 2, &[1.0, 1.0, 0.0, 1.0]).unwrap();
        let c = SparseMatrix::<f64>::new(&ctx, 2, 2);
        mxm(
            &c,
            None,
            None,
            &Semiring::plus_times(),
            &a,
            &a,
            &Descriptor::default(),
        )
        .unwrap();
        assert_eq!(c.to_dense().unwrap(), vec![1.0, 2.0, 0.0, 1.0]);
        // destination aliased with an operand
        mxm(
            &a,
            None,
            None,
            &Semiring::plus_times(),
            &a,
            &a,
            &Descriptor::default(),
        )
        .unwrap();
        assert_eq!(a.to_dense().unwrap(), vec![1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_min_plus_semiring() {
        let ctx = Context::new();
        // adjacency of a path 0->1->2 with weights
        let a = SparseMatrix::from_tuples(
            &ctx,
            3,
            3,
            &[0, 1],
            &[1, 2],
            &[2.0, 3.0],
            &BinaryOp::plus(),
        )
        .unwrap();
        let c = SparseMatrix::<f64>::new(&ctx, 3, 3);
        mxm(
            &c,
            None,
            None,
            &Semiring::min_plus(),
            &a,
            &a,
            &Descriptor::default(),
        )
        .unwrap();
        // two-hop distance 0->2 = 5
        assert_eq!(c.extract_element(0, 2).unwrap(), Some(5.0));
        assert_eq!(c.nvals().unwrap(), 1);
    }

    #[test]
    fn test_mxv() {
        let ctx = Context::new();
        let a = SparseMatrix::from_dense(&ctx, 2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let x = SparseVector::from_dense(&ctx, &[1.0, 0.5, 2.0]);
        let y = SparseVector::<f64>::new(&ctx, 2);
        mxv(
            &y,
            None,
            None,
            &Semiring::plus_times(),
            &a,
            &x,
            &Descriptor::default(),
        )
        .unwrap();
        assert_eq!(y.to_dense().unwrap(), vec![8.0, 18.5]);
    }

    #[test]
    fn test_method_hint_obeyed_and_reported() {
        let ctx = Context::new();
        let a = SparseMatrix::from_dense(&ctx, 2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let c = SparseMatrix::<f64>::new(&ctx, 2, 2);
        for method in [Method::Heap, Method::Saxpy, Method::Dot] {
            let desc = Descriptor {
                method,
                ..Descriptor::default()
            };
            let ran = mxm(&c, None, None, &Semiring::plus_times(), &a, &a, &desc).unwrap();
            assert_eq!(ran, method);
        }
        let ran = mxm(
            &c,
            None,
            None,
            &Semiring::plus_times(),
            &a,
            &a,
            &Descriptor::default(),
        )
        .unwrap();
        assert_ne!(ran, Method::Auto);
    }
}
