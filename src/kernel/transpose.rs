//! Two-phase parallel transpose
//!
//! Phase one counts entries per output line, one count array per slice;
//! an exclusive scan across slices then lines turns the counts into
//! disjoint write offsets; phase two scatters entries into them. Within
//! every output line entries arrive in increasing source-line order, so
//! the result is sorted without a cleanup pass.

use super::partition::{balanced_ranges, run_slices, slice_count};
use crate::algebra::UnaryOp;
use crate::context::Context;
use crate::error::Result;
use crate::matrix::{Compressed, Orientation, SparseMatrix};
use crate::scalar::Scalar;

// Disjoint-write view of the output arrays shared across slices. Each
// slice writes only at offsets reserved for it by the scan.
struct Scatter<T> {
    minor: *mut usize,
    values: *mut T,
}

unsafe impl<T: Send> Send for Scatter<T> {}
unsafe impl<T: Send> Sync for Scatter<T> {}

/// Exchange the major and minor axes of compressed storage
///
/// The output is tagged with `orientation`: passing the input's own
/// orientation computes a logical transpose; passing the flipped one
/// re-stores the same logical matrix along the other axis. `op`, when
/// present, is fused over the values during the scatter.
pub(crate) fn swap_axes<T: Scalar>(
    a: &Compressed<T>,
    orientation: Orientation,
    op: Option<&UnaryOp<T>>,
    hyper_threshold: f64,
    chunk: usize,
    nthreads: usize,
) -> Compressed<T> {
    let nnz = a.nnz();
    let out_major = a.nminor;
    let nslices = slice_count(nnz, chunk, nthreads);
    let ranges = balanced_ranges(a.ptrs(), nslices);

    // phase 1: per-slice counts per output line
    let counts: Vec<Vec<usize>> = run_slices(ranges.clone(), |_, r| {
        let mut c = vec![0usize; out_major];
        let p = a.ptrs();
        for k in r {
            for e in p[k]..p[k + 1] {
                c[a.minor[e]] += 1;
            }
        }
        c
    });

    let mut out_ptrs = vec![0usize; out_major + 1];
    for j in 0..out_major {
        let line: usize = counts.iter().map(|c| c[j]).sum();
        out_ptrs[j + 1] = out_ptrs[j] + line;
    }
    // exclusive scan: each slice's starting offset within each output line
    let mut offsets: Vec<Vec<usize>> = Vec::with_capacity(counts.len());
    {
        let mut base = out_ptrs[..out_major].to_vec();
        for c in &counts {
            offsets.push(base.clone());
            for j in 0..out_major {
                base[j] += c[j];
            }
        }
    }

    let pattern = a.is_pattern();
    let mut minor_out = vec![0usize; nnz];
    let mut values_out: Vec<T> = if pattern || nnz == 0 {
        Vec::new()
    } else {
        // placeholder fill; every position is overwritten in the scatter
        vec![a.val(0); nnz]
    };

    // phase 2: scatter
    let out = Scatter {
        minor: minor_out.as_mut_ptr(),
        values: values_out.as_mut_ptr(),
    };
    run_slices(ranges, |s, r| {
        // borrow the whole Scatter so the closure captures one Send/Sync
        // struct, not its raw-pointer fields
        let out = &out;
        let mut off = offsets[s].clone();
        let p = a.ptrs();
        for k in r {
            let major = a.line_id(k);
            for e in p[k]..p[k + 1] {
                let j = a.minor[e];
                let pos = off[j];
                off[j] += 1;
                // SAFETY: the scan assigns each slice a disjoint set of
                // positions covering 0..nnz exactly once.
                unsafe {
                    out.minor.add(pos).write(major);
                    if !pattern {
                        let v = a.values[e];
                        out.values.add(pos).write(match op {
                            Some(op) => op.call(v),
                            None => v,
                        });
                    }
                }
            }
        }
    });

    let iso = match (a.iso, op) {
        (Some(v), Some(op)) => Some(op.call(v)),
        (iso, _) => iso,
    };
    Compressed::from_parts(
        orientation,
        out_major,
        a.nmajor,
        out_ptrs,
        minor_out,
        values_out,
        iso,
        hyper_threshold,
    )
}

/// Re-store a matrix along the opposite axis without changing its
/// logical content
pub(crate) fn reorient<T: Scalar>(a: &Compressed<T>, ctx: &Context) -> Compressed<T> {
    swap_axes(
        a,
        a.orientation.flip(),
        None,
        ctx.hyper_threshold(),
        ctx.chunk(),
        ctx.nthreads(),
    )
}

/// C = A' (optionally C = op(A'))
///
/// Materializes pending updates on `a` first. The result keeps `a`'s
/// storage orientation with the dimensions swapped.
pub fn transpose<T: Scalar>(a: &SparseMatrix<T>, op: Option<&UnaryOp<T>>) -> Result<SparseMatrix<T>> {
    let ctx = a.context().clone();
    let degraded;
    let op = match op {
        Some(o) if !ctx.kernel_specialization() => {
            degraded = o.degraded();
            Some(&degraded)
        }
        other => other,
    };
    let mut core = a.lock();
    core.materialize()?;
    let store = swap_axes(
        &core.store,
        core.store.orientation,
        op,
        ctx.hyper_threshold(),
        ctx.chunk(),
        ctx.nthreads(),
    );
    drop(core);
    Ok(SparseMatrix::from_store(&ctx, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::BinaryOp;
    use crate::context::Context;

    #[test]
    fn test_transpose_rectangular() {
        let ctx = Context::new();
        let a = SparseMatrix::from_tuples(
            &ctx,
            2,
            3,
            &[0, 0, 1, 1],
            &[0, 2, 1, 2],
            &[1.0, 2.0, 3.0, 4.0],
            &BinaryOp::plus(),
        )
        .unwrap();
        let t = transpose(&a, None).unwrap();
        assert_eq!(t.nrows(), 3);
        assert_eq!(t.ncols(), 2);
        assert_eq!(
            t.to_dense().unwrap(),
            vec![1.0, 0.0, 0.0, 3.0, 2.0, 4.0]
        );
    }

    #[test]
    fn test_transpose_fused_op() {
        let ctx = Context::new();
        let a = SparseMatrix::from_dense(&ctx, 2, 2, &[1.0, -2.0, 0.0, -4.0]).unwrap();
        let t = transpose(&a, Some(&UnaryOp::abs())).unwrap();
        assert_eq!(t.to_dense().unwrap(), vec![1.0, 0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_transpose_twice_round_trips() {
        let ctx = Context::new();
        let dense = vec![0.0, 1.0, 2.0, 0.0, 0.0, 3.0, 4.0, 0.0, 5.0, 0.0, 0.0, 6.0];
        let a = SparseMatrix::from_dense(&ctx, 3, 4, &dense).unwrap();
        let tt = transpose(&transpose(&a, None).unwrap(), None).unwrap();
        assert_eq!(tt.to_dense().unwrap(), dense);
    }

    #[test]
    fn test_reorient_preserves_content() {
        let ctx = Context::new();
        let dense = vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0];
        let a = SparseMatrix::from_dense(&ctx, 2, 3, &dense).unwrap();
        let core = a.lock();
        let flipped = reorient(&core.store, &ctx);
        drop(core);
        assert_eq!(flipped.orientation, Orientation::ColMajor);
        let b = SparseMatrix::from_store(&ctx, flipped);
        assert_eq!(b.nrows(), 2);
        assert_eq!(b.ncols(), 3);
        assert_eq!(b.to_dense().unwrap(), dense);
    }

    #[test]
    fn test_transpose_with_many_parallel_slices() {
        let ctx = Context::new();
        ctx.set_chunk(1);
        ctx.set_nthreads(4);
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        let mut vals = Vec::new();
        for k in 0..200usize {
            rows.push((k * 7) % 20);
            cols.push((k * 13) % 30);
            vals.push(k as i64);
        }
        let a = SparseMatrix::from_tuples(&ctx, 20, 30, &rows, &cols, &vals, &BinaryOp::plus())
            .unwrap();
        let tt = transpose(&transpose(&a, None).unwrap(), None).unwrap();
        assert_eq!(tt.extract_tuples().unwrap(), a.extract_tuples().unwrap());
    }

    #[test]
    fn test_transpose_pattern() {
        let ctx = Context::new();
        let p = SparseMatrix::pattern_from_tuples(&ctx, 2, 3, &[0, 1], &[2, 0], 1i64).unwrap();
        let t = transpose(&p, None).unwrap();
        assert!(t.is_pattern());
        assert_eq!(t.extract_element(2, 0).unwrap(), Some(1));
        assert_eq!(t.extract_element(0, 1).unwrap(), Some(1));
        assert_eq!(t.nvals().unwrap(), 2);
    }
}
