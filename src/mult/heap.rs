//! Heap multiply: k-way priority merge
//!
//! Each A-line selects a handful of sorted B-lines; a min-heap over their
//! heads merges them in column order, folding equal columns as they
//! surface. No workspace proportional to the minor dimension, which makes
//! this the method of choice when lines carry very few entries.

use super::{product_slices, stitch, SliceOut};
use crate::algebra::Semiring;
use crate::context::{Context, Workspace};
use crate::error::Result;
use crate::kernel::partition::run_slices;
use crate::matrix::Compressed;
use crate::scalar::Scalar;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

pub(crate) fn multiply<T: Scalar>(
    ctx: &Context,
    a: &Compressed<T>,
    b: &Compressed<T>,
    semiring: &Semiring<T>,
) -> Result<Compressed<T>> {
    let alloc = ctx.allocator();
    let add = semiring.add();
    let mul = semiring.multiply();
    let ranges = product_slices(ctx, a);
    let results: Vec<Result<SliceOut<T>>> = run_slices(ranges, |_, r| {
        let p = a.ptrs();
        let mut out = SliceOut {
            sizes: Vec::with_capacity(r.len()),
            minor: Vec::new(),
            values: Vec::new(),
        };
        // (a value, b cursor, b end) per selected line, sized once to the
        // widest line of the slice through the context allocator
        let widest = r.clone().map(|k| p[k + 1] - p[k]).max().unwrap_or(0);
        let mut sources_ws =
            Workspace::<(T, usize, usize)>::filled(&alloc, widest, (add.identity(), 0, 0))?;
        let sources = sources_ws.as_mut_slice();
        let mut heap: BinaryHeap<Reverse<(usize, usize)>> = BinaryHeap::new();
        for k in r {
            let mut nsrc = 0;
            heap.clear();
            for e in p[k]..p[k + 1] {
                let range = b.line_range(a.minor[e]);
                if !range.is_empty() {
                    sources[nsrc] = (a.val(e), range.start, range.end);
                    heap.push(Reverse((b.minor[range.start], nsrc)));
                    nsrc += 1;
                }
            }
            let start = out.minor.len();
            while let Some(Reverse((j, s))) = heap.pop() {
                let (av, cursor, end) = sources[s];
                let v = mul.call(av, b.val(cursor));
                if out.minor.len() > start && out.minor[out.minor.len() - 1] == j {
                    let tail = out.values.len() - 1;
                    out.values[tail] = add.fold(out.values[tail], v);
                } else {
                    out.minor.push(j);
                    out.values.push(v);
                }
                let next = cursor + 1;
                if next < end {
                    sources[s].1 = next;
                    heap.push(Reverse((b.minor[next], s)));
                }
            }
            out.sizes.push(out.minor.len() - start);
        }
        Ok(out)
    });
    let slices = results.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(stitch(ctx, a, b.nminor, slices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::BinaryOp;
    use crate::matrix::SparseMatrix;
    use crate::mult::{mxm, Descriptor, Method};

    #[test]
    fn test_heap_merges_overlapping_lines() {
        let ctx = Context::new();
        let a = SparseMatrix::from_tuples(
            &ctx,
            1,
            3,
            &[0, 0, 0],
            &[0, 1, 2],
            &[1.0, 10.0, 100.0],
            &BinaryOp::plus(),
        )
        .unwrap();
        let b = SparseMatrix::from_tuples(
            &ctx,
            3,
            4,
            &[0, 0, 1, 1, 2, 2],
            &[0, 2, 1, 2, 2, 3],
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            &BinaryOp::plus(),
        )
        .unwrap();
        let c = SparseMatrix::<f64>::new(&ctx, 1, 4);
        let desc = Descriptor {
            method: Method::Heap,
            ..Descriptor::default()
        };
        mxm(&c, None, None, &crate::algebra::Semiring::plus_times(), &a, &b, &desc).unwrap();
        // col 2 folds contributions from all three sources: 2 + 40 + 500
        assert_eq!(c.to_dense().unwrap(), vec![1.0, 30.0, 542.0, 600.0]);
    }
}
