//! Saxpy multiply: successive sorted merges
//!
//! Builds each output line by merging one scaled B-line at a time into a
//! sorted accumulator. Quadratic in the worst case but allocation-light
//! and cache-friendly for short lines; available by hint only, the auto
//! heuristic never selects it.

use super::{product_slices, stitch, SliceOut};
use crate::algebra::Semiring;
use crate::context::{Context, Workspace};
use crate::error::Result;
use crate::kernel::partition::run_slices;
use crate::matrix::Compressed;
use crate::scalar::Scalar;

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
        // double-buffered sorted accumulator, sized to the largest per-line
        // multiply bound of the slice and allocated through the context
        // allocator; a line's union can never exceed its multiply count
        let widest = r
            .clone()
            .map(|k| {
                (p[k]..p[k + 1])
                    .map(|e| b.line_range(a.minor[e]).len())
                    .sum::<usize>()
            })
            .max()
            .unwrap_or(0);
        let fill = (0usize, add.identity());
        let mut acc_ws = Workspace::<(usize, T)>::filled(&alloc, widest, fill)?;
        let mut merged_ws = Workspace::<(usize, T)>::filled(&alloc, widest, fill)?;
        for k in r {
            let mut acc_len = 0usize;
            for e in p[k]..p[k + 1] {
                let av = a.val(e);
                let brange = b.line_range(a.minor[e]);
                if brange.is_empty() {
                    continue;
                }
                let acc = acc_ws.as_mut_slice();
                let merged = merged_ws.as_mut_slice();
                let mut merged_len = 0;
                let mut ai = 0;
                let mut bi = brange.start;
                while ai < acc_len || bi < brange.end {
                    if bi >= brange.end {
                        merged[merged_len] = acc[ai];
                        ai += 1;
                    } else if ai >= acc_len || b.minor[bi] < acc[ai].0 {
                        merged[merged_len] = (b.minor[bi], mul.call(av, b.val(bi)));
                        bi += 1;
                    } else if acc[ai].0 < b.minor[bi] {
                        merged[merged_len] = acc[ai];
                        ai += 1;
                    } else {
                        let v = mul.call(av, b.val(bi));
                        merged[merged_len] = (acc[ai].0, add.fold(acc[ai].1, v));
                        ai += 1;
                        bi += 1;
                    }
                    merged_len += 1;
                }
                std::mem::swap(&mut acc_ws, &mut merged_ws);
                acc_len = merged_len;
            }
            out.sizes.push(acc_len);
            let acc = acc_ws.as_mut_slice();
            for &(j, v) in &acc[..acc_len] {
                out.minor.push(j);
                out.values.push(v);
            }
        }
        Ok(out)
    });
    let slices = results.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(stitch(ctx, a, b.nminor, slices))
}
