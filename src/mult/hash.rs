//! Hash multiply: per-line open-addressing accumulation
//!
//! A symbolic pass bounds each output line by its multiply count; the
//! numeric pass accumulates into a power-of-two table sized to twice that
//! bound, so probes stay short without a dense workspace. Suited to wide
//! minor dimensions where a Gustavson workspace would be mostly idle. The
//! table is allocated through the context allocator, sized to the largest
//! line of the slice and reused with per-line slot resets.

use super::{product_slices, stitch, SliceOut};
use crate::algebra::Semiring;
use crate::context::{Context, Workspace};
use crate::error::Result;
use crate::kernel::partition::run_slices;
use crate::matrix::Compressed;
use crate::scalar::Scalar;

const EMPTY: usize = usize::MAX;

// Fibonacci hashing over the high bits of the multiply
#[inline]
fn slot(j: usize, shift: u32) -> usize {
    ((j as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) >> shift) as usize
}

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
        // symbolic: per-line upper bounds, and the widest table this slice
        // will need
        let bounds: Vec<usize> = r
            .clone()
            .map(|k| {
                (p[k]..p[k + 1])
                    .map(|e| b.line_range(a.minor[e]).len())
                    .sum()
            })
            .collect();
        let max_cap = bounds
            .iter()
            .map(|&bd| if bd == 0 { 0 } else { table_cap(bd) })
            .max()
            .unwrap_or(0);
        let mut keys_ws = Workspace::<usize>::filled(&alloc, max_cap, EMPTY)?;
        let mut vals_ws = Workspace::<T>::filled(&alloc, max_cap, add.identity())?;
        let keys = keys_ws.as_mut_slice();
        let vals = vals_ws.as_mut_slice();
        let mut pairs: Vec<(usize, T)> = Vec::new();
        for (k, &bound) in r.zip(&bounds) {
            if bound == 0 {
                out.sizes.push(0);
                continue;
            }
            let cap = table_cap(bound);
            let shift = 64 - cap.trailing_zeros();
            pairs.clear();
            for e in p[k]..p[k + 1] {
                let av = a.val(e);
                for f in b.line_range(a.minor[e]) {
                    let j = b.minor[f];
                    let prod = mul.call(av, b.val(f));
                    let mut s = slot(j, shift);
                    loop {
                        if keys[s] == j {
                            vals[s] = add.fold(vals[s], prod);
                            break;
                        }
                        if keys[s] == EMPTY {
                            keys[s] = j;
                            vals[s] = prod;
                            break;
                        }
                        s = (s + 1) & (cap - 1);
                    }
                }
            }
            // collect and reset the slots this line used; probing wraps
            // inside 0..cap, so nothing beyond it can be occupied
            for s in 0..cap {
                if keys[s] != EMPTY {
                    pairs.push((keys[s], vals[s]));
                    keys[s] = EMPTY;
                }
            }
            pairs.sort_unstable_by_key(|&(j, _)| j);
            out.sizes.push(pairs.len());
            for &(j, v) in &pairs {
                out.minor.push(j);
                out.values.push(v);
            }
        }
        Ok(out)
    });
    let slices = results.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(stitch(ctx, a, b.nminor, slices))
}

#[inline]
fn table_cap(bound: usize) -> usize {
    (bound * 2).next_power_of_two().max(4)
}
