//! Gustavson multiply: dense scatter workspace per slice
//!
//! Each slice owns a value workspace and a generation-mark array sized to
//! the minor dimension, allocated through the context allocator so an
//! installed byte limit is honored. Marks avoid clearing the workspace
//! between lines: a stale slot is one whose mark is not the current line's
//! generation.

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
    let n = b.nminor;
    let alloc = ctx.allocator();
    let add = semiring.add();
    let mul = semiring.multiply();
    let ranges = product_slices(ctx, a);
    let results: Vec<Result<SliceOut<T>>> = run_slices(ranges, |_, r| {
        let mut vals_ws = Workspace::<T>::filled(&alloc, n, add.identity())?;
        let mut marks_ws = Workspace::<u64>::zeroed(&alloc, n)?;
        let vals = vals_ws.as_mut_slice();
        let marks = marks_ws.as_mut_slice();
        let mut generation = 0u64;
        let p = a.ptrs();
        let mut out = SliceOut {
            sizes: Vec::with_capacity(r.len()),
            minor: Vec::new(),
            values: Vec::new(),
        };
        let mut cols: Vec<usize> = Vec::new();
        for k in r {
            generation += 1;
            cols.clear();
            for e in p[k]..p[k + 1] {
                let av = a.val(e);
                for f in b.line_range(a.minor[e]) {
                    let j = b.minor[f];
                    let prod = mul.call(av, b.val(f));
                    if marks[j] != generation {
                        marks[j] = generation;
                        vals[j] = prod;
                        cols.push(j);
                    } else {
                        vals[j] = add.fold(vals[j], prod);
                    }
                }
            }
            cols.sort_unstable();
            out.sizes.push(cols.len());
            for &j in &cols {
                out.minor.push(j);
                out.values.push(vals[j]);
            }
        }
        Ok(out)
    });
    let slices = results.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(stitch(ctx, a, n, slices))
}
