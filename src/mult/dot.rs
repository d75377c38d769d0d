//! Dot-product multiply: one sparse dot per output entry
//!
//! B arrives re-stored by column, so every candidate entry `(i, j)` is a
//! two-pointer intersection of A's row and B's column. With a
//! non-complemented mask only the mask's positions are computed at all —
//! the one method whose work scales with the requested output rather than
//! the full product. The add monoid's terminal value short-circuits the
//! intersection.

use super::{product_slices, stitch, SliceOut};
use crate::algebra::{BinaryOp, Monoid, Semiring};
use crate::context::Context;
use crate::error::Result;
use crate::kernel::partition::run_slices;
use crate::matrix::Compressed;
use crate::scalar::Scalar;

pub(crate) fn multiply<T: Scalar>(
    ctx: &Context,
    a: &Compressed<T>,
    b_cols: &Compressed<T>,
    semiring: &Semiring<T>,
    mask: Option<&Compressed<T>>,
) -> Result<Compressed<T>> {
    let add = semiring.add();
    let mul = semiring.multiply();
    let ranges = product_slices(ctx, a);
    let results: Vec<SliceOut<T>> = run_slices(ranges, |_, r| {
        let p = a.ptrs();
        let mut out = SliceOut {
            sizes: Vec::with_capacity(r.len()),
            minor: Vec::new(),
            values: Vec::new(),
        };
        for k in r {
            let arange = p[k]..p[k + 1];
            let start = out.minor.len();
            if !arange.is_empty() {
                let i = a.line_id(k);
                match mask {
                    Some(m) => {
                        for mp in m.line_range(i) {
                            let j = m.minor[mp];
                            if let Some(v) =
                                dot(a, arange.clone(), b_cols, j, add, mul)
                            {
                                out.minor.push(j);
                                out.values.push(v);
                            }
                        }
                    }
                    None => {
                        for (j, brange) in b_cols.lines() {
                            if brange.is_empty() {
                                continue;
                            }
                            if let Some(v) =
                                dot(a, arange.clone(), b_cols, j, add, mul)
                            {
                                out.minor.push(j);
                                out.values.push(v);
                            }
                        }
                    }
                }
            }
            out.sizes.push(out.minor.len() - start);
        }
        out
    });
    Ok(stitch(ctx, a, b_cols.nmajor, results))
}

// Sparse dot of one A-row and one B-column; None when no index matches.
fn dot<T: Scalar>(
    a: &Compressed<T>,
    arange: std::ops::Range<usize>,
    b_cols: &Compressed<T>,
    j: usize,
    add: &Monoid<T>,
    mul: &BinaryOp<T>,
) -> Option<T> {
    let brange = b_cols.line_range(j);
    let mut ap = arange.start;
    let mut bp = brange.start;
    let mut acc: Option<T> = None;
    while ap < arange.end && bp < brange.end {
        let ak = a.minor[ap];
        let bk = b_cols.minor[bp];
        if ak < bk {
            ap += 1;
        } else if bk < ak {
            bp += 1;
        } else {
            let v = mul.call(a.val(ap), b_cols.val(bp));
            acc = Some(match acc {
                None => v,
                Some(x) => add.fold(x, v),
            });
            if let Some(x) = acc {
                if add.is_terminal(x) {
                    break;
                }
            }
            ap += 1;
            bp += 1;
        }
    }
    acc
}
