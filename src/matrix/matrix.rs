//! The sparse matrix handle and its pending-update core

use super::storage::{Compressed, Orientation};
use crate::algebra::BinaryOp;
use crate::context::{Context, Mode, PendingFlush};
use crate::error::{Error, Result};
use crate::scalar::{NumericScalar, Scalar};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Locked state of one matrix: compressed storage plus the queue of
/// element updates not yet merged into it.
///
/// Pending tuples are stored in arrival order as `(major, minor, value)`.
/// Lock order is core before registry; `materialize` relies on it when it
/// unregisters under the core lock.
pub(crate) struct Core<T: Scalar> {
    pub ctx: Context,
    pub id: u64,
    pub store: Compressed<T>,
    pub pending: Vec<(usize, usize, T)>,
}

impl<T: Scalar> Core<T> {
    /// Merge all queued updates into compressed storage
    ///
    /// One stable sort plus one linear merge per call, independent of how
    /// the queue was built. Repeated updates to one position keep the
    /// latest; a queued update to an existing entry replaces it. The
    /// dense/hypersparse choice is re-evaluated for the merged structure.
    pub fn materialize(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut tuples = std::mem::take(&mut self.pending);
        tuples.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        // stable sort keeps arrival order within a position; last wins
        tuples.dedup_by(|next, prev| {
            if next.0 == prev.0 && next.1 == prev.1 {
                prev.2 = next.2;
                true
            } else {
                false
            }
        });

        let nmajor = self.store.nmajor;
        let mut ptrs = vec![0usize; nmajor + 1];
        let mut minor = Vec::with_capacity(self.store.nnz() + tuples.len());
        let mut values = Vec::with_capacity(self.store.nnz() + tuples.len());
        let mut t = 0;
        for major in 0..nmajor {
            let range = self.store.line_range(major);
            let mut p = range.start;
            while p < range.end || (t < tuples.len() && tuples[t].0 == major) {
                let pending_here = t < tuples.len() && tuples[t].0 == major;
                let take_pending = if p >= range.end {
                    true
                } else if !pending_here {
                    false
                } else {
                    tuples[t].1 <= self.store.minor[p]
                };
                if take_pending {
                    let (_, mj, v) = tuples[t];
                    if p < range.end && self.store.minor[p] == mj {
                        p += 1;
                    }
                    minor.push(mj);
                    values.push(v);
                    t += 1;
                } else {
                    minor.push(self.store.minor[p]);
                    values.push(self.store.val(p));
                    p += 1;
                }
            }
            ptrs[major + 1] = minor.len();
        }
        debug_assert_eq!(t, tuples.len());

        self.store = Compressed::from_parts(
            self.store.orientation,
            nmajor,
            self.store.nminor,
            ptrs,
            minor,
            values,
            None,
            self.ctx.hyper_threshold(),
        );
        self.ctx.unregister_pending(self.id);
        Ok(())
    }

    /// Map user coordinates to storage coordinates
    #[inline]
    pub fn position(&self, row: usize, col: usize) -> (usize, usize) {
        match self.store.orientation {
            Orientation::RowMajor => (row, col),
            Orientation::ColMajor => (col, row),
        }
    }
}

impl<T: Scalar> PendingFlush for Mutex<Core<T>> {
    fn flush_pending(&self) -> Result<()> {
        self.lock().materialize()
    }
}

/// A sparse matrix bound to a [`Context`]
///
/// Element updates queue in non-blocking mode; any whole-structure read
/// (`nvals`, `extract_tuples`, an operand position in a multiply)
/// materializes them first. Handles are not clonable; use [`Self::dup`]
/// for a deep copy.
pub struct SparseMatrix<T: Scalar> {
    core: Arc<Mutex<Core<T>>>,
    ctx: Context,
    id: u64,
    nrows: usize,
    ncols: usize,
}

impl<T: Scalar> Drop for SparseMatrix<T> {
    fn drop(&mut self) {
        self.ctx.unregister_pending(self.id);
    }
}

impl<T: Scalar> SparseMatrix<T> {
    /// An empty nrows-by-ncols matrix in the context's default orientation
    pub fn new(ctx: &Context, nrows: usize, ncols: usize) -> Self {
        Self::with_orientation(ctx, nrows, ncols, ctx.default_orientation())
    }

    /// An empty matrix with an explicit storage orientation
    pub fn with_orientation(
        ctx: &Context,
        nrows: usize,
        ncols: usize,
        orientation: Orientation,
    ) -> Self {
        let (nmajor, nminor) = match orientation {
            Orientation::RowMajor => (nrows, ncols),
            Orientation::ColMajor => (ncols, nrows),
        };
        Self::wrap(ctx, nrows, ncols, Compressed::empty(orientation, nmajor, nminor))
    }

    pub(crate) fn wrap(ctx: &Context, nrows: usize, ncols: usize, store: Compressed<T>) -> Self {
        let id = ctx.new_id();
        Self {
            core: Arc::new(Mutex::new(Core {
                ctx: ctx.clone(),
                id,
                store,
                pending: Vec::new(),
            })),
            ctx: ctx.clone(),
            id,
            nrows,
            ncols,
        }
    }

    /// Wrap finished storage produced by a kernel
    pub(crate) fn from_store(ctx: &Context, store: Compressed<T>) -> Self {
        let (nrows, ncols) = match store.orientation {
            Orientation::RowMajor => (store.nmajor, store.nminor),
            Orientation::ColMajor => (store.nminor, store.nmajor),
        };
        Self::wrap(ctx, nrows, ncols, store)
    }

    /// Build a matrix from coordinate tuples
    ///
    /// Duplicate positions are combined with `dup` in input order.
    pub fn from_tuples(
        ctx: &Context,
        nrows: usize,
        ncols: usize,
        rows: &[usize],
        cols: &[usize],
        vals: &[T],
        dup: &BinaryOp<T>,
    ) -> Result<Self> {
        if rows.len() != cols.len() || rows.len() != vals.len() {
            return Err(Error::invalid_arg(
                "tuples",
                format!(
                    "index/value length mismatch: {} rows, {} cols, {} values",
                    rows.len(),
                    cols.len(),
                    vals.len()
                ),
            ));
        }
        let orientation = ctx.default_orientation();
        let mut tuples = Vec::with_capacity(rows.len());
        for k in 0..rows.len() {
            if rows[k] >= nrows {
                return Err(Error::IndexOutOfBounds {
                    index: rows[k],
                    size: nrows,
                });
            }
            if cols[k] >= ncols {
                return Err(Error::IndexOutOfBounds {
                    index: cols[k],
                    size: ncols,
                });
            }
            let (mj, mn) = match orientation {
                Orientation::RowMajor => (rows[k], cols[k]),
                Orientation::ColMajor => (cols[k], rows[k]),
            };
            tuples.push((mj, mn, vals[k]));
        }
        let store = build_from_tuples(orientation, nrows, ncols, tuples, Some(dup), None, ctx);
        Ok(Self::wrap(ctx, nrows, ncols, store))
    }

    /// Build a structure-only matrix: no value buffer is stored and every
    /// entry reads as `iso`
    pub fn pattern_from_tuples(
        ctx: &Context,
        nrows: usize,
        ncols: usize,
        rows: &[usize],
        cols: &[usize],
        iso: T,
    ) -> Result<Self> {
        if rows.len() != cols.len() {
            return Err(Error::invalid_arg(
                "tuples",
                format!("index length mismatch: {} rows, {} cols", rows.len(), cols.len()),
            ));
        }
        let orientation = ctx.default_orientation();
        let mut tuples = Vec::with_capacity(rows.len());
        for k in 0..rows.len() {
            if rows[k] >= nrows {
                return Err(Error::IndexOutOfBounds {
                    index: rows[k],
                    size: nrows,
                });
            }
            if cols[k] >= ncols {
                return Err(Error::IndexOutOfBounds {
                    index: cols[k],
                    size: ncols,
                });
            }
            let (mj, mn) = match orientation {
                Orientation::RowMajor => (rows[k], cols[k]),
                Orientation::ColMajor => (cols[k], rows[k]),
            };
            tuples.push((mj, mn, iso));
        }
        let store = build_from_tuples(orientation, nrows, ncols, tuples, None, Some(iso), ctx);
        Ok(Self::wrap(ctx, nrows, ncols, store))
    }

    /// Number of rows
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Storage orientation
    pub fn orientation(&self) -> Orientation {
        self.core.lock().store.orientation
    }

    /// True when structure-only
    pub fn is_pattern(&self) -> bool {
        self.core.lock().store.is_pattern()
    }

    /// The owning context
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Core<T>> {
        self.core.lock()
    }

    /// Number of stored entries; materializes pending updates first
    pub fn nvals(&self) -> Result<usize> {
        let mut core = self.core.lock();
        core.materialize()?;
        Ok(core.store.nnz())
    }

    /// True while element updates are queued and unmaterialized
    pub fn is_pending(&self) -> bool {
        !self.core.lock().pending.is_empty()
    }

    /// Materialize this matrix's queued updates now; idempotent
    pub fn wait(&self) -> Result<()> {
        self.core.lock().materialize()
    }

    /// Set one element
    ///
    /// In non-blocking mode the update is queued in O(1) amortized time
    /// and the matrix joins the context's pending set; in blocking mode
    /// it is merged immediately.
    pub fn set_element(&self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.nrows {
            return Err(Error::IndexOutOfBounds {
                index: row,
                size: self.nrows,
            });
        }
        if col >= self.ncols {
            return Err(Error::IndexOutOfBounds {
                index: col,
                size: self.ncols,
            });
        }
        let mut core = self.core.lock();
        if core.store.is_pattern() {
            return Err(Error::invalid_arg(
                "matrix",
                "cannot set elements of a structure-only matrix",
            ));
        }
        let (mj, mn) = core.position(row, col);
        let was_empty = core.pending.is_empty();
        core.pending.push((mj, mn, value));
        if was_empty {
            // unsized coercion has to happen on the Arc before downgrading
            let flush: Arc<dyn PendingFlush> = self.core.clone();
            self.ctx.register_pending(self.id, Arc::downgrade(&flush));
        }
        if self.ctx.mode() == Mode::Blocking {
            core.materialize()?;
        }
        Ok(())
    }

    /// Read one element; materializes pending updates first
    pub fn extract_element(&self, row: usize, col: usize) -> Result<Option<T>> {
        if row >= self.nrows {
            return Err(Error::IndexOutOfBounds {
                index: row,
                size: self.nrows,
            });
        }
        if col >= self.ncols {
            return Err(Error::IndexOutOfBounds {
                index: col,
                size: self.ncols,
            });
        }
        let mut core = self.core.lock();
        core.materialize()?;
        let (mj, mn) = core.position(row, col);
        Ok(core.store.find(mj, mn).map(|p| core.store.val(p)))
    }

    /// Export all entries as coordinate tuples, sorted by the storage
    /// major dimension; materializes pending updates first
    pub fn extract_tuples(&self) -> Result<(Vec<usize>, Vec<usize>, Vec<T>)> {
        let mut core = self.core.lock();
        core.materialize()?;
        let store = &core.store;
        let mut rows = Vec::with_capacity(store.nnz());
        let mut cols = Vec::with_capacity(store.nnz());
        let mut vals = Vec::with_capacity(store.nnz());
        for (major, range) in store.lines() {
            for p in range {
                let (r, c) = match store.orientation {
                    Orientation::RowMajor => (major, store.minor[p]),
                    Orientation::ColMajor => (store.minor[p], major),
                };
                rows.push(r);
                cols.push(c);
                vals.push(store.val(p));
            }
        }
        Ok((rows, cols, vals))
    }

    /// Deep copy with a fresh id; materializes first, so the copy has no
    /// pending updates
    pub fn dup(&self) -> Result<Self> {
        let mut core = self.core.lock();
        core.materialize()?;
        Ok(Self::wrap(&self.ctx, self.nrows, self.ncols, core.store.clone()))
    }
}

impl<T: NumericScalar> SparseMatrix<T> {
    /// Build from a dense row-major slice, storing only nonzero entries
    pub fn from_dense(ctx: &Context, nrows: usize, ncols: usize, data: &[T]) -> Result<Self> {
        if data.len() != nrows * ncols {
            return Err(Error::dim_mismatch(&[nrows, ncols], &[data.len()]));
        }
        let orientation = ctx.default_orientation();
        let mut tuples = Vec::new();
        for i in 0..nrows {
            for j in 0..ncols {
                let v = data[i * ncols + j];
                if v != T::zero() {
                    let (mj, mn) = match orientation {
                        Orientation::RowMajor => (i, j),
                        Orientation::ColMajor => (j, i),
                    };
                    tuples.push((mj, mn, v));
                }
            }
        }
        let store = build_from_tuples(orientation, nrows, ncols, tuples, None, None, ctx);
        Ok(Self::wrap(ctx, nrows, ncols, store))
    }

    /// Export to a dense row-major vector, absent entries as zero
    pub fn to_dense(&self) -> Result<Vec<T>> {
        let mut core = self.core.lock();
        core.materialize()?;
        let store = &core.store;
        let mut out = vec![T::zero(); self.nrows * self.ncols];
        for (major, range) in store.lines() {
            for p in range {
                let (r, c) = match store.orientation {
                    Orientation::RowMajor => (major, store.minor[p]),
                    Orientation::ColMajor => (store.minor[p], major),
                };
                out[r * self.ncols + c] = store.val(p);
            }
        }
        Ok(out)
    }

    /// Copy into a new element type, converting values through f64
    pub fn cast<U: NumericScalar>(&self) -> Result<SparseMatrix<U>> {
        let mut core = self.core.lock();
        core.materialize()?;
        let store = &core.store;
        let values = if store.is_pattern() {
            Vec::new()
        } else {
            store.values.iter().map(|v| U::from_f64(v.to_f64())).collect()
        };
        let cast = Compressed {
            orientation: store.orientation,
            nmajor: store.nmajor,
            nminor: store.nminor,
            lines: store.lines.clone(),
            minor: store.minor.clone(),
            values,
            iso: store.iso.map(|v| U::from_f64(v.to_f64())),
        };
        Ok(SparseMatrix::wrap(&self.ctx, self.nrows, self.ncols, cast))
    }
}

/// Sort, combine, and compress coordinate tuples
///
/// With `dup`, duplicate positions fold left in input order; without it,
/// duplicates keep the last value (structural dedup for patterns).
fn build_from_tuples<T: Scalar>(
    orientation: Orientation,
    nrows: usize,
    ncols: usize,
    mut tuples: Vec<(usize, usize, T)>,
    dup: Option<&BinaryOp<T>>,
    iso: Option<T>,
    ctx: &Context,
) -> Compressed<T> {
    let (nmajor, nminor) = match orientation {
        Orientation::RowMajor => (nrows, ncols),
        Orientation::ColMajor => (ncols, nrows),
    };
    tuples.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    tuples.dedup_by(|next, prev| {
        if next.0 == prev.0 && next.1 == prev.1 {
            if let Some(op) = dup {
                prev.2 = op.call(prev.2, next.2);
            } else {
                prev.2 = next.2;
            }
            true
        } else {
            false
        }
    });
    let mut ptrs = vec![0usize; nmajor + 1];
    for &(mj, _, _) in &tuples {
        ptrs[mj + 1] += 1;
    }
    for m in 0..nmajor {
        ptrs[m + 1] += ptrs[m];
    }
    let minor = tuples.iter().map(|t| t.1).collect();
    let values = if iso.is_some() {
        Vec::new()
    } else {
        tuples.iter().map(|t| t.2).collect()
    };
    Compressed::from_parts(
        orientation,
        nmajor,
        nminor,
        ptrs,
        minor,
        values,
        iso,
        ctx.hyper_threshold(),
    )
}
