//! Sparse vectors as n-by-1 matrices

use super::matrix::SparseMatrix;
use super::storage::{Compressed, Orientation};
use crate::algebra::BinaryOp;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::scalar::{NumericScalar, Scalar};

/// A sparse column vector
///
/// Stored as an n-by-1 matrix compressed by column, so the whole vector
/// is a single storage line. All pending-update semantics of
/// [`SparseMatrix`] carry over unchanged.
pub struct SparseVector<T: Scalar> {
    mat: SparseMatrix<T>,
}

impl<T: Scalar> SparseVector<T> {
    /// An empty vector of the given size
    pub fn new(ctx: &Context, size: usize) -> Self {
        Self {
            mat: SparseMatrix::with_orientation(ctx, size, 1, Orientation::ColMajor),
        }
    }

    /// Build from index/value pairs, combining duplicates with `dup`
    pub fn from_tuples(
        ctx: &Context,
        size: usize,
        indices: &[usize],
        vals: &[T],
        dup: &BinaryOp<T>,
    ) -> Result<Self> {
        if indices.len() != vals.len() {
            return Err(Error::invalid_arg(
                "tuples",
                format!(
                    "index/value length mismatch: {} indices, {} values",
                    indices.len(),
                    vals.len()
                ),
            ));
        }
        let mut tuples: Vec<(usize, T)> = Vec::with_capacity(indices.len());
        for k in 0..indices.len() {
            if indices[k] >= size {
                return Err(Error::IndexOutOfBounds {
                    index: indices[k],
                    size,
                });
            }
            tuples.push((indices[k], vals[k]));
        }
        tuples.sort_by_key(|t| t.0);
        tuples.dedup_by(|next, prev| {
            if next.0 == prev.0 {
                prev.1 = dup.call(prev.1, next.1);
                true
            } else {
                false
            }
        });
        let store = Compressed::from_parts(
            Orientation::ColMajor,
            1,
            size,
            vec![0, tuples.len()],
            tuples.iter().map(|t| t.0).collect(),
            tuples.iter().map(|t| t.1).collect(),
            None,
            0.0,
        );
        Ok(Self {
            mat: SparseMatrix::wrap(ctx, size, 1, store),
        })
    }

    /// Build from a dense slice, storing every element including zeros
    pub fn from_dense(ctx: &Context, vals: &[T]) -> Self {
        let store = Compressed::from_parts(
            Orientation::ColMajor,
            1,
            vals.len(),
            vec![0, vals.len()],
            (0..vals.len()).collect(),
            vals.to_vec(),
            None,
            0.0,
        );
        Self {
            mat: SparseMatrix::wrap(ctx, vals.len(), 1, store),
        }
    }

    pub(crate) fn from_matrix(mat: SparseMatrix<T>) -> Self {
        debug_assert_eq!(mat.ncols(), 1);
        Self { mat }
    }

    pub(crate) fn as_matrix(&self) -> &SparseMatrix<T> {
        &self.mat
    }

    /// Length of the vector
    #[inline]
    pub fn size(&self) -> usize {
        self.mat.nrows()
    }

    /// Number of stored entries; materializes pending updates first
    pub fn nvals(&self) -> Result<usize> {
        self.mat.nvals()
    }

    /// The owning context
    pub fn context(&self) -> &Context {
        self.mat.context()
    }

    /// Set one element (queued in non-blocking mode)
    pub fn set_element(&self, index: usize, value: T) -> Result<()> {
        self.mat.set_element(index, 0, value)
    }

    /// Read one element; materializes pending updates first
    pub fn extract_element(&self, index: usize) -> Result<Option<T>> {
        self.mat.extract_element(index, 0)
    }

    /// Export stored entries as sorted index/value pairs
    pub fn extract_tuples(&self) -> Result<(Vec<usize>, Vec<T>)> {
        let (rows, _, vals) = self.mat.extract_tuples()?;
        Ok((rows, vals))
    }

    /// True while element updates are queued and unmaterialized
    pub fn is_pending(&self) -> bool {
        self.mat.is_pending()
    }

    /// Materialize queued updates now; idempotent
    pub fn wait(&self) -> Result<()> {
        self.mat.wait()
    }

    /// Deep copy with a fresh id
    pub fn dup(&self) -> Result<Self> {
        Ok(Self {
            mat: self.mat.dup()?,
        })
    }

    /// Export to a dense vector with absent entries as `fill`; the form
    /// of [`Self::to_dense`] available to non-numeric element types
    pub fn to_dense_with(&self, fill: T) -> Result<Vec<T>> {
        let (indices, vals) = self.extract_tuples()?;
        let mut out = vec![fill; self.size()];
        for (i, v) in indices.into_iter().zip(vals) {
            out[i] = v;
        }
        Ok(out)
    }
}

impl<T: NumericScalar> SparseVector<T> {
    /// Export to a dense vector, absent entries as zero
    pub fn to_dense(&self) -> Result<Vec<T>> {
        let (indices, vals) = self.extract_tuples()?;
        let mut out = vec![T::zero(); self.size()];
        for (i, v) in indices.into_iter().zip(vals) {
            out[i] = v;
        }
        Ok(out)
    }
}
