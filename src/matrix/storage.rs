//! Compressed sparse storage
//!
//! A matrix is stored compressed along its major dimension: rows for
//! [`Orientation::RowMajor`], columns for [`Orientation::ColMajor`]. The
//! line index is either a dense pointer array (one slot per major line)
//! or hypersparse (ids of the non-empty lines plus pointers), selected by
//! the context's density threshold whenever storage is rebuilt.

use crate::scalar::Scalar;
use std::ops::Range;

/// Storage orientation of a sparse matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Compressed by row; minor indices are column ids
    RowMajor,
    /// Compressed by column; minor indices are row ids
    ColMajor,
}

impl Orientation {
    /// The opposite orientation
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Orientation::RowMajor => Orientation::ColMajor,
            Orientation::ColMajor => Orientation::RowMajor,
        }
    }

    /// Returns true for row-major
    #[inline]
    pub fn is_row_major(self) -> bool {
        matches!(self, Orientation::RowMajor)
    }
}

/// Line pointer index: dense or hypersparse
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineIndex {
    /// One pointer slot per major line; length nmajor + 1
    Dense(Vec<usize>),
    /// Only non-empty lines are represented; `ids` is sorted and
    /// `ptrs.len() == ids.len() + 1`
    Hyper { ids: Vec<usize>, ptrs: Vec<usize> },
}

/// Compressed storage for one matrix
///
/// `values` is empty iff the matrix is pattern-only, in which case every
/// structural entry reads as the stored `iso` value.
#[derive(Debug, Clone)]
pub(crate) struct Compressed<T: Scalar> {
    pub orientation: Orientation,
    pub nmajor: usize,
    pub nminor: usize,
    pub lines: LineIndex,
    pub minor: Vec<usize>,
    pub values: Vec<T>,
    pub iso: Option<T>,
}

impl<T: Scalar> Compressed<T> {
    /// Empty storage with a dense line index
    pub fn empty(orientation: Orientation, nmajor: usize, nminor: usize) -> Self {
        Self {
            orientation,
            nmajor,
            nminor,
            lines: LineIndex::Dense(vec![0; nmajor + 1]),
            minor: Vec::new(),
            values: Vec::new(),
            iso: None,
        }
    }

    /// Number of structural entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.minor.len()
    }

    /// True when structure-only (no value buffer)
    #[inline]
    pub fn is_pattern(&self) -> bool {
        self.iso.is_some()
    }

    /// Value at entry position `p`
    #[inline]
    pub fn val(&self, p: usize) -> T {
        match self.iso {
            Some(v) => v,
            None => self.values[p],
        }
    }

    /// Number of stored lines (all lines when dense, non-empty lines
    /// when hypersparse)
    #[inline]
    pub fn nlines(&self) -> usize {
        match &self.lines {
            LineIndex::Dense(_) => self.nmajor,
            LineIndex::Hyper { ids, .. } => ids.len(),
        }
    }

    /// Line pointer array over the stored lines; length `nlines() + 1`.
    /// Also serves as the cumulative-work array for slice balancing.
    #[inline]
    pub fn ptrs(&self) -> &[usize] {
        match &self.lines {
            LineIndex::Dense(p) => p,
            LineIndex::Hyper { ptrs, .. } => ptrs,
        }
    }

    /// Major id of the k-th stored line
    #[inline]
    pub fn line_id(&self, k: usize) -> usize {
        match &self.lines {
            LineIndex::Dense(_) => k,
            LineIndex::Hyper { ids, .. } => ids[k],
        }
    }

    /// Entry range of a major line (empty when absent)
    pub fn line_range(&self, major: usize) -> Range<usize> {
        match &self.lines {
            LineIndex::Dense(p) => p[major]..p[major + 1],
            LineIndex::Hyper { ids, ptrs } => match ids.binary_search(&major) {
                Ok(k) => ptrs[k]..ptrs[k + 1],
                Err(_) => 0..0,
            },
        }
    }

    /// Iterate the stored lines as `(major id, entry range)`
    pub fn lines(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        (0..self.nlines()).map(move |k| {
            let p = self.ptrs();
            (self.line_id(k), p[k]..p[k + 1])
        })
    }

    /// Number of non-empty major lines
    pub fn nonempty_lines(&self) -> usize {
        let p = self.ptrs();
        (0..self.nlines()).filter(|&k| p[k] < p[k + 1]).count()
    }

    /// Build storage from a dense line pointer array, picking dense or
    /// hypersparse per the density threshold
    ///
    /// `line_ptrs.len()` must be `nmajor + 1` and monotone; `minor` must
    /// be sorted within each line.
    pub fn from_parts(
        orientation: Orientation,
        nmajor: usize,
        nminor: usize,
        line_ptrs: Vec<usize>,
        minor: Vec<usize>,
        values: Vec<T>,
        iso: Option<T>,
        hyper_threshold: f64,
    ) -> Self {
        debug_assert_eq!(line_ptrs.len(), nmajor + 1);
        let nonempty = (0..nmajor)
            .filter(|&m| line_ptrs[m] < line_ptrs[m + 1])
            .count();
        let go_hyper = nmajor > 0 && (nonempty as f64) < hyper_threshold * (nmajor as f64);
        let lines = if go_hyper {
            let mut ids = Vec::with_capacity(nonempty);
            let mut ptrs = Vec::with_capacity(nonempty + 1);
            ptrs.push(0);
            for m in 0..nmajor {
                if line_ptrs[m] < line_ptrs[m + 1] {
                    ids.push(m);
                    ptrs.push(line_ptrs[m + 1]);
                }
            }
            LineIndex::Hyper { ids, ptrs }
        } else {
            LineIndex::Dense(line_ptrs)
        };
        Self {
            orientation,
            nmajor,
            nminor,
            lines,
            minor,
            values,
            iso,
        }
    }

    /// Position of `(major, minor)` in the entry arrays, if present
    pub fn find(&self, major: usize, minor: usize) -> Option<usize> {
        let range = self.line_range(major);
        let slot = self.minor[range.clone()].binary_search(&minor).ok()?;
        Some(range.start + slot)
    }
}
