//! Work partitioning for parallel kernels
//!
//! Every parallel kernel splits its output into slices here and forks
//! through [`run_slices`], the crate's single fork-join site. Slice
//! boundaries depend only on shape, sparsity, and configuration, so
//! repeated runs partition identically; the thread ceiling caps the slice
//! count while scheduling is left to the pool.

use std::ops::Range;

/// Number of parallel slices for `work` units: `work / chunk`, at least
/// one, at most the thread ceiling.
pub(crate) fn slice_count(work: usize, chunk: usize, nthreads: usize) -> usize {
    (work / chunk.max(1)).clamp(1, nthreads.max(1))
}

/// Split `0..n` into `nslices` near-equal contiguous ranges
pub(crate) fn chunk_ranges(n: usize, nslices: usize) -> Vec<Range<usize>> {
    let nslices = nslices.max(1);
    (0..nslices)
        .map(|s| (n * s / nslices)..(n * (s + 1) / nslices))
        .collect()
}

/// Split lines into `nslices` ranges of near-equal work
///
/// `ptrs` is a cumulative-work array (a line pointer array works
/// directly): line `k` carries `ptrs[k + 1] - ptrs[k]` units. Boundaries
/// land where cumulative work crosses each equal-share target, so a few
/// heavy lines do not serialize behind many empty ones. Ranges may be
/// empty when lines are fewer than slices.
pub(crate) fn balanced_ranges(ptrs: &[usize], nslices: usize) -> Vec<Range<usize>> {
    let nlines = ptrs.len().saturating_sub(1);
    let total = ptrs.last().copied().unwrap_or(0);
    let nslices = nslices.max(1);
    if nslices == 1 || total == 0 {
        let mut ranges = vec![0..nlines];
        ranges.extend((1..nslices).map(|_| nlines..nlines));
        return ranges;
    }
    let mut bounds = Vec::with_capacity(nslices + 1);
    bounds.push(0usize);
    for s in 1..nslices {
        let target = total * s / nslices;
        let b = ptrs.partition_point(|&p| p < target).min(nlines);
        let prev = *bounds.last().unwrap_or(&0);
        bounds.push(b.max(prev));
    }
    bounds.push(nlines);
    bounds.windows(2).map(|w| w[0]..w[1]).collect()
}

/// Run one closure per slice and collect the results in slice order
#[cfg(feature = "rayon")]
pub(crate) fn run_slices<R, F>(ranges: Vec<Range<usize>>, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize, Range<usize>) -> R + Send + Sync,
{
    use rayon::prelude::*;
    ranges
        .into_par_iter()
        .enumerate()
        .map(|(s, r)| f(s, r))
        .collect()
}

/// Run one closure per slice and collect the results in slice order
#[cfg(not(feature = "rayon"))]
pub(crate) fn run_slices<R, F>(ranges: Vec<Range<usize>>, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize, Range<usize>) -> R + Send + Sync,
{
    ranges.into_iter().enumerate().map(|(s, r)| f(s, r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_count_clamps() {
        assert_eq!(slice_count(0, 4096, 8), 1);
        assert_eq!(slice_count(4096, 4096, 8), 1);
        assert_eq!(slice_count(20_000, 4096, 8), 4);
        assert_eq!(slice_count(1_000_000, 4096, 8), 8);
        assert_eq!(slice_count(100, 0, 0), 1);
    }

    #[test]
    fn test_chunk_ranges_cover() {
        let ranges = chunk_ranges(10, 3);
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges[2].end, 10);
        let total: usize = ranges.iter().map(|r| r.len()).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_balanced_ranges_skewed_work() {
        // one heavy line followed by many empty ones
        let mut ptrs = vec![0usize, 100];
        ptrs.extend(std::iter::repeat(100).take(99));
        let ranges = balanced_ranges(&ptrs, 4);
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges.last().unwrap().end, 100);
        // the heavy line stays in one slice
        assert!(ranges[0].contains(&0));
    }

    #[test]
    fn test_balanced_ranges_even_work() {
        let ptrs: Vec<usize> = (0..=8).map(|k| k * 10).collect();
        let ranges = balanced_ranges(&ptrs, 4);
        assert_eq!(ranges, vec![0..2, 2..4, 4..6, 6..8]);
    }

    #[test]
    fn test_balanced_ranges_deterministic() {
        let ptrs = vec![0, 3, 3, 10, 11, 40, 41, 41, 50];
        assert_eq!(balanced_ranges(&ptrs, 3), balanced_ranges(&ptrs, 3));
        let ranges = balanced_ranges(&ptrs, 3);
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges.last().unwrap().end, 8);
        for w in ranges.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }
    }

    #[test]
    fn test_run_slices_order() {
        let ranges = chunk_ranges(100, 7);
        let sums = run_slices(ranges.clone(), |_, r| r.sum::<usize>());
        let expect: Vec<usize> = ranges.into_iter().map(|r| r.sum()).collect();
        assert_eq!(sums, expect);
    }
}
