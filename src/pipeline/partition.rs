//! Page-range partitioning across renderer workers.
//!
//! Pages are handed out in contiguous, increasing spans so concatenating
//! worker results in submission order reproduces document order without
//! any sorting. When the span does not divide evenly, the first
//! `span % workers` workers take one extra page each.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive, 1-based page span handled by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    /// Number of pages in the span.
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Always `false`; a range holds at least one page.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Normalised page bounds for a request.
///
/// `None` when the request selects no pages (`first > last`).
pub fn page_bounds(total_pages: u32, first_page: Option<u32>, last_page: Option<u32>) -> Option<(u32, u32)> {
    let first = match first_page {
        Some(p) if p >= 1 => p,
        _ => 1,
    };
    let last = match last_page {
        Some(p) if p <= total_pages => p,
        _ => total_pages,
    };
    (first <= last).then_some((first, last))
}

/// Split `[first_page, last_page]` of a `total_pages` document across at
/// most `workers` workers.
///
/// The returned length is the effective worker count. An empty vector
/// means there is nothing to render.
pub fn partition(
    total_pages: u32,
    first_page: Option<u32>,
    last_page: Option<u32>,
    workers: usize,
) -> Vec<PageRange> {
    let Some((first, last)) = page_bounds(total_pages, first_page, last_page) else {
        return Vec::new();
    };

    let span = last - first + 1;
    let workers = (workers.max(1) as u64).min(span as u64) as u32;
    let base = span / workers;
    let mut remainder = span % workers;

    let mut ranges = Vec::with_capacity(workers as usize);
    let mut start = first;
    for _ in 0..workers {
        let mut count = base;
        if remainder > 0 {
            count += 1;
            remainder -= 1;
        }
        let end = start + count - 1;
        ranges.push(PageRange { start, end });
        // Saturates only after the final range, which may end at u32::MAX.
        start = end.saturating_add(1);
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(ranges: &[PageRange]) -> Vec<u32> {
        ranges.iter().map(PageRange::len).collect()
    }

    fn assert_exact_cover(ranges: &[PageRange], first: u32, last: u32) {
        assert_eq!(ranges.first().map(|r| r.start), Some(first));
        assert_eq!(ranges.last().map(|r| r.end), Some(last));
        for pair in ranges.windows(2) {
            assert_eq!(pair[1].start, pair[0].end + 1, "gap or overlap in {ranges:?}");
        }
        assert_eq!(sizes(ranges).iter().sum::<u32>(), last - first + 1);
    }

    #[test]
    fn fourteen_pages_four_workers() {
        let ranges = partition(14, None, None, 4);
        assert_eq!(sizes(&ranges), vec![4, 4, 3, 3]);
        assert_eq!(
            ranges,
            vec![
                PageRange { start: 1, end: 4 },
                PageRange { start: 5, end: 8 },
                PageRange { start: 9, end: 11 },
                PageRange { start: 12, end: 14 },
            ]
        );
    }

    #[test]
    fn first_page_twelve_runs_to_the_end() {
        for workers in [1, 2, 3, 8] {
            let ranges = partition(14, Some(12), None, workers);
            assert_exact_cover(&ranges, 12, 14);
            assert!(ranges.len() <= 3);
        }
    }

    #[test]
    fn first_after_last_is_empty() {
        assert!(partition(14, Some(12), Some(1), 4).is_empty());
        assert!(partition(0, None, None, 1).is_empty());
    }

    #[test]
    fn workers_clamped_to_pages() {
        let ranges = partition(14, None, None, 15);
        assert_eq!(ranges.len(), 14);
        assert!(ranges.iter().all(|r| r.len() == 1));
        assert_eq!(partition(14, Some(3), Some(5), 100).len(), 3);
    }

    #[test]
    fn zero_workers_means_one() {
        assert_eq!(partition(14, None, None, 0), vec![PageRange { start: 1, end: 14 }]);
    }

    #[test]
    fn out_of_range_bounds_are_normalised() {
        assert_eq!(page_bounds(14, Some(0), Some(99)), Some((1, 14)));
        assert_eq!(page_bounds(14, Some(2), Some(12)), Some((2, 12)));
        assert_eq!(page_bounds(14, Some(15), None), None);
    }

    #[test]
    fn last_page_at_u32_max() {
        let ranges = partition(u32::MAX, Some(u32::MAX - 2), None, 2);
        assert_eq!(
            ranges,
            vec![
                PageRange { start: u32::MAX - 2, end: u32::MAX - 1 },
                PageRange { start: u32::MAX, end: u32::MAX },
            ]
        );

        let whole = partition(u32::MAX, None, None, 3);
        assert_exact_cover(&whole, 1, u32::MAX);
    }

    #[test]
    fn exhaustive_small_inputs_cover_exactly() {
        for total in 1..=20u32 {
            for first in 1..=total {
                for last in first..=total {
                    for workers in 1..=8usize {
                        let ranges = partition(total, Some(first), Some(last), workers);
                        assert_exact_cover(&ranges, first, last);
                        assert_eq!(ranges.len(), workers.min((last - first + 1) as usize));
                        let lens = sizes(&ranges);
                        let max = *lens.iter().max().unwrap();
                        let min = *lens.iter().min().unwrap();
                        assert!(max - min <= 1);
                        assert!(lens.windows(2).all(|w| w[0] >= w[1]));
                    }
                }
            }
        }
    }
}
