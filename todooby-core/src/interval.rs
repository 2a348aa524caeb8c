//! Interval algebra over minutes since midnight.

use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: u32,
    pub end: u32,
}

impl Interval {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn width(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Zero-length or inverted.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Sort and coalesce intervals into a minimal disjoint list.
///
/// Empty intervals are dropped. Touching intervals (`a.end == b.start`) are
/// merged, so the output is disjoint and non-touching.
pub fn merge_intervals(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = intervals.iter().copied().filter(|i| !i.is_empty()).collect();
    sorted.sort_by_key(|i| i.start);

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for iv in sorted {
        match merged.last_mut() {
            Some(last) if iv.start <= last.end => last.end = last.end.max(iv.end),
            _ => merged.push(iv),
        }
    }
    merged
}

/// Working time minus busy time, as sorted disjoint free intervals.
pub fn subtract_busy_from_working(working: &[Interval], busy: &[Interval]) -> Vec<Interval> {
    let working = merge_intervals(working);
    let busy = merge_intervals(busy);

    let mut free = Vec::new();
    for w in working {
        // Every busy interval is checked against every live fragment, since an
        // earlier busy interval may already have split `w`.
        let mut fragments = vec![w];
        for b in &busy {
            fragments = fragments
                .into_iter()
                .flat_map(|f| split_around(f, *b))
                .collect();
        }
        free.extend(fragments);
    }
    free
}

fn split_around(free: Interval, busy: Interval) -> Vec<Interval> {
    if !free.overlaps(&busy) {
        return vec![free];
    }
    [
        Interval::new(free.start, busy.start),
        Interval::new(busy.end, free.end),
    ]
    .into_iter()
    .filter(|i| !i.is_empty())
    .collect()
}
