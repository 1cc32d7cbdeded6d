//! Ordered interval store with window search.
//!
//! Entries are kept in a `BTreeMap` ordered by `(start, end)`. A search for
//! window `w` only scans starts in `[w.start - max_span, w.end)`, where
//! `max_span` is the longest interval currently stored. Spans are counted
//! per node so removing the widest node narrows later scans.
//! Several values may share one interval; callers decide whether that is
//! allowed.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included};

use crate::domain::types::TimeRange;

/// f64 with a total order, so interval bounds can key a `BTreeMap`.
#[derive(Debug, Clone, Copy)]
struct Endpoint(f64);

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Endpoint {}

impl PartialOrd for Endpoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Endpoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

type NodeKey = (Endpoint, Endpoint);

fn node_key(range: &TimeRange) -> NodeKey {
    (Endpoint(range.start()), Endpoint(range.end()))
}

/// One search result.
#[derive(Debug)]
pub struct Hit<'a, V> {
    pub range: TimeRange,
    pub value: &'a V,
}

#[derive(Debug, Clone)]
pub struct IntervalTree<V> {
    nodes: BTreeMap<NodeKey, (TimeRange, Vec<V>)>,
    /// Node count per interval length.
    spans: BTreeMap<Endpoint, usize>,
    len: usize,
}

impl<V> Default for IntervalTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> IntervalTree<V> {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            spans: BTreeMap::new(),
            len: 0,
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Longest stored interval, 0 when empty.
    fn max_span(&self) -> f64 {
        self.spans.last_key_value().map_or(0.0, |(span, _)| span.0)
    }

    pub fn insert(&mut self, range: TimeRange, value: V) {
        let spans = &mut self.spans;
        self.nodes
            .entry(node_key(&range))
            .or_insert_with(|| {
                *spans.entry(Endpoint(range.duration())).or_insert(0) += 1;
                (range, Vec::new())
            })
            .1
            .push(value);
        self.len += 1;
    }

    /// Remove every value stored under exactly `range` (bitwise bounds).
    pub fn remove_exact(&mut self, range: &TimeRange) -> Vec<V> {
        match self.nodes.remove(&node_key(range)) {
            Some((stored, values)) => {
                let span = Endpoint(stored.duration());
                if let Some(count) = self.spans.get_mut(&span) {
                    *count -= 1;
                    if *count == 0 {
                        self.spans.remove(&span);
                    }
                }
                self.len -= values.len();
                values
            }
            None => Vec::new(),
        }
    }

    /// All values whose interval intersects `window`, ordered by `(start, end)`.
    pub fn search(&self, window: &TimeRange) -> Vec<Hit<'_, V>> {
        if self.nodes.is_empty() {
            return Vec::new();
        }
        let mut lower = window.start() - self.max_span();
        if lower.is_nan() {
            lower = f64::NEG_INFINITY;
        }
        let from = (Endpoint(lower), Endpoint(f64::NEG_INFINITY));
        let to = (Endpoint(window.end()), Endpoint(f64::NEG_INFINITY));
        if from >= to {
            return Vec::new();
        }

        self.nodes
            .range((Included(from), Excluded(to)))
            .filter(|(_, (range, _))| range.intersects(window))
            .flat_map(|(_, (range, values))| {
                values.iter().map(move |value| Hit { range: *range, value })
            })
            .collect()
    }

    /// Every stored value, ordered by `(start, end)`.
    pub fn iter(&self) -> impl Iterator<Item = (TimeRange, &V)> {
        self.nodes
            .values()
            .flat_map(|(range, values)| values.iter().map(move |v| (*range, v)))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.spans.clear();
        self.len = 0;
    }
}
