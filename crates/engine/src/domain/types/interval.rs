use std::fmt;

use serde::Serialize;

use crate::domain::error::{EngineError, EngineResult};

/// Half-open time range `[start, end)` in stream-relative seconds.
///
/// Construction enforces `start < end` and rejects NaN, so every range in the
/// index has positive length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> EngineResult<Self> {
        if start.is_nan() || end.is_nan() {
            return Err(EngineError::InvalidInterval { start, end });
        }
        if start >= end {
            return Err(EngineError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range of a fragment given as `start_time` + `duration`.
    pub fn from_start_duration(start: f64, duration: f64) -> EngineResult<Self> {
        Self::new(start, start + duration)
    }

    /// Range covering every possible playback time. A monolithic asset is
    /// indexed under this single range.
    pub fn whole() -> Self {
        Self {
            start: f64::NEG_INFINITY,
            end: f64::INFINITY,
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_whole(&self) -> bool {
        self.start == f64::NEG_INFINITY && self.end == f64::INFINITY
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    pub fn intersects(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Exact bit-level equality of both bounds. Used for duplicate
    /// suppression, where `0.1 + 0.2` and `0.3` must stay distinct.
    pub fn same_bounds(&self, other: &TimeRange) -> bool {
        self.start.to_bits() == other.start.to_bits() && self.end.to_bits() == other.end.to_bits()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        assert!(TimeRange::new(2.0, 2.0).is_err());
        assert!(TimeRange::new(3.0, 2.0).is_err());
        assert!(TimeRange::new(f64::NAN, 2.0).is_err());
        assert!(TimeRange::from_start_duration(4.0, 0.0).is_err());
    }

    #[test]
    fn half_open_semantics() {
        let r = TimeRange::new(0.0, 2.0).unwrap();
        assert!(r.contains(0.0));
        assert!(r.contains(1.999));
        assert!(!r.contains(2.0));

        let next = TimeRange::new(2.0, 4.0).unwrap();
        assert!(!r.intersects(&next));
        assert!(r.intersects(&TimeRange::new(1.995, 2.005).unwrap()));
    }

    #[test]
    fn whole_range_contains_everything() {
        let w = TimeRange::whole();
        assert!(w.is_whole());
        assert!(w.contains(-5.0));
        assert!(w.contains(1e9));
    }

    #[test]
    fn same_bounds_is_bit_exact() {
        let a = TimeRange::new(0.1 + 0.2, 1.0).unwrap();
        let b = TimeRange::new(0.3, 1.0).unwrap();
        assert!(!a.same_bounds(&b));
        assert!(a.same_bounds(&a));
    }
}
