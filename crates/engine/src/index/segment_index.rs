use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::domain::manifest::FragmentManifest;
use crate::domain::types::{EngineDefaults, ManifestKey, TimeRange};
use crate::domain::verify::VerificationError;

use super::interval_tree::IntervalTree;

/// One verification unit: the manifest extracted for one fragment.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestRecord {
    pub key: ManifestKey,
    pub interval: TimeRange,
    pub manifest: Arc<FragmentManifest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the exact same interval existed and was dropped first.
    Replaced,
}

/// Why a point lookup did not resolve to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    NoSegmentFound,
    /// Several records with different intervals cover the point.
    AmbiguousSegments { count: usize },
}

impl From<LookupError> for VerificationError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::NoSegmentFound => VerificationError::NoSegmentFound,
            LookupError::AmbiguousSegments { count } => VerificationError::AmbiguousSegments { count },
        }
    }
}

/// One interval tree per `(stream, media type, representation)` key.
///
/// Trees are created on first insertion and only go away on `reset`.
#[derive(Debug, Clone)]
pub struct SegmentManifestIndex {
    trees: HashMap<ManifestKey, IntervalTree<ManifestRecord>>,
    epsilon: f64,
}

impl Default for SegmentManifestIndex {
    fn default() -> Self {
        Self::new(EngineDefaults::SEARCH_EPSILON_SECS)
    }
}

impl SegmentManifestIndex {
    /// `epsilon` is the width of the point query window; must be positive.
    pub fn new(epsilon: f64) -> Self {
        Self {
            trees: HashMap::new(),
            epsilon,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Insert a record, replacing any record of the same key whose interval
    /// has bit-identical bounds. Distinct overlapping intervals coexist.
    pub fn insert(
        &mut self,
        key: ManifestKey,
        interval: TimeRange,
        manifest: impl Into<Arc<FragmentManifest>>,
    ) -> InsertOutcome {
        let tree = self.trees.entry(key.clone()).or_default();

        let removed = tree.remove_exact(&interval);
        let outcome = if removed.is_empty() {
            InsertOutcome::Inserted
        } else {
            debug!(%key, %interval, "segment already indexed, replacing");
            InsertOutcome::Replaced
        };

        tree.insert(
            interval,
            ManifestRecord {
                key,
                interval,
                manifest: manifest.into(),
            },
        );
        outcome
    }

    /// Resolve the record covering `point`, looking at `[point, point + epsilon)`.
    pub fn search(&self, key: &ManifestKey, point: f64) -> Result<&ManifestRecord, LookupError> {
        let tree = self.trees.get(key).ok_or(LookupError::NoSegmentFound)?;
        let window =
            TimeRange::new(point, point + self.epsilon).map_err(|_| LookupError::NoSegmentFound)?;

        let hits = tree.search(&window);
        let first = hits.first().ok_or(LookupError::NoSegmentFound)?;

        // Copies under the exact same interval are harmless; distinct
        // intervals covering the same point are not.
        if hits.iter().skip(1).all(|h| h.range.same_bounds(&first.range)) {
            trace!(%key, point, hits = hits.len(), "segment resolved");
            Ok(first.value)
        } else {
            debug!(%key, point, hits = hits.len(), "ambiguous segments for point");
            Err(LookupError::AmbiguousSegments { count: hits.len() })
        }
    }

    /// Drop the records of one key, or of every key when `key` is `None`.
    /// Returns the number of records dropped.
    pub fn reset(&mut self, key: Option<&ManifestKey>) -> usize {
        match key {
            Some(key) => self.trees.remove(key).map(|t| t.len()).unwrap_or(0),
            None => {
                let dropped = self.len();
                self.trees.clear();
                dropped
            }
        }
    }

    /// Total number of records across all keys.
    pub fn len(&self) -> usize {
        self.trees.values().map(IntervalTree::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.values().all(IntervalTree::is_empty)
    }

    pub fn contains_key(&self, key: &ManifestKey) -> bool {
        self.trees.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ManifestKey> {
        self.trees.keys()
    }

    /// Records of one key ordered by interval start.
    pub fn records(&self, key: &ManifestKey) -> Vec<&ManifestRecord> {
        self.trees
            .get(key)
            .map(|t| t.iter().map(|(_, rec)| rec).collect())
            .unwrap_or_default()
    }

    /// Intervals of one key whose manifest does not verify, ordered by start.
    /// Adjacent failing intervals are merged.
    pub fn failed_ranges(&self, key: &ManifestKey) -> Vec<TimeRange> {
        let mut out: Vec<TimeRange> = Vec::new();
        for rec in self.records(key) {
            if rec.manifest.is_verified() {
                continue;
            }
            match out.last_mut() {
                Some(last) if rec.interval.start() <= last.end() => {
                    if rec.interval.end() > last.end() {
                        if let Ok(merged) = TimeRange::new(last.start(), rec.interval.end()) {
                            *last = merged;
                        }
                    }
                }
                _ => out.push(rec.interval),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::MediaType;

    fn key() -> ManifestKey {
        ManifestKey::new("S", MediaType::Video, "R1")
    }

    fn r(start: f64, end: f64) -> TimeRange {
        TimeRange::new(start, end).unwrap()
    }

    #[test]
    fn duplicate_interval_replaces_record() {
        let mut index = SegmentManifestIndex::default();
        assert_eq!(index.insert(key(), r(0.0, 2.0), FragmentManifest::clean()), InsertOutcome::Inserted);
        assert_eq!(
            index.insert(key(), r(0.0, 2.0), FragmentManifest::failing(["claimSignature.mismatch"])),
            InsertOutcome::Replaced
        );

        assert_eq!(index.len(), 1);
        let rec = index.search(&key(), 1.0).unwrap();
        assert_eq!(rec.manifest.failure_code(), Some("claimSignature.mismatch"));
    }

    #[test]
    fn adjacent_and_overlapping_intervals_coexist() {
        let mut index = SegmentManifestIndex::default();
        index.insert(key(), r(0.0, 2.0), FragmentManifest::clean());
        index.insert(key(), r(2.0, 4.0), FragmentManifest::clean());
        index.insert(key(), r(1.0, 3.0), FragmentManifest::clean());
        assert_eq!(index.len(), 3);
        assert_eq!(index.records(&key()).len(), 3);
    }

    #[test]
    fn search_outcomes() {
        let mut index = SegmentManifestIndex::default();
        index.insert(key(), r(0.0, 2.0), FragmentManifest::clean());
        index.insert(key(), r(2.0, 4.0), FragmentManifest::clean());

        assert_eq!(index.search(&key(), 0.5).unwrap().interval, r(0.0, 2.0));
        assert_eq!(index.search(&key(), 3.0).unwrap().interval, r(2.0, 4.0));
        assert_eq!(index.search(&key(), 5.0).unwrap_err(), LookupError::NoSegmentFound);
        // The window [1.995, 2.005) straddles both fragments.
        assert_eq!(
            index.search(&key(), 1.995).unwrap_err(),
            LookupError::AmbiguousSegments { count: 2 }
        );
        assert_eq!(index.search(&key(), f64::NAN).unwrap_err(), LookupError::NoSegmentFound);

        let other = ManifestKey::new("S", MediaType::Video, "R2");
        assert_eq!(index.search(&other, 1.0).unwrap_err(), LookupError::NoSegmentFound);
    }

    #[test]
    fn reset_one_key_or_all() {
        let mut index = SegmentManifestIndex::default();
        let audio = ManifestKey::new("S", MediaType::Audio, "A1");
        index.insert(key(), r(0.0, 2.0), FragmentManifest::clean());
        index.insert(key(), r(2.0, 4.0), FragmentManifest::clean());
        index.insert(audio.clone(), r(0.0, 2.0), FragmentManifest::clean());

        assert_eq!(index.reset(Some(&key())), 2);
        assert!(!index.contains_key(&key()));
        assert_eq!(index.len(), 1);

        assert_eq!(index.reset(None), 1);
        assert!(index.is_empty());
        assert_eq!(index.search(&audio, 1.0).unwrap_err(), LookupError::NoSegmentFound);
    }

    #[test]
    fn failed_ranges_merge_adjacent_failures() {
        let mut index = SegmentManifestIndex::default();
        index.insert(key(), r(0.0, 2.0), FragmentManifest::clean());
        index.insert(key(), r(2.0, 4.0), FragmentManifest::failing(["assertion.dataHash.mismatch"]));
        index.insert(key(), r(4.0, 6.0), FragmentManifest::without_store());
        index.insert(key(), r(6.0, 8.0), FragmentManifest::clean());
        index.insert(key(), r(9.0, 10.0), FragmentManifest::failing(["x"]));

        assert_eq!(index.failed_ranges(&key()), vec![r(2.0, 6.0), r(9.0, 10.0)]);
    }
}
