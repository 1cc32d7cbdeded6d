//! Point-in-time verification over the segment index.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::manifest::FragmentManifest;
use crate::domain::types::{ManifestKey, MediaType, RepresentationId, SessionConfig, StreamId, TimeRange};
use crate::domain::verify::{MediaVerification, VerificationError, VerificationVerdict, Verdict};
use crate::index::{InsertOutcome, ManifestRecord, SegmentManifestIndex};

/// Currently active representation per supported media type, plus the
/// stream queries are evaluated against.
#[derive(Debug, Clone, Default)]
pub struct ActiveRepresentationTable {
    slots: BTreeMap<MediaType, Option<RepresentationId>>,
    stream: Option<StreamId>,
}

impl ActiveRepresentationTable {
    /// One empty slot per supported media type.
    pub fn new(supported: &[MediaType]) -> Self {
        Self {
            slots: supported.iter().cloned().map(|t| (t, None)).collect(),
            stream: None,
        }
    }

    pub fn supports(&self, media_type: &MediaType) -> bool {
        self.slots.contains_key(media_type)
    }

    pub fn get(&self, media_type: &MediaType) -> Option<&RepresentationId> {
        self.slots.get(media_type).and_then(Option::as_ref)
    }

    /// Returns false (and changes nothing) for unsupported media types.
    pub fn set(&mut self, media_type: &MediaType, representation_id: RepresentationId) -> bool {
        match self.slots.get_mut(media_type) {
            Some(slot) => {
                *slot = Some(representation_id);
                true
            }
            None => false,
        }
    }

    /// Fill an empty slot. Returns true when the slot was filled.
    pub fn set_if_unset(&mut self, media_type: &MediaType, representation_id: &RepresentationId) -> bool {
        match self.slots.get_mut(media_type) {
            Some(slot) if slot.is_none() => {
                *slot = Some(representation_id.clone());
                true
            }
            _ => false,
        }
    }

    pub fn stream(&self) -> Option<&StreamId> {
        self.stream.as_ref()
    }

    pub fn set_stream(&mut self, stream_id: StreamId) {
        self.stream = Some(stream_id);
    }

    pub fn set_stream_if_unset(&mut self, stream_id: &StreamId) -> bool {
        if self.stream.is_none() {
            self.stream = Some(stream_id.clone());
            true
        } else {
            false
        }
    }

    /// Media types that have an active representation.
    pub fn active(&self) -> impl Iterator<Item = (&MediaType, &RepresentationId)> {
        self.slots
            .iter()
            .filter_map(|(t, rep)| rep.as_ref().map(|rep| (t, rep)))
    }

    /// Back to "nothing selected" for every slot and the stream.
    pub fn clear(&mut self) {
        for slot in self.slots.values_mut() {
            *slot = None;
        }
        self.stream = None;
    }
}

/// Owns the index and the active table; turns a playback time into a verdict.
#[derive(Debug, Clone)]
pub struct VerificationResolver {
    index: SegmentManifestIndex,
    active: ActiveRepresentationTable,
}

impl VerificationResolver {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            index: SegmentManifestIndex::new(config.search_epsilon),
            active: ActiveRepresentationTable::new(&config.supported_media_types),
        }
    }

    pub fn index(&self) -> &SegmentManifestIndex {
        &self.index
    }

    pub fn active(&self) -> &ActiveRepresentationTable {
        &self.active
    }

    /// Insert an extracted manifest. The first successful insertion for a
    /// media type (or for the session) also selects its representation
    /// (or stream) if no switch event has done so yet.
    pub fn record_manifest(
        &mut self,
        key: ManifestKey,
        interval: TimeRange,
        manifest: impl Into<Arc<FragmentManifest>>,
    ) -> InsertOutcome {
        if self.active.set_if_unset(&key.media_type, &key.representation_id) {
            debug!(media_type = %key.media_type, representation = %key.representation_id, "representation selected implicitly");
        }
        if self.active.set_stream_if_unset(&key.stream_id) {
            debug!(stream = %key.stream_id, "stream selected implicitly");
        }
        self.index.insert(key, interval, manifest)
    }

    /// Pure state update; no lookup is performed.
    pub fn on_representation_switch(&mut self, media_type: &MediaType, representation_id: RepresentationId) -> bool {
        let accepted = self.active.set(media_type, representation_id.clone());
        if accepted {
            info!(%media_type, representation = %representation_id, "representation switched");
        } else {
            warn!(%media_type, "ignoring representation switch for unsupported media type");
        }
        accepted
    }

    pub fn on_stream_activated(&mut self, stream_id: StreamId) {
        info!(stream = %stream_id, "stream activated");
        self.active.set_stream(stream_id);
    }

    /// Verdict for `time` on the active stream.
    pub fn query(&self, time: f64) -> VerificationVerdict {
        match self.active.stream() {
            Some(stream_id) => self.query_stream(stream_id, time),
            None => VerificationVerdict::empty(time, None),
        }
    }

    /// Verdict for `time` on an explicit stream.
    pub fn query_stream(&self, stream_id: &StreamId, time: f64) -> VerificationVerdict {
        let mut per_type = BTreeMap::new();

        for (media_type, representation_id) in self.active.active() {
            let key = ManifestKey::new(stream_id.clone(), media_type.clone(), representation_id.clone());
            let detail = match self.index.search(&key, time) {
                Ok(record) => classify(record),
                Err(e) => {
                    debug!(%key, time, error = ?e, "no unambiguous segment");
                    MediaVerification {
                        representation_id: representation_id.clone(),
                        verified: false,
                        manifest: None,
                        interval: None,
                        error: Some(e.into()),
                    }
                }
            };
            per_type.insert(media_type.clone(), detail);
        }

        let overall = aggregate(per_type.values());
        VerificationVerdict {
            overall,
            time,
            stream_id: Some(stream_id.clone()),
            per_type,
        }
    }

    /// Failing intervals of the active representation of `media_type`.
    pub fn compromised_ranges(&self, media_type: &MediaType) -> Vec<TimeRange> {
        let (Some(stream_id), Some(representation_id)) = (self.active.stream(), self.active.get(media_type)) else {
            return Vec::new();
        };
        let key = ManifestKey::new(stream_id.clone(), media_type.clone(), representation_id.clone());
        self.index.failed_ranges(&key)
    }

    /// Drop records of one key or of all keys. The active table is kept.
    pub fn reset(&mut self, key: Option<&ManifestKey>) -> usize {
        self.index.reset(key)
    }

    /// Drop all records and forget every selection.
    pub fn clear(&mut self) {
        self.index.reset(None);
        self.active.clear();
    }
}

fn classify(record: &ManifestRecord) -> MediaVerification {
    let manifest = &record.manifest;
    let error = match &manifest.store {
        None => Some(VerificationError::MissingManifestStore),
        Some(_) => manifest
            .failure_code()
            .map(|code| VerificationError::ValidationFailed { code: code.to_string() }),
    };

    MediaVerification {
        representation_id: record.key.representation_id.clone(),
        verified: error.is_none(),
        manifest: Some(Arc::clone(manifest)),
        interval: Some(record.interval),
        error,
    }
}

fn aggregate<'a>(details: impl Iterator<Item = &'a MediaVerification>) -> Verdict {
    let mut evaluated = false;
    let mut all_verified = true;
    for detail in details {
        if detail.is_indeterminate() {
            return Verdict::Indeterminate;
        }
        evaluated = true;
        all_verified &= detail.verified;
    }

    match (evaluated, all_verified) {
        (false, _) => Verdict::Indeterminate,
        (true, true) => Verdict::Verified,
        (true, false) => Verdict::Failed,
    }
}
