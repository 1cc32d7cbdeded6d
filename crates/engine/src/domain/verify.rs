// crates/engine/src/domain/verify.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::manifest::FragmentManifest;
use super::types::{MediaType, RepresentationId, StreamId, TimeRange};

/// Aggregated verdict for a playback time.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every media type with an active representation resolved to a clean manifest.
    Verified,
    /// All active types resolved and at least one did not verify.
    Failed,
    /// At least one active type had no unambiguous record for the time,
    /// or nothing was active at all.
    Indeterminate,
}

/// Why a media type did not verify.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationError {
    NoSegmentFound,
    AmbiguousSegments { count: usize },
    MissingManifestStore,
    ValidationFailed { code: String },
}

impl VerificationError {
    /// Lookup errors mean "no data", not "tampered".
    pub fn is_indeterminate(&self) -> bool {
        matches!(
            self,
            VerificationError::NoSegmentFound | VerificationError::AmbiguousSegments { .. }
        )
    }
}

/// Per-media-type part of a verdict.
#[derive(Debug, Serialize, Clone)]
pub struct MediaVerification {
    pub representation_id: RepresentationId,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Arc<FragmentManifest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<VerificationError>,
}

impl MediaVerification {
    pub fn is_indeterminate(&self) -> bool {
        self.error
            .as_ref()
            .map(VerificationError::is_indeterminate)
            .unwrap_or(false)
    }

    /// Signature issuer of the resolved manifest, if any.
    pub fn signature_issuer(&self) -> Option<&str> {
        self.manifest
            .as_ref()?
            .store
            .as_ref()?
            .signature
            .as_ref()?
            .issuer
            .as_deref()
    }

    pub fn claim_generator(&self) -> Option<&str> {
        self.manifest.as_ref()?.store.as_ref()?.claim_generator.as_deref()
    }
}

/// Result of a point-in-time query. Recomputed on every query, owned by the caller.
#[derive(Debug, Serialize, Clone)]
pub struct VerificationVerdict {
    pub overall: Verdict,
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<StreamId>,
    pub per_type: BTreeMap<MediaType, MediaVerification>,
}

impl VerificationVerdict {
    /// Verdict for a query where no media type could be evaluated.
    pub fn empty(time: f64, stream_id: Option<StreamId>) -> Self {
        Self {
            overall: Verdict::Indeterminate,
            time,
            stream_id,
            per_type: BTreeMap::new(),
        }
    }

    pub fn is_verified(&self) -> bool {
        self.overall == Verdict::Verified
    }

    pub fn get(&self, media_type: &MediaType) -> Option<&MediaVerification> {
        self.per_type.get(media_type)
    }
}
