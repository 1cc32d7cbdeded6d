// crates/engine/src/lib.rs

//! Public facade for the Que stream engine.
//!
//! Verifies C2PA provenance of fragmented media during playback: extracted
//! manifests are indexed per stream, media type and representation by their
//! time interval, and a point-in-time query turns the active selection into
//! a verdict. Re-exports the types consumers (players, FFI) need.

pub mod adapters;
pub mod domain;
pub mod index;
pub mod resolver;
pub mod session;

use std::sync::Arc;

use domain::error::EngineResult;

/// Session backed by the built-in C2PA extractor, on the current Tokio runtime.
#[cfg(feature = "c2pa")]
pub fn c2pa_session(config: SessionConfig) -> EngineResult<VerificationSession> {
    let extractor = Arc::new(adapters::c2pa::C2pa::new(&config)?);
    VerificationSession::new(extractor, config)
}

/// Session backed by a caller-supplied extractor.
pub fn session_with_extractor(
    extractor: Arc<dyn ManifestExtractor>,
    config: SessionConfig,
) -> EngineResult<VerificationSession> {
    VerificationSession::new(extractor, config)
}

// Re-exports for convenience
#[cfg(feature = "c2pa")]
pub use adapters::c2pa::C2pa;
pub use domain::error::EngineError;
pub use domain::manifest::{CertInfo, FragmentManifest, ManifestStore, ValidationStatus};
pub use domain::manifest_engine::ManifestExtractor;
pub use domain::types::{
    EngineDefaults, LimitsConfig, ManifestKey, MediaType, RepresentationId, SegmentRole, SessionConfig, StreamId,
    TimeRange, TrustPolicyConfig,
};
pub use domain::verify::{MediaVerification, VerificationError, VerificationVerdict, Verdict};
pub use index::{InsertOutcome, SegmentManifestIndex};
pub use resolver::{ActiveRepresentationTable, VerificationResolver};
pub use session::{FragmentEvent, Ingest, SettleSummary, VerificationSession};
