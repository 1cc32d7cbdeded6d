use std::sync::Arc;

use bytes::Bytes;
use que_stream_engine::domain::error::EngineError;
use que_stream_engine::domain::types as dt;
use tracing::{debug, info, warn};

use que_stream_engine::{
    FragmentEvent, Ingest, ManifestExtractor, MediaVerification, SettleSummary, VerificationSession,
    VerificationVerdict, Verdict,
};

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FfiError {
    #[error("{message}")]
    Generic { message: String },
}

impl From<EngineError> for FfiError {
    fn from(e: EngineError) -> Self {
        warn!(error = %e, "engine call failed at the ffi boundary");
        FfiError::Generic {
            message: e.to_string(),
        }
    }
}

// ===== Configuration =====

#[derive(uniffi::Record, Debug, Clone, Copy)]
pub struct FfiLimitsConfig {
    pub max_fragment_size: u64,
    pub max_init_segment_size: u64,
    pub max_asset_size: u64,
}

impl From<FfiLimitsConfig> for dt::LimitsConfig {
    fn from(v: FfiLimitsConfig) -> Self {
        dt::LimitsConfig {
            max_fragment_size: v.max_fragment_size as usize,
            max_init_segment_size: v.max_init_segment_size as usize,
            max_asset_size: v.max_asset_size as usize,
        }
    }
}

impl FfiLimitsConfig {
    pub fn defaults() -> Self {
        let d = dt::LimitsConfig::defaults();
        Self {
            max_fragment_size: d.max_fragment_size as u64,
            max_init_segment_size: d.max_init_segment_size as u64,
            max_asset_size: d.max_asset_size as u64,
        }
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiTrustPolicyConfig {
    pub anchors: Option<Vec<u8>>,          // PEM trust anchors
    pub allowed_list: Option<Vec<u8>>,     // PEM allowed-list
    pub allowed_ekus: Option<Vec<String>>, // EKU OIDs
}

impl From<FfiTrustPolicyConfig> for dt::TrustPolicyConfig {
    fn from(v: FfiTrustPolicyConfig) -> Self {
        dt::TrustPolicyConfig { anchors: v.anchors, allowed_list: v.allowed_list, allowed_ekus: v.allowed_ekus }
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiSessionConfig {
    pub supported_media_types: Vec<String>,
    pub search_epsilon: f64,
    pub extraction_timeout_ms: u64,
    pub limits: FfiLimitsConfig,
    pub trust_policy: Option<FfiTrustPolicyConfig>,
    pub allow_remote_manifests: bool,
}

impl TryFrom<FfiSessionConfig> for dt::SessionConfig {
    type Error = FfiError;
    fn try_from(v: FfiSessionConfig) -> Result<Self, Self::Error> {
        let supported_media_types = v
            .supported_media_types
            .iter()
            .map(|t| t.parse::<dt::MediaType>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dt::SessionConfig {
            supported_media_types,
            search_epsilon: v.search_epsilon,
            extraction_timeout_ms: v.extraction_timeout_ms,
            limits: v.limits.into(),
            trust_policy: v.trust_policy.map(Into::into),
            allow_remote_manifests: v.allow_remote_manifests,
        })
    }
}

#[uniffi::export]
pub fn default_session_config() -> FfiSessionConfig {
    let d = dt::SessionConfig::secure_default();
    FfiSessionConfig {
        supported_media_types: d.supported_media_types.iter().map(|t| t.to_string()).collect(),
        search_epsilon: d.search_epsilon,
        extraction_timeout_ms: d.extraction_timeout_ms,
        limits: FfiLimitsConfig::defaults(),
        trust_policy: None,
        allow_remote_manifests: d.allow_remote_manifests,
    }
}

// ===== Events =====

#[derive(uniffi::Enum, Debug, Clone, Copy)]
pub enum FfiSegmentRole { Initialization, Media }

impl From<FfiSegmentRole> for dt::SegmentRole {
    fn from(v: FfiSegmentRole) -> Self {
        match v { FfiSegmentRole::Initialization => dt::SegmentRole::Initialization, FfiSegmentRole::Media => dt::SegmentRole::Media }
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiFragmentEvent {
    pub stream_id: String,
    pub media_type: String,
    pub representation_id: String,
    pub role: FfiSegmentRole,
    pub start_time: f64,
    pub duration: f64,
    pub payload: Vec<u8>,
    pub content_type: Option<String>,
}

impl TryFrom<FfiFragmentEvent> for FragmentEvent {
    type Error = FfiError;
    fn try_from(v: FfiFragmentEvent) -> Result<Self, Self::Error> {
        Ok(FragmentEvent {
            stream_id: v.stream_id.into(),
            media_type: v.media_type.parse()?,
            representation_id: v.representation_id.into(),
            role: v.role.into(),
            start_time: v.start_time,
            duration: v.duration,
            payload: Bytes::from(v.payload),
            content_type: v.content_type,
        })
    }
}

#[derive(uniffi::Enum, Debug, Clone, Copy)]
pub enum FfiIngest { InitSegmentCached, ExtractionScheduled }

impl From<Ingest> for FfiIngest {
    fn from(v: Ingest) -> Self {
        match v { Ingest::InitSegmentCached => FfiIngest::InitSegmentCached, Ingest::ExtractionScheduled => FfiIngest::ExtractionScheduled }
    }
}

#[derive(uniffi::Record, Debug, Clone, Copy)]
pub struct FfiSettleSummary {
    pub inserted: u64,
    pub replaced: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub discarded: u64,
}

impl From<SettleSummary> for FfiSettleSummary {
    fn from(v: SettleSummary) -> Self {
        FfiSettleSummary {
            inserted: v.inserted as u64,
            replaced: v.replaced as u64,
            failed: v.failed as u64,
            cancelled: v.cancelled as u64,
            discarded: v.discarded as u64,
        }
    }
}

// ===== Verdict mappings =====

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiCertInfo {
    pub alg: Option<String>,
    pub issuer: Option<String>,
    pub cert_serial_number: Option<String>,
    pub time: Option<String>,
    pub revocation_status: Option<bool>,
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiValidationStatus {
    pub code: String,
    pub url: Option<String>,
    pub explanation: Option<String>,
    pub ingredient_uri: Option<String>,
    pub passed: bool,
}

#[derive(uniffi::Record, Debug, Clone, Copy)]
pub struct FfiTimeRange {
    pub start: f64,
    pub end: f64,
}

impl From<dt::TimeRange> for FfiTimeRange {
    fn from(v: dt::TimeRange) -> Self {
        FfiTimeRange { start: v.start(), end: v.end() }
    }
}

#[derive(uniffi::Enum, Debug, Clone, Copy)]
pub enum FfiVerdict { Verified, Failed, Indeterminate }

impl From<Verdict> for FfiVerdict {
    fn from(v: Verdict) -> Self {
        match v { Verdict::Verified => FfiVerdict::Verified, Verdict::Failed => FfiVerdict::Failed, Verdict::Indeterminate => FfiVerdict::Indeterminate }
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiMediaVerification {
    pub media_type: String,
    pub representation_id: String,
    pub verified: bool,
    pub interval: Option<FfiTimeRange>,
    /// Error kind ("no_segment_found", "validation_failed", ...)
    pub error: Option<String>,
    pub failure_code: Option<String>,
    pub claim_generator: Option<String>,
    pub signature: Option<FfiCertInfo>,
    pub validation_status: Vec<FfiValidationStatus>,
}

fn media_verification(media_type: &dt::MediaType, v: &MediaVerification) -> FfiMediaVerification {
    use que_stream_engine::VerificationError as E;

    let (error, failure_code) = match &v.error {
        None => (None, None),
        Some(E::NoSegmentFound) => (Some("no_segment_found"), None),
        Some(E::AmbiguousSegments { .. }) => (Some("ambiguous_segments"), None),
        Some(E::MissingManifestStore) => (Some("missing_manifest_store"), None),
        Some(E::ValidationFailed { code }) => (Some("validation_failed"), Some(code.clone())),
    };
    let store = v.manifest.as_ref().and_then(|m| m.store.as_ref());

    FfiMediaVerification {
        media_type: media_type.to_string(),
        representation_id: v.representation_id.to_string(),
        verified: v.verified,
        interval: v.interval.map(Into::into),
        error: error.map(str::to_string),
        failure_code,
        claim_generator: v.claim_generator().map(str::to_string),
        signature: store.and_then(|s| s.signature.as_ref()).map(|c| FfiCertInfo {
            alg: c.alg.clone(),
            issuer: c.issuer.clone(),
            cert_serial_number: c.cert_serial_number.clone(),
            time: c.time.clone(),
            revocation_status: c.revocation_status,
        }),
        validation_status: store
            .map(|s| {
                s.validation_status
                    .iter()
                    .map(|s| FfiValidationStatus { code: s.code.clone(), url: s.url.clone(), explanation: s.explanation.clone(), ingredient_uri: s.ingredient_uri.clone(), passed: s.passed })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiVerificationVerdict {
    pub overall: FfiVerdict,
    pub time: f64,
    pub stream_id: Option<String>,
    pub per_type: Vec<FfiMediaVerification>,
}

impl From<VerificationVerdict> for FfiVerificationVerdict {
    fn from(v: VerificationVerdict) -> Self {
        FfiVerificationVerdict {
            overall: v.overall.into(),
            time: v.time,
            stream_id: v.stream_id.as_ref().map(|s| s.to_string()),
            per_type: v.per_type.iter().map(|(t, m)| media_verification(t, m)).collect(),
        }
    }
}

// ===== Session object =====

#[derive(uniffi::Object)]
pub struct FfiVerificationSession {
    // Declared before the runtime so it is dropped (and its tasks aborted) first.
    inner: VerificationSession,
    runtime: tokio::runtime::Runtime,
}

#[cfg(feature = "c2pa")]
fn default_extractor(config: &dt::SessionConfig) -> Result<Arc<dyn ManifestExtractor>, FfiError> {
    Ok(Arc::new(que_stream_engine::C2pa::new(config)?))
}

#[cfg(not(feature = "c2pa"))]
fn default_extractor(_config: &dt::SessionConfig) -> Result<Arc<dyn ManifestExtractor>, FfiError> {
    Err(EngineError::Feature("c2pa").into())
}

impl FfiVerificationSession {
    fn build(config: dt::SessionConfig) -> Result<Arc<Self>, FfiError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| FfiError::Generic { message: format!("Failed to create tokio runtime: {e}") })?;
        let extractor = default_extractor(&config)?;
        let inner = VerificationSession::with_runtime(runtime.handle().clone(), extractor, config)?;
        info!(media_types = ?inner.config().supported_media_types, "ffi verification session created");
        Ok(Arc::new(Self { inner, runtime }))
    }
}

#[uniffi::export]
impl FfiVerificationSession {
    #[uniffi::constructor]
    pub fn new(config: FfiSessionConfig) -> Result<Arc<Self>, FfiError> {
        Self::build(config.try_into()?)
    }

    /// Same as `new`, from a JSON `SessionConfig` document.
    #[uniffi::constructor]
    pub fn from_json(json: String) -> Result<Arc<Self>, FfiError> {
        Self::build(dt::SessionConfig::from_json(&json)?)
    }

    pub fn on_fragment_arrived(&self, event: FfiFragmentEvent) -> Result<FfiIngest, FfiError> {
        let event: FragmentEvent = event.try_into()?;
        Ok(self.inner.on_fragment_arrived(event)?.into())
    }

    pub fn on_monolithic_asset(
        &self,
        stream_id: String,
        media_type: String,
        representation_id: String,
        content_type: String,
        asset: Vec<u8>,
    ) -> Result<FfiIngest, FfiError> {
        let ingest = self.inner.on_monolithic_asset(
            stream_id.into(),
            media_type.parse()?,
            representation_id.into(),
            &content_type,
            Bytes::from(asset),
        )?;
        Ok(ingest.into())
    }

    pub fn on_representation_switch(&self, media_type: String, representation_id: String) -> Result<bool, FfiError> {
        let media_type: dt::MediaType = media_type.parse()?;
        Ok(self.inner.on_representation_switch(&media_type, representation_id.into()))
    }

    pub fn on_stream_activated(&self, stream_id: String) {
        self.inner.on_stream_activated(stream_id.into())
    }

    /// Drop indexed records of one key, or of every key when `key` is `None`.
    pub fn reset(&self, stream_id: Option<String>, media_type: Option<String>, representation_id: Option<String>) -> Result<u64, FfiError> {
        let key = match (stream_id, media_type, representation_id) {
            (Some(s), Some(m), Some(r)) => Some(dt::ManifestKey::new(s, m.parse::<dt::MediaType>()?, r)),
            (None, None, None) => None,
            _ => {
                warn!("partial reset key rejected");
                return Err(FfiError::Generic { message: "reset needs all of stream_id, media_type and representation_id, or none".into() })
            }
        };
        Ok(self.inner.reset(key.as_ref()) as u64)
    }

    pub fn shutdown(&self) {
        info!(pending = self.inner.pending_extractions(), "ffi session shutdown requested");
        self.inner.shutdown()
    }

    /// Block until every scheduled extraction has finished.
    pub fn flush(&self) -> FfiSettleSummary {
        let summary = self.runtime.block_on(self.inner.settled());
        debug!(?summary, "extractions settled");
        summary.into()
    }

    pub fn pending_extractions(&self) -> u64 {
        self.inner.pending_extractions() as u64
    }

    pub fn query(&self, time: f64) -> FfiVerificationVerdict {
        self.inner.query(time).into()
    }

    pub fn compromised_ranges(&self, media_type: String) -> Result<Vec<FfiTimeRange>, FfiError> {
        let media_type: dt::MediaType = media_type.parse()?;
        Ok(self.inner.compromised_ranges(&media_type).into_iter().map(Into::into).collect())
    }
}

uniffi::setup_scaffolding!();
