use std::time::Duration;

use serde::Deserialize;

use crate::domain::error::{EngineError, EngineResult};

use super::ids::MediaType;
use super::trust::TrustPolicyConfig;

/// Centralized defaults for the stream engine.
/// All opinionated defaults should be defined here for consistency.
pub struct EngineDefaults;

impl EngineDefaults {
    // Lookup defaults
    pub const SEARCH_EPSILON_SECS: f64 = 0.01; // Point queries use [t, t + eps)
    pub const SUPPORTED_MEDIA_TYPES: [MediaType; 2] = [MediaType::Video, MediaType::Audio];

    // Extraction defaults
    pub const EXTRACTION_TIMEOUT_MS: u64 = 30_000; // Slow toolkit calls become ExtractionFailed
    pub const ALLOW_REMOTE_MANIFESTS: bool = false; // Secure default: no network fetches
    pub const HAS_TRUST_POLICY: Option<TrustPolicyConfig> = None; // Bring-your-own-trust
}

/// Configurable per-session limits to control memory use.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max size of a single media segment handed to the toolkit.
    pub max_fragment_size: usize,
    /// Max size of a cached initialization segment.
    pub max_init_segment_size: usize,
    /// Max size of a monolithic asset.
    pub max_asset_size: usize,
}

impl LimitsConfig {
    /// Opinionated production defaults.
    pub fn defaults() -> Self {
        Self {
            max_fragment_size: 64 * 1024 * 1024,      // 64 MB
            max_init_segment_size: 4 * 1024 * 1024,   // 4 MB
            max_asset_size: 1024 * 1024 * 1024,       // 1 GB
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Configuration of a verification session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Media types that are indexed and aggregated. Fragments of any other
    /// type are rejected with `UnsupportedMediaType`.
    pub supported_media_types: Vec<MediaType>,
    /// Width of the query window in seconds.
    pub search_epsilon: f64,
    /// Upper bound for one extraction, in milliseconds.
    pub extraction_timeout_ms: u64,
    pub limits: LimitsConfig,
    /// Optional trust policy applied by the C2PA extractor.
    pub trust_policy: Option<TrustPolicyConfig>,
    /// Opt-in: let the toolkit fetch remote manifests (requires feature).
    pub allow_remote_manifests: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::secure_default()
    }
}

impl SessionConfig {
    /// Secure opinionated defaults.
    pub fn secure_default() -> Self {
        Self {
            supported_media_types: EngineDefaults::SUPPORTED_MEDIA_TYPES.to_vec(),
            search_epsilon: EngineDefaults::SEARCH_EPSILON_SECS,
            extraction_timeout_ms: EngineDefaults::EXTRACTION_TIMEOUT_MS,
            limits: LimitsConfig::defaults(),
            trust_policy: EngineDefaults::HAS_TRUST_POLICY,
            allow_remote_manifests: EngineDefaults::ALLOW_REMOTE_MANIFESTS,
        }
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let cfg: SessionConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.supported_media_types.is_empty() {
            return Err(EngineError::Config("at least one media type must be supported".into()));
        }
        if !self.search_epsilon.is_finite() || self.search_epsilon <= 0.0 {
            return Err(EngineError::Config(format!(
                "search_epsilon must be a positive number of seconds, got {}",
                self.search_epsilon
            )));
        }
        if self.extraction_timeout_ms == 0 {
            return Err(EngineError::Config("extraction_timeout_ms must be non-zero".into()));
        }
        if self.limits.max_fragment_size == 0
            || self.limits.max_init_segment_size == 0
            || self.limits.max_asset_size == 0
        {
            return Err(EngineError::Config("segment size limits must be non-zero".into()));
        }
        Ok(())
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }

    pub fn supports(&self, media_type: &MediaType) -> bool {
        self.supported_media_types.contains(media_type)
    }
}
