// crates/engine/src/domain/manifest.rs
use serde::{Deserialize, Serialize};

/// Certificate summary extracted from the active claim signature.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CertInfo {
    pub alg: Option<String>,
    pub issuer: Option<String>,
    pub cert_serial_number: Option<String>,
    pub time: Option<String>,
    pub revocation_status: Option<bool>,
}

/// Structured validation status entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ValidationStatus {
    pub code: String,
    pub url: Option<String>,
    pub explanation: Option<String>,
    pub ingredient_uri: Option<String>,
    pub passed: bool,
}

impl ValidationStatus {
    /// Failure entry carrying only a code.
    pub fn failure(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            url: None,
            explanation: None,
            ingredient_uri: None,
            passed: false,
        }
    }
}

/// Manifest store summary produced by the authenticity toolkit for one
/// fragment or asset.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ManifestStore {
    /// Label of the active manifest.
    pub active_manifest: Option<String>,
    pub claim_generator: Option<String>,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<CertInfo>,
    /// Empty means the store validated cleanly. Otherwise the first entry
    /// is the authoritative failure reason.
    #[serde(default)]
    pub validation_status: Vec<ValidationStatus>,
}

/// Result of extracting a manifest from a fragment (or a whole asset).
///
/// `store == None` means the toolkit ran but found no manifest store; a
/// failed extraction never yields a `FragmentManifest` at all.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct FragmentManifest {
    pub store: Option<ManifestStore>,
}

impl FragmentManifest {
    pub fn with_store(store: ManifestStore) -> Self {
        Self { store: Some(store) }
    }

    pub fn without_store() -> Self {
        Self { store: None }
    }

    /// Store with an empty validation status list.
    pub fn clean() -> Self {
        Self::with_store(ManifestStore::default())
    }

    /// Store whose validation status holds the given failure codes, in order.
    pub fn failing<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_store(ManifestStore {
            validation_status: codes.into_iter().map(ValidationStatus::failure).collect(),
            ..ManifestStore::default()
        })
    }

    /// True when a store is present and its validation status is empty.
    pub fn is_verified(&self) -> bool {
        self.store
            .as_ref()
            .map(|s| s.validation_status.is_empty())
            .unwrap_or(false)
    }

    /// First validation status code, if any.
    pub fn failure_code(&self) -> Option<&str> {
        self.store
            .as_ref()
            .and_then(|s| s.validation_status.first())
            .map(|s| s.code.as_str())
    }
}
