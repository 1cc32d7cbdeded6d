// crates/engine/src/domain/error.rs
use thiserror::Error;

use super::types::{ManifestKey, MediaType};

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("configuration: {0}")]
  Config(String),

  #[error("invalid interval [{start}, {end})")]
  InvalidInterval { start: f64, end: f64 },

  #[error("manifest extraction failed: {0}")]
  ExtractionFailed(String),

  #[error("no initialization segment cached for {0}")]
  MissingInitSegment(ManifestKey),

  #[error("unsupported media type: {0}")]
  UnsupportedMediaType(MediaType),

  #[error("runtime: {0}")]
  Runtime(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[cfg(feature = "c2pa")]
  #[error(transparent)]
  C2pa(#[from] c2pa::Error),

  #[error("feature not enabled: {0}")]
  Feature(&'static str),

  // Useful when we catch_unwind to avoid crossing FFI boundaries with panics.
  #[error("internal panic: {0}")]
  Panic(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
