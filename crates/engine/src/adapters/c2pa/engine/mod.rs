// adapters/c2pa/engine/mod.rs

mod common;
mod extract;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::manifest::FragmentManifest;
use crate::domain::manifest_engine::ManifestExtractor;
use crate::domain::types::SessionConfig;
use super::content_detection::resolve_format;

pub use common::{build_reader_settings, build_trust_settings};

/// `ManifestExtractor` backed by the c2pa `Reader`.
///
/// Toolkit calls are blocking, so each one runs on Tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct C2pa {
  settings: Arc<Vec<serde_json::Value>>,
}

impl C2pa {
  pub fn new(config: &SessionConfig) -> EngineResult<Self> {
    Ok(Self {
      settings: Arc::new(build_reader_settings(config)?),
    })
  }
}

#[async_trait]
impl ManifestExtractor for C2pa {
  async fn extract_fragment(
    &self,
    init_segment: Bytes,
    fragment: Bytes,
    content_type: &str,
  ) -> EngineResult<FragmentManifest> {
    let settings = Arc::clone(&self.settings);
    let format = resolve_format(&init_segment, content_type);
    debug!(%format, init = init_segment.len(), fragment = fragment.len(), "reading fragment manifest");

    tokio::task::spawn_blocking(move || extract::read_fragment(&settings, &format, init_segment, fragment))
      .await
      .map_err(|e| EngineError::Panic(format!("extraction task failed: {e}")))?
  }

  async fn extract_asset(&self, asset: Bytes, content_type: &str) -> EngineResult<FragmentManifest> {
    let settings = Arc::clone(&self.settings);
    let format = resolve_format(&asset, content_type);
    debug!(%format, bytes = asset.len(), "reading asset manifest");

    tokio::task::spawn_blocking(move || extract::read_asset(&settings, &format, asset))
      .await
      .map_err(|e| EngineError::Panic(format!("extraction task failed: {e}")))?
  }
}
