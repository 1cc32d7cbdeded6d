// crates/engine/src/domain/manifest_engine.rs

use async_trait::async_trait;
use bytes::Bytes;

use super::error::EngineResult;
use super::manifest::FragmentManifest;

/// Authenticity toolkit seam (C2PA today, others later).
///
/// Implementations must be thread-safe: a session runs many extractions
/// concurrently and never holds its state lock across one.
#[async_trait]
pub trait ManifestExtractor: Send + Sync {
    /// Extract the manifest of one media segment, using the cached
    /// initialization segment of the same representation as context.
    async fn extract_fragment(
        &self,
        init_segment: Bytes,
        fragment: Bytes,
        content_type: &str,
    ) -> EngineResult<FragmentManifest>;

    /// Extract the manifest of a whole, undivided asset.
    async fn extract_asset(&self, asset: Bytes, content_type: &str) -> EngineResult<FragmentManifest>;
}
