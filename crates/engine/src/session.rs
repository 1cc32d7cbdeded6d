//! Ingestion pipeline around the index/resolver pair.
//!
//! A `VerificationSession` is created per player session. Fragment and
//! switch events may arrive from any task in any order; manifest extraction
//! runs on spawned tasks and lands in the index when it completes. Queries
//! are synchronous and only ever see settled state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::manifest::FragmentManifest;
use crate::domain::manifest_engine::ManifestExtractor;
use crate::domain::types::{
    ManifestKey, MediaType, RepresentationId, SegmentRole, SessionConfig, StreamId, TimeRange,
};
use crate::domain::verify::VerificationVerdict;
use crate::index::InsertOutcome;
use crate::resolver::VerificationResolver;

/// A segment delivered by the player.
#[derive(Debug, Clone)]
pub struct FragmentEvent {
    pub stream_id: StreamId,
    pub media_type: MediaType,
    pub representation_id: RepresentationId,
    pub role: SegmentRole,
    /// Stream-relative start, in seconds. Ignored for initialization segments.
    pub start_time: f64,
    /// Duration in seconds. Ignored for initialization segments.
    pub duration: f64,
    pub payload: Bytes,
    /// Optional MIME type hint (e.g. "video/mp4"). Falls back to the media type default.
    pub content_type: Option<String>,
}

impl FragmentEvent {
    pub fn initialization(
        stream_id: impl Into<StreamId>,
        media_type: MediaType,
        representation_id: impl Into<RepresentationId>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            media_type,
            representation_id: representation_id.into(),
            role: SegmentRole::Initialization,
            start_time: 0.0,
            duration: 0.0,
            payload: payload.into(),
            content_type: None,
        }
    }

    pub fn media(
        stream_id: impl Into<StreamId>,
        media_type: MediaType,
        representation_id: impl Into<RepresentationId>,
        start_time: f64,
        duration: f64,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            media_type,
            representation_id: representation_id.into(),
            role: SegmentRole::Media,
            start_time,
            duration,
            payload: payload.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn key(&self) -> ManifestKey {
        ManifestKey::new(
            self.stream_id.clone(),
            self.media_type.clone(),
            self.representation_id.clone(),
        )
    }
}

/// What `on_fragment_arrived` did with an accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    InitSegmentCached,
    ExtractionScheduled,
}

/// Outcome counts of the tasks awaited by `VerificationSession::settled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleSummary {
    pub inserted: usize,
    pub replaced: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Extractions that finished after a `shutdown` and were dropped.
    pub discarded: usize,
}

#[derive(Debug, Clone)]
struct InitSegment {
    bytes: Bytes,
    content_type: String,
}

#[derive(Debug)]
struct SessionState {
    resolver: VerificationResolver,
    init_segments: HashMap<ManifestKey, InitSegment>,
    /// Bumped by `shutdown`; results from older generations are dropped.
    generation: u64,
}

type SharedState = Arc<Mutex<SessionState>>;

// Critical sections never suspend and leave the state consistent, so a
// poisoned lock is still safe to use.
fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Record an extracted manifest unless the session was shut down after the
/// extraction was scheduled. The generation check and the insert share one
/// lock acquisition.
fn index_manifest(
    state: &Mutex<SessionState>,
    generation: u64,
    key: ManifestKey,
    interval: TimeRange,
    manifest: FragmentManifest,
) -> Option<InsertOutcome> {
    let mut state = lock(state);
    if state.generation != generation {
        debug!(%key, %interval, "session shut down during extraction, manifest discarded");
        return None;
    }
    let outcome = state.resolver.record_manifest(key.clone(), interval, manifest);
    info!(%key, %interval, ?outcome, "manifest indexed");
    Some(outcome)
}

pub struct VerificationSession {
    state: SharedState,
    extractor: Arc<dyn ManifestExtractor>,
    config: Arc<SessionConfig>,
    runtime: Handle,
    tasks: Mutex<Vec<JoinHandle<EngineResult<Option<InsertOutcome>>>>>,
}

impl std::fmt::Debug for VerificationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationSession")
            .field("config", &self.config)
            .field("pending_extractions", &self.pending_extractions())
            .finish()
    }
}

impl VerificationSession {
    /// Create a session on the current Tokio runtime.
    pub fn new(extractor: Arc<dyn ManifestExtractor>, config: SessionConfig) -> EngineResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| EngineError::Runtime(format!("no tokio runtime available: {e}")))?;
        Self::with_runtime(runtime, extractor, config)
    }

    /// Create a session whose extraction tasks run on `runtime`.
    pub fn with_runtime(
        runtime: Handle,
        extractor: Arc<dyn ManifestExtractor>,
        config: SessionConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        let state = SessionState {
            resolver: VerificationResolver::new(&config),
            init_segments: HashMap::new(),
            generation: 0,
        };
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            extractor,
            config: Arc::new(config),
            runtime,
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Accept a segment from the player.
    ///
    /// Initialization segments are cached per key. Media segments schedule
    /// an extraction that inserts into the index once it completes; a failed
    /// or timed-out extraction is logged and leaves no record.
    #[instrument(level = "debug", skip_all, fields(key = %event.key(), role = ?event.role))]
    pub fn on_fragment_arrived(&self, event: FragmentEvent) -> EngineResult<Ingest> {
        if !self.config.supports(&event.media_type) {
            info!(media_type = %event.media_type, "unsupported media type, fragment ignored");
            return Err(EngineError::UnsupportedMediaType(event.media_type));
        }

        let key = event.key();
        match event.role {
            SegmentRole::Initialization => {
                if event.payload.len() > self.config.limits.max_init_segment_size {
                    return Err(EngineError::Config(format!(
                        "initialization segment too large: {} bytes (max: {})",
                        event.payload.len(),
                        self.config.limits.max_init_segment_size
                    )));
                }
                let content_type = event
                    .content_type
                    .unwrap_or_else(|| event.media_type.default_content_type().to_string());
                debug!(bytes = event.payload.len(), "initialization segment cached");
                lock(&self.state).init_segments.insert(
                    key,
                    InitSegment {
                        bytes: event.payload,
                        content_type,
                    },
                );
                Ok(Ingest::InitSegmentCached)
            }
            SegmentRole::Media => {
                let interval = TimeRange::from_start_duration(event.start_time, event.duration)?;
                if event.payload.len() > self.config.limits.max_fragment_size {
                    return Err(EngineError::Config(format!(
                        "media segment too large: {} bytes (max: {})",
                        event.payload.len(),
                        self.config.limits.max_fragment_size
                    )));
                }

                let init = lock(&self.state).init_segments.get(&key).cloned();
                let Some(init) = init else {
                    error!("no initialization segment cached, fragment dropped");
                    return Err(EngineError::MissingInitSegment(key));
                };

                let content_type = event.content_type.unwrap_or(init.content_type);
                let extractor = Arc::clone(&self.extractor);
                let timeout = self.config.extraction_timeout();
                let payload = event.payload;
                debug!(%interval, bytes = payload.len(), "scheduling manifest extraction");

                self.spawn_indexing(key, interval, async move {
                    match tokio::time::timeout(
                        timeout,
                        extractor.extract_fragment(init.bytes, payload, &content_type),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(EngineError::ExtractionFailed(format!(
                            "timed out after {} ms",
                            timeout.as_millis()
                        ))),
                    }
                });
                Ok(Ingest::ExtractionScheduled)
            }
        }
    }

    /// Accept an undivided asset. Its manifest is indexed under
    /// `TimeRange::whole()`, so every query time resolves to it.
    #[instrument(level = "debug", skip_all, fields(stream = %stream_id, %media_type))]
    pub fn on_monolithic_asset(
        &self,
        stream_id: StreamId,
        media_type: MediaType,
        representation_id: RepresentationId,
        content_type: &str,
        asset: Bytes,
    ) -> EngineResult<Ingest> {
        if !self.config.supports(&media_type) {
            info!("unsupported media type, asset ignored");
            return Err(EngineError::UnsupportedMediaType(media_type));
        }
        if asset.len() > self.config.limits.max_asset_size {
            return Err(EngineError::Config(format!(
                "asset too large: {} bytes (max: {})",
                asset.len(),
                self.config.limits.max_asset_size
            )));
        }

        let key = ManifestKey::new(stream_id, media_type, representation_id);
        let extractor = Arc::clone(&self.extractor);
        let timeout = self.config.extraction_timeout();
        let content_type = content_type.to_string();

        self.spawn_indexing(key, TimeRange::whole(), async move {
            match tokio::time::timeout(timeout, extractor.extract_asset(asset, &content_type)).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::ExtractionFailed(format!(
                    "timed out after {} ms",
                    timeout.as_millis()
                ))),
            }
        });
        Ok(Ingest::ExtractionScheduled)
    }

    fn spawn_indexing<F>(&self, key: ManifestKey, interval: TimeRange, extraction: F)
    where
        F: std::future::Future<Output = EngineResult<FragmentManifest>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let generation = lock(&self.state).generation;
        let handle = self.runtime.spawn(async move {
            let manifest = match extraction.await {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(%key, %interval, error = %e, "failed to extract manifest, fragment skipped");
                    return Err(match e {
                        EngineError::ExtractionFailed(msg) => EngineError::ExtractionFailed(msg),
                        other => EngineError::ExtractionFailed(other.to_string()),
                    });
                }
            };

            Ok(index_manifest(&state, generation, key, interval, manifest))
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
    }

    pub fn on_representation_switch(&self, media_type: &MediaType, representation_id: RepresentationId) -> bool {
        lock(&self.state).resolver.on_representation_switch(media_type, representation_id)
    }

    pub fn on_stream_activated(&self, stream_id: StreamId) {
        lock(&self.state).resolver.on_stream_activated(stream_id)
    }

    /// Verdict for `time` on the active stream. Never waits on extractions.
    pub fn query(&self, time: f64) -> VerificationVerdict {
        lock(&self.state).resolver.query(time)
    }

    pub fn query_stream(&self, stream_id: &StreamId, time: f64) -> VerificationVerdict {
        lock(&self.state).resolver.query_stream(stream_id, time)
    }

    /// Failing intervals under the active representation of `media_type`.
    pub fn compromised_ranges(&self, media_type: &MediaType) -> Vec<TimeRange> {
        lock(&self.state).resolver.compromised_ranges(media_type)
    }

    /// Number of indexed records.
    pub fn indexed_records(&self) -> usize {
        lock(&self.state).resolver.index().len()
    }

    /// Drop indexed records for one key or all keys (seek to zero).
    ///
    /// Extractions already in flight keep running; a result that lands after
    /// the reset recreates its key's tree.
    pub fn reset(&self, key: Option<&ManifestKey>) -> usize {
        let dropped = lock(&self.state).resolver.reset(key);
        match key {
            Some(key) => info!(%key, dropped, "index reset"),
            None => info!(dropped, "index reset for all keys"),
        }
        dropped
    }

    /// Stream teardown: abort in-flight extractions and forget all records,
    /// cached initialization segments and selections. An extraction that
    /// completes despite the abort is discarded.
    pub fn shutdown(&self) {
        let aborted = {
            let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            let pending = tasks.iter().filter(|h| !h.is_finished()).count();
            for h in tasks.iter() {
                h.abort();
            }
            pending
        };
        let mut state = lock(&self.state);
        state.generation = state.generation.wrapping_add(1);
        state.resolver.clear();
        state.init_segments.clear();
        info!(aborted, "session shut down");
    }

    pub fn pending_extractions(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Wait until every extraction scheduled so far (and any scheduled while
    /// waiting) has finished.
    pub async fn settled(&self) -> SettleSummary {
        let mut summary = SettleSummary::default();
        loop {
            let handles = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
            if handles.is_empty() {
                return summary;
            }
            for handle in handles {
                match handle.await {
                    Ok(Ok(Some(InsertOutcome::Inserted))) => summary.inserted += 1,
                    Ok(Ok(Some(InsertOutcome::Replaced))) => summary.replaced += 1,
                    Ok(Ok(None)) => summary.discarded += 1,
                    Ok(Err(_)) => summary.failed += 1,
                    Err(e) if e.is_cancelled() => summary.cancelled += 1,
                    Err(e) => {
                        error!(error = %e, "extraction task panicked");
                        summary.failed += 1;
                    }
                }
            }
        }
    }
}

impl Drop for VerificationSession {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for h in tasks.iter() {
            h.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::domain::verify::Verdict;

    struct CleanExtractor;

    #[async_trait]
    impl ManifestExtractor for CleanExtractor {
        async fn extract_fragment(&self, _: Bytes, _: Bytes, _: &str) -> EngineResult<FragmentManifest> {
            Ok(FragmentManifest::clean())
        }

        async fn extract_asset(&self, _: Bytes, _: &str) -> EngineResult<FragmentManifest> {
            Ok(FragmentManifest::clean())
        }
    }

    fn key() -> ManifestKey {
        ManifestKey::new("S", MediaType::Video, "R1")
    }

    fn r(start: f64, end: f64) -> TimeRange {
        TimeRange::new(start, end).unwrap()
    }

    #[tokio::test]
    async fn extraction_finishing_after_shutdown_is_discarded() {
        let session = VerificationSession::new(Arc::new(CleanExtractor), SessionConfig::secure_default()).unwrap();
        // Generation captured when the extraction was scheduled.
        let scheduled = lock(&session.state).generation;
        session.shutdown();

        let outcome = index_manifest(&session.state, scheduled, key(), r(0.0, 2.0), FragmentManifest::clean());
        assert_eq!(outcome, None);
        assert_eq!(session.indexed_records(), 0);
        let verdict = session.query(1.0);
        assert_eq!(verdict.overall, Verdict::Indeterminate);
        assert!(verdict.per_type.is_empty());

        // Work scheduled after the shutdown indexes normally.
        let current = lock(&session.state).generation;
        let outcome = index_manifest(&session.state, current, key(), r(0.0, 2.0), FragmentManifest::clean());
        assert_eq!(outcome, Some(InsertOutcome::Inserted));
        assert!(session.query(1.0).is_verified());
    }

    #[tokio::test]
    async fn reset_keeps_generation() {
        let session = VerificationSession::new(Arc::new(CleanExtractor), SessionConfig::secure_default()).unwrap();
        let scheduled = lock(&session.state).generation;
        session.reset(None);

        let outcome = index_manifest(&session.state, scheduled, key(), r(0.0, 2.0), FragmentManifest::clean());
        assert_eq!(outcome, Some(InsertOutcome::Inserted));
    }
}
