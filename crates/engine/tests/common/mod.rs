#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use que_stream_engine::domain::error::{EngineError, EngineResult};
use que_stream_engine::{
    FragmentEvent, FragmentManifest, ManifestExtractor, ManifestStore, MediaType, SessionConfig, VerificationSession,
};

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Extractor whose behaviour is scripted by the fragment payload:
///
/// - `clean` - store without validation failures
/// - `fail:<code>` - store with one failing status
/// - `nostore` - no manifest store
/// - `error` - extraction error
/// - `hang` - never completes
/// - `gated:<script>` - waits for the gate, then runs `<script>`
pub struct MockExtractor {
    gate: Arc<watch::Sender<bool>>,
    calls: AtomicUsize,
}

/// Releases every `gated:` extraction of a `MockExtractor`.
pub struct Gate(Arc<watch::Sender<bool>>);

impl Gate {
    pub fn open(&self) {
        self.0.send_replace(true);
    }
}

impl MockExtractor {
    pub fn new() -> Arc<Self> {
        Self::gated().0
    }

    pub fn gated() -> (Arc<Self>, Gate) {
        let (tx, _rx) = watch::channel(false);
        let tx = Arc::new(tx);
        let extractor = Arc::new(Self {
            gate: Arc::clone(&tx),
            calls: AtomicUsize::new(0),
        });
        (extractor, Gate(tx))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn run(&self, script: &[u8]) -> EngineResult<FragmentManifest> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = std::str::from_utf8(script)
            .map_err(|_| EngineError::ExtractionFailed("script is not utf-8".into()))?;

        if let Some(rest) = script.strip_prefix("gated:") {
            let mut rx = self.gate.subscribe();
            let _ = rx.wait_for(|open| *open).await;
            script = rest;
        }

        match script {
            "clean" => Ok(FragmentManifest::with_store(ManifestStore {
                claim_generator: Some("mock-packager/1.0".into()),
                ..ManifestStore::default()
            })),
            "nostore" => Ok(FragmentManifest::without_store()),
            "error" => Err(EngineError::ExtractionFailed("mock extraction error".into())),
            "hang" => std::future::pending().await,
            other => match other.strip_prefix("fail:") {
                Some(code) => Ok(FragmentManifest::failing([code])),
                None => Err(EngineError::ExtractionFailed(format!("unknown script {other:?}"))),
            },
        }
    }
}

#[async_trait]
impl ManifestExtractor for MockExtractor {
    async fn extract_fragment(
        &self,
        _init_segment: Bytes,
        fragment: Bytes,
        _content_type: &str,
    ) -> EngineResult<FragmentManifest> {
        self.run(&fragment).await
    }

    async fn extract_asset(&self, asset: Bytes, _content_type: &str) -> EngineResult<FragmentManifest> {
        self.run(&asset).await
    }
}

pub fn session(extractor: Arc<MockExtractor>) -> VerificationSession {
    session_with(extractor, SessionConfig::secure_default())
}

pub fn session_with(
    extractor: Arc<MockExtractor>,
    config: SessionConfig,
) -> VerificationSession {
    init_tracing();
    VerificationSession::new(extractor, config).expect("session")
}

pub fn init(stream: &str, media_type: MediaType, representation: &str) -> FragmentEvent {
    FragmentEvent::initialization(stream, media_type, representation, Bytes::from_static(b"init"))
}

pub fn media(
    stream: &str,
    media_type: MediaType,
    representation: &str,
    start: f64,
    duration: f64,
    script: &str,
) -> FragmentEvent {
    FragmentEvent::media(stream, media_type, representation, start, duration, script.as_bytes().to_vec())
}
