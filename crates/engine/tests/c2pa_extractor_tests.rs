#![cfg(feature = "c2pa")]

mod common;

use bytes::Bytes;
use que_stream_engine as qe;
use qe::{C2pa, EngineError, ManifestExtractor, MediaType, SessionConfig, Verdict};

fn ftyp_init() -> Bytes {
    let mut v = vec![0, 0, 0, 24];
    v.extend_from_slice(b"ftyp");
    v.extend_from_slice(b"iso6");
    v.extend_from_slice(&[0, 0, 0, 0]);
    v.extend_from_slice(b"isomdash");
    Bytes::from(v)
}

#[tokio::test]
async fn unsigned_fragment_has_no_store_or_errors() {
    let extractor = C2pa::new(&SessionConfig::secure_default()).unwrap();
    let fragment = Bytes::from(vec![0u8; 256]);

    // Accept either: no manifest found, or a toolkit error for malformed BMFF.
    match extractor.extract_fragment(ftyp_init(), fragment, "video/mp4").await {
        Ok(m) => assert!(m.store.is_none()),
        Err(e) => assert!(!matches!(e, EngineError::Panic(_) | EngineError::Feature(_)), "unexpected error: {e}"),
    }
}

#[tokio::test]
async fn unsigned_asset_has_no_store_or_errors() {
    let extractor = C2pa::new(&SessionConfig::secure_default()).unwrap();
    let mut data = vec![0xFF, 0xD8, 0xFF];
    data.resize(1024, 0u8);

    match extractor.extract_asset(Bytes::from(data), "image/jpeg").await {
        Ok(m) => assert!(m.store.is_none()),
        Err(e) => assert!(matches!(e, EngineError::C2pa(_)), "unexpected error: {e}"),
    }
}

#[cfg(not(feature = "remote_manifests"))]
#[test]
fn remote_manifests_feature_gate_enforced() {
    let mut cfg = SessionConfig::secure_default();
    cfg.allow_remote_manifests = true;
    let err = C2pa::new(&cfg).unwrap_err();
    assert!(matches!(err, EngineError::Feature("remote_manifests")));
}

#[tokio::test]
async fn c2pa_session_never_indexes_failed_extractions() {
    common::init_tracing();
    let session = qe::c2pa_session(SessionConfig::secure_default()).unwrap();
    session
        .on_fragment_arrived(qe::FragmentEvent::initialization("S", MediaType::Video, "R1", ftyp_init()))
        .unwrap();
    session
        .on_fragment_arrived(qe::FragmentEvent::media("S", MediaType::Video, "R1", 0.0, 2.0, vec![0u8; 128]))
        .unwrap();
    let summary = session.settled().await;
    assert_eq!(summary.inserted + summary.failed, 1);

    // Either way an unsigned fragment never verifies.
    assert_ne!(session.query(1.0).overall, Verdict::Verified);
}
