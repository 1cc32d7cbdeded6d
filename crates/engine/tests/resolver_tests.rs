use que_stream_engine as qe;
use qe::{
    FragmentManifest, InsertOutcome, ManifestKey, MediaType, SegmentManifestIndex, SessionConfig, TimeRange,
    VerificationError, VerificationResolver, Verdict,
};

fn r(start: f64, end: f64) -> TimeRange {
    TimeRange::new(start, end).unwrap()
}

fn video(rep: &str) -> ManifestKey {
    ManifestKey::new("S", MediaType::Video, rep)
}

fn audio(rep: &str) -> ManifestKey {
    ManifestKey::new("S", MediaType::Audio, rep)
}

fn resolver() -> VerificationResolver {
    VerificationResolver::new(&SessionConfig::secure_default())
}

#[test]
fn duplicate_insert_keeps_single_latest_record() {
    let mut index = SegmentManifestIndex::default();
    index.insert(video("R1"), r(0.0, 2.0), FragmentManifest::clean());
    let outcome = index.insert(video("R1"), r(0.0, 2.0), FragmentManifest::failing(["assertion.dataHash.mismatch"]));

    assert_eq!(outcome, InsertOutcome::Replaced);
    assert_eq!(index.len(), 1);
    let rec = index.search(&video("R1"), 1.0).unwrap();
    assert_eq!(rec.manifest.failure_code(), Some("assertion.dataHash.mismatch"));
}

#[test]
fn point_inside_only_interval_resolves() {
    let mut index = SegmentManifestIndex::default();
    index.insert(video("R1"), r(4.0, 6.0), FragmentManifest::clean());
    for t in [4.0, 4.5, 5.0, 5.98] {
        assert_eq!(index.search(&video("R1"), t).unwrap().interval, r(4.0, 6.0), "t = {t}");
    }
}

#[test]
fn uncovered_point_is_no_segment_found() {
    let mut index = SegmentManifestIndex::default();
    index.insert(video("R1"), r(0.0, 2.0), FragmentManifest::clean());
    assert!(matches!(index.search(&video("R1"), 2.5), Err(qe::index::LookupError::NoSegmentFound)));
    assert!(matches!(index.search(&video("R9"), 1.0), Err(qe::index::LookupError::NoSegmentFound)));
}

#[test]
fn query_window_reaches_next_fragment_near_boundary() {
    let mut index = SegmentManifestIndex::new(0.01);
    index.insert(video("R1"), r(0.0, 2.0), FragmentManifest::clean());
    index.insert(video("R1"), r(2.0, 4.0), FragmentManifest::clean());

    assert_eq!(index.search(&video("R1"), 1.98).unwrap().interval, r(0.0, 2.0));
    assert_eq!(index.search(&video("R1"), 2.0).unwrap().interval, r(2.0, 4.0));
    // [1.995, 2.005) touches both fragments.
    assert!(matches!(
        index.search(&video("R1"), 1.995),
        Err(qe::index::LookupError::AmbiguousSegments { count: 2 })
    ));
}

#[test]
fn overlapping_distinct_intervals_are_ambiguous() {
    let mut res = resolver();
    res.record_manifest(video("R1"), r(0.0, 4.0), FragmentManifest::clean());
    res.record_manifest(video("R1"), r(2.0, 6.0), FragmentManifest::clean());

    let verdict = res.query(3.0);
    assert_eq!(verdict.overall, Verdict::Indeterminate);
    assert_eq!(
        verdict.get(&MediaType::Video).unwrap().error,
        Some(VerificationError::AmbiguousSegments { count: 2 })
    );
    // Outside the overlap each interval resolves on its own.
    assert!(res.query(1.0).is_verified());
    assert!(res.query(5.0).is_verified());
}

#[test]
fn scenario_clean_fragment_verifies() {
    let mut res = resolver();
    res.record_manifest(video("R1"), r(0.0, 2.0), FragmentManifest::clean());

    let verdict = res.query(1.0);
    assert!(verdict.get(&MediaType::Video).unwrap().verified);
    assert_eq!(verdict.overall, Verdict::Verified);
}

#[test]
fn scenario_failing_reinsert_fails() {
    let mut res = resolver();
    res.record_manifest(video("R1"), r(0.0, 2.0), FragmentManifest::clean());
    res.record_manifest(video("R1"), r(0.0, 2.0), FragmentManifest::failing(["claimSignature.mismatch"]));

    let verdict = res.query(1.0);
    assert!(!verdict.get(&MediaType::Video).unwrap().verified);
    assert_eq!(verdict.overall, Verdict::Failed);
}

#[test]
fn scenario_inactive_audio_does_not_downgrade() {
    let mut res = resolver();
    res.record_manifest(video("R1"), r(0.0, 2.0), FragmentManifest::clean());

    let verdict = res.query(1.0);
    assert!(verdict.get(&MediaType::Audio).is_none());
    assert_eq!(verdict.per_type.len(), 1);
    assert_eq!(verdict.overall, Verdict::Verified);
}

#[test]
fn one_failing_type_flips_overall() {
    let mut res = resolver();
    res.record_manifest(video("R1"), r(0.0, 2.0), FragmentManifest::clean());
    res.record_manifest(audio("A1"), r(0.0, 2.0), FragmentManifest::clean());
    assert_eq!(res.query(1.0).overall, Verdict::Verified);

    res.record_manifest(audio("A1"), r(0.0, 2.0), FragmentManifest::failing(["assertion.dataHash.mismatch"]));
    let verdict = res.query(1.0);
    assert_eq!(verdict.overall, Verdict::Failed);
    assert!(verdict.get(&MediaType::Video).unwrap().verified);
}

#[test]
fn scenario_reset_then_late_insertion() {
    let mut res = resolver();
    res.record_manifest(video("R1"), r(0.0, 2.0), FragmentManifest::clean());
    res.record_manifest(video("R1"), r(2.0, 4.0), FragmentManifest::clean());

    assert_eq!(res.reset(None), 2);
    assert_eq!(
        res.query(1.0).get(&MediaType::Video).unwrap().error,
        Some(VerificationError::NoSegmentFound)
    );

    // The pending extraction for [0, 2) lands after the reset.
    res.record_manifest(video("R1"), r(0.0, 2.0), FragmentManifest::clean());
    assert!(res.query(1.0).is_verified());
    assert_eq!(res.index().len(), 1);
}

#[test]
fn whole_range_serves_every_query() {
    let mut res = resolver();
    res.record_manifest(video("main"), TimeRange::whole(), FragmentManifest::failing(["assertion.dataHash.mismatch"]));
    for t in [0.0, 10.0, 1e9] {
        assert_eq!(res.query(t).overall, Verdict::Failed);
    }
    assert_eq!(res.compromised_ranges(&MediaType::Video), vec![TimeRange::whole()]);
}

#[test]
fn verdict_carries_manifest_details() {
    let mut res = resolver();
    let manifest = FragmentManifest::with_store(qe::ManifestStore {
        claim_generator: Some("packager/2.1".into()),
        signature: Some(qe::CertInfo {
            issuer: Some("Que Test CA".into()),
            ..Default::default()
        }),
        ..Default::default()
    });
    res.record_manifest(video("R1"), r(0.0, 2.0), manifest);

    let verdict = res.query(0.5);
    let detail = verdict.get(&MediaType::Video).unwrap();
    assert_eq!(detail.claim_generator(), Some("packager/2.1"));
    assert_eq!(detail.signature_issuer(), Some("Que Test CA"));
    assert_eq!(detail.interval, Some(r(0.0, 2.0)));
    assert_eq!(verdict.time, 0.5);
}
