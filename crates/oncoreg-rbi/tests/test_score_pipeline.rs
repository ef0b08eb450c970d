//! Pipeline-level tests driven by the scripted mock model.
//!
//! Everything here exercises the public `RbiPipeline` surface end to end:
//! extraction, tissue resolution, batched dispatch, normalisation and
//! aggregation, with no network involved.

use std::sync::Arc;
use std::time::Duration;

use oncoreg_common::config::RbiConfig;
use oncoreg_common::error::OncoregError;
use oncoreg_common::variant::{RawVariantRecord, RegionClass};
use oncoreg_predict::capability::ModelError;
use oncoreg_predict::mock::MockRegulatoryModel;
use oncoreg_rbi::RbiPipeline;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn record(chromosome: &str, position: u64) -> RawVariantRecord {
    RawVariantRecord::new(chromosome, position, "A", "T", RegionClass::NonCoding, 60.0)
}

fn fast_config() -> RbiConfig {
    let mut config = RbiConfig::default();
    config.batching.initial_backoff_ms = 1;
    config.batching.max_backoff_ms = 4;
    config
}

const RUN_TIMEOUT: Duration = Duration::from_secs(10);

// ── Determinism and ordering ──────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_same_input_scores_identically() {
    init_logging();
    let mock = Arc::new(
        MockRegulatoryModel::new()
            .with_signals("chr1", 1_000, &[("rna_seq", 0.8)])
            .with_signals("chr1", 2_000, &[("rna_seq", 0.2), ("atac", 1.4)])
            .with_signals("chr2", 5_000, &[("cage", 0.6)]),
    );
    let pipeline = RbiPipeline::new(mock.clone(), fast_config()).unwrap();
    let records = vec![record("chr1", 1_000), record("chr1", 2_000), record("chr2", 5_000)];

    let first = pipeline.score(&records, "breast", RUN_TIMEOUT).await.unwrap();
    let second = pipeline.score(&records, "breast", RUN_TIMEOUT).await.unwrap();

    assert_eq!(first.value(), second.value());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_variant_order_does_not_change_the_index() {
    init_logging();
    let mock = Arc::new(
        MockRegulatoryModel::new()
            .with_signals("chr1", 1_000, &[("rna_seq", 0.9)])
            .with_signals("chr1", 2_000, &[("rna_seq", 0.3)])
            .with_signals("chr2", 5_000, &[("rna_seq", 1.7)])
            .with_signals("chr3", 7_000, &[("rna_seq", 0.05)]),
    );
    let pipeline = RbiPipeline::new(mock.clone(), fast_config()).unwrap();

    let forward = vec![
        record("chr1", 1_000),
        record("chr1", 2_000),
        record("chr2", 5_000),
        record("chr3", 7_000),
    ];
    let shuffled = vec![
        record("chr2", 5_000),
        record("chr3", 7_000),
        record("chr1", 1_000),
        record("chr1", 2_000),
    ];

    let a = pipeline.score(&forward, "lung", RUN_TIMEOUT).await.unwrap();
    let b = pipeline.score(&shuffled, "lung", RUN_TIMEOUT).await.unwrap();

    assert_eq!(a.value(), b.value());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stronger_disruption_never_lowers_the_index() {
    init_logging();
    let records = vec![record("chr1", 1_000), record("chr1", 2_000)];

    let weak = Arc::new(
        MockRegulatoryModel::new()
            .with_signals("chr1", 1_000, &[("rna_seq", 0.4)])
            .with_signals("chr1", 2_000, &[("rna_seq", 0.6)]),
    );
    let strong = Arc::new(
        MockRegulatoryModel::new()
            .with_signals("chr1", 1_000, &[("rna_seq", 1.4)])
            .with_signals("chr1", 2_000, &[("rna_seq", 0.6)]),
    );

    let low = RbiPipeline::new(weak, fast_config())
        .unwrap()
        .score(&records, "colon", RUN_TIMEOUT)
        .await
        .unwrap();
    let high = RbiPipeline::new(strong, fast_config())
        .unwrap()
        .score(&records, "colon", RUN_TIMEOUT)
        .await
        .unwrap();

    assert!(high.value() >= low.value());
}

// ── Partial failure ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_one_lost_variant_shifts_the_index_by_its_share_of_the_mean() {
    init_logging();
    let records: Vec<RawVariantRecord> =
        (0..5).map(|i| record("chr4", 1_000 + i * 100)).collect();

    // Every variant scores |1.6| / 2.0 = 0.8
    let mut healthy = MockRegulatoryModel::new();
    let mut degraded = MockRegulatoryModel::new();
    for i in 0..5u64 {
        healthy = healthy.with_signals("chr4", 1_000 + i * 100, &[("rna_seq", 1.6)]);
        degraded = degraded.with_signals("chr4", 1_000 + i * 100, &[("rna_seq", 1.6)]);
    }
    let degraded = degraded.with_unscorable("chr4", 1_200, "low coverage");

    let baseline = RbiPipeline::new(Arc::new(healthy), fast_config())
        .unwrap()
        .score(&records, "ovarian", RUN_TIMEOUT)
        .await
        .unwrap();
    let report = RbiPipeline::new(Arc::new(degraded), fast_config())
        .unwrap()
        .score_detailed(&records, "ovarian", RUN_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(report.n_scored, 4);
    assert_eq!(report.n_skipped, 1);

    // The lost variant's 0.8 is replaced by the 0.5 neutral default,
    // moving the mean by exactly (0.8 - 0.5) / 5.
    let expected_delta = (0.8 - 0.5) / 5.0;
    let delta = baseline.value() - report.rbi.value();
    assert!((delta - expected_delta).abs() < 1e-9);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_fails_when_no_variant_scores_at_all() {
    init_logging();
    // No scripted outcomes and no uniform fallback: everything is unscored.
    let mock = Arc::new(MockRegulatoryModel::new());
    let pipeline = RbiPipeline::new(mock.clone(), fast_config()).unwrap();
    let records = vec![record("chr1", 1_000), record("chr1", 2_000)];

    let err = pipeline.score(&records, "breast", RUN_TIMEOUT).await.unwrap_err();

    match err {
        OncoregError::PredictionUnavailable { n_variants } => assert_eq!(n_variants, 2),
        other => panic!("unexpected error: {other}"),
    }
}

// ── Input rejection ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_input_is_rejected() {
    init_logging();
    let mock = Arc::new(MockRegulatoryModel::new().with_uniform_signal("rna_seq", 1.0));
    let pipeline = RbiPipeline::new(mock.clone(), fast_config()).unwrap();

    let err = pipeline.score(&[], "lung", RUN_TIMEOUT).await.unwrap_err();

    assert!(matches!(err, OncoregError::NoVariants));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unsupported_cancer_type_never_reaches_the_model() {
    init_logging();
    let mock = Arc::new(MockRegulatoryModel::new().with_uniform_signal("rna_seq", 1.0));
    let pipeline = RbiPipeline::new(mock.clone(), fast_config()).unwrap();
    let records = vec![record("chr1", 1_000)];

    let err = pipeline.score(&records, "pancreatic", RUN_TIMEOUT).await.unwrap_err();

    assert!(matches!(err, OncoregError::UnsupportedCancerType { .. }));
    assert!(err.to_string().contains("breast"));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dirty_records_are_filtered_and_accounted_for() {
    init_logging();
    let mock = Arc::new(MockRegulatoryModel::new().with_uniform_signal("rna_seq", 1.0));
    let pipeline = RbiPipeline::new(mock.clone(), fast_config()).unwrap();

    let records = vec![
        record("chr1", 1_000),
        RawVariantRecord { position: None, ..record("chr1", 2_000) },
        RawVariantRecord::new("chr1", 3_000, "A", "T", RegionClass::Coding, 60.0),
        RawVariantRecord::new("chr1", 4_000, "A", "T", RegionClass::NonCoding, 2.0),
        record("chr1", 1_000),
        record("chr5", 9_000),
    ];

    let report = pipeline
        .score_detailed(&records, "prostate", RUN_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(report.n_input_records, 6);
    assert_eq!(report.n_variants, 2);
    assert_eq!(report.extraction.n_malformed, 1);
    assert_eq!(report.extraction.n_coding, 1);
    assert_eq!(report.extraction.n_low_quality, 1);
    assert_eq!(report.extraction.n_duplicate, 1);
    assert_eq!(report.extraction.warnings.len(), 1);
    assert_eq!(report.effects.len(), 2);
}

// ── Batching ──────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_batches_reassemble_in_submission_order() {
    init_logging();
    let mut mock = MockRegulatoryModel::new();
    for i in 0..250u64 {
        let value = i as f64 / 250.0;
        mock = mock.with_signals("chr7", 10_000 + i * 10, &[("rna_seq", value)]);
    }
    // Delay the first two batches so the third answers first.
    let mock = Arc::new(
        mock.with_delay_for("chr7", 10_000, Duration::from_millis(120))
            .with_delay_for("chr7", 11_000, Duration::from_millis(60)),
    );
    let pipeline = RbiPipeline::new(mock.clone(), fast_config()).unwrap();

    let records: Vec<RawVariantRecord> =
        (0..250).map(|i| record("chr7", 10_000 + i * 10)).collect();
    let report = pipeline
        .score_detailed(&records, "colon", RUN_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(mock.call_count(), 3);
    let mut sizes = mock.batch_sizes();
    sizes.sort();
    assert_eq!(sizes, vec![50, 100, 100]);

    assert_eq!(report.n_variants, 250);
    assert_eq!(report.n_scored, 250);
    for (i, effect) in report.effects.iter().enumerate() {
        assert_eq!(effect.position, 10_000 + i as u64 * 10, "variant {i} out of place");
        let expected = (i as f64 / 250.0) / 2.0;
        assert!((effect.magnitude - expected).abs() < 1e-9, "variant {i} has the wrong effect");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transient_failures_are_retried_to_success() {
    init_logging();
    let mock = Arc::new(
        MockRegulatoryModel::new()
            .with_uniform_signal("rna_seq", 1.0)
            .with_scripted_failure(ModelError::RateLimitExceeded)
            .with_scripted_failure(ModelError::Unavailable("warming up".to_string())),
    );
    let pipeline = RbiPipeline::new(mock.clone(), fast_config()).unwrap();

    let rbi = pipeline
        .score(&[record("chr1", 500)], "prostate", RUN_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(mock.call_count(), 3);
    // Uniform rna_seq 1.0 normalises to |1.0| / 2.0
    assert!((rbi.value() - 0.5).abs() < 1e-9);
}

// ── Deadlines ─────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_expired_deadline_with_nothing_scored_is_an_error() {
    init_logging();
    let mock = Arc::new(
        MockRegulatoryModel::new()
            .with_uniform_signal("rna_seq", 1.0)
            .with_delay_for("chr1", 500, Duration::from_secs(30)),
    );
    let pipeline = RbiPipeline::new(mock.clone(), fast_config()).unwrap();

    let err = pipeline
        .score(&[record("chr1", 500)], "ovarian", Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, OncoregError::PredictionUnavailable { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deadline_degrades_pending_batches_to_the_neutral_default() {
    init_logging();
    let mock = Arc::new(
        MockRegulatoryModel::new()
            .with_signals("chr1", 1_000, &[("rna_seq", 1.8)])
            .with_signals("chr1", 2_000, &[("rna_seq", 1.8)])
            .with_delay_for("chr1", 2_000, Duration::from_secs(30)),
    );
    let mut config = fast_config();
    config.batching.batch_size = 1;
    let pipeline = RbiPipeline::new(mock.clone(), config).unwrap();

    let records = vec![record("chr1", 1_000), record("chr1", 2_000)];
    let report = pipeline
        .score_detailed(&records, "breast", Duration::from_millis(400))
        .await
        .unwrap();

    assert_eq!(report.n_scored, 1);
    assert_eq!(report.n_failed, 1);
    assert!(report.effects[1].imputed);
    // (1.8 / 2.0 + 0.5) / 2
    assert!((report.rbi.value() - 0.7).abs() < 1e-9);
}

// ── Report shape ──────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_report_totals_are_consistent_with_the_index() {
    init_logging();
    let mock = Arc::new(
        MockRegulatoryModel::new()
            .with_signals("chr2", 1_000, &[("rna_seq", 0.4)])
            .with_signals("chr2", 2_000, &[("rna_seq", 1.2)])
            .with_signals("chr2", 3_000, &[("rna_seq", 2.4)]),
    );
    let pipeline = RbiPipeline::new(mock.clone(), fast_config()).unwrap();
    let records = vec![record("chr2", 1_000), record("chr2", 2_000), record("chr2", 3_000)];

    let report = pipeline
        .score_detailed(&records, "lung", RUN_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(report.cancer_type.as_str(), "lung");
    assert_eq!(report.reference_tissue, "UBERON:0002048");
    assert_eq!(report.n_variants, 3);
    // 0.2 + 0.6 + 1.0 (the last saturates)
    assert!((report.total_burden - 1.8).abs() < 1e-9);
    assert!((report.rbi.value() - report.total_burden / 3.0).abs() < 1e-9);
    assert!((0.0..=1.0).contains(&report.rbi.value()));
}
