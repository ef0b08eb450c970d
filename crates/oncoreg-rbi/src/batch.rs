//! Batched prediction dispatch.
//!
//! Chunks variants into fixed-size batches, runs them against the model on a
//! bounded worker pool, retries transient failures with exponential backoff,
//! and reassembles per-variant results in submission order regardless of
//! batch completion order.
//!
//! This is the pipeline's only suspension point and the only place that
//! performs I/O.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, instrument, warn};

use oncoreg_common::config::BatchingConfig;
use oncoreg_common::tissue::TissueContext;
use oncoreg_common::variant::Variant;
use oncoreg_predict::capability::{
    BatchRequest, PredictionRequest, RegulatoryModel, VariantOutcome,
};

// ── Results ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    /// The model returned disruption signals.
    Scored,
    /// Batch-level failure after retries, or the run deadline hit first.
    Failed,
    /// The model declined this specific variant.
    Skipped,
}

/// Outcome for one submitted variant, keyed back by its extraction index.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub variant_index: usize,
    pub status: PredictionStatus,
    pub signals: Option<HashMap<String, f64>>,
}

// ── Retry policy ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    fn from_config(config: &BatchingConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// Score all variants against the model; one result per variant, in input
/// order. Never errors: batch failures and deadline expiry surface as
/// `Failed` statuses on the affected variants.
#[instrument(skip(model, variants, tissue, config, deadline), fields(n_variants = variants.len()))]
pub async fn submit(
    model: Arc<dyn RegulatoryModel>,
    variants: &[Variant],
    tissue: &TissueContext,
    config: &BatchingConfig,
    deadline: Instant,
) -> Vec<PredictionResult> {
    let mut results: Vec<PredictionResult> = (0..variants.len())
        .map(|i| PredictionResult {
            variant_index: i,
            status: PredictionStatus::Failed,
            signals: None,
        })
        .collect();
    if variants.is_empty() {
        return results;
    }

    let batch_size = config.batch_size.min(model.max_batch_size()).max(1);

    // Payloads own everything so batch tasks need no borrow of the input.
    let jobs: Vec<(usize, BatchRequest)> = variants
        .chunks(batch_size)
        .enumerate()
        .map(|(n, chunk)| {
            let items = chunk.iter().map(PredictionRequest::for_variant).collect();
            let request = BatchRequest {
                reference_tissue: tissue.reference_tissue.clone(),
                items,
            };
            (n * batch_size, request)
        })
        .collect();

    let n_batches = jobs.len();
    let retry = RetryPolicy::from_config(config);
    debug!(n_batches, batch_size, "Dispatching prediction batches");

    let mut pending = jobs.into_iter();
    let mut in_flight: JoinSet<(usize, BatchOutcome)> = JoinSet::new();
    for (offset, request) in pending.by_ref().take(config.max_concurrent_batches.max(1)) {
        spawn_batch(&mut in_flight, &model, retry, offset, request);
    }

    let mut completed = 0usize;
    loop {
        match timeout_at(deadline, in_flight.join_next()).await {
            Ok(Some(Ok((offset, outcome)))) => {
                completed += 1;
                apply_outcome(&mut results, offset, outcome);
                if let Some((offset, request)) = pending.next() {
                    spawn_batch(&mut in_flight, &model, retry, offset, request);
                }
            }
            Ok(Some(Err(join_error))) => {
                warn!(error = %join_error, "Prediction batch task aborted");
                if let Some((offset, request)) = pending.next() {
                    spawn_batch(&mut in_flight, &model, retry, offset, request);
                }
            }
            Ok(None) => break,
            Err(_) => {
                warn!(completed, total = n_batches, "Deadline reached, abandoning in-flight batches");
                in_flight.abort_all();
                break;
            }
        }
    }

    results
}

enum BatchOutcome {
    /// Per-item outcomes, same order as the request.
    Completed(Vec<VariantOutcome>),
    /// The whole batch failed; its variants stay `Failed`.
    Failed,
}

fn spawn_batch(
    in_flight: &mut JoinSet<(usize, BatchOutcome)>,
    model: &Arc<dyn RegulatoryModel>,
    retry: RetryPolicy,
    offset: usize,
    request: BatchRequest,
) {
    let model = Arc::clone(model);
    in_flight.spawn(async move { (offset, run_batch(model, request, retry).await) });
}

/// Run one batch with retries. Transient failures back off exponentially,
/// doubling up to the cap; anything else fails the batch immediately.
async fn run_batch(
    model: Arc<dyn RegulatoryModel>,
    request: BatchRequest,
    retry: RetryPolicy,
) -> BatchOutcome {
    let expected = request.items.len();
    let mut attempt: u32 = 0;
    let mut backoff = retry.initial_backoff;

    loop {
        attempt += 1;
        match model.predict_batch(request.clone()).await {
            Ok(outcomes) if outcomes.len() == expected => {
                return BatchOutcome::Completed(outcomes);
            }
            Ok(outcomes) => {
                warn!(expected, got = outcomes.len(), "Model returned wrong result count, failing batch");
                return BatchOutcome::Failed;
            }
            Err(e) if e.is_transient() && attempt <= retry.max_retries => {
                warn!(
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Transient batch failure, retrying"
                );
                sleep(backoff).await;
                backoff = (backoff * 2).min(retry.max_backoff);
            }
            Err(e) => {
                warn!(attempt, error = %e, "Batch failed");
                return BatchOutcome::Failed;
            }
        }
    }
}

fn apply_outcome(results: &mut [PredictionResult], offset: usize, outcome: BatchOutcome) {
    let BatchOutcome::Completed(outcomes) = outcome else {
        return;
    };
    for (slot, item) in results[offset..].iter_mut().zip(outcomes) {
        match item {
            VariantOutcome::Scored { signals } => {
                slot.status = PredictionStatus::Scored;
                slot.signals = Some(signals);
            }
            VariantOutcome::Unscored { reason } => {
                slot.status = PredictionStatus::Skipped;
                debug!(variant = slot.variant_index, reason = %reason, "Variant skipped by model");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
