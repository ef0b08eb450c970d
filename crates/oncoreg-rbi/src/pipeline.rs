//! End-to-end RBI scoring pipeline.
//!
//! Orchestrates the full flow for a single patient run and assembles the
//! per-run report. Everything downstream of the prediction model is pure,
//! so identical inputs always produce identical indices.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use oncoreg_common::config::RbiConfig;
use oncoreg_common::error::{OncoregError, Result};
use oncoreg_common::tissue::CancerType;
use oncoreg_common::variant::{RawVariantRecord, Variant};
use oncoreg_predict::capability::RegulatoryModel;

use crate::aggregate::{aggregate, RegulatoryBurdenIndex};
use crate::batch::{submit, PredictionResult, PredictionStatus};
use crate::extract::{extract, ExtractionSummary};
use crate::normalise::{normalise_all, NormalisedEffect};
use crate::tissue::resolve;

// ── Report ────────────────────────────────────────────────────────────────────

/// Full accounting for one scoring run.
#[derive(Debug, Clone, Serialize)]
pub struct RbiReport {
    pub run_id: Uuid,
    pub cancer_type: CancerType,
    pub reference_tissue: String,
    pub rbi: RegulatoryBurdenIndex,
    /// Sum of effect magnitudes before the count correction.
    pub total_burden: f64,
    pub n_input_records: usize,
    pub n_variants: usize,
    pub n_scored: usize,
    pub n_failed: usize,
    pub n_skipped: usize,
    pub extraction: ExtractionSummary,
    pub effects: Vec<VariantEffect>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Per-variant row of the report.
#[derive(Debug, Clone, Serialize)]
pub struct VariantEffect {
    pub chromosome: String,
    pub position: u64,
    pub reference_allele: String,
    pub alternate_allele: String,
    pub status: PredictionStatus,
    pub magnitude: f64,
    pub imputed: bool,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// RBI scoring pipeline bound to one prediction model and one configuration.
pub struct RbiPipeline {
    model: Arc<dyn RegulatoryModel>,
    config: RbiConfig,
}

impl RbiPipeline {
    /// Validates the configuration up front so a bad config fails at
    /// construction, not mid-run.
    pub fn new(model: Arc<dyn RegulatoryModel>, config: RbiConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { model, config })
    }

    /// Score one patient: raw variant records and a cancer-type label in,
    /// one bounded index out.
    ///
    /// `timeout` bounds the whole run. Batches still pending at the deadline
    /// are abandoned and their variants fall back to the neutral default; if
    /// nothing scored at all, the run fails with `PredictionUnavailable`.
    pub async fn score(
        &self,
        records: &[RawVariantRecord],
        cancer_type: &str,
        timeout: Duration,
    ) -> Result<RegulatoryBurdenIndex> {
        Ok(self.score_detailed(records, cancer_type, timeout).await?.rbi)
    }

    /// As `score`, returning the full per-run accounting.
    #[instrument(skip(self, records), fields(n_records = records.len()))]
    pub async fn score_detailed(
        &self,
        records: &[RawVariantRecord],
        cancer_type: &str,
        timeout: Duration,
    ) -> Result<RbiReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let t0 = std::time::Instant::now();
        let deadline = tokio::time::Instant::now() + timeout;

        info!(
            run_id = %run_id,
            cancer_type,
            model = self.model.model_id(),
            "Starting RBI scoring run"
        );

        // ── 1. Tissue resolution ─────────────────────────────────────────────
        let tissue = resolve(cancer_type)?;

        // ── 2. Variant extraction ────────────────────────────────────────────
        let (variants, extraction) = extract(records, &self.config.extraction)?;
        info!(
            run_id = %run_id,
            kept        = extraction.n_kept,
            malformed   = extraction.n_malformed,
            coding      = extraction.n_coding,
            low_quality = extraction.n_low_quality,
            duplicate   = extraction.n_duplicate,
            "Variants extracted"
        );

        // ── 3. Batched prediction ────────────────────────────────────────────
        let results = submit(
            Arc::clone(&self.model),
            &variants,
            &tissue,
            &self.config.batching,
            deadline,
        )
        .await;

        let n_scored  = count(&results, PredictionStatus::Scored);
        let n_failed  = count(&results, PredictionStatus::Failed);
        let n_skipped = count(&results, PredictionStatus::Skipped);

        if n_scored == 0 {
            warn!(run_id = %run_id, n_failed, n_skipped, "No variant received a prediction");
            return Err(OncoregError::PredictionUnavailable { n_variants: variants.len() });
        }
        if n_failed + n_skipped > 0 {
            warn!(run_id = %run_id, n_failed, n_skipped, "Degraded run, neutral default substituted");
        }

        // ── 4. Normalise + aggregate ─────────────────────────────────────────
        let effects = normalise_all(&results, &self.config.normalisation);
        let rbi = aggregate(&effects)?;
        let total_burden: f64 = effects.iter().map(|e| e.magnitude).sum();

        let report = RbiReport {
            run_id,
            cancer_type: tissue.cancer_type,
            reference_tissue: tissue.reference_tissue.clone(),
            rbi,
            total_burden,
            n_input_records: records.len(),
            n_variants: variants.len(),
            n_scored,
            n_failed,
            n_skipped,
            extraction,
            effects: effect_rows(&variants, &results, &effects),
            started_at,
            duration_ms: t0.elapsed().as_millis() as u64,
        };

        info!(
            run_id      = %run_id,
            rbi         = %report.rbi,
            n_variants  = report.n_variants,
            n_scored,
            n_failed,
            n_skipped,
            duration_ms = report.duration_ms,
            "RBI scoring run complete"
        );

        Ok(report)
    }
}

fn count(results: &[PredictionResult], status: PredictionStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}

fn effect_rows(
    variants: &[Variant],
    results: &[PredictionResult],
    effects: &[NormalisedEffect],
) -> Vec<VariantEffect> {
    variants
        .iter()
        .zip(results)
        .zip(effects)
        .map(|((variant, result), effect)| VariantEffect {
            chromosome: variant.chromosome.clone(),
            position: variant.position,
            reference_allele: variant.reference_allele.clone(),
            alternate_allele: variant.alternate_allele.clone(),
            status: result.status,
            magnitude: effect.magnitude,
            imputed: effect.imputed,
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
