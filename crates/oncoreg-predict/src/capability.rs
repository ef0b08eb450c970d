//! Trait and wire types for the external regulatory prediction model.
//!
//! One call scores one batch of variants against one reference tissue.
//! Batch-level problems surface as `ModelError`; per-variant problems come
//! back as `Unscored` outcomes so one bad variant cannot sink its batch.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use oncoreg_common::variant::Variant;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Model unavailable: {0}")]
    Unavailable(String),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Response shape mismatch: expected {expected} results, got {got}")]
    ShapeMismatch { expected: usize, got: usize },
}

impl ModelError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Timeouts, connection failures, throttling and server-side errors are
    /// transient; anything the service rejected deterministically is not.
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::Http(e) => e.is_timeout() || e.is_connect(),
            ModelError::Unavailable(_) => true,
            ModelError::RateLimitExceeded => true,
            ModelError::ApiError { status, .. } => *status == 408 || *status >= 500,
            ModelError::Serde(_) => false,
            ModelError::InvalidRequest(_) => false,
            ModelError::ShapeMismatch { .. } => false,
        }
    }
}

// ── Request / Outcome ─────────────────────────────────────────────────────────

/// One variant as submitted to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub chromosome: String,
    pub position: u64,
    pub window_start: u64,
    pub window_end: u64,
    pub reference_allele: String,
    pub alternate_allele: String,
}

impl PredictionRequest {
    pub fn for_variant(variant: &Variant) -> Self {
        Self {
            chromosome: variant.chromosome.clone(),
            position: variant.position,
            window_start: variant.genomic_window.start,
            window_end: variant.genomic_window.end,
            reference_allele: variant.reference_allele.clone(),
            alternate_allele: variant.alternate_allele.clone(),
        }
    }
}

/// One batch of variants scored against a single reference tissue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub reference_tissue: String,
    pub items: Vec<PredictionRequest>,
}

/// Per-variant outcome as reported by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VariantOutcome {
    /// Disruption signals per assay channel (e.g. "rna_seq", "atac").
    Scored { signals: HashMap<String, f64> },
    /// The model declined this variant (e.g. window outside the assembly).
    Unscored { reason: String },
}

// ── Trait ─────────────────────────────────────────────────────────────────────

/// The external regulatory prediction capability.
///
/// The returned vector has exactly one outcome per request item, in request
/// order.
#[async_trait]
pub trait RegulatoryModel: Send + Sync {
    async fn predict_batch(&self, batch: BatchRequest) -> Result<Vec<VariantOutcome>, ModelError>;
    fn model_id(&self) -> &str;
    /// Largest batch the capability accepts in one call.
    fn max_batch_size(&self) -> usize;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
