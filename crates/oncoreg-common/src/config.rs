//! Configuration for the RBI scoring pipeline.
//! Reads oncoreg.toml from the current directory or path in ONCOREG_CONFIG env var.
//!
//! Everything is carried in one explicit `RbiConfig` object handed to the
//! pipeline at construction; nothing is read from global state at runtime.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OncoregError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RbiConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub batching: BatchingConfig,
    #[serde(default)]
    pub normalisation: NormalisationConfig,
}

// ── Model endpoint ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the regulatory prediction service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key; falls back to the ONCOREG_API_KEY environment variable.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request HTTP timeout. The whole-run deadline is passed to
    /// `score()` separately by the caller.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_endpoint()             -> String { "https://api.oncoreg.dev".to_string() }
fn default_request_timeout_secs() -> u64    { 30 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ModelConfig {
    /// Configured key, else the ONCOREG_API_KEY environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ONCOREG_API_KEY").ok())
    }
}

// ── Extraction ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Minimum Phred-scaled call quality; variants below are dropped.
    #[serde(default = "default_min_quality")]
    pub min_quality: f64,
}

fn default_min_quality() -> f64 { 20.0 }

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { min_quality: default_min_quality() }
    }
}

// ── Batching ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Variants per prediction request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Batches in flight at once.
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,
    /// Retries per batch after the first attempt, transient failures only.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First retry delay; doubles per attempt up to `max_backoff_ms`.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_batch_size()             -> usize { 100 }
fn default_max_concurrent_batches() -> usize { 4 }
fn default_max_retries()            -> u32   { 3 }
fn default_initial_backoff_ms()     -> u64   { 500 }
fn default_max_backoff_ms()         -> u64   { 8_000 }

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

// ── Normalisation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalisationConfig {
    #[serde(default)]
    pub weights: SignalWeights,
    /// Absolute signal magnitude treated as fully disruptive.
    #[serde(default = "default_saturation")]
    pub saturation: f64,
    /// Effect magnitude substituted for failed or skipped variants.
    /// The scale midpoint, so missing data is not read as no disruption.
    #[serde(default = "default_neutral_effect")]
    pub neutral_effect: f64,
}

fn default_saturation()     -> f64 { 2.0 }
fn default_neutral_effect() -> f64 { 0.5 }

impl Default for NormalisationConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            saturation: default_saturation(),
            neutral_effect: default_neutral_effect(),
        }
    }
}

/// Per-channel weights for collapsing disruption signals into one magnitude.
/// Weights sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalWeights {
    /// Expression change in the reference tissue (the primary signal).
    pub rna_seq: f64,
    /// Transcription initiation (CAGE).
    pub cage: f64,
    /// Chromatin accessibility (ATAC-seq).
    pub atac: f64,
    /// DNase hypersensitivity.
    pub dnase: f64,
    /// Histone mark occupancy (ChIP-seq).
    pub chip_histone: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            rna_seq:      0.40,
            cage:         0.15,
            atac:         0.15,
            dnase:        0.15,
            chip_histone: 0.15,
        }
    }
}

impl SignalWeights {
    /// Validate that all weights are non-negative and sum to ~1.0.
    pub fn validate(&self) -> bool {
        let weights = self.channels().map(|(_, w)| w);
        weights.iter().all(|&w| w >= 0.0) && (weights.iter().sum::<f64>() - 1.0).abs() < 1e-6
    }

    /// Renormalise weights so they sum to 1.0.
    pub fn normalise(&mut self) {
        let sum: f64 = self.channels().map(|(_, w)| w).iter().sum();
        if sum > 0.0 {
            self.rna_seq      /= sum;
            self.cage         /= sum;
            self.atac         /= sum;
            self.dnase        /= sum;
            self.chip_histone /= sum;
        }
    }

    /// Channel names and weights in a fixed order, so reductions fold
    /// deterministically.
    pub fn channels(&self) -> [(&'static str, f64); 5] {
        [
            ("rna_seq",      self.rna_seq),
            ("cage",         self.cage),
            ("atac",         self.atac),
            ("dnase",        self.dnase),
            ("chip_histone", self.chip_histone),
        ]
    }
}

// ── Loading / validation ──────────────────────────────────────────────────────

impl RbiConfig {
    /// Load configuration from oncoreg.toml.
    /// Checks ONCOREG_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("ONCOREG_CONFIG")
            .unwrap_or_else(|_| "oncoreg.toml".to_string());

        if !Path::new(&path).exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy oncoreg.example.toml to oncoreg.toml and edit it.",
                path
            );
        }

        let content = std::fs::read_to_string(&path)?;
        let config: RbiConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every knob the pipeline depends on.
    pub fn validate(&self) -> Result<(), OncoregError> {
        if self.model.endpoint.trim().is_empty() {
            return Err(OncoregError::Config(
                "model.endpoint must not be empty".to_string(),
            ));
        }
        if self.model.request_timeout_secs == 0 {
            return Err(OncoregError::Config(
                "model.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.batching.batch_size == 0 {
            return Err(OncoregError::Config(
                "batching.batch_size must be at least 1".to_string(),
            ));
        }
        if self.batching.max_concurrent_batches == 0 {
            return Err(OncoregError::Config(
                "batching.max_concurrent_batches must be at least 1".to_string(),
            ));
        }
        if self.batching.initial_backoff_ms == 0
            || self.batching.max_backoff_ms < self.batching.initial_backoff_ms
        {
            return Err(OncoregError::Config(
                "batching backoff must satisfy 0 < initial_backoff_ms <= max_backoff_ms".to_string(),
            ));
        }
        if !self.extraction.min_quality.is_finite() || self.extraction.min_quality < 0.0 {
            return Err(OncoregError::Config(
                "extraction.min_quality must be a non-negative number".to_string(),
            ));
        }
        if !self.normalisation.weights.validate() {
            return Err(OncoregError::Config(
                "normalisation.weights must be non-negative and sum to 1.0".to_string(),
            ));
        }
        if !self.normalisation.saturation.is_finite() || self.normalisation.saturation <= 0.0 {
            return Err(OncoregError::Config(
                "normalisation.saturation must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.normalisation.neutral_effect) {
            return Err(OncoregError::Config(
                "normalisation.neutral_effect must lie in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
