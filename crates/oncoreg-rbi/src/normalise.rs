//! Effect normalisation: collapse per-channel disruption signals into one
//! magnitude in [0, 1].
//!
//! Total over every prediction outcome. Failed and skipped predictions get
//! the configured neutral default rather than zero, so missing data is not
//! read as evidence of no disruption.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use oncoreg_common::config::NormalisationConfig;

use crate::batch::{PredictionResult, PredictionStatus};

/// One variant's contribution to the index.
#[derive(Debug, Clone, Serialize)]
pub struct NormalisedEffect {
    pub variant_index: usize,
    /// Disruption magnitude: 0 = none detected, 1 = saturated.
    pub magnitude: f64,
    /// True when the neutral default stands in for a missing prediction.
    pub imputed: bool,
}

/// Collapse one prediction into an effect magnitude.
pub fn normalise(result: &PredictionResult, config: &NormalisationConfig) -> NormalisedEffect {
    let variant_index = result.variant_index;

    let signals = match (&result.status, &result.signals) {
        (PredictionStatus::Scored, Some(signals)) => signals,
        _ => return neutral(variant_index, config),
    };

    match weighted_magnitude(signals, config) {
        Some(raw) => NormalisedEffect {
            variant_index,
            magnitude: (raw / config.saturation).clamp(0.0, 1.0),
            imputed: false,
        },
        None => {
            warn!(variant = variant_index, "Scored prediction carried no usable signal channel");
            neutral(variant_index, config)
        }
    }
}

/// Normalise a full result set, preserving order.
pub fn normalise_all(
    results: &[PredictionResult],
    config: &NormalisationConfig,
) -> Vec<NormalisedEffect> {
    results.iter().map(|r| normalise(r, config)).collect()
}

fn neutral(variant_index: usize, config: &NormalisationConfig) -> NormalisedEffect {
    NormalisedEffect {
        variant_index,
        magnitude: config.neutral_effect,
        imputed: true,
    }
}

/// Weighted mean of absolute channel values, re-normalised over the channels
/// actually present so partial predictions are not understated. Channels are
/// folded in the fixed order given by the weight table, keeping the float
/// sum identical from run to run. Unknown channels and non-finite values
/// are ignored.
fn weighted_magnitude(signals: &HashMap<String, f64>, config: &NormalisationConfig) -> Option<f64> {
    let mut acc = 0.0;
    let mut weight_sum = 0.0;

    for (channel, weight) in config.weights.channels() {
        let Some(value) = signals.get(channel) else { continue };
        if !value.is_finite() {
            warn!(channel, value = *value, "Discarding non-finite signal");
            continue;
        }
        acc += weight * value.abs();
        weight_sum += weight;
    }

    if weight_sum > 0.0 {
        Some(acc / weight_sum)
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
