//! Index aggregation: one bounded scalar from many per-variant effects.

use std::fmt;

use serde::{Deserialize, Serialize};

use oncoreg_common::error::{OncoregError, Result};

use crate::normalise::NormalisedEffect;

/// The patient-level Regulatory Burden Index, in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryBurdenIndex(pub f64);

impl RegulatoryBurdenIndex {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for RegulatoryBurdenIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// Mean effect magnitude across all variants.
///
/// Magnitudes are summed in ascending value order, so the float sum (and
/// therefore the index) is identical for every permutation of the input.
/// The mean keeps variant-rich patients from being inflated by count alone.
/// Empty input is an error: an index over nothing is undefined, not zero.
pub fn aggregate(effects: &[NormalisedEffect]) -> Result<RegulatoryBurdenIndex> {
    if effects.is_empty() {
        return Err(OncoregError::NoVariants);
    }

    let mut magnitudes: Vec<f64> = effects.iter().map(|e| e.magnitude).collect();
    magnitudes.sort_by(f64::total_cmp);

    let sum: f64 = magnitudes.iter().sum();
    let mean = sum / magnitudes.len() as f64;
    Ok(RegulatoryBurdenIndex(mean.clamp(0.0, 1.0)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
