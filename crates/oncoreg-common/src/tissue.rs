//! Cancer-type labels and the reference tissue used for regulatory prediction.
//!
//! Predictions are tissue-specific, so every supported cancer type maps to a
//! curated UBERON term; unknown labels are rejected before any network call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OncoregError;

// ---------------------------------------------------------------------------
// Cancer type
// ---------------------------------------------------------------------------

/// Cancer types with a curated reference tissue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancerType {
    Breast,
    Lung,
    Colon,
    Prostate,
    Ovarian,
}

impl CancerType {
    pub const ALL: [CancerType; 5] = [
        CancerType::Breast,
        CancerType::Lung,
        CancerType::Colon,
        CancerType::Prostate,
        CancerType::Ovarian,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CancerType::Breast   => "breast",
            CancerType::Lung     => "lung",
            CancerType::Colon    => "colon",
            CancerType::Prostate => "prostate",
            CancerType::Ovarian  => "ovarian",
        }
    }

    /// UBERON term of the tissue whose regulatory landscape stands in for
    /// this cancer type.
    pub fn reference_tissue(&self) -> &'static str {
        match self {
            CancerType::Breast   => "UBERON:0008367",  // breast epithelium
            CancerType::Lung     => "UBERON:0002048",  // lung
            CancerType::Colon    => "UBERON:0001157",  // transverse colon
            CancerType::Prostate => "UBERON:0002367",  // prostate gland
            CancerType::Ovarian  => "UBERON:0000992",  // ovary
        }
    }

    /// Comma-separated supported labels, for error messages.
    pub fn supported_labels() -> String {
        CancerType::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for CancerType {
    type Err = OncoregError;

    /// Case-insensitive label lookup.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breast"   => Ok(CancerType::Breast),
            "lung"     => Ok(CancerType::Lung),
            "colon"    => Ok(CancerType::Colon),
            "prostate" => Ok(CancerType::Prostate),
            "ovarian"  => Ok(CancerType::Ovarian),
            _ => Err(OncoregError::UnsupportedCancerType {
                label: s.to_string(),
                supported: CancerType::supported_labels(),
            }),
        }
    }
}

impl fmt::Display for CancerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tissue context
// ---------------------------------------------------------------------------

/// Resolved tissue context for one scoring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TissueContext {
    pub cancer_type: CancerType,
    pub reference_tissue: String,
}

impl TissueContext {
    pub fn for_cancer_type(cancer_type: CancerType) -> Self {
        Self {
            cancer_type,
            reference_tissue: cancer_type.reference_tissue().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
