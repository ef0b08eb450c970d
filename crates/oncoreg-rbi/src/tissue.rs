//! Cancer type to reference tissue resolution.

use oncoreg_common::error::Result;
use oncoreg_common::tissue::{CancerType, TissueContext};

/// Resolve a caller-supplied cancer-type label to its reference tissue.
///
/// Pure table lookup, resolved once per run before any prediction request
/// is issued; unknown labels fail fast.
pub fn resolve(label: &str) -> Result<TissueContext> {
    let cancer_type: CancerType = label.parse()?;
    Ok(TissueContext::for_cancer_type(cancer_type))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
