//! Variant extraction: raw call records in, validated non-coding variants out.
//!
//! Record-level problems never abort a run. Each dropped record is counted
//! by reason; malformed records additionally leave a warning in the summary.
//! Only an empty survivor set is fatal, because the index is undefined
//! without variants.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use oncoreg_common::config::ExtractionConfig;
use oncoreg_common::error::{OncoregError, Result};
use oncoreg_common::variant::{RawVariantRecord, RegionClass, Variant};

// ── Summary ───────────────────────────────────────────────────────────────────

/// Per-reason accounting for one extraction pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionSummary {
    pub n_input: usize,
    pub n_kept: usize,
    pub n_malformed: usize,
    pub n_coding: usize,
    pub n_low_quality: usize,
    pub n_duplicate: usize,
    /// One warning per malformed record, with its input index.
    pub warnings: Vec<String>,
}

// ── Extractor ─────────────────────────────────────────────────────────────────

enum Dropped {
    Malformed(String),
    Coding,
    LowQuality(f64),
    Duplicate,
}

/// Filter raw records down to analyzable variants, preserving input order.
///
/// Drops records that are malformed, fall in a coding region, sit below
/// the quality floor, or repeat an already-seen (chromosome, position,
/// ref, alt) identity (first occurrence wins).
pub fn extract(
    records: &[RawVariantRecord],
    config: &ExtractionConfig,
) -> Result<(Vec<Variant>, ExtractionSummary)> {
    let mut summary = ExtractionSummary { n_input: records.len(), ..Default::default() };
    let mut seen: HashSet<String> = HashSet::new();
    let mut variants = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        match screen(record, config, &mut seen) {
            Ok(variant) => {
                summary.n_kept += 1;
                variants.push(variant);
            }
            Err(Dropped::Malformed(reason)) => {
                summary.n_malformed += 1;
                let msg = format!("record {idx} dropped: {reason}");
                warn!("{}", &msg);
                summary.warnings.push(msg);
            }
            Err(Dropped::Coding) => {
                summary.n_coding += 1;
                debug!(record = idx, "Coding variant excluded");
            }
            Err(Dropped::LowQuality(quality)) => {
                summary.n_low_quality += 1;
                debug!(record = idx, quality, min = config.min_quality, "Low-quality variant excluded");
            }
            Err(Dropped::Duplicate) => {
                summary.n_duplicate += 1;
                debug!(record = idx, "Duplicate variant excluded");
            }
        }
    }

    if variants.is_empty() {
        return Err(OncoregError::NoVariants);
    }
    Ok((variants, summary))
}

fn screen(
    record: &RawVariantRecord,
    config: &ExtractionConfig,
    seen: &mut HashSet<String>,
) -> std::result::Result<Variant, Dropped> {
    let chromosome = record
        .chromosome
        .as_deref()
        .ok_or_else(|| Dropped::Malformed("missing chromosome".to_string()))?;
    let position = record
        .position
        .ok_or_else(|| Dropped::Malformed("missing position".to_string()))?;
    let reference = record
        .reference_allele
        .as_deref()
        .ok_or_else(|| Dropped::Malformed("missing reference allele".to_string()))?;
    let alternate = record
        .alternate_allele
        .as_deref()
        .ok_or_else(|| Dropped::Malformed("missing alternate allele".to_string()))?;
    let region = record
        .region
        .ok_or_else(|| Dropped::Malformed("missing region classification".to_string()))?;
    let quality = record
        .quality
        .ok_or_else(|| Dropped::Malformed("missing quality".to_string()))?;

    if !quality.is_finite() {
        return Err(Dropped::Malformed(format!("quality is not a number ({quality})")));
    }
    if region == RegionClass::Coding {
        return Err(Dropped::Coding);
    }
    if quality < config.min_quality {
        return Err(Dropped::LowQuality(quality));
    }

    let variant = Variant::new(chromosome, position, reference, alternate).map_err(|e| match e {
        OncoregError::MalformedInput(reason) => Dropped::Malformed(reason),
        other => Dropped::Malformed(other.to_string()),
    })?;

    if !seen.insert(variant.key()) {
        return Err(Dropped::Duplicate);
    }
    Ok(variant)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
