//! Variant records flowing through the scoring pipeline.
//!
//! Raw records arrive from an upstream variant-call reader with every field
//! optional; `Variant::new` enforces the invariants the rest of the pipeline
//! relies on and derives the genomic context window.

use serde::{Deserialize, Serialize};

use crate::error::OncoregError;

/// Flanking distance on each side of a variant position, in base pairs.
/// The regulatory model scores each variant inside a 1 Mb context window.
pub const WINDOW_FLANK: u64 = 500_000;

// ---------------------------------------------------------------------------
// Raw input record
// ---------------------------------------------------------------------------

/// Coding/non-coding classification attached by the upstream annotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionClass {
    Coding,
    NonCoding,
}

/// One row of a per-patient variant call file, as handed over by the reader.
///
/// Every field is optional: upstream files are messy, and a record with
/// missing fields must be skippable rather than fatal to the whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawVariantRecord {
    pub chromosome: Option<String>,
    /// 1-based genomic coordinate.
    pub position: Option<u64>,
    pub reference_allele: Option<String>,
    pub alternate_allele: Option<String>,
    pub region: Option<RegionClass>,
    /// Phred-scaled call quality.
    pub quality: Option<f64>,
}

impl RawVariantRecord {
    /// Fully populated record, the common case for well-formed input.
    pub fn new(
        chromosome: &str,
        position: u64,
        reference_allele: &str,
        alternate_allele: &str,
        region: RegionClass,
        quality: f64,
    ) -> Self {
        Self {
            chromosome: Some(chromosome.to_string()),
            position: Some(position),
            reference_allele: Some(reference_allele.to_string()),
            alternate_allele: Some(alternate_allele.to_string()),
            region: Some(region),
            quality: Some(quality),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical variant
// ---------------------------------------------------------------------------

/// Genomic interval handed to the regulatory model, 1-based inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomicWindow {
    pub start: u64,
    pub end: u64,
}

impl GenomicWindow {
    /// Window centred on `position` with `WINDOW_FLANK` on each side.
    /// The lower bound saturates at coordinate 1 near the chromosome start.
    pub fn around(position: u64) -> Self {
        let start = position.saturating_sub(WINDOW_FLANK).max(1);
        let end = position.saturating_add(WINDOW_FLANK);
        Self { start, end }
    }

    pub fn contains(&self, position: u64) -> bool {
        self.start <= position && position <= self.end
    }
}

/// A validated variant ready for prediction.
///
/// Construct through `Variant::new`; fields hold canonical values
/// (uppercased alleles, position > 0, window containing the position).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub chromosome: String,
    /// 1-based genomic coordinate, always > 0.
    pub position: u64,
    pub reference_allele: String,
    pub alternate_allele: String,
    pub genomic_window: GenomicWindow,
}

impl Variant {
    /// Validate and canonicalise one variant.
    ///
    /// Fails on an empty chromosome, position 0, empty or non-ACGTN
    /// alleles, or a reference allele equal to the alternate.
    pub fn new(
        chromosome: &str,
        position: u64,
        reference_allele: &str,
        alternate_allele: &str,
    ) -> Result<Self, OncoregError> {
        let chromosome = chromosome.trim();
        if chromosome.is_empty() {
            return Err(OncoregError::MalformedInput("empty chromosome".to_string()));
        }
        if position == 0 {
            return Err(OncoregError::MalformedInput(
                "position must be 1-based, got 0".to_string(),
            ));
        }

        let reference_allele = reference_allele.trim().to_uppercase();
        let alternate_allele = alternate_allele.trim().to_uppercase();
        if !is_valid_allele(&reference_allele) {
            return Err(OncoregError::MalformedInput(format!(
                "invalid reference allele '{reference_allele}'"
            )));
        }
        if !is_valid_allele(&alternate_allele) {
            return Err(OncoregError::MalformedInput(format!(
                "invalid alternate allele '{alternate_allele}'"
            )));
        }
        if reference_allele == alternate_allele {
            return Err(OncoregError::MalformedInput(format!(
                "reference and alternate alleles are identical ('{reference_allele}')"
            )));
        }

        Ok(Self {
            chromosome: chromosome.to_string(),
            position,
            reference_allele,
            alternate_allele,
            genomic_window: GenomicWindow::around(position),
        })
    }

    /// Deduplication identity: chromosome, position and allele pair.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}>{}",
            self.chromosome, self.position, self.reference_allele, self.alternate_allele
        )
    }
}

fn is_valid_allele(allele: &str) -> bool {
    !allele.is_empty() && allele.chars().all(|c| matches!(c, 'A' | 'C' | 'G' | 'T' | 'N'))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
