//! oncoreg-rbi — Regulatory Burden Index scoring pipeline.
//!
//! Stages for a single patient run:
//!   1. Resolve the cancer-type label to its reference regulatory tissue
//!   2. Extract analyzable non-coding variants from raw call records
//!   3. Submit variants to the prediction model in bounded concurrent batches
//!   4. Collapse per-variant disruption signals into one normalised magnitude
//!   5. Aggregate magnitudes into the patient-level index
//!
//! The pipeline never touches the network outside stage 3, and stage 3 only
//! talks through the `RegulatoryModel` trait, so the whole flow runs against
//! the mock model in tests.

pub mod extract;
pub mod tissue;
pub mod batch;
pub mod normalise;
pub mod aggregate;
pub mod pipeline;

pub use aggregate::RegulatoryBurdenIndex;
pub use pipeline::{RbiPipeline, RbiReport};
