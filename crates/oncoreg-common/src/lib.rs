//! oncoreg-common — Shared types, errors, and configuration used across all OncoReg crates.

pub mod error;
pub mod variant;
pub mod tissue;
pub mod config;

// Re-export commonly used types
pub use error::{OncoregError, Result};
pub use variant::{GenomicWindow, RawVariantRecord, RegionClass, Variant};
pub use tissue::{CancerType, TissueContext};
pub use config::RbiConfig;
