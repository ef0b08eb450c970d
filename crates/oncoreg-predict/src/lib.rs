//! oncoreg-predict — Regulatory model capability boundary.
//!
//! The scoring pipeline talks to the external prediction model only through
//! the `RegulatoryModel` trait defined here.
//!
//! Implementations:
//!   HttpRegulatoryModel — JSON/REST client for a hosted service
//!   MockRegulatoryModel — scripted in-process model for tests and dry runs

pub mod capability;
pub mod http;
pub mod mock;

pub use capability::{BatchRequest, ModelError, PredictionRequest, RegulatoryModel, VariantOutcome};
pub use http::HttpRegulatoryModel;
pub use mock::MockRegulatoryModel;
