use thiserror::Error;

#[derive(Debug, Error)]
pub enum OncoregError {
    #[error("Malformed variant record: {0}")]
    MalformedInput(String),

    #[error("No analyzable variants remain after extraction")]
    NoVariants,

    #[error("Unsupported cancer type '{label}'. Supported types: {supported}")]
    UnsupportedCancerType { label: String, supported: String },

    #[error("Prediction unavailable: none of the {n_variants} variants received a score")]
    PredictionUnavailable { n_variants: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, OncoregError>;
