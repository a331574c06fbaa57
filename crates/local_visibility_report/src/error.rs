//! Error types for the report driver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("API error: {0}")]
    Api(#[from] local_visibility_client::InsightsError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for report operations.
pub type ReportResult<T> = Result<T, ReportError>;
