//! Business-profile insights acquisition and visibility scoring.
//!
//! The client side fetches daily performance metrics through a chain of
//! fallback strategies and normalises them into [`AggregatedInsights`]; the
//! [`scoring`] module turns those (plus review and profile signals) into a
//! 0-100 visibility score.

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::SecretString;
use thiserror::Error;

pub mod aggregate;
pub mod config;
pub mod executor;
pub mod fallback;
pub mod http_client;
pub mod normalize;
pub mod observability;
pub mod profile;
pub mod retry;
pub mod reviews;
pub mod scoring;
pub mod types;
pub mod utils;

pub use profile::{LocationProfile, ProfileSignals};
pub use reviews::ReviewSummary;
pub use scoring::{Grade, ScoringDetails, ScoringMetrics, calculate_visibility_score};
pub use types::{AggregatedInsights, DailyMetricRecord, DateKey, InsightTotals, MetricSeries};

/// Errors that escape the client. Permission and availability gaps are
/// absorbed by the fallback chain and never show up here.
#[derive(Debug, Error)]
pub enum InsightsError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("TLS failure talking to upstream: {0}")]
    Tls(String),
    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("decoding {context}: {message}")]
    Decode { context: String, message: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Bearer credential supplied by the caller on every request.
///
/// Token acquisition and refresh belong to the caller; the client only reads
/// `access_token`.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub access_token: SecretString,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into().into()),
        }
    }
}

#[async_trait]
pub trait VisibilityClient: Send + Sync + 'static {
    /// Best-available insights for the inclusive `[start, end]` range.
    ///
    /// Never fails for permission or availability gaps; those degrade to
    /// zero-filled data. Fails only on auth, TLS or exhausted transport errors.
    async fn fetch_insights(
        &self,
        credentials: &Credentials,
        location_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AggregatedInsights, InsightsError>;

    /// Review aggregates for a location, paging through the legacy review host.
    async fn fetch_review_summary(
        &self,
        credentials: &Credentials,
        account_id: &str,
        location_id: &str,
        as_of: NaiveDate,
    ) -> Result<ReviewSummary, InsightsError>;

    /// Location metadata used for the profile completeness input.
    async fn fetch_location_profile(
        &self,
        credentials: &Credentials,
        location_id: &str,
    ) -> Result<LocationProfile, InsightsError>;
}
