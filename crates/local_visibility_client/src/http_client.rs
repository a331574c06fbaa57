//! reqwest-based implementation of [`VisibilityClient`](crate::VisibilityClient).

use crate::aggregate::aggregate;
use crate::config::ClientConfig;
use crate::executor::RequestExecutor;
use crate::fallback::{ChainOutcome, InsightsFallbackChain};
use crate::types::{AggregatedInsights, Period};
use crate::{
    Credentials, InsightsError, LocationProfile, ReviewSummary, VisibilityClient, profile, reviews,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Client for the business-profile APIs.
///
/// Holds no credential; every call takes the caller's [`Credentials`], so a
/// single instance can serve many locations and tenants concurrently.
#[derive(Clone, Debug)]
pub struct ReqwestVisibilityClient {
    config: ClientConfig,
    executor: RequestExecutor,
}

impl ReqwestVisibilityClient {
    pub fn new(config: ClientConfig) -> Result<Self, InsightsError> {
        let executor = RequestExecutor::new(config.retry.clone(), config.request_timeout)?;
        Ok(Self { config, executor })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run the fallback chain and report which strategy produced the data.
    pub async fn fetch_insights_detailed(
        &self,
        credentials: &Credentials,
        location_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(AggregatedInsights, ChainOutcome), InsightsError> {
        let chain = InsightsFallbackChain::new(&self.executor, &self.config.performance_base_url);
        let mut outcome = chain.run(credentials, location_id, start, end).await?;
        let period = Period {
            start: start.into(),
            end: end.into(),
        };
        let records = std::mem::take(&mut outcome.records);
        Ok((aggregate(period, records), outcome))
    }
}

#[async_trait]
impl VisibilityClient for ReqwestVisibilityClient {
    async fn fetch_insights(
        &self,
        credentials: &Credentials,
        location_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AggregatedInsights, InsightsError> {
        let (insights, _) = self
            .fetch_insights_detailed(credentials, location_id, start, end)
            .await?;
        Ok(insights)
    }

    async fn fetch_review_summary(
        &self,
        credentials: &Credentials,
        account_id: &str,
        location_id: &str,
        as_of: NaiveDate,
    ) -> Result<ReviewSummary, InsightsError> {
        reviews::fetch_review_summary(
            &self.executor,
            &self.config.legacy_base_url,
            credentials,
            account_id,
            location_id,
            as_of,
            self.config.review_page_limit,
        )
        .await
    }

    async fn fetch_location_profile(
        &self,
        credentials: &Credentials,
        location_id: &str,
    ) -> Result<LocationProfile, InsightsError> {
        profile::fetch_location_profile(
            &self.executor,
            &self.config.info_base_url,
            credentials,
            location_id,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_new_and_basic() {
        let client = ReqwestVisibilityClient::new(ClientConfig::single_host("http://localhost/"))
            .expect("client");
        assert_eq!(client.config().performance_base_url, "http://localhost");
        assert_eq!(client.config().legacy_base_url, "http://localhost");
    }
}
