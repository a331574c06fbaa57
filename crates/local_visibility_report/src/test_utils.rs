//! Mock `VisibilityClient` used by the driver's unit tests.
#![cfg(test)]

use async_trait::async_trait;
use chrono::NaiveDate;
use local_visibility_client::aggregate::aggregate;
use local_visibility_client::types::Period;
use local_visibility_client::{
    AggregatedInsights, Credentials, DailyMetricRecord, InsightsError, LocationProfile,
    ReviewSummary, VisibilityClient,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Returns fixed data for every location and records which calls were made.
#[derive(Default)]
pub struct MockClient {
    fail_reviews: bool,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl MockClient {
    /// Review fetches fail with an auth error.
    pub fn failing_reviews() -> Self {
        Self {
            fail_reviews: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl VisibilityClient for MockClient {
    async fn fetch_insights(
        &self,
        _credentials: &Credentials,
        location_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AggregatedInsights, InsightsError> {
        self.record("insights");
        let mut day = DailyMetricRecord::new(location_id, start.into());
        day.metrics.insert("mobileSearchImpressions".into(), 600.0);
        day.metrics.insert("mobileMapsImpressions".into(), 400.0);
        day.metrics.insert("callClicks".into(), 20.0);
        day.metrics.insert("websiteClicks".into(), 30.0);
        let period = Period {
            start: start.into(),
            end: end.into(),
        };
        Ok(aggregate(period, vec![day]))
    }

    async fn fetch_review_summary(
        &self,
        _credentials: &Credentials,
        _account_id: &str,
        _location_id: &str,
        _as_of: NaiveDate,
    ) -> Result<ReviewSummary, InsightsError> {
        self.record("reviews");
        if self.fail_reviews {
            return Err(InsightsError::Auth("token revoked".into()));
        }
        Ok(ReviewSummary {
            average_rating: 4.5,
            total_reviews: 80,
            recent_reviews: 5,
            response_rate: 60.0,
        })
    }

    async fn fetch_location_profile(
        &self,
        _credentials: &Credentials,
        _location_id: &str,
    ) -> Result<LocationProfile, InsightsError> {
        self.record("profile");
        let profile = serde_json::from_value(json!({
            "title": "Mock Bakery",
            "categories": {"primaryCategory": {"displayName": "Bakery"}},
            "storefrontAddress": {"addressLines": ["1 Main St"]},
            "phoneNumbers": {"primaryPhone": "+1 555 0100"},
            "websiteUri": "https://bakery.example",
            "regularHours": {"periods": [{"openDay": "MONDAY"}]},
            "profile": {"description": "Fresh bread daily"}
        }))
        .expect("mock profile");
        Ok(profile)
    }
}
