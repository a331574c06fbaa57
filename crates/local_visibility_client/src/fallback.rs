//! Ordered acquisition strategies for daily performance metrics.
//!
//! 1. batched multi-metric endpoint, shrinking the metric set on 400s that
//!    name unsupported metrics;
//! 2. on 403, a zero-filled day for every date in range;
//! 3. on 404 or empty batched results, one single-series request per metric;
//! 4. if nothing yields data, zero-filled days.

use crate::executor::{ApiRequest, FailureClass, RequestExecutor};
use crate::normalize::{
    DailyMetricsResponse, InsightsPayload, MultiDailyMetricsResponse, canonical_metric_name,
    normalize,
};
use crate::types::DailyMetricRecord;
use crate::utils::{daily_range_query, days_in_range, location_resource};
use crate::{Credentials, InsightsError, observability};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Metrics requested from the batched endpoint.
pub const CORE_METRICS: [&str; 7] = [
    "WEBSITE_CLICKS",
    "CALL_CLICKS",
    "BUSINESS_DIRECTION_REQUESTS",
    "BUSINESS_IMPRESSIONS_DESKTOP_SEARCH",
    "BUSINESS_IMPRESSIONS_MOBILE_SEARCH",
    "BUSINESS_IMPRESSIONS_DESKTOP_MAPS",
    "BUSINESS_IMPRESSIONS_MOBILE_MAPS",
];

static METRIC_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z][A-Z0-9]*(?:_[A-Z0-9]+)+").expect("metric token regex is valid")
});

/// Which strategy produced the records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsightsStrategy {
    Batched,
    PerMetric,
    PermissionDegraded,
    Zeroed,
}

impl InsightsStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            InsightsStrategy::Batched => "batched",
            InsightsStrategy::PerMetric => "per_metric",
            InsightsStrategy::PermissionDegraded => "permission_degraded",
            InsightsStrategy::Zeroed => "zeroed",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChainOutcome {
    pub strategy: InsightsStrategy,
    pub records: Vec<DailyMetricRecord>,
    /// Metrics dropped after the batched endpoint rejected them.
    pub removed_metrics: Vec<String>,
}

enum BatchedStep {
    Records(Vec<DailyMetricRecord>),
    PermissionDenied,
    FallBack,
    NothingLeft,
}

/// The requested metric identifiers named in a 400 error body.
pub fn unsupported_metrics(error_body: &str, requested: &[String]) -> Vec<String> {
    let named: BTreeSet<&str> = METRIC_TOKEN
        .find_iter(error_body)
        .map(|m| m.as_str())
        .collect();
    requested
        .iter()
        .filter(|m| named.contains(m.as_str()))
        .cloned()
        .collect()
}

/// Zero-valued record for every day in range, carrying every core metric.
pub fn zero_filled_records(
    location_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DailyMetricRecord> {
    days_in_range(start, end)
        .into_iter()
        .map(|date| {
            let mut rec = DailyMetricRecord::new(location_id, date);
            for metric in CORE_METRICS {
                rec.metrics.insert(canonical_metric_name(metric), 0.0);
            }
            rec
        })
        .collect()
}

pub struct InsightsFallbackChain<'a> {
    executor: &'a RequestExecutor,
    base_url: &'a str,
}

impl<'a> InsightsFallbackChain<'a> {
    pub fn new(executor: &'a RequestExecutor, base_url: &'a str) -> Self {
        Self { executor, base_url }
    }

    pub async fn run(
        &self,
        credentials: &Credentials,
        location_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ChainOutcome, InsightsError> {
        if start > end {
            return Err(InsightsError::InvalidInput(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let mut requested: Vec<String> = CORE_METRICS.iter().map(|m| m.to_string()).collect();
        let mut removed: BTreeSet<String> = BTreeSet::new();

        let step = self
            .batched(credentials, location_id, start, end, &mut requested, &mut removed)
            .await?;
        let removed_metrics: Vec<String> = removed.into_iter().collect();

        let outcome = match step {
            BatchedStep::Records(records) => (InsightsStrategy::Batched, records),
            BatchedStep::PermissionDenied => {
                warn!(
                    location_id,
                    "performance metrics permission denied, returning zero-filled days"
                );
                (
                    InsightsStrategy::PermissionDegraded,
                    zero_filled_records(location_id, start, end),
                )
            }
            BatchedStep::FallBack => {
                let records = self
                    .per_metric(credentials, location_id, start, end, &requested)
                    .await?;
                if records.is_empty() {
                    (
                        InsightsStrategy::Zeroed,
                        zero_filled_records(location_id, start, end),
                    )
                } else {
                    (InsightsStrategy::PerMetric, records)
                }
            }
            BatchedStep::NothingLeft => (
                InsightsStrategy::Zeroed,
                zero_filled_records(location_id, start, end),
            ),
        };

        let (strategy, records) = outcome;
        info!(
            location_id,
            strategy = strategy.as_str(),
            days = records.len(),
            removed = removed_metrics.len(),
            "insights acquired"
        );
        observability::record_strategy(strategy.as_str());
        Ok(ChainOutcome {
            strategy,
            records,
            removed_metrics,
        })
    }

    /// Batched attempts with a shrinking metric set. Every 400 that names
    /// requested metrics removes at least one, so the loop is bounded by the
    /// size of the initial set.
    async fn batched(
        &self,
        credentials: &Credentials,
        location_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        requested: &mut Vec<String>,
        removed: &mut BTreeSet<String>,
    ) -> Result<BatchedStep, InsightsError> {
        for _ in 0..=CORE_METRICS.len() {
            if requested.is_empty() {
                warn!(location_id, "every metric was rejected upstream");
                return Ok(BatchedStep::NothingLeft);
            }

            let request = self.batched_request(location_id, start, end, requested);
            let resp = self.executor.execute(credentials, &request).await?;

            let Some(class) = resp.failure_class() else {
                let payload = match resp.json::<MultiDailyMetricsResponse>("batched metrics") {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(location_id, error = %e, "unreadable batched payload");
                        return Ok(BatchedStep::FallBack);
                    }
                };
                let records = normalize(location_id, [InsightsPayload::Batched(payload)]);
                if records.is_empty() {
                    debug!(location_id, "batched endpoint returned no data");
                    return Ok(BatchedStep::FallBack);
                }
                return Ok(BatchedStep::Records(records));
            };

            match class {
                FailureClass::PermissionDenied => return Ok(BatchedStep::PermissionDenied),
                FailureClass::MalformedRequest => {
                    let rejected: Vec<String> = unsupported_metrics(&resp.body, requested)
                        .into_iter()
                        .filter(|m| !removed.contains(m))
                        .collect();
                    if rejected.is_empty() {
                        warn!(location_id, body = %resp.body_snippet(), "batched request rejected without naming metrics");
                        return Ok(BatchedStep::FallBack);
                    }
                    warn!(location_id, metrics = ?rejected, "dropping unsupported metrics and retrying");
                    requested.retain(|m| !rejected.contains(m));
                    removed.extend(rejected);
                }
                FailureClass::Unavailable => {
                    debug!(location_id, "batched endpoint unavailable");
                    return Ok(BatchedStep::FallBack);
                }
                FailureClass::Other(status) => {
                    warn!(location_id, status, "unexpected batched response status");
                    return Ok(BatchedStep::FallBack);
                }
            }
        }
        Ok(BatchedStep::FallBack)
    }

    /// One request per metric, strictly sequential. Metrics that fail
    /// individually are dropped.
    async fn per_metric(
        &self,
        credentials: &Credentials,
        location_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        metrics: &[String],
    ) -> Result<Vec<DailyMetricRecord>, InsightsError> {
        let mut payloads = Vec::with_capacity(metrics.len());
        for metric in metrics {
            let request = self.single_request(location_id, start, end, metric);
            let resp = self.executor.execute(credentials, &request).await?;
            if let Some(class) = resp.failure_class() {
                debug!(location_id, metric = %metric, ?class, "metric unavailable, skipping");
                continue;
            }
            match resp.json::<DailyMetricsResponse>("single metric") {
                Ok(response) => payloads.push(InsightsPayload::SingleMetric {
                    metric: metric.clone(),
                    response,
                }),
                Err(e) => warn!(location_id, metric = %metric, error = %e, "unreadable metric payload"),
            }
        }
        Ok(normalize(location_id, payloads))
    }

    fn batched_request(
        &self,
        location_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        metrics: &[String],
    ) -> ApiRequest {
        let url = format!(
            "{}/v1/{}:fetchMultiDailyMetricsTimeSeries",
            self.base_url,
            location_resource(location_id)
        );
        ApiRequest::get(url)
            .queries(metrics.iter().map(|m| ("dailyMetrics".to_string(), m.clone())))
            .queries(daily_range_query(start, end))
    }

    fn single_request(
        &self,
        location_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        metric: &str,
    ) -> ApiRequest {
        let url = format!(
            "{}/v1/{}:getDailyMetricsTimeSeries",
            self.base_url,
            location_resource(location_id)
        );
        ApiRequest::get(url)
            .query("dailyMetric", metric)
            .queries(daily_range_query(start, end))
    }
}
