//! Period totals over normalised daily records.

use crate::normalize::checked_metric_value;
use crate::observability;
use crate::types::{AggregatedInsights, DailyMetricRecord, InsightTotals, Period};
use tracing::warn;

/// Add `term` to `sum` unless the term is NaN, negative or above the metric
/// ceiling, in which case it is dropped.
pub fn accumulate(sum: f64, term: f64) -> f64 {
    match checked_metric_value(term) {
        Some(t) => sum + t,
        None => {
            warn!(term, "dropping out-of-range term from aggregate");
            observability::record_sanitized_value();
            sum
        }
    }
}

fn total(records: &[DailyMetricRecord], field: &str) -> f64 {
    records
        .iter()
        .filter_map(|r| r.metrics.get(field).copied())
        .fold(0.0, accumulate)
}

/// Sum the canonical metrics for `period` and derive `views` / `actions`.
pub fn aggregate(period: Period, daily_metrics: Vec<DailyMetricRecord>) -> AggregatedInsights {
    let call_clicks = total(&daily_metrics, "callClicks");
    let website_clicks = total(&daily_metrics, "websiteClicks");
    let direction_requests = total(&daily_metrics, "directionRequests");
    let desktop_search_impressions = total(&daily_metrics, "desktopSearchImpressions");
    let mobile_search_impressions = total(&daily_metrics, "mobileSearchImpressions");
    let desktop_maps_impressions = total(&daily_metrics, "desktopMapsImpressions");
    let mobile_maps_impressions = total(&daily_metrics, "mobileMapsImpressions");

    let totals = InsightTotals {
        views: desktop_search_impressions
            + mobile_search_impressions
            + desktop_maps_impressions
            + mobile_maps_impressions,
        actions: website_clicks + call_clicks + direction_requests,
        call_clicks,
        website_clicks,
        direction_requests,
        desktop_search_impressions,
        mobile_search_impressions,
        desktop_maps_impressions,
        mobile_maps_impressions,
    };

    AggregatedInsights {
        period,
        totals,
        daily_metrics,
    }
}
