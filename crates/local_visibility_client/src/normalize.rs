//! Conversion of upstream time-series payloads into canonical daily records.
//!
//! Each upstream shape is a variant of [`InsightsPayload`] with its own
//! conversion into [`MetricSeries`]. Series are then folded into
//! [`DailyMetricRecord`]s keyed by `(location, date)`, merging partial records.

use crate::observability;
use crate::types::{DailyMetricRecord, DateKey, DatedValue, MetricSeries};
use crate::utils::parse_date_key;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Upper bound for a single daily metric value. Anything above is treated as
/// corrupted upstream data.
pub const MAX_METRIC_VALUE: f64 = 1_000_000.0;

/// Upstream metric identifier -> canonical field name.
const CANONICAL_METRICS: &[(&str, &str)] = &[
    ("WEBSITE_CLICKS", "websiteClicks"),
    ("CALL_CLICKS", "callClicks"),
    ("BUSINESS_DIRECTION_REQUESTS", "directionRequests"),
    ("BUSINESS_IMPRESSIONS_DESKTOP_SEARCH", "desktopSearchImpressions"),
    ("BUSINESS_IMPRESSIONS_MOBILE_SEARCH", "mobileSearchImpressions"),
    ("BUSINESS_IMPRESSIONS_DESKTOP_MAPS", "desktopMapsImpressions"),
    ("BUSINESS_IMPRESSIONS_MOBILE_MAPS", "mobileMapsImpressions"),
    ("BUSINESS_BOOKINGS", "bookings"),
    ("BUSINESS_CONVERSATIONS", "conversations"),
    ("BUSINESS_FOOD_ORDERS", "foodOrders"),
    ("BUSINESS_FOOD_MENU_CLICKS", "foodMenuClicks"),
    // legacy v4 report names
    ("ACTIONS_WEBSITE", "websiteClicks"),
    ("ACTIONS_PHONE", "callClicks"),
    ("ACTIONS_DRIVING_DIRECTIONS", "directionRequests"),
    ("QUERIES_DIRECT", "directSearches"),
    ("QUERIES_INDIRECT", "discoverySearches"),
    ("VIEWS_MAPS", "mapsViews"),
    ("VIEWS_SEARCH", "searchViews"),
];

/// Canonical field name for an upstream metric identifier. Unknown
/// identifiers pass through lower-cased.
pub fn canonical_metric_name(upstream: &str) -> String {
    CANONICAL_METRICS
        .iter()
        .find(|(raw, _)| raw.eq_ignore_ascii_case(upstream))
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or_else(|| upstream.to_lowercase())
}

/// `Some(v)` when `v` is a finite number in `[0, MAX_METRIC_VALUE]`.
pub fn checked_metric_value(v: f64) -> Option<f64> {
    (v.is_finite() && (0.0..=MAX_METRIC_VALUE).contains(&v)).then_some(v)
}

/// Parse a raw upstream value. Upstream encodes int64 counts as strings and
/// omits the field entirely for zero.
pub fn sanitize_metric_value(metric: &str, raw: Option<&Value>) -> f64 {
    let parsed = match raw {
        None | Some(Value::Null) => return 0.0,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed.and_then(checked_metric_value) {
        Some(v) => v,
        None => {
            let raw = raw.map(serde_json::Value::to_string).unwrap_or_default();
            warn!(metric, raw = %raw, "discarding out-of-range metric value");
            observability::record_sanitized_value();
            0.0
        }
    }
}

// --- batched / single-metric wire shapes -----------------------------------

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiDailyMetricsResponse {
    #[serde(default)]
    pub multi_daily_metric_time_series: Vec<MultiDailyMetricTimeSeries>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiDailyMetricTimeSeries {
    #[serde(default)]
    pub daily_metric_time_series: Vec<DailyMetricTimeSeries>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetricTimeSeries {
    pub daily_metric: String,
    #[serde(default)]
    pub time_series: TimeSeries,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetricsResponse {
    #[serde(default)]
    pub time_series: TimeSeries,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    #[serde(default)]
    pub dated_values: Vec<WireDatedValue>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WireDatedValue {
    pub date: Option<WireDate>,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct WireDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl WireDate {
    fn to_key(self) -> Option<DateKey> {
        let key = DateKey::new(self.year?, self.month?, self.day?);
        key.to_naive().map(|_| key)
    }
}

// --- legacy keyword/threshold wire shape -----------------------------------

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyInsightsResponse {
    #[serde(default)]
    pub location_metrics: Vec<LegacyLocationMetrics>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyLocationMetrics {
    #[serde(default)]
    pub metric_values: Vec<LegacyMetricValue>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMetricValue {
    pub metric: Option<String>,
    #[serde(default)]
    pub dimensional_values: Vec<LegacyDimensionalValue>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDimensionalValue {
    pub time_dimension: Option<LegacyTimeDimension>,
    #[serde(default)]
    pub value: Option<Value>,
    /// Present instead of `value` when the count is below a privacy threshold.
    #[serde(default)]
    pub threshold: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTimeDimension {
    pub time_range: Option<LegacyTimeRange>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTimeRange {
    pub start_time: Option<String>,
}

/// The upstream response shapes the normaliser understands.
#[derive(Clone, Debug)]
pub enum InsightsPayload {
    Batched(MultiDailyMetricsResponse),
    /// The single-series endpoint does not echo the metric, so the caller
    /// supplies the identifier it asked for.
    SingleMetric {
        metric: String,
        response: DailyMetricsResponse,
    },
    LegacyKeyword(LegacyInsightsResponse),
}

impl InsightsPayload {
    pub fn into_series(self) -> Vec<MetricSeries> {
        match self {
            InsightsPayload::Batched(resp) => batched_series(resp),
            InsightsPayload::SingleMetric { metric, response } => {
                vec![single_series(metric, response)]
            }
            InsightsPayload::LegacyKeyword(resp) => legacy_series(resp),
        }
    }
}

fn batched_series(resp: MultiDailyMetricsResponse) -> Vec<MetricSeries> {
    resp.multi_daily_metric_time_series
        .into_iter()
        .flat_map(|m| m.daily_metric_time_series)
        .map(|s| build_series(s.daily_metric, s.time_series))
        .collect()
}

fn single_series(metric: String, resp: DailyMetricsResponse) -> MetricSeries {
    build_series(metric, resp.time_series)
}

fn build_series(metric: String, ts: TimeSeries) -> MetricSeries {
    let values = ts
        .dated_values
        .into_iter()
        .filter_map(|dv| {
            let date = dv.date.and_then(WireDate::to_key)?;
            Some(DatedValue {
                date,
                value: sanitize_metric_value(&metric, dv.value.as_ref()),
            })
        })
        .collect();
    sorted_series(metric, values)
}

fn legacy_series(resp: LegacyInsightsResponse) -> Vec<MetricSeries> {
    resp.location_metrics
        .into_iter()
        .flat_map(|lm| lm.metric_values)
        .filter_map(|mv| {
            let metric = mv.metric?;
            let values = mv
                .dimensional_values
                .into_iter()
                .filter_map(|dv| {
                    let date = dv
                        .time_dimension
                        .and_then(|t| t.time_range)
                        .and_then(|r| r.start_time)
                        .and_then(|s| parse_date_key(&s))?;
                    // a threshold bucket carries no exact count
                    let value = match (&dv.value, &dv.threshold) {
                        (None, Some(_)) => 0.0,
                        _ => sanitize_metric_value(&metric, dv.value.as_ref()),
                    };
                    Some(DatedValue { date, value })
                })
                .collect();
            Some(sorted_series(metric, values))
        })
        .collect()
}

fn sorted_series(metric_type: String, mut values: Vec<DatedValue>) -> MetricSeries {
    values.sort_by_key(|v| v.date);
    MetricSeries {
        metric_type,
        ordered_values: values,
    }
}

/// Fold metric series into one record per date for `location_id`.
pub fn series_to_records(location_id: &str, series: &[MetricSeries]) -> Vec<DailyMetricRecord> {
    let partials = series.iter().flat_map(|s| {
        let field = canonical_metric_name(&s.metric_type);
        s.ordered_values.iter().map(move |dv| {
            let mut rec = DailyMetricRecord::new(location_id, dv.date);
            rec.metrics.insert(field.clone(), dv.value);
            rec
        })
    });
    merge_records(partials)
}

/// Merge partial records sharing `(location, date)` by union of their metric
/// fields. Output is ascending by date, then location.
pub fn merge_records(
    records: impl IntoIterator<Item = DailyMetricRecord>,
) -> Vec<DailyMetricRecord> {
    let mut by_key: BTreeMap<(DateKey, String), DailyMetricRecord> = BTreeMap::new();
    for rec in records {
        let key = (rec.date, rec.location_id.clone());
        match by_key.get_mut(&key) {
            Some(existing) => existing.merge_from(rec),
            None => {
                by_key.insert(key, rec);
            }
        }
    }
    by_key.into_values().collect()
}

/// Normalise any mix of payloads for one location into daily records.
pub fn normalize(
    location_id: &str,
    payloads: impl IntoIterator<Item = InsightsPayload>,
) -> Vec<DailyMetricRecord> {
    let series: Vec<MetricSeries> = payloads
        .into_iter()
        .flat_map(InsightsPayload::into_series)
        .collect();
    series_to_records(location_id, &series)
}
