//! Canonical insight records shared by the normaliser, aggregator and scorer.

use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Calendar date without a timezone. Identity key for daily records.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct DateKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DateKey {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// `None` when the fields do not form a real calendar date.
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl From<NaiveDate> for DateKey {
    fn from(d: NaiveDate) -> Self {
        Self {
            year: d.year(),
            month: d.month(),
            day: d.day(),
        }
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// One location's metrics for one day, keyed by canonical metric name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetricRecord {
    pub location_id: String,
    pub date: DateKey,
    pub metrics: BTreeMap<String, f64>,
}

impl DailyMetricRecord {
    pub fn new(location_id: impl Into<String>, date: DateKey) -> Self {
        Self {
            location_id: location_id.into(),
            date,
            metrics: BTreeMap::new(),
        }
    }

    /// Union `other`'s fields into this record. Fields present in both take
    /// `other`'s value; fields only in `self` are kept.
    pub fn merge_from(&mut self, other: DailyMetricRecord) {
        self.metrics.extend(other.metrics);
    }

    pub fn metric(&self, name: &str) -> f64 {
        self.metrics.get(name).copied().unwrap_or(0.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatedValue {
    pub date: DateKey,
    pub value: f64,
}

/// One upstream metric's raw time series, ascending by date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricSeries {
    pub metric_type: String,
    pub ordered_values: Vec<DatedValue>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Period {
    pub start: DateKey,
    pub end: DateKey,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsightTotals {
    pub views: f64,
    pub actions: f64,
    pub call_clicks: f64,
    pub website_clicks: f64,
    pub direction_requests: f64,
    pub desktop_search_impressions: f64,
    pub mobile_search_impressions: f64,
    pub desktop_maps_impressions: f64,
    pub mobile_maps_impressions: f64,
}

/// Period totals plus the per-day records they were summed from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedInsights {
    pub period: Period,
    pub totals: InsightTotals,
    pub daily_metrics: Vec<DailyMetricRecord>,
}

impl AggregatedInsights {
    /// Sum of an arbitrary canonical metric across all daily records.
    pub fn metric_total(&self, name: &str) -> f64 {
        self.daily_metrics
            .iter()
            .map(|r| r.metrics.get(name).copied())
            .fold(0.0, |acc, v| match v {
                Some(v) => crate::aggregate::accumulate(acc, v),
                None => acc,
            })
    }

    /// Whether any daily record carries the named metric at all.
    pub fn has_metric(&self, name: &str) -> bool {
        self.daily_metrics
            .iter()
            .any(|r| r.metrics.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_keys_order_chronologically() {
        let mut keys = vec![
            DateKey::new(2025, 2, 1),
            DateKey::new(2024, 12, 31),
            DateKey::new(2025, 1, 15),
        ];
        keys.sort();
        assert_eq!(keys[0], DateKey::new(2024, 12, 31));
        assert_eq!(keys[2], DateKey::new(2025, 2, 1));
    }

    #[test]
    fn date_key_round_trips_through_naive_date() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let key = DateKey::from(d);
        assert_eq!(key.to_string(), "2024-02-29");
        assert_eq!(key.to_naive(), Some(d));
        assert_eq!(DateKey::new(2023, 2, 29).to_naive(), None);
    }

    #[test]
    fn merge_keeps_existing_fields() {
        let mut a = DailyMetricRecord::new("loc", DateKey::new(2025, 1, 1));
        a.metrics.insert("callClicks".into(), 3.0);
        let mut b = DailyMetricRecord::new("loc", DateKey::new(2025, 1, 1));
        b.metrics.insert("websiteClicks".into(), 7.0);
        a.merge_from(b);
        assert_eq!(a.metric("callClicks"), 3.0);
        assert_eq!(a.metric("websiteClicks"), 7.0);
        assert_eq!(a.metric("bookings"), 0.0);
    }

    #[test]
    fn serializes_camel_case() {
        let rec = DailyMetricRecord::new("locations/1", DateKey::new(2025, 3, 4));
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["locationId"], "locations/1");
        assert_eq!(v["date"]["month"], 3);
    }
}
