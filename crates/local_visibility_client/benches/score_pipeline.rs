use chrono::{Datelike, Days, NaiveDate};
use criterion::{Criterion, criterion_group, criterion_main};
use local_visibility_client::aggregate::aggregate;
use local_visibility_client::normalize::{InsightsPayload, MultiDailyMetricsResponse, normalize};
use local_visibility_client::types::Period;
use local_visibility_client::{
    ProfileSignals, ReviewSummary, ScoringMetrics, calculate_visibility_score,
};
use serde_json::json;
use std::hint::black_box;

const METRICS: [&str; 7] = [
    "WEBSITE_CLICKS",
    "CALL_CLICKS",
    "BUSINESS_DIRECTION_REQUESTS",
    "BUSINESS_IMPRESSIONS_DESKTOP_SEARCH",
    "BUSINESS_IMPRESSIONS_MOBILE_SEARCH",
    "BUSINESS_IMPRESSIONS_DESKTOP_MAPS",
    "BUSINESS_IMPRESSIONS_MOBILE_MAPS",
];

// a year of daily values for every core metric
fn year_payload(start: NaiveDate) -> serde_json::Value {
    let series: Vec<_> = METRICS
        .iter()
        .enumerate()
        .map(|(i, metric)| {
            let values: Vec<_> = (0..365u64)
                .map(|d| {
                    let date = start + Days::new(d);
                    json!({
                        "date": {"year": date.year(), "month": date.month(), "day": date.day()},
                        "value": ((d * 7 + i as u64) % 500).to_string()
                    })
                })
                .collect();
            json!({"dailyMetric": metric, "timeSeries": {"datedValues": values}})
        })
        .collect();
    json!({"multiDailyMetricTimeSeries": [{"dailyMetricTimeSeries": series}]})
}

fn bench_score_pipeline(c: &mut Criterion) {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
    let end = start + Days::new(364);
    let raw = year_payload(start);
    let reviews = ReviewSummary {
        average_rating: 4.3,
        total_reviews: 120,
        recent_reviews: 6,
        response_rate: 70.0,
    };
    let signals = ProfileSignals {
        profile_photos: 12,
        recent_posts: 3,
        profile_completeness: 86.0,
        qa_activity: 2,
    };

    c.bench_function("normalize_aggregate_score_year", |b| {
        b.iter(|| {
            let payload: MultiDailyMetricsResponse =
                serde_json::from_value(raw.clone()).expect("payload");
            let records = normalize("bench", [InsightsPayload::Batched(payload)]);
            let insights = aggregate(
                Period {
                    start: start.into(),
                    end: end.into(),
                },
                records,
            );
            let metrics = ScoringMetrics::from_sources(&insights, &reviews, &signals);
            black_box(calculate_visibility_score(&metrics))
        })
    });
}

criterion_group!(benches, bench_score_pipeline);
criterion_main!(benches);
