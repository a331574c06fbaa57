//! Deterministic visibility scoring.
//!
//! Four component scores (reviews 30%, performance 40%, profile 20%,
//! competitive 10%) combine into a 0-100 total, a letter grade and a ranked
//! recommendation list. Pure: no I/O, no state.

use crate::profile::ProfileSignals;
use crate::reviews::ReviewSummary;
use crate::types::AggregatedInsights;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_MARKET_POSITION: f64 = 75.0;
const DEFAULT_CONSISTENCY: f64 = 70.0;
const DEFAULT_TREND_DIRECTION: f64 = 80.0;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoringMetrics {
    pub average_rating: f64,
    pub total_reviews: u64,
    pub recent_reviews: u64,
    pub response_rate: f64,
    pub impressions: u64,
    pub call_clicks: u64,
    pub website_clicks: u64,
    #[serde(default)]
    pub bookings: Option<u64>,
    pub profile_photos: u32,
    pub recent_posts: u32,
    /// Already a 0-100 percentage.
    pub profile_completeness: f64,
    pub qa_activity: u32,
    #[serde(default)]
    pub market_position: Option<f64>,
    #[serde(default)]
    pub consistency: Option<f64>,
    #[serde(default)]
    pub trend_direction: Option<f64>,
}

impl ScoringMetrics {
    /// Assemble scoring inputs from acquired insights, review aggregates and
    /// profile signals. Competitive fields stay unset.
    pub fn from_sources(
        insights: &AggregatedInsights,
        reviews: &ReviewSummary,
        profile: &ProfileSignals,
    ) -> Self {
        let count = |v: f64| if v.is_finite() && v > 0.0 { v.round() as u64 } else { 0 };
        Self {
            average_rating: reviews.average_rating,
            total_reviews: reviews.total_reviews,
            recent_reviews: reviews.recent_reviews,
            response_rate: reviews.response_rate,
            impressions: count(insights.totals.views),
            call_clicks: count(insights.totals.call_clicks),
            website_clicks: count(insights.totals.website_clicks),
            bookings: insights
                .has_metric("bookings")
                .then(|| count(insights.metric_total("bookings"))),
            profile_photos: profile.profile_photos,
            recent_posts: profile.recent_posts,
            profile_completeness: profile.profile_completeness,
            qa_activity: profile.qa_activity,
            market_position: None,
            consistency: None,
            trend_direction: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoringBreakdown {
    pub reviews_score: u8,
    pub performance_score: u8,
    pub profile_score: u8,
    pub competitive_score: u8,
    pub total_score: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum Grade {
    #[serde(rename = "F")]
    F,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl Grade {
    pub fn from_score(total: u8) -> Self {
        match total {
            95.. => Grade::APlus,
            90..=94 => Grade::A,
            85..=89 => Grade::BPlus,
            80..=84 => Grade::B,
            75..=79 => Grade::CPlus,
            70..=74 => Grade::C,
            65..=69 => Grade::DPlus,
            60..=64 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyRatios {
    pub call_rate: f64,
    pub website_rate: f64,
    pub response_rate: f64,
    pub recent_review_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoringDetails {
    pub breakdown: ScoringBreakdown,
    pub grade: Grade,
    pub interpretation: String,
    pub recommendations: Vec<String>,
    pub key_ratios: KeyRatios,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Component {
    Reviews,
    Performance,
    Profile,
    Competitive,
}

fn finite(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn percent(v: f64) -> f64 {
    finite(v).clamp(0.0, 100.0)
}

fn round_score(v: f64) -> u8 {
    if !v.is_finite() {
        return 0;
    }
    v.round().clamp(0.0, 100.0) as u8
}

fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn review_volume_score(total_reviews: u64) -> f64 {
    let n = total_reviews as f64;
    if n <= 10.0 {
        20.0
    } else if n <= 50.0 {
        20.0 + ((n - 10.0) / 40.0) * 40.0
    } else if n <= 100.0 {
        60.0 + ((n - 50.0) / 50.0) * 20.0
    } else {
        80.0 + ((n - 100.0) / 100.0).min(1.0) * 20.0
    }
}

fn reviews_score(m: &ScoringMetrics) -> u8 {
    let rating = finite(m.average_rating).clamp(0.0, 5.0) / 5.0 * 100.0;
    let volume = review_volume_score(m.total_reviews);
    let recency = match m.recent_reviews {
        0 => 0.0,
        1..=3 => 50.0,
        _ => 100.0,
    };
    let response = percent(m.response_rate);
    round_score(rating * 0.40 + volume * 0.25 + recency * 0.20 + response * 0.15)
}

/// Raw impressions score on a 0-200 scale.
pub fn impressions_score(impressions: u64) -> f64 {
    let n = impressions as f64;
    if n < 100.0 {
        n
    } else if n < 1000.0 {
        100.0 + ((n - 100.0) / 900.0) * 50.0
    } else {
        (150.0 + (n / 1000.0).log10() * 50.0).min(200.0)
    }
}

fn performance_score(m: &ScoringMetrics) -> u8 {
    if m.impressions == 0 {
        return 0;
    }
    let call = (rate(m.call_clicks, m.impressions) * 50.0).min(100.0);
    let website = (rate(m.website_clicks, m.impressions) * 33.33).min(100.0);
    let normalized_impressions = (impressions_score(m.impressions) / 200.0 * 100.0).min(100.0);
    let bookings = m
        .bookings
        .map_or(0.0, |b| (b as f64 * 10.0).min(100.0));
    round_score(normalized_impressions * 0.25 + call * 0.35 + website * 0.25 + bookings * 0.15)
}

fn profile_score(m: &ScoringMetrics) -> u8 {
    let photo = (f64::from(m.profile_photos) * 10.0).min(100.0);
    let posts = (f64::from(m.recent_posts) * 25.0).min(100.0);
    let completeness = percent(m.profile_completeness);
    let qa = (f64::from(m.qa_activity) * 20.0).min(100.0);
    round_score(photo * 0.25 + posts * 0.25 + completeness * 0.35 + qa * 0.15)
}

fn competitive_score(m: &ScoringMetrics) -> u8 {
    let market = m.market_position.map_or(DEFAULT_MARKET_POSITION, percent);
    let consistency = m.consistency.map_or(DEFAULT_CONSISTENCY, percent);
    let trend = m.trend_direction.map_or(DEFAULT_TREND_DIRECTION, percent);
    round_score(market * 0.40 + consistency * 0.30 + trend * 0.30)
}

pub fn breakdown(m: &ScoringMetrics) -> ScoringBreakdown {
    let reviews_score = reviews_score(m);
    let performance_score = performance_score(m);
    let profile_score = profile_score(m);
    let competitive_score = competitive_score(m);
    let total_score = round_score(
        f64::from(reviews_score) * 0.30
            + f64::from(performance_score) * 0.40
            + f64::from(profile_score) * 0.20
            + f64::from(competitive_score) * 0.10,
    );
    ScoringBreakdown {
        reviews_score,
        performance_score,
        profile_score,
        competitive_score,
        total_score,
    }
}

/// Lowest-scoring component. Reviews is the starting candidate and only a
/// strictly lower score replaces it, so reviews wins every exact tie; among
/// the others the earlier of performance, profile, competitive wins.
pub fn weakest_component(b: &ScoringBreakdown) -> Component {
    let mut weakest = (Component::Reviews, b.reviews_score);
    for candidate in [
        (Component::Performance, b.performance_score),
        (Component::Profile, b.profile_score),
        (Component::Competitive, b.competitive_score),
    ] {
        if candidate.1 < weakest.1 {
            weakest = candidate;
        }
    }
    weakest.0
}

fn interpretation_for(total: u8) -> (&'static str, &'static [&'static str]) {
    match total {
        90.. => (
            "Excellent visibility. This location is highly discoverable and turns searches into customer actions.",
            &[
                "Keep replying to every new review within a day or two.",
                "Publish fresh posts weekly to stay prominent in search.",
                "Watch nearby competitors for new offers and categories.",
            ],
        ),
        80..=89 => (
            "Strong visibility. Customers find this location easily, with a few gaps left to close.",
            &[
                "Ask satisfied customers for reviews to keep volume growing.",
                "Add recent photos of the storefront, products and team.",
                "Answer open questions in the Q&A section.",
            ],
        ),
        70..=79 => (
            "Good visibility. The profile performs reasonably but is leaving customer actions on the table.",
            &[
                "Fill in every missing profile field, including hours and description.",
                "Post updates or offers at least once a week.",
                "Reply to all reviews, starting with the negative ones.",
            ],
        ),
        60..=69 => (
            "Fair visibility. The location appears in searches but rarely stands out.",
            &[
                "Run a review request campaign with recent customers.",
                "Upload at least ten high-quality photos.",
                "Check that categories, phone number and website are correct.",
            ],
        ),
        _ => (
            "Poor visibility. Most potential customers are unlikely to find or choose this location.",
            &[
                "Complete the profile: title, category, address, phone, website, hours and description.",
                "Start collecting reviews and respond to each one.",
                "Add photos and publish a first post.",
                "Verify the location and confirm performance data access is granted.",
            ],
        ),
    }
}

fn priority_recommendation(component: Component) -> &'static str {
    match component {
        Component::Reviews => {
            "Priority: reviews are the weakest area. Grow review volume, encourage recent reviews and reply to every one."
        }
        Component::Performance => {
            "Priority: search performance is the weakest area. Improve calls and website clicks per impression with clearer calls to action."
        }
        Component::Profile => {
            "Priority: the profile is the weakest area. Complete missing fields and keep photos, posts and Q&A active."
        }
        Component::Competitive => {
            "Priority: competitive standing is the weakest area. Differentiate with categories, attributes and offers competitors lack."
        }
    }
}

fn key_ratios(m: &ScoringMetrics) -> KeyRatios {
    KeyRatios {
        call_rate: rate(m.call_clicks, m.impressions),
        website_rate: rate(m.website_clicks, m.impressions),
        response_rate: finite(m.response_rate),
        recent_review_rate: rate(m.recent_reviews, m.total_reviews),
    }
}

/// Score a location. Total: every input yields a valid report.
pub fn calculate_visibility_score(metrics: &ScoringMetrics) -> ScoringDetails {
    let breakdown = breakdown(metrics);
    let grade = Grade::from_score(breakdown.total_score);
    let (interpretation, base) = interpretation_for(breakdown.total_score);
    let mut recommendations: Vec<String> = base.iter().map(|s| (*s).to_string()).collect();
    recommendations.push(priority_recommendation(weakest_component(&breakdown)).to_string());

    ScoringDetails {
        breakdown,
        grade,
        interpretation: interpretation.to_string(),
        recommendations,
        key_ratios: key_ratios(metrics),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_metrics() -> ScoringMetrics {
        ScoringMetrics {
            average_rating: 4.2,
            total_reviews: 120,
            recent_reviews: 5,
            response_rate: 80.0,
            impressions: 10_000,
            call_clicks: 150,
            website_clicks: 200,
            bookings: Some(0),
            profile_photos: 10,
            recent_posts: 4,
            profile_completeness: 90.0,
            qa_activity: 2,
            ..ScoringMetrics::default()
        }
    }

    #[test]
    fn reference_location_scores_c_plus() {
        let details = calculate_visibility_score(&reference_metrics());
        assert_eq!(
            details.breakdown,
            ScoringBreakdown {
                reviews_score: 87,
                performance_score: 68,
                profile_score: 88,
                competitive_score: 75,
                total_score: 78,
            }
        );
        assert_eq!(details.grade, Grade::CPlus);
        assert_eq!(details.grade.to_string(), "C+");
        assert_eq!(details.recommendations.len(), 4);
        assert!(details.recommendations[3].contains("search performance"));
        assert_eq!(details.key_ratios.call_rate, 1.5);
        assert_eq!(details.key_ratios.website_rate, 2.0);
        assert_eq!(details.key_ratios.response_rate, 80.0);
    }

    #[test]
    fn zero_impressions_zeroes_performance() {
        let m = ScoringMetrics {
            impressions: 0,
            call_clicks: 500,
            website_clicks: 500,
            bookings: Some(50),
            ..reference_metrics()
        };
        let details = calculate_visibility_score(&m);
        assert_eq!(details.breakdown.performance_score, 0);
        assert_eq!(details.key_ratios.call_rate, 0.0);
        assert_eq!(details.key_ratios.website_rate, 0.0);
    }

    #[test]
    fn review_volume_tiers() {
        assert_eq!(review_volume_score(0), 20.0);
        assert_eq!(review_volume_score(10), 20.0);
        assert_eq!(review_volume_score(30), 40.0);
        assert_eq!(review_volume_score(50), 60.0);
        assert_eq!(review_volume_score(75), 70.0);
        assert_eq!(review_volume_score(100), 80.0);
        assert_eq!(review_volume_score(150), 90.0);
        assert_eq!(review_volume_score(10_000), 100.0);
    }

    #[test]
    fn impressions_tiers() {
        assert_eq!(impressions_score(50), 50.0);
        assert_eq!(impressions_score(100), 100.0);
        assert_eq!(impressions_score(550), 125.0);
        assert_eq!(impressions_score(1000), 150.0);
        assert_eq!(impressions_score(10_000), 200.0);
        assert_eq!(impressions_score(1_000_000), 200.0);
    }

    #[test]
    fn competitive_defaults_and_overrides() {
        let m = ScoringMetrics::default();
        assert_eq!(breakdown(&m).competitive_score, 75);
        let m = ScoringMetrics {
            market_position: Some(100.0),
            consistency: Some(100.0),
            trend_direction: Some(100.0),
            ..ScoringMetrics::default()
        };
        assert_eq!(breakdown(&m).competitive_score, 100);
    }

    #[test]
    fn scores_stay_in_bounds_for_extreme_inputs() {
        let extremes = [
            ScoringMetrics::default(),
            ScoringMetrics {
                average_rating: 50.0,
                total_reviews: u64::MAX,
                recent_reviews: u64::MAX,
                response_rate: 1e9,
                impressions: u64::MAX,
                call_clicks: u64::MAX,
                website_clicks: u64::MAX,
                bookings: Some(u64::MAX),
                profile_photos: u32::MAX,
                recent_posts: u32::MAX,
                profile_completeness: 500.0,
                qa_activity: u32::MAX,
                market_position: Some(1e6),
                consistency: Some(f64::INFINITY),
                trend_direction: Some(250.0),
            },
            ScoringMetrics {
                average_rating: f64::NAN,
                response_rate: -40.0,
                profile_completeness: f64::NEG_INFINITY,
                impressions: 1,
                call_clicks: 1_000,
                market_position: Some(-10.0),
                consistency: Some(f64::NAN),
                ..ScoringMetrics::default()
            },
        ];
        for m in &extremes {
            let b = calculate_visibility_score(m).breakdown;
            for s in [
                b.reviews_score,
                b.performance_score,
                b.profile_score,
                b.competitive_score,
                b.total_score,
            ] {
                assert!(s <= 100, "{b:?}");
            }
        }
    }

    #[test]
    fn grade_is_monotonic_in_total() {
        let mut previous = Grade::from_score(0);
        assert_eq!(previous, Grade::F);
        for total in 1..=100u8 {
            let g = Grade::from_score(total);
            assert!(g >= previous, "grade dropped at {total}");
            previous = g;
        }
        assert_eq!(Grade::from_score(95), Grade::APlus);
        assert_eq!(Grade::from_score(94), Grade::A);
        assert_eq!(Grade::from_score(60), Grade::D);
        assert_eq!(Grade::from_score(59), Grade::F);
    }

    #[test]
    fn ties_with_reviews_pick_reviews() {
        let b = ScoringBreakdown {
            reviews_score: 40,
            performance_score: 40,
            profile_score: 40,
            competitive_score: 90,
            total_score: 0,
        };
        assert_eq!(weakest_component(&b), Component::Reviews);
        let b = ScoringBreakdown {
            reviews_score: 41,
            performance_score: 90,
            profile_score: 40,
            competitive_score: 40,
            total_score: 0,
        };
        assert_eq!(weakest_component(&b), Component::Profile);
    }

    #[test]
    fn recent_review_rate_guards_zero_total() {
        let m = ScoringMetrics {
            recent_reviews: 3,
            total_reviews: 0,
            ..ScoringMetrics::default()
        };
        assert_eq!(key_ratios(&m).recent_review_rate, 0.0);
        let m = ScoringMetrics {
            recent_reviews: 5,
            total_reviews: 20,
            ..ScoringMetrics::default()
        };
        assert_eq!(key_ratios(&m).recent_review_rate, 25.0);
    }

    #[test]
    fn low_scores_get_the_poor_band() {
        let details = calculate_visibility_score(&ScoringMetrics::default());
        assert_eq!(details.grade, Grade::F);
        assert!(details.interpretation.starts_with("Poor visibility"));
        assert_eq!(details.recommendations.len(), 5);
    }

    #[test]
    fn grade_serializes_as_letter() {
        assert_eq!(serde_json::to_value(Grade::BPlus).unwrap(), "B+");
    }
}
