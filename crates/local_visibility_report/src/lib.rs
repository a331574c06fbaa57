//! One-shot visibility report for a single location: acquire insights,
//! reviews and profile data, then score them.

use chrono::{Days, NaiveDate};
use local_visibility_client::config::ClientConfig;
use local_visibility_client::types::Period;
use local_visibility_client::{
    AggregatedInsights, Credentials, ProfileSignals, ReviewSummary, ScoringDetails,
    ScoringMetrics, VisibilityClient, calculate_visibility_score,
};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::info;

pub mod error;
mod test_utils;

pub use error::{ReportError, ReportResult};

/// Length of the default reporting window, ending yesterday.
pub const DEFAULT_WINDOW_DAYS: u64 = 30;

/// Filter used when the configured directive does not parse.
pub const DEFAULT_LOG_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Log filter directive from `LOCAL_VISIBILITY_LOG_LEVEL`, falling back to
/// `RUST_LOG`, then `info`. HTTP internals stay at `warn`.
pub fn log_filter_directive<F>(mut get: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let level = match non_empty(get("LOCAL_VISIBILITY_LOG_LEVEL")) {
        Some(level) => level,
        None => non_empty(get("RUST_LOG")).unwrap_or_else(|| "info".to_string()),
    };
    format!("{level},hyper=warn,reqwest=warn")
}

#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub credentials: Credentials,
    pub location_id: String,
    /// Reviews are skipped when no account is configured.
    pub account_id: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub profile_photos: u32,
    pub recent_posts: u32,
    pub qa_activity: u32,
    pub client: ClientConfig,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_date(key: &str, raw: Option<String>) -> ReportResult<Option<NaiveDate>> {
    non_empty(raw)
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| ReportError::Config(format!("{key}={s:?} is not YYYY-MM-DD: {e}")))
        })
        .transpose()
}

fn parse_count(key: &str, raw: Option<String>) -> ReportResult<u32> {
    match non_empty(raw) {
        None => Ok(0),
        Some(s) => s
            .parse::<u32>()
            .map_err(|e| ReportError::Config(format!("{key}={s:?}: {e}"))),
    }
}

impl ReportConfig {
    pub fn from_env(today: NaiveDate) -> ReportResult<Self> {
        Self::from_env_with(|k| std::env::var(k).ok(), today)
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F, today: NaiveDate) -> ReportResult<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let token = non_empty(get("LOCAL_VISIBILITY_ACCESS_TOKEN"))
            .ok_or_else(|| ReportError::Config("LOCAL_VISIBILITY_ACCESS_TOKEN is required".into()))?;
        let location_id = non_empty(get("LOCAL_VISIBILITY_LOCATION_ID"))
            .ok_or_else(|| ReportError::Config("LOCAL_VISIBILITY_LOCATION_ID is required".into()))?;
        let account_id = non_empty(get("LOCAL_VISIBILITY_ACCOUNT_ID"));

        let start = parse_date("LOCAL_VISIBILITY_START_DATE", get("LOCAL_VISIBILITY_START_DATE"))?;
        let end = parse_date("LOCAL_VISIBILITY_END_DATE", get("LOCAL_VISIBILITY_END_DATE"))?;
        let (start, end) = resolve_window(start, end, today)?;

        let profile_photos = parse_count(
            "LOCAL_VISIBILITY_PROFILE_PHOTOS",
            get("LOCAL_VISIBILITY_PROFILE_PHOTOS"),
        )?;
        let recent_posts = parse_count(
            "LOCAL_VISIBILITY_RECENT_POSTS",
            get("LOCAL_VISIBILITY_RECENT_POSTS"),
        )?;
        let qa_activity =
            parse_count("LOCAL_VISIBILITY_QA_ACTIVITY", get("LOCAL_VISIBILITY_QA_ACTIVITY"))?;

        let client = ClientConfig::from_env_with(&mut get)?;

        Ok(Self {
            credentials: Credentials::new(token),
            location_id,
            account_id,
            start,
            end,
            profile_photos,
            recent_posts,
            qa_activity,
            client,
        })
    }
}

/// Fill in missing window bounds: the end defaults to yesterday and the start
/// to `DEFAULT_WINDOW_DAYS` days ending at `end`.
pub fn resolve_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> ReportResult<(NaiveDate, NaiveDate)> {
    let out_of_range = || ReportError::Validation("date out of range".into());
    let end = match end {
        Some(d) => d,
        None => today.checked_sub_days(Days::new(1)).ok_or_else(out_of_range)?,
    };
    let start = match start {
        Some(d) => d,
        None => end
            .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS - 1))
            .ok_or_else(out_of_range)?,
    };
    if start > end {
        return Err(ReportError::Validation(format!(
            "start date {start} is after end date {end}"
        )));
    }
    Ok((start, end))
}

#[derive(Clone, Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityReport {
    pub location_id: String,
    pub title: Option<String>,
    pub period: Period,
    pub insights: AggregatedInsights,
    pub reviews: ReviewSummary,
    pub profile: ProfileSignals,
    pub metrics: ScoringMetrics,
    pub score: ScoringDetails,
}

/// Acquire every input for one location and score it. The three upstream
/// reads run concurrently; each already degrades on its own.
pub async fn build_report(
    client: &dyn VisibilityClient,
    config: &ReportConfig,
) -> ReportResult<VisibilityReport> {
    let credentials = &config.credentials;
    let location_id = config.location_id.as_str();

    let insights = client.fetch_insights(credentials, location_id, config.start, config.end);
    let reviews = async {
        match config.account_id.as_deref() {
            Some(account_id) => {
                client
                    .fetch_review_summary(credentials, account_id, location_id, config.end)
                    .await
            }
            None => {
                info!(location_id, "no account configured, skipping reviews");
                Ok(ReviewSummary::default())
            }
        }
    };
    let profile = client.fetch_location_profile(credentials, location_id);
    let (insights, reviews, profile) = tokio::try_join!(insights, reviews, profile)?;

    let signals = ProfileSignals {
        profile_photos: config.profile_photos,
        recent_posts: config.recent_posts,
        profile_completeness: f64::from(profile.completeness()),
        qa_activity: config.qa_activity,
    };
    let metrics = ScoringMetrics::from_sources(&insights, &reviews, &signals);
    let score = calculate_visibility_score(&metrics);
    info!(
        location_id,
        total = score.breakdown.total_score,
        grade = score.grade.as_str(),
        "location scored"
    );

    Ok(VisibilityReport {
        location_id: config.location_id.clone(),
        title: profile.title,
        period: insights.period,
        insights,
        reviews,
        profile: signals,
        metrics,
        score,
    })
}

/// JSON schema of the report document.
pub fn report_schema() -> ReportResult<String> {
    let schema = schemars::schema_for!(VisibilityReport);
    Ok(serde_json::to_string_pretty(&schema)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockClient;
    use local_visibility_client::{Grade, InsightsError};
    use std::collections::HashMap;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    fn env(pairs: &[(&str, &str)]) -> impl FnMut(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    fn base_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("LOCAL_VISIBILITY_ACCESS_TOKEN", "tok"),
            ("LOCAL_VISIBILITY_LOCATION_ID", "123"),
        ]
    }

    #[test]
    fn config_defaults_to_thirty_days_ending_yesterday() {
        let cfg = ReportConfig::from_env_with(env(&base_env()), today()).unwrap();
        assert_eq!(cfg.end, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
        assert_eq!(cfg.start, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(cfg.account_id, None);
        assert_eq!(cfg.profile_photos, 0);
        assert_eq!(cfg.client.retry.max_attempts, 3);
    }

    #[test]
    fn config_reads_explicit_values() {
        let mut pairs = base_env();
        pairs.extend([
            ("LOCAL_VISIBILITY_ACCOUNT_ID", "acc"),
            ("LOCAL_VISIBILITY_START_DATE", "2025-01-01"),
            ("LOCAL_VISIBILITY_END_DATE", "2025-01-31"),
            ("LOCAL_VISIBILITY_PROFILE_PHOTOS", "12"),
            ("LOCAL_VISIBILITY_MAX_ATTEMPTS", "5"),
        ]);
        let cfg = ReportConfig::from_env_with(env(&pairs), today()).unwrap();
        assert_eq!(cfg.account_id.as_deref(), Some("acc"));
        assert_eq!(cfg.start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(cfg.end, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(cfg.profile_photos, 12);
        assert_eq!(cfg.client.retry.max_attempts, 5);
        // the token never shows up in debug output
        assert!(!format!("{cfg:?}").contains("tok\""));
    }

    #[test]
    fn config_requires_token_and_location() {
        let err = ReportConfig::from_env_with(env(&[]), today()).unwrap_err();
        assert!(err.to_string().contains("LOCAL_VISIBILITY_ACCESS_TOKEN"));

        let err = ReportConfig::from_env_with(
            env(&[("LOCAL_VISIBILITY_ACCESS_TOKEN", "tok"), ("LOCAL_VISIBILITY_LOCATION_ID", " ")]),
            today(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("LOCAL_VISIBILITY_LOCATION_ID"));
    }

    #[test]
    fn config_rejects_bad_values() {
        let mut pairs = base_env();
        pairs.push(("LOCAL_VISIBILITY_START_DATE", "01/02/2025"));
        assert!(matches!(
            ReportConfig::from_env_with(env(&pairs), today()),
            Err(ReportError::Config(_))
        ));

        let mut pairs = base_env();
        pairs.push(("LOCAL_VISIBILITY_QA_ACTIVITY", "-1"));
        assert!(matches!(
            ReportConfig::from_env_with(env(&pairs), today()),
            Err(ReportError::Config(_))
        ));

        let mut pairs = base_env();
        pairs.push(("LOCAL_VISIBILITY_TIMEOUT_SECS", "0"));
        assert!(matches!(
            ReportConfig::from_env_with(env(&pairs), today()),
            Err(ReportError::Api(InsightsError::Config(_)))
        ));
    }

    #[test]
    fn window_rejects_reversed_range() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 10);
        let end = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert!(matches!(
            resolve_window(start, end, today()),
            Err(ReportError::Validation(_))
        ));
    }

    fn config(account_id: Option<&str>) -> ReportConfig {
        ReportConfig {
            credentials: Credentials::new("tok"),
            location_id: "123".into(),
            account_id: account_id.map(str::to_string),
            start: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            profile_photos: 8,
            recent_posts: 3,
            qa_activity: 4,
            client: ClientConfig::default(),
        }
    }

    #[tokio::test]
    async fn report_combines_all_sources() {
        let client = MockClient::default();
        let report = build_report(&client, &config(Some("acc"))).await.unwrap();

        assert_eq!(report.title.as_deref(), Some("Mock Bakery"));
        assert_eq!(report.metrics.impressions, 1000);
        assert_eq!(report.metrics.call_clicks, 20);
        assert_eq!(report.metrics.total_reviews, 80);
        assert_eq!(report.profile.profile_completeness, 100.0);
        assert_eq!(report.profile.profile_photos, 8);
        assert_eq!(report.period.end.day, 30);
        assert!(report.score.grade >= Grade::D);
        let mut calls = client.calls();
        calls.sort();
        assert_eq!(calls, vec!["insights", "profile", "reviews"]);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["score"]["breakdown"]["totalScore"].is_u64());
        assert_eq!(json["locationId"], "123");
    }

    #[tokio::test]
    async fn report_without_account_skips_reviews() {
        let client = MockClient::default();
        let report = build_report(&client, &config(None)).await.unwrap();
        assert_eq!(report.reviews, ReviewSummary::default());
        assert!(!client.calls().contains(&"reviews"));
    }

    #[tokio::test]
    async fn fatal_client_errors_propagate() {
        let client = MockClient::failing_reviews();
        let err = build_report(&client, &config(Some("acc"))).await.unwrap_err();
        assert!(matches!(err, ReportError::Api(InsightsError::Auth(_))));
    }

    #[test]
    fn schema_describes_report() {
        let schema = report_schema().unwrap();
        assert!(schema.contains("VisibilityReport"));
        assert!(schema.contains("totalScore"));
    }
}
