//! Review aggregates from the legacy review host.

use crate::executor::{ApiRequest, RequestExecutor};
use crate::utils::{location_resource, parse_date_key};
use crate::{Credentials, InsightsError};
use chrono::{Duration, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Reviews created within this many days up to and including `as_of` count
/// as recent.
pub const RECENT_WINDOW_DAYS: i64 = 30;
const PAGE_SIZE: &str = "50";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub average_rating: f64,
    pub total_reviews: u64,
    pub recent_reviews: u64,
    /// Percentage (0-100) of fetched reviews carrying an owner reply.
    pub response_rate: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewsPage {
    #[serde(default)]
    reviews: Vec<WireReview>,
    average_rating: Option<f64>,
    total_review_count: Option<u64>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReview {
    star_rating: Option<String>,
    create_time: Option<String>,
    review_reply: Option<serde_json::Value>,
}

fn star_value(rating: &str) -> Option<f64> {
    match rating {
        "ONE" => Some(1.0),
        "TWO" => Some(2.0),
        "THREE" => Some(3.0),
        "FOUR" => Some(4.0),
        "FIVE" => Some(5.0),
        _ => None,
    }
}

#[derive(Debug)]
struct ReviewTally {
    recent_since: NaiveDate,
    as_of: NaiveDate,
    fetched: u64,
    replied: u64,
    recent: u64,
    star_sum: f64,
    starred: u64,
    reported_average: Option<f64>,
    reported_total: Option<u64>,
}

impl ReviewTally {
    fn new(as_of: NaiveDate) -> Self {
        Self {
            recent_since: as_of - Duration::days(RECENT_WINDOW_DAYS),
            as_of,
            fetched: 0,
            replied: 0,
            recent: 0,
            star_sum: 0.0,
            starred: 0,
            reported_average: None,
            reported_total: None,
        }
    }

    fn add_page(&mut self, page: &ReviewsPage) {
        self.reported_average = self.reported_average.or(page.average_rating);
        self.reported_total = self.reported_total.or(page.total_review_count);
        for review in &page.reviews {
            self.fetched += 1;
            if review.review_reply.as_ref().is_some_and(|r| !r.is_null()) {
                self.replied += 1;
            }
            if let Some(stars) = review.star_rating.as_deref().and_then(star_value) {
                self.star_sum += stars;
                self.starred += 1;
            }
            let created = review
                .create_time
                .as_deref()
                .and_then(parse_date_key)
                .and_then(|k| k.to_naive());
            if created.is_some_and(|d| d >= self.recent_since && d <= self.as_of) {
                self.recent += 1;
            }
        }
    }

    fn finish(self) -> ReviewSummary {
        let computed_average = if self.starred == 0 {
            0.0
        } else {
            self.star_sum / self.starred as f64
        };
        let average_rating = self
            .reported_average
            .filter(|a| a.is_finite() && (0.0..=5.0).contains(a))
            .unwrap_or(computed_average);
        let response_rate = if self.fetched == 0 {
            0.0
        } else {
            self.replied as f64 / self.fetched as f64 * 100.0
        };
        ReviewSummary {
            average_rating,
            total_reviews: self.reported_total.unwrap_or(self.fetched).max(self.fetched),
            recent_reviews: self.recent,
            response_rate,
        }
    }
}

/// Page through a location's reviews, up to `page_limit` pages.
///
/// Permission or availability failures end pagination and summarise whatever
/// was already fetched (an empty summary if nothing was).
pub async fn fetch_review_summary(
    executor: &RequestExecutor,
    base_url: &str,
    credentials: &Credentials,
    account_id: &str,
    location_id: &str,
    as_of: NaiveDate,
    page_limit: u32,
) -> Result<ReviewSummary, InsightsError> {
    let account = account_id.trim().trim_start_matches("accounts/");
    let url = format!(
        "{}/v4/accounts/{}/{}/reviews",
        base_url,
        account,
        location_resource(location_id)
    );

    let mut tally = ReviewTally::new(as_of);
    let mut page_token: Option<String> = None;
    for page_index in 0..page_limit.max(1) {
        let mut request = ApiRequest::get(&url).query("pageSize", PAGE_SIZE);
        if let Some(token) = page_token.take() {
            request = request.query("pageToken", token);
        }
        let resp = executor.execute(credentials, &request).await?;
        if let Some(class) = resp.failure_class() {
            warn!(location_id, page_index, ?class, "review page unavailable, stopping");
            break;
        }
        let page: ReviewsPage = resp.json("reviews page")?;
        tally.add_page(&page);
        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }
    if page_token.is_some() {
        debug!(location_id, page_limit, "review page limit reached");
    }
    Ok(tally.finish())
}
