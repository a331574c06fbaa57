//! Counters emitted by the client. No recorder is installed here; without one
//! the macros are no-ops.

pub const HTTP_REQUESTS: &str = "visibility_http_requests_total";
pub const HTTP_RETRIES: &str = "visibility_http_retries_total";
pub const INSIGHTS_STRATEGY: &str = "visibility_insights_strategy_total";
pub const SANITIZED_VALUES: &str = "visibility_sanitized_values_total";

pub fn record_request(outcome: &'static str) {
    metrics::counter!(HTTP_REQUESTS, "outcome" => outcome).increment(1);
}

pub fn record_retry() {
    metrics::counter!(HTTP_RETRIES).increment(1);
}

pub fn record_strategy(strategy: &'static str) {
    metrics::counter!(INSIGHTS_STRATEGY, "strategy" => strategy).increment(1);
}

pub fn record_sanitized_value() {
    metrics::counter!(SANITIZED_VALUES).increment(1);
}
