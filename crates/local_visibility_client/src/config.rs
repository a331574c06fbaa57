use crate::InsightsError;
use crate::retry::RetryPolicy;
use std::time::Duration;

pub const DEFAULT_PERFORMANCE_BASE_URL: &str = "https://businessprofileperformance.googleapis.com";
pub const DEFAULT_LEGACY_BASE_URL: &str = "https://mybusiness.googleapis.com";
pub const DEFAULT_INFO_BASE_URL: &str = "https://mybusinessbusinessinformation.googleapis.com";

/// Hosts and transport limits. Credentials are deliberately absent: they are
/// passed per call so one client can serve many tenants.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub performance_base_url: String,
    pub legacy_base_url: String,
    pub info_base_url: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub review_page_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            performance_base_url: DEFAULT_PERFORMANCE_BASE_URL.into(),
            legacy_base_url: DEFAULT_LEGACY_BASE_URL.into(),
            info_base_url: DEFAULT_INFO_BASE_URL.into(),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            review_page_limit: 10,
        }
    }
}

impl ClientConfig {
    /// Point every API family at one host. Used against mock servers.
    pub fn single_host(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            performance_base_url: base.clone(),
            legacy_base_url: base.clone(),
            info_base_url: base,
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn from_env() -> Result<Self, InsightsError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, InsightsError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let url = |v: Option<String>, fallback: String| {
            v.map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(fallback)
        };

        let performance_base_url = url(
            get("LOCAL_VISIBILITY_PERFORMANCE_BASE_URL"),
            defaults.performance_base_url,
        );
        let legacy_base_url = url(
            get("LOCAL_VISIBILITY_LEGACY_BASE_URL"),
            defaults.legacy_base_url,
        );
        let info_base_url = url(get("LOCAL_VISIBILITY_INFO_BASE_URL"), defaults.info_base_url);

        let timeout_secs = parse_number(
            "LOCAL_VISIBILITY_TIMEOUT_SECS",
            get("LOCAL_VISIBILITY_TIMEOUT_SECS"),
            defaults.request_timeout.as_secs(),
        )?;
        let max_attempts = parse_number(
            "LOCAL_VISIBILITY_MAX_ATTEMPTS",
            get("LOCAL_VISIBILITY_MAX_ATTEMPTS"),
            u64::from(defaults.retry.max_attempts),
        )?;
        let review_page_limit = parse_number(
            "LOCAL_VISIBILITY_REVIEW_PAGE_LIMIT",
            get("LOCAL_VISIBILITY_REVIEW_PAGE_LIMIT"),
            u64::from(defaults.review_page_limit),
        )?;

        if timeout_secs == 0 {
            return Err(InsightsError::Config(
                "LOCAL_VISIBILITY_TIMEOUT_SECS must be positive".into(),
            ));
        }
        let max_attempts = u32::try_from(max_attempts)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                InsightsError::Config("LOCAL_VISIBILITY_MAX_ATTEMPTS must be 1..=u32::MAX".into())
            })?;
        let review_page_limit = u32::try_from(review_page_limit).map_err(|_| {
            InsightsError::Config("LOCAL_VISIBILITY_REVIEW_PAGE_LIMIT out of range".into())
        })?;

        Ok(Self {
            performance_base_url,
            legacy_base_url,
            info_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy {
                max_attempts,
                ..defaults.retry
            },
            review_page_limit,
        })
    }
}

fn parse_number(key: &str, raw: Option<String>, default: u64) -> Result<u64, InsightsError> {
    match raw {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| InsightsError::Config(format!("{key}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_uses_defaults_when_unset() {
        let cfg = ClientConfig::from_env_with(|_| None).expect("cfg");
        assert_eq!(cfg.performance_base_url, DEFAULT_PERFORMANCE_BASE_URL);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.review_page_limit, 10);
    }

    #[test]
    fn from_env_reads_values() {
        let get = |k: &str| match k {
            "LOCAL_VISIBILITY_PERFORMANCE_BASE_URL" => Some("http://localhost:9000/".into()),
            "LOCAL_VISIBILITY_TIMEOUT_SECS" => Some("5".into()),
            "LOCAL_VISIBILITY_MAX_ATTEMPTS" => Some("4".into()),
            _ => None,
        };
        let cfg = ClientConfig::from_env_with(get).expect("cfg");
        assert_eq!(cfg.performance_base_url, "http://localhost:9000");
        assert_eq!(cfg.legacy_base_url, DEFAULT_LEGACY_BASE_URL);
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.retry.max_attempts, 4);
    }

    #[test]
    fn from_env_rejects_garbage_numbers() {
        let get = |k: &str| (k == "LOCAL_VISIBILITY_TIMEOUT_SECS").then(|| "soon".to_string());
        let res = ClientConfig::from_env_with(get);
        assert!(matches!(res, Err(InsightsError::Config(_))));
    }

    #[test]
    fn from_env_rejects_zero_attempts() {
        let get = |k: &str| (k == "LOCAL_VISIBILITY_MAX_ATTEMPTS").then(|| "0".to_string());
        assert!(ClientConfig::from_env_with(get).is_err());
    }
}
