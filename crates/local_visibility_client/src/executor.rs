//! Single-call HTTP executor with bounded retries.
//!
//! Retries 408/429/5xx responses and timeout/reset transport failures.
//! Other statuses come back as an [`ApiResponse`] for the caller to interpret,
//! except 401 which is surfaced as [`InsightsError::Auth`].

use crate::retry::{RetryPolicy, is_retryable_status};
use crate::{Credentials, InsightsError, observability};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::{debug, warn};

const BODY_SNIPPET_CHARS: usize = 256;

/// A GET against one of the upstream hosts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn queries(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }
}

/// How a non-success response should be treated by the fallback chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// 403
    PermissionDenied,
    /// 404
    Unavailable,
    /// 400, possibly naming unsupported metrics
    MalformedRequest,
    Other(u16),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `None` for 2xx responses.
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self.status {
            200..=299 => None,
            403 => Some(FailureClass::PermissionDenied),
            404 => Some(FailureClass::Unavailable),
            400 => Some(FailureClass::MalformedRequest),
            other => Some(FailureClass::Other(other)),
        }
    }

    pub fn body_snippet(&self) -> String {
        self.body.chars().take(BODY_SNIPPET_CHARS).collect()
    }

    /// Decode the body, reporting a snippet of it on failure.
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T, InsightsError> {
        if self.body.trim().is_empty() {
            return serde_json::from_str("{}").map_err(|e| InsightsError::Decode {
                context: context.to_string(),
                message: e.to_string(),
            });
        }
        serde_json::from_str(&self.body).map_err(|e| InsightsError::Decode {
            context: context.to_string(),
            message: format!("{e} - body: {}", self.body_snippet()),
        })
    }
}

enum AttemptError {
    Tls(String),
    Transient(String),
    Fatal(reqwest::Error),
}

/// Issues one logical request, retrying transient failures per [`RetryPolicy`].
#[derive(Clone, Debug)]
pub struct RequestExecutor {
    client: reqwest::Client,
    policy: RetryPolicy,
    timeout: Duration,
}

impl RequestExecutor {
    pub fn new(policy: RetryPolicy, timeout: Duration) -> Result<Self, InsightsError> {
        let client = reqwest::Client::builder().gzip(true).build()?;
        Ok(Self::with_client(client, policy, timeout))
    }

    pub fn with_client(client: reqwest::Client, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            client,
            policy,
            timeout,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute(
        &self,
        credentials: &Credentials,
        request: &ApiRequest,
    ) -> Result<ApiResponse, InsightsError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let failure = match self.attempt(credentials, request).await {
                Ok(resp) if resp.status == 401 => {
                    observability::record_request("auth_failed");
                    return Err(InsightsError::Auth(resp.body_snippet()));
                }
                Ok(resp) if is_retryable_status(resp.status) => {
                    format!("HTTP {}: {}", resp.status, resp.body_snippet())
                }
                Ok(resp) => {
                    observability::record_request(if resp.is_success() {
                        "success"
                    } else {
                        "rejected"
                    });
                    return Ok(resp);
                }
                Err(AttemptError::Tls(msg)) => {
                    observability::record_request("tls_failed");
                    return Err(InsightsError::Tls(msg));
                }
                Err(AttemptError::Fatal(e)) => {
                    observability::record_request("transport_failed");
                    return Err(InsightsError::Transport(e));
                }
                Err(AttemptError::Transient(msg)) => msg,
            };

            if attempt >= max_attempts {
                observability::record_request("retries_exhausted");
                return Err(InsightsError::RetriesExhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            let wait = self.policy.delay_for(attempt);
            warn!(
                url = %request.url,
                attempt,
                max_attempts,
                error = %failure,
                wait_ms = wait.as_millis() as u64,
                "transient upstream failure, retrying"
            );
            observability::record_retry();
            tokio::time::sleep(wait).await;
        }
    }

    async fn attempt(
        &self,
        credentials: &Credentials,
        request: &ApiRequest,
    ) -> Result<ApiResponse, AttemptError> {
        let resp = self
            .client
            .get(&request.url)
            .query(&request.query)
            .bearer_auth(credentials.access_token.expose_secret())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify_transport_error)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(classify_transport_error)?;
        debug!(url = %request.url, status, "upstream response");
        Ok(ApiResponse { status, body })
    }
}

fn classify_transport_error(err: reqwest::Error) -> AttemptError {
    let chain = error_chain(&err);
    if err.is_timeout() {
        return AttemptError::Transient(format!("timeout: {chain}"));
    }
    // the top-level message embeds the request URL, so only causes are scanned
    if mentions_tls(&source_chain(&err)) {
        return AttemptError::Tls(chain);
    }
    if err.is_connect() || err.is_body() || is_connection_reset(&err) {
        return AttemptError::Transient(chain);
    }
    AttemptError::Fatal(err)
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let causes = source_chain(err);
    if causes.is_empty() {
        err.to_string()
    } else {
        format!("{err}: {causes}")
    }
}

fn source_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = Vec::new();
    let mut source = err.source();
    while let Some(s) = source {
        parts.push(s.to_string());
        source = s.source();
    }
    parts.join(": ")
}

fn is_connection_reset(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(s) = source {
        if let Some(io) = s.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = s.source();
    }
    false
}

/// Heuristic over a rendered error chain; reqwest does not expose a TLS kind.
pub(crate) fn mentions_tls(chain: &str) -> bool {
    let lower = chain.to_ascii_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| lower.contains(needle))
}
