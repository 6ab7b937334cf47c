//! Rate-limited HTTP fetching against the source-control content API.
//!
//! [`RateLimitedFetcher`] spaces consecutive requests by a minimum interval and retries
//! rate-limited or timed-out requests according to a [`RetryPolicy`]. All waiting goes
//! through the injected [`Clock`], so spacing and backoff are testable without delays.
//!
//! # Retry rules
//! - **403 with rate-limit signal, `remaining == 0`**: wait until `reset + 10s`, retry
//! - **403 with rate-limit signal, quota left**: back off on the delay ladder, retry
//! - **Timeout / connection failure**: back off on the delay ladder, retry
//! - **Any other response**: returned as-is, never retried
//! - **Malformed request**: permanent failure, never retried

use crate::core::clock::{elapsed_between, Clock};
use crate::core::error::{DeployerError, Result};
use crate::core::transport::{HttpResponse, HttpTransport, TransportError};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);
pub const TREE_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONTENT_TIMEOUT: Duration = Duration::from_secs(10);

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// What happened on one request attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    Response(u16),
    RateLimited,
    Transport(TransportError),
}

/// One HTTP call made by the fetcher. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub url: String,
    /// Zero-based attempt index within one `fetch`
    pub attempt: usize,
    /// Time spent waiting for the request spacing before the call went out
    pub waited: Duration,
    pub status: AttemptStatus,
    pub remaining: Option<u64>,
    pub reset_epoch: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Hand the response back to the caller
    Return,
    /// Sleep for the delay, then try again
    Retry { delay: Duration, reason: String },
    /// Stop immediately with a permanent failure
    Abort { reason: String },
}

/// Retry limits and delays consumed by [`RateLimitedFetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delays: Vec<Duration>,
    /// Added to the rate-limit reset time before retrying an exhausted quota
    pub reset_buffer: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delays: [1, 2, 5, 10, 30]
                .into_iter()
                .map(Duration::from_secs)
                .collect(),
            reset_buffer: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Ladder delay for a zero-based attempt, clamped to the last rung
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        match self.delays.len() {
            0 => Duration::ZERO,
            len => self.delays[attempt.min(len - 1)],
        }
    }

    /// Decide what to do after `attempt`, given the current epoch second
    pub fn decide(&self, attempt: &FetchAttempt, now_epoch: i64) -> RetryDecision {
        match &attempt.status {
            AttemptStatus::Response(_) => RetryDecision::Return,
            AttemptStatus::RateLimited if attempt.remaining.unwrap_or(0) == 0 => {
                let reset = attempt.reset_epoch.unwrap_or(0);
                let buffer = i64::try_from(self.reset_buffer.as_secs()).unwrap_or(i64::MAX);
                let wait = u64::try_from(reset.saturating_sub(now_epoch).saturating_add(buffer))
                    .unwrap_or(0);
                RetryDecision::Retry {
                    delay: Duration::from_secs(wait),
                    reason: format!("GitHub API rate limited. Waiting {wait} seconds..."),
                }
            }
            AttemptStatus::RateLimited => {
                let delay = self.backoff_delay(attempt.attempt);
                RetryDecision::Retry {
                    delay,
                    reason: format!(
                        "GitHub API rate limited. Retrying in {} seconds...",
                        delay.as_secs()
                    ),
                }
            }
            AttemptStatus::Transport(error) if error.is_retryable() => {
                let delay = self.backoff_delay(attempt.attempt);
                RetryDecision::Retry {
                    delay,
                    reason: format!("{error}. Retrying in {} seconds...", delay.as_secs()),
                }
            }
            AttemptStatus::Transport(error) => RetryDecision::Abort {
                reason: error.to_string(),
            },
        }
    }
}

/// Whether a response is GitHub's rate-limit rejection rather than a permission error
pub fn is_rate_limited(response: &HttpResponse) -> bool {
    response.status == 403
        && (response.body.to_lowercase().contains("rate limit")
            || response.header(RATE_LIMIT_REMAINING).is_some())
}

pub struct RateLimitedFetcher {
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    min_interval: Duration,
    default_headers: Vec<(String, String)>,
    last_request: Mutex<Option<DateTime<Utc>>>,
    last_attempts: Mutex<Vec<FetchAttempt>>,
}

impl RateLimitedFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            transport,
            clock,
            policy: RetryPolicy::default(),
            min_interval: DEFAULT_MIN_INTERVAL,
            default_headers: Vec::new(),
            last_request: Mutex::new(None),
            last_attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    /// Send `Authorization: token <token>` with every request
    pub fn with_token(mut self, token: Option<&str>) -> Self {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.default_headers
                .push(("Authorization".to_string(), format!("token {token}")));
        }
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Attempts made by the most recent `fetch`
    pub fn last_attempts(&self) -> Vec<FetchAttempt> {
        self.last_attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Block until the minimum spacing since the previous request has elapsed
    fn wait_if_needed(&self) -> Duration {
        let mut last_request = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
        let mut waited = Duration::ZERO;

        if let Some(previous) = *last_request {
            let since_last = elapsed_between(previous, self.clock.now());
            if since_last < self.min_interval {
                waited = self.min_interval - since_last;
                self.clock.sleep(waited);
            }
        }

        *last_request = Some(self.clock.now());
        waited
    }

    fn attempt_once(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
        attempt: usize,
    ) -> (FetchAttempt, Option<HttpResponse>) {
        let waited = self.wait_if_needed();
        let result = self.transport.get(url, headers, timeout);

        let (status, response) = match result {
            Ok(response) if is_rate_limited(&response) => (AttemptStatus::RateLimited, Some(response)),
            Ok(response) => (AttemptStatus::Response(response.status), Some(response)),
            Err(error) => (AttemptStatus::Transport(error), None),
        };

        let remaining = response
            .as_ref()
            .and_then(|r| r.header(RATE_LIMIT_REMAINING))
            .and_then(|v| v.trim().parse().ok());
        let reset_epoch = response
            .as_ref()
            .and_then(|r| r.header(RATE_LIMIT_RESET))
            .and_then(|v| v.trim().parse().ok());

        let record = FetchAttempt {
            url: url.to_string(),
            attempt,
            waited,
            status,
            remaining,
            reset_epoch,
        };
        (record, response)
    }

    /// GET `url` with spacing and retries.
    ///
    /// Any non-rate-limited response comes back as `Ok`, including 4xx/5xx. Exhausted
    /// retries yield [`DeployerError::RetriesExhausted`]; malformed requests yield
    /// [`DeployerError::PermanentRequestFailure`].
    pub fn fetch(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse> {
        let mut all_headers = self.default_headers.clone();
        all_headers.extend(headers.iter().cloned());

        let mut attempts = Vec::new();
        let mut last_error = String::from("no attempts made");

        for attempt in 0..self.policy.max_attempts {
            let (record, response) = self.attempt_once(url, &all_headers, timeout, attempt);
            log::debug!(
                "GET {url} attempt {} -> {:?} (waited {:?})",
                attempt + 1,
                record.status,
                record.waited
            );

            let decision = self.policy.decide(&record, self.clock.now().timestamp());
            attempts.push(record);

            match decision {
                RetryDecision::Return => {
                    self.store_attempts(attempts);
                    return response.ok_or_else(|| {
                        DeployerError::permanent_request_failure(url, "no response received")
                    });
                }
                RetryDecision::Abort { reason } => {
                    log::error!("Request to {url} failed permanently: {reason}");
                    self.store_attempts(attempts);
                    return Err(DeployerError::permanent_request_failure(url, reason));
                }
                RetryDecision::Retry { delay, reason } => {
                    log::warn!("{reason}");
                    last_error = reason;
                    // No point waiting before an attempt that will never be made
                    if attempt + 1 < self.policy.max_attempts {
                        self.clock.sleep(delay);
                    }
                }
            }
        }

        log::error!("GitHub API request failed after all retries: {url}");
        let count = attempts.len();
        self.store_attempts(attempts);
        Err(DeployerError::retries_exhausted(url, count, last_error))
    }

    fn store_attempts(&self, attempts: Vec<FetchAttempt>) {
        *self.last_attempts.lock().unwrap_or_else(|e| e.into_inner()) = attempts;
    }
}
