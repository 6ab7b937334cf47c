//! HTTP transport seam used by [`RateLimitedFetcher`](crate::core::fetcher::RateLimitedFetcher).
//!
//! # Public API
//! - [`HttpTransport`]: One blocking GET with a per-call timeout
//! - [`HttpResponse`]: Status, body and lowercased headers of any completed request
//! - [`TransportError`]: Failures where no HTTP response was received
//! - [`UreqTransport`]: The real implementation on top of `ureq`
//! - [`ScriptedTransport`]: Canned responses per URL for offline runs and tests
//!
//! Every completed request is an `Ok(HttpResponse)`, whatever its status code. Deciding
//! what a 403 or 404 means is left to the fetcher and its callers.

use crate::core::clock::Clock;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::error::Error as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// Header names are stored lowercased
    pub headers: BTreeMap<String, String>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Timeouts and connection failures are worth retrying, malformed requests never are
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::InvalidRequest(_))
    }
}

pub trait HttpTransport: Send + Sync {
    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// Blocking HTTP client backed by a shared `ureq::Agent`
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(concat!("repo-deployer/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }

    fn convert(response: ureq::Response) -> HttpResponse {
        let status = response.status();
        let headers = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                response
                    .header(&name)
                    .map(|value| (name.to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        let body = response.into_string().unwrap_or_else(|e| {
            log::warn!("Failed to read response body: {e}");
            String::new()
        });

        HttpResponse {
            status,
            body,
            headers,
        }
    }

    fn classify(error: ureq::Transport) -> TransportError {
        let message = error.to_string();
        match error.kind() {
            ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => {
                TransportError::InvalidRequest(message)
            }
            ureq::ErrorKind::Io => {
                let timed_out = error
                    .source()
                    .and_then(|source| source.downcast_ref::<std::io::Error>())
                    .map(|io| {
                        matches!(
                            io.kind(),
                            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                        )
                    })
                    .unwrap_or(false);
                if timed_out {
                    TransportError::Timeout(message)
                } else {
                    TransportError::Connection(message)
                }
            }
            _ => TransportError::Connection(message),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for UreqTransport {
    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.agent.get(url).timeout(timeout);
        for (name, value) in headers {
            request = request.set(name, value);
        }

        match request.call() {
            Ok(response) => Ok(Self::convert(response)),
            // ureq reports 4xx/5xx as errors; they are ordinary responses here
            Err(ureq::Error::Status(_, response)) => Ok(Self::convert(response)),
            Err(ureq::Error::Transport(transport)) => Err(Self::classify(transport)),
        }
    }
}

/// One request seen by a [`ScriptedTransport`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    /// Clock reading at the moment of the call, if the transport has a clock
    pub at: Option<DateTime<Utc>>,
}

type ScriptedResult = Result<HttpResponse, TransportError>;

/// Transport that answers from a per-URL script.
///
/// Results queued for a URL are handed out in order and the last one repeats. URLs
/// without a script answer `404 Not Found`.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<ScriptedResult>>>,
    calls: Mutex<Vec<RecordedCall>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp each recorded call with the clock's reading
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock: Some(clock),
            ..Self::default()
        }
    }

    pub fn push(&self, url: impl Into<String>, result: ScriptedResult) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes.entry(url.into()).or_default().push_back(result);
    }

    pub fn respond(&self, url: impl Into<String>, response: HttpResponse) {
        self.push(url, Ok(response));
    }

    pub fn fail(&self, url: impl Into<String>, error: TransportError) {
        self.push(url, Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|call| call.url == url).count()
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                url: url.to_string(),
                headers: headers.to_vec(),
                timeout,
                at: self.clock.as_ref().map(|clock| clock.now()),
            });

        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "Not Found"))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "Not Found"))),
            None => Ok(HttpResponse::new(404, "Not Found")),
        }
    }
}
