//! Retrieval of listing pages with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`Fetch`]: Core trait for retrieving one document body by URL
//! - [`HttpFetcher`]: `reqwest` implementation with a bounded per-request timeout
//! - [`RetryFetch`]: Decorator that retries any `Fetch` on transient failures
//!
//! Every failure comes back as a [`FetchError`] value carrying the URL, so
//! callers can report a source without the error escaping the pipeline.
//!
//! # Retry Strategy
//!
//! - Only timeouts, transport errors, HTTP 429 and 5xx are retried
//! - Exponential backoff from a configurable base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Why a document could not be retrieved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not read body from {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// The URL the failed request was made to.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url }
            | FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Body { url, .. } => url,
        }
    }

    /// Whether trying again could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Body { .. } => false,
        }
    }

    fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if e.is_body() || e.is_decode() {
            FetchError::Body {
                url: url.to_string(),
                message: e.to_string(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// Trait for retrieving a remote document.
///
/// The returned future is `Send` so pipelines can run on any runtime worker.
pub trait Fetch {
    /// Fetch the body at `url` as text.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Fetches documents over HTTP(S) with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        if !status.is_success() {
            debug!(
                status = status.as_u16(),
                body_preview = %truncate_for_log(&body, 200),
                "Non-success response"
            );
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched document"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Fetch`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetcher to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: Fetch,
{
    /// Create a new retry wrapper around an existing [`Fetch`] implementation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpFetcher::new(Duration::from_secs(30))?;
    /// let fetcher = RetryFetch::new(http, 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    fn backoff(&self, attempt: usize) -> Duration {
        // Keep the shift within u32.
        let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Fetch for RetryFetch<T>
where
    T: Fetch + Sync,
{
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_retryable() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            retryable = e.is_retryable(),
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch() giving up"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.backoff(attempt) + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replays a fixed sequence of outcomes, one per call.
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<String, FetchError>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<String, FetchError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl Fetch for Scripted {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            *self.calls.lock().unwrap() += 1;
            let next = self.outcomes.lock().unwrap().pop_front();
            next.unwrap_or_else(|| {
                Err(FetchError::Body {
                    url: url.to_string(),
                    message: "script exhausted".to_string(),
                })
            })
        }
    }

    /// Fails every call with a 503.
    struct AlwaysDown {
        calls: Mutex<usize>,
    }

    impl Fetch for AlwaysDown {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            *self.calls.lock().unwrap() += 1;
            Err(server_error(url))
        }
    }

    fn server_error(url: &str) -> FetchError {
        FetchError::Status {
            url: url.to_string(),
            status: 503,
        }
    }

    #[test]
    fn test_retryable_classification() {
        let url = "https://example.com";
        assert!(FetchError::Timeout { url: url.into() }.is_retryable());
        assert!(server_error(url).is_retryable());
        assert!(
            FetchError::Status {
                url: url.into(),
                status: 429
            }
            .is_retryable()
        );
        assert!(
            !FetchError::Status {
                url: url.into(),
                status: 404
            }
            .is_retryable()
        );
        assert!(
            !FetchError::Body {
                url: url.into(),
                message: "bad utf-8".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_error_carries_url() {
        let e = server_error("https://nuc.example/federal");
        assert_eq!(e.url(), "https://nuc.example/federal");
        assert_eq!(
            e.to_string(),
            "https://nuc.example/federal responded with HTTP 503"
        );
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failure() {
        let url = "https://nuc.example/state";
        let inner = Scripted::new(vec![Err(server_error(url)), Ok("<table></table>".into())]);
        let fetcher = RetryFetch::new(inner, 3, Duration::from_millis(1));

        let body = fetcher.fetch(url).await.unwrap();
        assert_eq!(body, "<table></table>");
        assert_eq!(fetcher.inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let url = "https://nuc.example/state";
        let inner = Scripted::new(vec![
            Err(server_error(url)),
            Err(server_error(url)),
            Err(server_error(url)),
        ]);
        let fetcher = RetryFetch::new(inner, 1, Duration::from_millis(1));

        let err = fetcher.fetch(url).await.unwrap_err();
        assert_eq!(err, server_error(url));
        assert_eq!(fetcher.inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_does_not_repeat_permanent_failure() {
        let url = "https://nuc.example/gone";
        let not_found = FetchError::Status {
            url: url.to_string(),
            status: 404,
        };
        let inner = Scripted::new(vec![Err(not_found.clone()), Ok("unused".into())]);
        let fetcher = RetryFetch::new(inner, 5, Duration::from_millis(1));

        assert_eq!(fetcher.fetch(url).await.unwrap_err(), not_found);
        assert_eq!(fetcher.inner.calls(), 1);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let fetcher = RetryFetch::new(Scripted::new(vec![]), 3, Duration::from_secs(1));
        assert_eq!(fetcher.backoff(1), Duration::from_secs(1));
        assert_eq!(fetcher.backoff(2), Duration::from_secs(2));
        assert_eq!(fetcher.backoff(5), Duration::from_secs(16));
        assert_eq!(fetcher.backoff(6), Duration::from_secs(30));
        assert_eq!(fetcher.backoff(33), Duration::from_secs(30));
        assert_eq!(fetcher.backoff(usize::MAX), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_retries_do_not_overflow_backoff() {
        let url = "https://nuc.example/federal";
        let inner = AlwaysDown {
            calls: Mutex::new(0),
        };
        let fetcher = RetryFetch::new(inner, 40, Duration::ZERO);

        assert_eq!(fetcher.fetch(url).await.unwrap_err(), server_error(url));
        assert_eq!(*fetcher.inner.calls.lock().unwrap(), 41);
    }

    #[tokio::test]
    async fn test_http_fetcher_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/federal"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<table></table>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let body = fetcher
            .fetch(&format!("{}/federal", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<table></table>");
    }

    #[tokio::test]
    async fn test_http_fetcher_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/private"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let url = format!("{}/private", server.uri());
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert_eq!(err, FetchError::Status { url, status: 500 });
    }

    #[tokio::test]
    async fn test_http_fetcher_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let url = format!("{}/slow", server.uri());
        let fetcher = HttpFetcher::new(Duration::from_millis(100)).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert_eq!(err, FetchError::Timeout { url });
    }

    #[tokio::test]
    async fn test_http_fetcher_reports_unreachable_host() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:9/federal").await.unwrap_err();
        assert_eq!(err.url(), "http://127.0.0.1:9/federal");
        assert!(err.is_retryable());
    }
}
