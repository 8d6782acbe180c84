//! Rate-limited HTTP fetcher.
//!
//! The single network entry point for every adapter. Enforces a jittered
//! minimum/maximum delay between consecutive calls, retries transient
//! failures through a bounded backoff schedule, and surfaces reason-coded
//! errors so the orchestrator can decide whether to skip a page or stop
//! the run.

mod transport;

pub use transport::{HttpTransport, ReqwestTransport, TransportError, TransportResponse};

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// Pacing, timeout, and retry policy for one fetcher instance.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Lower bound of the jittered inter-request delay.
    pub min_delay: Duration,
    /// Upper bound of the jittered inter-request delay.
    pub max_delay: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries allowed after the initial attempt, for transient failures.
    pub max_retries: u32,
    /// Base of the exponential backoff schedule between retries.
    pub backoff_base: Duration,
    /// Fixed pause applied once after an HTTP 429 before the final attempt.
    pub rate_limit_pause: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(7),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
            rate_limit_pause: Duration::from_secs(60),
        }
    }
}

/// Why a fetch gave up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out or host unreachable")]
    Timeout,
    #[error("rate limited by server")]
    RateLimited,
    #[error("client error: HTTP {0}")]
    ClientError(u16),
    #[error("server error: HTTP {0}")]
    ServerError(u16),
    #[error("malformed request: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Sustained rate limiting and client errors mean the remaining pages
    /// of a run should be skipped rather than hammered.
    pub fn should_stop_run(&self) -> bool {
        matches!(self, Self::RateLimited | Self::ClientError(_))
    }
}

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

/// Exponential backoff delay for a retry attempt, capped at 60s.
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let millis = (base.as_millis() as u64).saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(millis.min(60_000))
}

/// Paced, retrying HTTP fetcher.
///
/// Pacing state is per instance: one fetcher drives one source, so two
/// sources scraped concurrently do not share a request cadence.
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    config: FetchConfig,
    last_request: Mutex<Option<Instant>>,
}

impl Fetcher {
    /// Create a fetcher backed by a real HTTP client.
    pub fn new(config: FetchConfig, user_agent: &str) -> Self {
        let transport = Arc::new(ReqwestTransport::new(user_agent, config.timeout));
        Self::with_transport(transport, config)
    }

    /// Create a fetcher over an arbitrary transport (tests use this).
    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: FetchConfig) -> Self {
        Self {
            transport,
            config,
            last_request: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch a URL, honoring pacing, bounded retry, and 429 handling.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        if let Err(e) = Url::parse(url) {
            return Err(FetchError::Malformed(format!("{url}: {e}")));
        }

        self.pace().await;

        let mut retries_used: u32 = 0;
        let mut paused_for_rate_limit = false;

        loop {
            let outcome = match self.transport.get(url).await {
                Ok(response) => response,
                Err(TransportError::Malformed(reason)) => {
                    return Err(FetchError::Malformed(reason));
                }
                Err(TransportError::Timeout) | Err(TransportError::Connect(_)) => {
                    if retries_used >= self.config.max_retries {
                        return Err(FetchError::Timeout);
                    }
                    retries_used += 1;
                    let delay = backoff_delay(retries_used, self.config.backoff_base);
                    debug!(url, attempt = retries_used, ?delay, "retrying after connection failure");
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            match outcome.status {
                status if (200..300).contains(&status) => {
                    return Ok(FetchedPage {
                        status,
                        body: outcome.body,
                    });
                }
                429 => {
                    if paused_for_rate_limit {
                        warn!(url, "still rate limited after pause, giving up");
                        return Err(FetchError::RateLimited);
                    }
                    paused_for_rate_limit = true;
                    let pause = outcome.retry_after.unwrap_or(self.config.rate_limit_pause);
                    warn!(url, ?pause, "rate limited (HTTP 429), backing off once");
                    tokio::time::sleep(pause).await;
                }
                status if (400..500).contains(&status) => {
                    return Err(FetchError::ClientError(status));
                }
                status => {
                    // 5xx and anything else unexpected: transient.
                    if retries_used >= self.config.max_retries {
                        return Err(FetchError::ServerError(status));
                    }
                    retries_used += 1;
                    let delay = backoff_delay(retries_used, self.config.backoff_base);
                    debug!(url, status, attempt = retries_used, ?delay, "retrying after server error");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Sleep out the remainder of a jittered delay since the last request,
    /// then stamp this request as the new reference point.
    async fn pace(&self) {
        let span_ms = {
            let min = self.config.min_delay.as_millis() as u64;
            let max = (self.config.max_delay.as_millis() as u64).max(min);
            let mut rng = rand::thread_rng();
            rng.gen_range(min..=max)
        };
        let target = Duration::from_millis(span_ms);

        let wait = {
            let last = self.last_request.lock().await;
            match *last {
                Some(at) => target.saturating_sub(at.elapsed()),
                None => Duration::ZERO,
            }
        };
        if wait > Duration::ZERO {
            debug!(?wait, "pacing before next request");
            tokio::time::sleep(wait).await;
        }
        *self.last_request.lock().await = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that replays a fixed script of responses.
    struct ScriptedTransport {
        script: Vec<Result<TransportResponse, TransportError>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<TransportResponse, TransportError>>) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(&self, _url: &str) -> Result<TransportResponse, TransportError> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.get(index) {
                Some(Ok(r)) => Ok(r.clone()),
                Some(Err(TransportError::Timeout)) => Err(TransportError::Timeout),
                Some(Err(TransportError::Connect(s))) => Err(TransportError::Connect(s.clone())),
                Some(Err(TransportError::Malformed(s))) => {
                    Err(TransportError::Malformed(s.clone()))
                }
                None => panic!("transport called more times than scripted"),
            }
        }
    }

    fn status(code: u16) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status: code,
            body: format!("body-{code}"),
            retry_after: None,
        })
    }

    fn fast_config() -> FetchConfig {
        FetchConfig {
            min_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(50),
            max_retries: 2,
            backoff_base: Duration::from_millis(1),
            rate_limit_pause: Duration::from_millis(5),
        }
    }

    fn fetcher(script: Vec<Result<TransportResponse, TransportError>>) -> (Fetcher, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(script));
        let fetcher = Fetcher::with_transport(transport.clone(), fast_config());
        (fetcher, transport)
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let (fetcher, transport) = fetcher(vec![status(200)]);
        let page = fetcher.fetch("https://example.com/jobs").await.unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.body, "body-200");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_server_error_exhausts_exactly_max_retries() {
        // Three 500s against max_retries = 2: initial attempt plus two
        // retries, then a terminal ServerError.
        let (fetcher, transport) = fetcher(vec![status(500), status(500), status(500)]);
        let err = fetcher.fetch("https://example.com/jobs").await.unwrap_err();
        assert_eq!(err, FetchError::ServerError(500));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_server_error_then_recovery() {
        let (fetcher, transport) = fetcher(vec![status(500), status(200)]);
        let page = fetcher.fetch("https://example.com/jobs").await.unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (fetcher, transport) = fetcher(vec![status(404)]);
        let err = fetcher.fetch("https://example.com/jobs").await.unwrap_err();
        assert_eq!(err, FetchError::ClientError(404));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_backs_off_once_then_surfaces() {
        let (fetcher, transport) = fetcher(vec![status(429), status(429)]);
        let err = fetcher.fetch("https://example.com/jobs").await.unwrap_err();
        assert_eq!(err, FetchError::RateLimited);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_recovers_after_pause() {
        let (fetcher, transport) = fetcher(vec![status(429), status(200)]);
        let page = fetcher.fetch("https://example.com/jobs").await.unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_timeout_retried_then_terminal() {
        let (fetcher, transport) = fetcher(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
        ]);
        let err = fetcher.fetch("https://example.com/jobs").await.unwrap_err();
        assert_eq!(err, FetchError::Timeout);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_malformed_url_fails_without_request() {
        let (fetcher, transport) = fetcher(vec![]);
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_backoff_delay_schedule() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(0, base), Duration::from_millis(500));
        assert_eq!(backoff_delay(1, base), Duration::from_secs(1));
        assert_eq!(backoff_delay(2, base), Duration::from_secs(2));
        // Capped.
        assert_eq!(backoff_delay(20, base), Duration::from_secs(60));
    }
}
