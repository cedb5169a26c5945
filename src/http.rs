//! HTTP transport with exponential backoff retry logic.
//!
//! Every network call the crawler makes (homepages, feeds, sitemaps,
//! articles, alias lookups) goes through [`HttpClient`]. It carries the
//! configured timeout and user agent, and transparently retries transient
//! failures.
//!
//! # Retry Strategy
//!
//! - Retried: HTTP 429/500/502/503/504, timeouts, connection failures
//! - At most `max_retries` additional attempts
//! - Exponential backoff starting at `retry_backoff`, capped at 30 seconds
//! - Random jitter (0-250ms) added to every delay
//!
//! A failure that survives the retries is final for that URL in this run.

use crate::config::CrawlerConfig;
use crate::error::{CrawlError, Result};
use rand::{Rng, rng};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Upper bound on the timeout used for HEAD probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared HTTP client with timeout, user agent, and retry policy baked in.
///
/// Cloning is cheap; clones share one connection pool. Discovery, article
/// extraction, and the alias sources all hold clones of the same client.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(retry_backoff * 2^(attempt-1), 30s) + random_jitter(0..250ms)
/// ```
#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
    /// Maximum number of retries before giving up.
    max_retries: u32,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: Duration,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl HttpClient {
    /// Build a client from the run configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies `timeout`, `user_agent`, `max_retries`, and `retry_backoff`
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Client`] if the TLS backend or client builder
    /// fails to initialize.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpClient::new(&config)?;
    /// let html = http.get_text("https://site.com/").await?;
    /// ```
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let timeout = config.timeout();
        let inner = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .build()
            .map_err(CrawlError::Client)?;

        Ok(Self {
            inner,
            timeout,
            max_retries: config.max_retries,
            base_delay: config.retry_backoff(),
            max_delay: Duration::from_secs(30),
        })
    }

    /// GET `url` and return the body as text.
    ///
    /// Transient failures (429, 5xx gateway errors, timeouts, connection
    /// errors) are retried with backoff up to `max_retries` times.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to fetch
    ///
    /// # Returns
    ///
    /// The decoded response body of the first 2xx answer.
    ///
    /// # Errors
    ///
    /// * [`CrawlError::Status`] - a non-2xx answer that is not retryable, or
    ///   the last one after retries ran out
    /// * [`CrawlError::Timeout`] - the request or body read timed out
    /// * [`CrawlError::Http`] - any other transport failure
    #[instrument(level = "debug", skip(self))]
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send_with_retry(Method::GET, url).await?;
        response
            .text()
            .await
            .map_err(|e| CrawlError::from_reqwest(url, e))
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// Same retry behavior as [`get_text`](Self::get_text).
    ///
    /// # Errors
    ///
    /// Everything [`get_text`](Self::get_text) can return, plus
    /// [`CrawlError::Json`] when the body does not decode as `T`.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|source| CrawlError::Json {
            url: url.to_string(),
            source,
        })
    }

    /// Single HEAD request; `true` only for a 2xx answer.
    ///
    /// Never retried and never an error, since a probe miss is the common
    /// case. The timeout is the configured one, capped at 10 seconds.
    pub async fn probe(&self, url: &str) -> bool {
        let outcome = self
            .inner
            .head(url)
            .timeout(self.timeout.min(PROBE_TIMEOUT))
            .send()
            .await;
        match outcome {
            Ok(resp) => {
                debug!(%url, status = %resp.status(), "Probe answered");
                resp.status().is_success()
            }
            Err(e) => {
                debug!(%url, error = %e, "Probe failed");
                false
            }
        }
    }

    async fn send_with_retry(&self, method: Method, url: &str) -> Result<Response> {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            let attempt_t0 = Instant::now();
            let outcome = match self.inner.request(method.clone(), url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => CrawlError::Status {
                    url: url.to_string(),
                    status: resp.status(),
                },
                Err(e) => CrawlError::from_reqwest(url, e),
            };

            if !outcome.is_retryable() || attempt >= self.max_retries {
                debug!(
                    %url,
                    attempt,
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    error = %outcome,
                    "Request failed"
                );
                return Err(outcome);
            }

            attempt += 1;
            let delay = self.backoff_delay(attempt);
            warn!(
                %url,
                attempt,
                max = self.max_retries,
                elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                ?delay,
                error = %outcome,
                "Request attempt failed; backing off"
            );
            sleep(delay).await;
        }
    }

    /// `min(base * 2^(attempt-1), max) + jitter(0..=250ms)`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}
