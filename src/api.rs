//! Zenn HTTP access with exponential backoff retry logic.
//!
//! # Architecture
//!
//! The module uses a trait-based design so the page-scrape extractor never
//! touches the network directly:
//! - [`ZennApi`]: core trait for the two requests the sync makes
//! - [`HttpZennApi`]: `reqwest` implementation with fixed headers and a timeout
//! - [`RetryFetch`]: decorator that adds retry logic to any `ZennApi`
//!
//! # Retry Strategy
//!
//! - `max_retries` extra attempts (0 by default, so a single request)
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay

use crate::error::{Error, Result};
use crate::models::ArticleList;
use crate::settings::Settings;
use crate::utils::{decode_permissive, truncate_for_log};
use rand::{Rng, rng};
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_CHARSET, HeaderMap, HeaderValue, USER_AGENT};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// The two requests the page-scrape extractor needs.
pub trait ZennApi {
    /// Fetch the article listing for the configured account, newest first.
    async fn list_articles(&self) -> Result<ArticleList>;

    /// Fetch the rendered HTML of one article page.
    async fn article_html(&self, url: &str) -> Result<String>;
}

/// `reqwest`-backed [`ZennApi`].
///
/// Bodies are always decoded as UTF-8, whatever charset the server declares.
pub struct HttpZennApi {
    /// Shared client carrying the fixed headers and timeout.
    client: Client,
    /// Listing endpoint with the username already substituted.
    listing_url: String,
}

impl HttpZennApi {
    /// Build a client from the configured endpoint, user agent and timeout.
    ///
    /// Every request carries `User-Agent`, `Accept: application/json` and
    /// `Accept-Charset: utf-8`.
    ///
    /// # Arguments
    ///
    /// * `settings` - Source of `api_url`, `username`, `user_agent` and `request_timeout_secs`
    ///
    /// # Returns
    ///
    /// * `Ok(HttpZennApi)` - Ready to issue requests
    /// * `Err(Error::Config)` - The user agent is not a valid header value
    /// * `Err(Error::Fetch)` - The TLS backend could not be initialised
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|e| Error::Config(format!("invalid user agent: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_CHARSET, HeaderValue::from_static("utf-8"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            listing_url: settings.listing_url(),
        })
    }

    /// GET `url` and return the raw body; any non-2xx status is a fetch error.
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("GET {url} returned {status}")));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

impl fmt::Debug for HttpZennApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpZennApi")
            .field("listing_url", &self.listing_url)
            .finish()
    }
}

impl ZennApi for HttpZennApi {
    #[instrument(level = "info", skip_all, fields(url = %self.listing_url))]
    async fn list_articles(&self) -> Result<ArticleList> {
        let t0 = Instant::now();
        let body = self.get_bytes(&self.listing_url).await?;
        let text = decode_permissive(&body);
        let list: ArticleList = serde_json::from_str(&text).map_err(|e| {
            Error::Fetch(format!(
                "listing is not valid JSON ({e}): {}",
                truncate_for_log(&text, 200)
            ))
        })?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            count = list.articles.len(),
            "Fetched article listing"
        );
        Ok(list)
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn article_html(&self, url: &str) -> Result<String> {
        let t0 = Instant::now();
        let body = self.get_bytes(url).await?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = body.len(),
            "Fetched article page"
        );
        Ok(decode_permissive(&body))
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`ZennApi`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    /// The wrapped client.
    inner: T,
    /// Extra attempts after the first failure.
    max_retries: usize,
    /// Delay before the first retry (doubles with each attempt).
    base_delay: StdDuration,
    /// Upper bound for a single backoff delay.
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: ZennApi,
{
    /// Wrap an existing [`ZennApi`] with retry logic.
    ///
    /// # Arguments
    ///
    /// * `inner` - The client to wrap
    /// * `max_retries` - Extra attempts after the first failure (0 keeps a single request)
    /// * `base_delay` - Delay before the first retry
    ///
    /// # Example
    ///
    /// ```ignore
    /// let api = HttpZennApi::new(&settings)?;
    /// let api = RetryFetch::new(api, settings.max_retries, settings.retry_base_delay());
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt - 1).min(16) as u32;
        let mut delay = self.base_delay.saturating_mul(1 << shift);
        if delay > self.max_delay {
            delay = self.max_delay;
        }
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }

    async fn with_retries<R, F, Fut>(&self, what: &str, mut op: F) -> Result<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "{what} exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "{what} attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
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

impl<T> ZennApi for RetryFetch<T>
where
    T: ZennApi,
{
    async fn list_articles(&self) -> Result<ArticleList> {
        self.with_retries("list_articles", || self.inner.list_articles())
            .await
    }

    async fn article_html(&self, url: &str) -> Result<String> {
        self.with_retries("article_html", || self.inner.article_html(url))
            .await
    }
}
