//! Page retrieval over plain HTTP or a headless browser.
//!
//! The fetcher is assembled from small pieces around one trait:
//! - [`PageFetcher`]: Core trait, "give me the markup for this request"
//! - [`HttpFetcher`]: One static GET with a rotating user agent
//! - [`RetryFetch`]: Decorator adding bounded attempts with exponential backoff
//! - [`Fetcher`]: Per-source fetcher that picks static or rendered mode,
//!   falls back to static when no browser is available, and applies the
//!   inter-request delay after every fetch
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```
//!
//! `max_attempts` counts requests, so `3` means the URL is requested at most
//! three times. Client errors other than `429` are returned immediately.

mod browser;

pub use browser::RenderAvailability;

use crate::config::{FetchConfig, ResolvedSourceConfig};
use crate::error::FetchError;
use rand::seq::IndexedRandom;
use rand::{Rng, rng};
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Desktop browser user agents rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

const ACCEPT_LANGUAGE_VALUE: &str = "az,en-US;q=0.8,en;q=0.6,ru;q=0.4";
const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Pick a user agent at random.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS.choose(&mut rng()).copied().unwrap_or(USER_AGENTS[0])
}

/// How markup is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Plain HTTP GET.
    Static,
    /// Headless browser with JavaScript executed.
    Rendered,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::Static => f.write_str("static"),
            FetchMode::Rendered => f.write_str("rendered"),
        }
    }
}

/// One fetch to perform.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub url: &'a str,
    /// `None` uses the fetcher's configured mode.
    pub mode: Option<FetchMode>,
    /// Times to scroll to the bottom before capturing a rendered page.
    pub scroll_passes: u32,
}

impl<'a> PageRequest<'a> {
    pub fn new(url: &'a str) -> Self {
        Self {
            url,
            mode: None,
            scroll_passes: 0,
        }
    }

    pub fn rendered(url: &'a str, scroll_passes: u32) -> Self {
        Self {
            url,
            mode: Some(FetchMode::Rendered),
            scroll_passes,
        }
    }
}

/// Trait for async page retrieval.
///
/// Implementors return the raw markup for a request, or a classified
/// [`FetchError`]. Decorators such as [`RetryFetch`] wrap another implementor.
pub trait PageFetcher {
    /// Retrieve markup for `request`.
    async fn fetch(&self, request: &PageRequest<'_>) -> Result<String, FetchError>;

    /// Release any resources held (browser processes, pooled connections).
    async fn close(self)
    where
        Self: Sized;
}

/// Creates one fetcher per source run.
pub trait FetcherFactory {
    type Fetcher: PageFetcher;

    async fn open(
        &self,
        domain: &str,
        config: &ResolvedSourceConfig,
    ) -> Result<Self::Fetcher, FetchError>;
}

/// Single-attempt static fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with the configured timeout and compression enabled.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

fn classify_reqwest(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            attempts: 1,
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(url = %request.url))]
    async fn fetch(&self, request: &PageRequest<'_>) -> Result<String, FetchError> {
        let url = request.url;
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, random_user_agent())
            .header(ACCEPT, ACCEPT_VALUE)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .send()
            .await
            .map_err(|e| classify_reqwest(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| classify_reqwest(url, e))?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }

    async fn close(self) {}
}

/// Wrapper that adds exponential backoff retry logic to any [`PageFetcher`].
pub struct RetryFetch<T> {
    inner: T,
    /// Total requests allowed per URL.
    max_attempts: u32,
    /// Initial delay between attempts (doubles with each attempt).
    base_delay: Duration,
    /// Delay cap.
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: PageFetcher,
{
    pub fn new(inner: T, max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> PageFetcher for RetryFetch<T>
where
    T: PageFetcher,
{
    #[instrument(level = "debug", skip_all, fields(url = %request.url))]
    async fn fetch(&self, request: &PageRequest<'_>) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.inner.fetch(request).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_retryable() => {
                    warn!(attempt, error = %e, "fetch failed with a non-retryable error");
                    return Err(e.with_attempts(attempt));
                }
                Err(e) => {
                    if attempt >= self.max_attempts {
                        error!(
                            attempt,
                            max = self.max_attempts,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "fetch exhausted attempts"
                        );
                        return Err(e.with_attempts(attempt));
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn close(self) {
        self.inner.close().await;
    }
}

/// Per-source fetcher: static retries, lazy browser, rate limiting.
///
/// The browser is only launched the first time a rendered request arrives and
/// is shut down by [`PageFetcher::close`].
pub struct Fetcher {
    domain: String,
    http: RetryFetch<HttpFetcher>,
    mode: FetchMode,
    config: FetchConfig,
    render: OnceCell<RenderAvailability>,
}

impl Fetcher {
    pub fn new(domain: &str, config: &ResolvedSourceConfig) -> Result<Self, FetchError> {
        let fetch = &config.fetch;
        let http = RetryFetch::new(
            HttpFetcher::new(fetch)?,
            fetch.max_attempts,
            fetch.backoff_base(),
            fetch.backoff_max(),
        );
        Ok(Self {
            domain: domain.to_string(),
            http,
            mode: config.render_mode,
            config: fetch.clone(),
            render: OnceCell::new(),
        })
    }

    /// Build a fetcher whose render capability is already decided.
    #[cfg(test)]
    pub fn with_render_availability(
        domain: &str,
        config: &ResolvedSourceConfig,
        availability: RenderAvailability,
    ) -> Result<Self, FetchError> {
        let mut fetcher = Self::new(domain, config)?;
        fetcher.render = OnceCell::new_with(Some(availability));
        Ok(fetcher)
    }

    async fn render_availability(&self) -> &RenderAvailability {
        self.render
            .get_or_init(|| async {
                let availability = browser::availability(&self.config).await;
                match &availability {
                    RenderAvailability::Available(_) => {
                        info!(source = %self.domain, "Headless browser launched")
                    }
                    RenderAvailability::Unavailable { reason } => warn!(
                        source = %self.domain,
                        %reason,
                        "Browser rendering unavailable; falling back to static fetches"
                    ),
                }
                availability
            })
            .await
    }

    async fn fetch_inner(&self, request: &PageRequest<'_>) -> Result<String, FetchError> {
        let mode = request.mode.unwrap_or(self.mode);
        if mode == FetchMode::Rendered {
            if let RenderAvailability::Available(renderer) = self.render_availability().await {
                return renderer
                    .render(request.url, request.scroll_passes, &self.config)
                    .await;
            }
            debug!(url = %request.url, "Rendered fetch served statically");
        }
        self.http.fetch(request).await
    }
}

impl PageFetcher for Fetcher {
    #[instrument(level = "info", skip_all, fields(source = %self.domain, url = %request.url))]
    async fn fetch(&self, request: &PageRequest<'_>) -> Result<String, FetchError> {
        let result = self.fetch_inner(request).await;
        sleep(self.config.request_delay()).await;
        result
    }

    async fn close(self) {
        self.http.close().await;
        if let Some(RenderAvailability::Available(renderer)) = self.render.into_inner() {
            renderer.close().await;
            info!(source = %self.domain, "Headless browser closed");
        }
    }
}

/// Opens a [`Fetcher`] for each source.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFetcherFactory;

impl FetcherFactory for DefaultFetcherFactory {
    type Fetcher = Fetcher;

    async fn open(
        &self,
        domain: &str,
        config: &ResolvedSourceConfig,
    ) -> Result<Fetcher, FetchError> {
        Fetcher::new(domain, config)
    }
}
