//! Headless Chromium rendering for JavaScript-heavy listings.
//!
//! Built on `chromiumoxide` behind the `browser` feature. Without the feature
//! (or without a Chromium binary on the host) [`availability`] reports
//! [`RenderAvailability::Unavailable`] and callers fetch statically instead.

use crate::config::FetchConfig;
use crate::error::FetchError;
use std::future::Future;
use std::time::Duration;

/// Result of checking whether pages can be rendered on this host.
pub enum RenderAvailability {
    Available(BrowserRenderer),
    Unavailable { reason: String },
}

impl std::fmt::Debug for RenderAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderAvailability::Available(_) => f.write_str("Available"),
            RenderAvailability::Unavailable { reason } => {
                f.debug_struct("Unavailable").field("reason", reason).finish()
            }
        }
    }
}

/// Run `work` for at most `budget`, then run `cleanup` whatever the outcome.
///
/// Running out of budget is reported as a single-attempt [`FetchError::Timeout`].
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
async fn bounded_then<T>(
    url: &str,
    budget: Duration,
    work: impl Future<Output = Result<T, FetchError>>,
    cleanup: impl Future<Output = ()>,
) -> Result<T, FetchError> {
    let result = match tokio::time::timeout(budget, work).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            attempts: 1,
        }),
    };
    cleanup.await;
    result
}

#[cfg(feature = "browser")]
mod engine {
    use super::*;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use std::time::Instant;
    use tokio::task::JoinHandle;
    use tokio::time::{sleep, timeout};
    use tracing::{debug, warn};

    const SETTLE_POLL: Duration = Duration::from_millis(500);
    const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

    /// One Chromium process shared by every rendered fetch of a source run.
    pub struct BrowserRenderer {
        browser: Browser,
        handler: JoinHandle<()>,
    }

    /// Try to launch Chromium.
    pub async fn availability(config: &FetchConfig) -> RenderAvailability {
        let built = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(config.timeout())
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .build();
        let browser_config = match built {
            Ok(c) => c,
            Err(reason) => return RenderAvailability::Unavailable { reason },
        };

        match Browser::launch(browser_config).await {
            Ok((browser, mut handler)) => {
                let handler = tokio::spawn(async move {
                    while let Some(event) = handler.next().await {
                        if event.is_err() {
                            break;
                        }
                    }
                });
                RenderAvailability::Available(BrowserRenderer { browser, handler })
            }
            Err(e) => RenderAvailability::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    fn render_failure(url: &str, err: impl std::fmt::Display) -> FetchError {
        FetchError::RenderFailure {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Poll the document until two consecutive snapshots match or `max_wait` passes.
    async fn settle(page: &Page, url: &str, max_wait: Duration) -> Result<String, FetchError> {
        let started = Instant::now();
        let mut last = page.content().await.map_err(|e| render_failure(url, e))?;
        while started.elapsed() < max_wait {
            sleep(SETTLE_POLL).await;
            let current = page.content().await.map_err(|e| render_failure(url, e))?;
            if current == last {
                return Ok(current);
            }
            last = current;
        }
        debug!(url, ?max_wait, "Page still changing at render deadline");
        Ok(last)
    }

    impl BrowserRenderer {
        /// Navigate to `url`, scroll `scroll_passes` times, and return the settled markup.
        pub async fn render(
            &self,
            url: &str,
            scroll_passes: u32,
            config: &FetchConfig,
        ) -> Result<String, FetchError> {
            let max_wait = config.render_max_wait();
            let budget = config.timeout() + max_wait * (scroll_passes + 1);

            let new_page = timeout(config.timeout(), self.browser.new_page("about:blank"));
            let page = match new_page.await {
                Ok(page) => page.map_err(|e| render_failure(url, e))?,
                Err(_) => {
                    return Err(FetchError::Timeout {
                        url: url.to_string(),
                        attempts: 1,
                    });
                }
            };

            let work = async {
                page.set_user_agent(crate::fetcher::random_user_agent())
                    .await
                    .map_err(|e| render_failure(url, e))?;
                page.goto(url).await.map_err(|e| render_failure(url, e))?;
                settle(&page, url, max_wait).await?;

                for pass in 0..scroll_passes {
                    page.evaluate(SCROLL_TO_BOTTOM)
                        .await
                        .map_err(|e| render_failure(url, e))?;
                    debug!(url, pass = pass + 1, "Scrolled page");
                    settle(&page, url, max_wait).await?;
                }

                page.content().await.map_err(|e| render_failure(url, e))
            };
            let close_tab = async {
                if let Err(e) = page.clone().close().await {
                    warn!(url, error = %e, "Failed to close browser tab");
                }
            };

            bounded_then(url, budget, work, close_tab).await
        }

        /// Shut the browser down and wait for the process to exit.
        pub async fn close(mut self) {
            if let Err(e) = self.browser.close().await {
                warn!(error = %e, "Browser close command failed");
            }
            if let Err(e) = self.browser.wait().await {
                warn!(error = %e, "Waiting for browser exit failed");
            }
            self.handler.abort();
        }
    }
}

#[cfg(not(feature = "browser"))]
mod engine {
    use super::*;
    use crate::error::FetchError;

    /// Uninhabited: there is no renderer without the `browser` feature.
    pub enum BrowserRenderer {}

    pub async fn availability(_config: &FetchConfig) -> RenderAvailability {
        RenderAvailability::Unavailable {
            reason: "built without the `browser` feature".to_string(),
        }
    }

    impl BrowserRenderer {
        pub async fn render(
            &self,
            _url: &str,
            _scroll_passes: u32,
            _config: &FetchConfig,
        ) -> Result<String, FetchError> {
            match *self {}
        }

        pub async fn close(self) {
            match self {}
        }
    }
}

pub use engine::{BrowserRenderer, availability};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cleanup_runs_when_work_fails() {
        let cleaned = std::cell::Cell::new(false);
        let result: Result<String, FetchError> = bounded_then(
            "https://axar.az/",
            Duration::from_secs(5),
            async {
                Err(FetchError::RenderFailure {
                    url: "https://axar.az/".into(),
                    message: "navigation failed".into(),
                })
            },
            async { cleaned.set(true) },
        )
        .await;

        assert!(matches!(result, Err(FetchError::RenderFailure { .. })));
        assert!(cleaned.get());
    }

    #[tokio::test]
    async fn test_cleanup_runs_when_budget_runs_out() {
        let cleaned = std::cell::Cell::new(false);
        let result: Result<String, FetchError> = bounded_then(
            "https://trend.az/",
            Duration::from_millis(20),
            std::future::pending(),
            async { cleaned.set(true) },
        )
        .await;

        assert!(matches!(result, Err(FetchError::Timeout { attempts: 1, .. })));
        assert!(cleaned.get());
    }

    #[test]
    fn test_unavailable_debug_shows_reason() {
        let availability = RenderAvailability::Unavailable {
            reason: "no chromium".into(),
        };
        assert!(format!("{availability:?}").contains("no chromium"));
    }
}
