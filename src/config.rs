//! YAML configuration with per-source overrides.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid
//! configuration. A minimal file looks like:
//!
//! ```yaml
//! database_url: sqlite://aznews.db
//! render_mode: static
//! retention_days: 7
//! fetch:
//!   timeout_ms: 30000
//!   max_attempts: 3
//! run:
//!   max_page_failures: 3
//! sources:
//!   axar.az:
//!     render_mode: rendered
//!     request_delay_ms: 2000
//! ```
//!
//! Settings are resolved once per source into a [`ResolvedSourceConfig`] and
//! passed explicitly to the fetcher and runner.

use crate::fetcher::FetchMode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://aznews.db";

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    /// Process-wide fetch mode; sources may override it.
    pub render_mode: FetchMode,
    /// Age after which job and error history is purged.
    pub retention_days: u32,
    /// Pause between sources when they run one after another.
    pub source_delay_secs: u64,
    /// Number of sources scraped at the same time.
    pub workers: usize,
    pub max_db_connections: u32,
    pub fetch: FetchConfig,
    pub run: RunConfig,
    pub sources: BTreeMap<String, SourceOverride>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            render_mode: FetchMode::Static,
            retention_days: 7,
            source_delay_secs: 5,
            workers: 1,
            max_db_connections: 5,
            fetch: FetchConfig::default(),
            run: RunConfig::default(),
            sources: BTreeMap::new(),
        }
    }
}

/// Timeout, retry and rate-limit policy for one fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    /// Total number of requests per URL, including the first.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Delay applied after every fetch.
    pub request_delay_ms: u64,
    /// Upper bound on waiting for a rendered page to settle.
    pub render_max_wait_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_attempts: 3,
            backoff_base_ms: 5_000,
            backoff_max_ms: 30_000,
            request_delay_ms: 1_000,
            render_max_wait_ms: 15_000,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn render_max_wait(&self) -> Duration {
        Duration::from_millis(self.render_max_wait_ms)
    }
}

/// Failure budget and concurrency for one source run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// A run aborts once more than this many pages have failed.
    pub max_page_failures: u32,
    /// Detail pages fetched at the same time within one listing page.
    pub detail_concurrency: usize,
    /// Expected items per full listing page; fewer means the last page.
    pub page_size: Option<u32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_page_failures: 3,
            detail_concurrency: 2,
            page_size: None,
        }
    }
}

/// Per-source overrides. Unset fields fall back to the top-level values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceOverride {
    pub render_mode: Option<FetchMode>,
    pub timeout_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub backoff_base_ms: Option<u64>,
    pub backoff_max_ms: Option<u64>,
    pub request_delay_ms: Option<u64>,
    pub render_max_wait_ms: Option<u64>,
    pub max_page_failures: Option<u32>,
    pub detail_concurrency: Option<usize>,
    pub page_size: Option<u32>,
}

/// Settings for a single source after applying its override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSourceConfig {
    pub render_mode: FetchMode,
    pub fetch: FetchConfig,
    pub run: RunConfig,
    pub retention_days: u32,
}

impl Config {
    /// Parse configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Box<dyn Error>> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a file, or defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    #[instrument(level = "info", skip_all, fields(path = ?path))]
    pub async fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(path) => {
                let text = tokio::fs::read_to_string(path).await?;
                let config = Self::from_yaml_str(&text)?;
                info!(
                    sources_overridden = config.sources.len(),
                    "Loaded configuration file"
                );
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Merge the override for `domain` (if any) over the defaults.
    pub fn resolve(&self, domain: &str) -> ResolvedSourceConfig {
        let mut fetch = self.fetch.clone();
        let mut run = self.run.clone();
        let mut render_mode = self.render_mode;

        if let Some(o) = self.sources.get(domain) {
            render_mode = o.render_mode.unwrap_or(render_mode);
            fetch.timeout_ms = o.timeout_ms.unwrap_or(fetch.timeout_ms);
            fetch.max_attempts = o.max_attempts.unwrap_or(fetch.max_attempts);
            fetch.backoff_base_ms = o.backoff_base_ms.unwrap_or(fetch.backoff_base_ms);
            fetch.backoff_max_ms = o.backoff_max_ms.unwrap_or(fetch.backoff_max_ms);
            fetch.request_delay_ms = o.request_delay_ms.unwrap_or(fetch.request_delay_ms);
            fetch.render_max_wait_ms = o.render_max_wait_ms.unwrap_or(fetch.render_max_wait_ms);
            run.max_page_failures = o.max_page_failures.unwrap_or(run.max_page_failures);
            run.detail_concurrency = o.detail_concurrency.unwrap_or(run.detail_concurrency);
            run.page_size = o.page_size.or(run.page_size);
        }

        fetch.max_attempts = fetch.max_attempts.max(1);
        run.detail_concurrency = run.detail_concurrency.max(1);

        ResolvedSourceConfig {
            render_mode,
            fetch,
            run,
            retention_days: self.retention_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.fetch, FetchConfig::default());
        assert_eq!(config.render_mode, FetchMode::Static);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = Config::from_yaml_str(
            "retention_days: 3\nfetch:\n  max_attempts: 5\nrun:\n  page_size: 20\n",
        )
        .unwrap();
        assert_eq!(config.retention_days, 3);
        assert_eq!(config.fetch.max_attempts, 5);
        assert_eq!(config.fetch.timeout_ms, 30_000);
        assert_eq!(config.run.page_size, Some(20));
        assert_eq!(config.run.max_page_failures, 3);
    }

    #[test]
    fn test_source_override_applies_only_to_that_source() {
        let yaml = r#"
render_mode: static
sources:
  axar.az:
    render_mode: rendered
    request_delay_ms: 2500
    max_page_failures: 1
"#;
        let config = Config::from_yaml_str(yaml).unwrap();

        let axar = config.resolve("axar.az");
        assert_eq!(axar.render_mode, FetchMode::Rendered);
        assert_eq!(axar.fetch.request_delay_ms, 2500);
        assert_eq!(axar.run.max_page_failures, 1);
        assert_eq!(axar.fetch.timeout_ms, 30_000);

        let apa = config.resolve("apa.az");
        assert_eq!(apa.render_mode, FetchMode::Static);
        assert_eq!(apa.fetch.request_delay_ms, 1_000);
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        let config =
            Config::from_yaml_str("fetch:\n  max_attempts: 0\nrun:\n  detail_concurrency: 0\n")
                .unwrap();
        let resolved = config.resolve("fed.az");
        assert_eq!(resolved.fetch.max_attempts, 1);
        assert_eq!(resolved.run.detail_concurrency, 1);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(Config::from_yaml_str("fetch: [1, 2").is_err());
        assert!(Config::from_yaml_str("render_mode: sideways").is_err());
    }
}
