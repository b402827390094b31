//! Run Coordinator: scrapes a set of sources and aggregates a [`RunReport`].
//!
//! Sources run one after another with a pause in between, or up to
//! `workers` at a time. Each source gets its own fetcher, opened before and
//! closed after its run. A failing source never affects the others; the
//! report only remembers that it failed.

use crate::config::Config;
use crate::db::Database;
use crate::error::StoreError;
use crate::fetcher::{FetcherFactory, PageFetcher};
use crate::models::{JobCounters, JobStatus, NewsSource, Trigger};
use crate::runner::{RunOptions, cancelled, deadline_reached, run_source};
use crate::scrapers;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

/// Final state of one source within an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Completed,
    Partial,
    Failed,
    /// Not run: inactive, unregistered, or cancelled before it started.
    Skipped,
}

impl From<JobStatus> for SourceStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Completed => SourceStatus::Completed,
            JobStatus::Partial => SourceStatus::Partial,
            JobStatus::Running | JobStatus::Failed => SourceStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub domain: String,
    pub status: SourceStatus,
    pub job_id: Option<i64>,
    pub counters: JobCounters,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl SourceReport {
    fn skipped(domain: &str, reason: &str) -> Self {
        Self {
            domain: domain.to_string(),
            status: SourceStatus::Skipped,
            job_id: None,
            counters: JobCounters::default(),
            error: Some(reason.to_string()),
            duration_ms: 0,
        }
    }
}

/// Outcome of one `run` / `run-all` invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub trigger: Trigger,
    pub max_pages: u32,
    pub scrape_details: bool,
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    /// Whether the process should exit non-zero.
    pub fn any_failed(&self) -> bool {
        self.sources
            .iter()
            .any(|s| s.status == SourceStatus::Failed)
    }

    pub fn count(&self, status: SourceStatus) -> usize {
        self.sources.iter().filter(|s| s.status == status).count()
    }

    /// Counters summed over every source.
    pub fn totals(&self) -> JobCounters {
        self.sources
            .iter()
            .fold(JobCounters::default(), |mut acc, s| {
                let c = &s.counters;
                acc.pages_scraped += c.pages_scraped;
                acc.pages_failed += c.pages_failed;
                acc.articles_found += c.articles_found;
                acc.articles_new += c.articles_new;
                acc.articles_updated += c.articles_updated;
                acc.articles_failed += c.articles_failed;
                acc.articles_duplicate += c.articles_duplicate;
                acc.articles_deleted += c.articles_deleted;
                acc
            })
    }

    pub fn log_summary(&self) {
        for s in &self.sources {
            match s.status {
                SourceStatus::Failed => warn!(
                    source = %s.domain,
                    error = s.error.as_deref().unwrap_or("unknown"),
                    "FAILED"
                ),
                SourceStatus::Skipped => info!(
                    source = %s.domain,
                    reason = s.error.as_deref().unwrap_or(""),
                    "skipped"
                ),
                _ => info!(
                    source = %s.domain,
                    status = ?s.status,
                    new = s.counters.articles_new,
                    found = s.counters.articles_found,
                    failed = s.counters.articles_failed,
                    "{} new / {} found",
                    s.counters.articles_new,
                    s.counters.articles_found
                ),
            }
        }
        let totals = self.totals();
        info!(
            completed = self.count(SourceStatus::Completed),
            partial = self.count(SourceStatus::Partial),
            failed = self.count(SourceStatus::Failed),
            skipped = self.count(SourceStatus::Skipped),
            found = totals.articles_found,
            new = totals.articles_new,
            article_failures = totals.articles_failed,
            "Run summary"
        );
    }
}

/// Drives source runs for one invocation.
pub struct Coordinator<'a, F> {
    db: &'a Database,
    config: &'a Config,
    factory: &'a F,
    options: RunOptions,
    cancel: watch::Receiver<bool>,
}

impl<'a, F: FetcherFactory> Coordinator<'a, F> {
    pub fn new(
        db: &'a Database,
        config: &'a Config,
        factory: &'a F,
        options: RunOptions,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            db,
            config,
            factory,
            options,
            cancel,
        }
    }

    /// Run every registered source; inactive ones are reported as skipped.
    pub async fn run_all(&self) -> Result<RunReport, StoreError> {
        let sources = self.db.list_sources().await?;
        info!(sources = sources.len(), workers = self.config.workers, "Running all sources");
        Ok(self.run_sources(sources).await)
    }

    /// Run a single source, whether or not it is active.
    ///
    /// # Errors
    ///
    /// [`StoreError::SourceNotFound`] for a domain missing from the database.
    pub async fn run_domain(&self, domain: &str) -> Result<RunReport, StoreError> {
        let mut source = self
            .db
            .get_source(domain)
            .await?
            .ok_or_else(|| StoreError::SourceNotFound(domain.to_string()))?;
        if !source.is_active {
            info!(source = %domain, "Source is inactive; running it on explicit request");
            source.is_active = true;
        }
        Ok(self.run_sources(vec![source]).await)
    }

    async fn run_sources(&self, sources: Vec<NewsSource>) -> RunReport {
        let started_at = Utc::now();
        let workers = self.config.workers.max(1);

        let reports = if workers == 1 {
            self.run_sequential(sources).await
        } else {
            let mut indexed: Vec<(usize, SourceReport)> =
                stream::iter(sources.into_iter().enumerate())
                    .map(|(i, source)| async move { (i, self.run_one(source).await) })
                    .buffer_unordered(workers)
                    .collect()
                    .await;
            indexed.sort_by_key(|(i, _)| *i);
            indexed.into_iter().map(|(_, report)| report).collect()
        };

        RunReport {
            started_at,
            finished_at: Utc::now(),
            trigger: self.options.trigger,
            max_pages: self.options.max_pages,
            scrape_details: self.options.scrape_details,
            sources: reports,
        }
    }

    async fn run_sequential(&self, sources: Vec<NewsSource>) -> Vec<SourceReport> {
        let delay = Duration::from_secs(self.config.source_delay_secs);
        let mut reports = Vec::with_capacity(sources.len());
        let mut ran_any = false;

        for source in sources {
            let runnable = source.is_active && scrapers::find(&source.domain).is_some();
            if runnable && ran_any && !delay.is_zero() {
                info!(secs = delay.as_secs(), "Waiting before next source");
                let mut cancel = self.cancel.clone();
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancelled(&mut cancel) => {}
                    _ = deadline_reached(self.options.deadline) => {}
                }
            }
            let report = self.run_one(source).await;
            ran_any |= report.status != SourceStatus::Skipped;
            reports.push(report);
        }
        reports
    }

    fn deadline_passed(&self) -> bool {
        self.options
            .deadline
            .is_some_and(|at| at <= tokio::time::Instant::now())
    }

    #[instrument(level = "info", skip_all, fields(source = %source.domain))]
    async fn run_one(&self, source: NewsSource) -> SourceReport {
        if !source.is_active {
            return SourceReport::skipped(&source.domain, "inactive");
        }
        if *self.cancel.borrow() {
            return SourceReport::skipped(&source.domain, "run cancelled before start");
        }
        if self.deadline_passed() {
            return SourceReport::skipped(&source.domain, "run deadline reached before start");
        }
        let Some(extractor) = scrapers::find(&source.domain) else {
            warn!("No extractor registered for source");
            return SourceReport::skipped(&source.domain, "no extractor registered");
        };

        let started = Instant::now();
        let resolved = self.config.resolve(&source.domain);
        let fetcher = match self.factory.open(&source.domain, &resolved).await {
            Ok(fetcher) => fetcher,
            Err(e) => {
                warn!(error = %e, "Could not open fetcher");
                return SourceReport {
                    domain: source.domain.clone(),
                    status: SourceStatus::Failed,
                    job_id: None,
                    counters: JobCounters::default(),
                    error: Some(e.to_string()),
                    duration_ms: 0,
                };
            }
        };

        let summary = run_source(
            self.db,
            &fetcher,
            extractor,
            &source,
            &resolved,
            &self.options,
            self.cancel.clone(),
        )
        .await;
        fetcher.close().await;

        SourceReport {
            domain: source.domain,
            status: summary.status.into(),
            job_id: summary.job_id,
            counters: summary.counters,
            error: summary.error,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedSourceConfig;
    use crate::error::FetchError;
    use crate::fetcher::PageRequest;
    use crate::scrapers::registry;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Hands out fetchers over one shared set of canned pages.
    #[derive(Default)]
    struct FakeFactory {
        pages: Arc<HashMap<String, String>>,
        opened: Mutex<Vec<String>>,
        closed: Arc<Mutex<u32>>,
    }

    struct FakeFetcher {
        pages: Arc<HashMap<String, String>>,
        closed: Arc<Mutex<u32>>,
    }

    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, request: &PageRequest<'_>) -> Result<String, FetchError> {
            self.pages
                .get(request.url)
                .cloned()
                .ok_or_else(|| FetchError::HttpStatus {
                    url: request.url.to_string(),
                    status: 404,
                })
        }

        async fn close(self) {
            *self.closed.lock().unwrap() += 1;
        }
    }

    impl FetcherFactory for FakeFactory {
        type Fetcher = FakeFetcher;

        async fn open(
            &self,
            domain: &str,
            _config: &ResolvedSourceConfig,
        ) -> Result<FakeFetcher, FetchError> {
            self.opened.lock().unwrap().push(domain.to_string());
            Ok(FakeFetcher {
                pages: Arc::clone(&self.pages),
                closed: Arc::clone(&self.closed),
            })
        }
    }

    fn banker_factory() -> FakeFactory {
        let listing = r#"<html><body>
          <div class="td_module_wrap"><h3 class="entry-title"><a href="/kredit-portfeli-artib/">Kredit portfeli 8% artıb</a></h3></div>
          <div class="td_module_wrap"><h3 class="entry-title"><a href="/depozit-faizleri/">Depozit faizləri sabit qalıb</a></h3></div>
        </body></html>"#;
        let mut pages = HashMap::new();
        pages.insert(
            "https://banker.az/category/xYbYrlYr/".to_string(),
            listing.to_string(),
        );
        FakeFactory {
            pages: Arc::new(pages),
            ..FakeFactory::default()
        }
    }

    fn options() -> RunOptions {
        RunOptions {
            max_pages: 1,
            scrape_details: false,
            trigger: Trigger::Scheduled,
            deadline: None,
        }
    }

    fn config(yaml: &str) -> Config {
        let mut config = Config::from_yaml_str(yaml).unwrap();
        config.source_delay_secs = 0;
        config
    }

    /// Leave only `keep` active.
    async fn only_active(db: &Database, keep: &[&str]) {
        for extractor in registry() {
            let domain = extractor.domain();
            db.set_source_active(domain, keep.contains(&domain))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_run_all_skips_inactive_sources() {
        let db = Database::in_memory().await;
        only_active(&db, &["banker.az", "fed.az"]).await;
        let factory = banker_factory();
        let config = config("");
        let coordinator =
            Coordinator::new(&db, &config, &factory, options(), watch::channel(false).1);

        let report = coordinator.run_all().await.unwrap();

        assert_eq!(report.sources.len(), registry().len());
        assert_eq!(report.count(SourceStatus::Skipped), registry().len() - 2);
        let banker = report.sources.iter().find(|s| s.domain == "banker.az").unwrap();
        assert_eq!(banker.status, SourceStatus::Completed);
        assert_eq!(banker.counters.articles_new, 2);
        // fed.az only 404s, which stays within the failure budget.
        let fed = report.sources.iter().find(|s| s.domain == "fed.az").unwrap();
        assert_eq!(fed.status, SourceStatus::Partial);
        assert!(!report.any_failed());
        assert_eq!(report.totals().articles_new, 2);
        assert_eq!(*factory.opened.lock().unwrap(), vec!["banker.az", "fed.az"]);
        assert_eq!(*factory.closed.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_source_fails_report_but_not_neighbours() {
        let db = Database::in_memory().await;
        only_active(&db, &["banker.az", "fed.az", "oxu.az"]).await;
        let factory = banker_factory();
        let config = config("workers: 2\nsources:\n  fed.az:\n    max_page_failures: 0\n");
        let coordinator =
            Coordinator::new(&db, &config, &factory, options(), watch::channel(false).1);

        let report = coordinator.run_all().await.unwrap();

        assert!(report.any_failed());
        let active: Vec<(&str, SourceStatus)> = report
            .sources
            .iter()
            .filter(|s| s.status != SourceStatus::Skipped)
            .map(|s| (s.domain.as_str(), s.status))
            .collect();
        // Registry order is kept even when sources finish out of order.
        assert_eq!(
            active,
            vec![
                ("banker.az", SourceStatus::Completed),
                ("fed.az", SourceStatus::Failed),
                ("oxu.az", SourceStatus::Partial),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_domain_runs_inactive_source() {
        let db = Database::in_memory().await;
        db.set_source_active("banker.az", false).await.unwrap();
        let factory = banker_factory();
        let config = config("");
        let coordinator =
            Coordinator::new(&db, &config, &factory, options(), watch::channel(false).1);

        let report = coordinator.run_domain("banker.az").await.unwrap();

        assert_eq!(report.sources.len(), 1);
        assert_eq!(report.sources[0].status, SourceStatus::Completed);
        assert!(report.sources[0].job_id.is_some());
    }

    #[tokio::test]
    async fn test_run_domain_unknown_source() {
        let db = Database::in_memory().await;
        let factory = FakeFactory::default();
        let config = config("");
        let coordinator =
            Coordinator::new(&db, &config, &factory, options(), watch::channel(false).1);

        let err = coordinator.run_domain("metbuat.az").await.unwrap_err();
        assert!(matches!(err, StoreError::SourceNotFound(d) if d == "metbuat.az"));
    }

    #[tokio::test]
    async fn test_cancelled_invocation_starts_nothing() {
        let db = Database::in_memory().await;
        let factory = banker_factory();
        let config = config("");
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let coordinator = Coordinator::new(&db, &config, &factory, options(), rx);

        let report = coordinator.run_all().await.unwrap();

        assert_eq!(report.count(SourceStatus::Skipped), registry().len());
        assert!(factory.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_deadline_skips_unstarted_sources() {
        let db = Database::in_memory().await;
        only_active(&db, &["banker.az", "fed.az"]).await;
        let factory = banker_factory();
        let config = config("");
        let mut options = options();
        options.deadline = Some(tokio::time::Instant::now());
        let coordinator =
            Coordinator::new(&db, &config, &factory, options, watch::channel(false).1);

        let report = coordinator.run_all().await.unwrap();

        assert_eq!(report.count(SourceStatus::Skipped), registry().len());
        assert!(!report.any_failed());
        let banker = report.sources.iter().find(|s| s.domain == "banker.az").unwrap();
        assert_eq!(banker.error.as_deref(), Some("run deadline reached before start"));
        assert!(factory.opened.lock().unwrap().is_empty());
        let source = db.get_source("banker.az").await.unwrap().unwrap();
        assert!(db.jobs_for_source(source.id, 10).await.unwrap().is_empty());
    }
}
