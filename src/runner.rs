//! Source Runner: one scrape of one source, start to finish.
//!
//! A run moves a job row through `running → completed | partial | failed`:
//!
//! 1. Open a `running` job.
//! 2. Delete the source's current article snapshot.
//! 3. Walk the listing pages, optionally fetching article pages, inserting as it goes.
//! 4. Write the final status and counters, then purge expired job history.
//!
//! Page failures are recorded and skipped until the failure budget is spent.
//! Cancellation and the run deadline are observed at every await point, and
//! the job row is finalized on every exit path.

use crate::config::ResolvedSourceConfig;
use crate::dates::baku_now;
use crate::db::Database;
use crate::error::{ErrorCategory, FetchError, ParseError, RunError, StoreError};
use crate::fetcher::{PageFetcher, PageRequest};
use crate::models::{
    ArticleDetail, ArticleSummary, JobCounters, JobKind, JobStatus, JobUpdate, NewArticle,
    NewScrapeError, NewsSource, Pagination, Trigger, content_hash,
};
use crate::scrapers::{ExtractContext, Extractor};
use crate::utils::{slugify, truncate_for_log};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Per-invocation settings shared by every source run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Listing pages to walk, before any extractor page limit.
    pub max_pages: u32,
    /// Fetch and parse each article page.
    pub scrape_details: bool,
    pub trigger: Trigger,
    /// Point at which active runs are stopped and finalized as failed.
    pub deadline: Option<Instant>,
}

/// What a finished run reports back to the coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// `None` only when the job row itself could not be created.
    pub job_id: Option<i64>,
    pub status: JobStatus,
    pub counters: JobCounters,
    pub error: Option<String>,
}

/// A failure about to be written to `scrape_errors`.
#[derive(Debug)]
struct Failure {
    url: String,
    category: ErrorCategory,
    message: String,
    retry_count: u32,
}

impl Failure {
    fn fetch(err: &FetchError, max_attempts: u32) -> Self {
        let retry_count = match err {
            FetchError::Timeout { attempts, .. } => attempts.saturating_sub(1),
            e if e.is_retryable() => max_attempts.saturating_sub(1),
            _ => 0,
        };
        Self {
            url: err.url().to_string(),
            category: err.category(),
            message: err.to_string(),
            retry_count,
        }
    }

    fn parse(url: &str, err: &ParseError) -> Self {
        Self {
            url: url.to_string(),
            category: err.category(),
            message: err.to_string(),
            retry_count: 0,
        }
    }
}

/// Mutable state of one run.
struct SourceRun<'a, F> {
    db: &'a Database,
    fetcher: &'a F,
    extractor: &'a dyn Extractor,
    source: &'a NewsSource,
    config: &'a ResolvedSourceConfig,
    options: &'a RunOptions,
    job_id: i64,
    counters: JobCounters,
    seen_urls: HashSet<String>,
    seen_hashes: HashSet<String>,
    /// Category ids by slug, resolved once per run.
    categories: HashMap<String, i64>,
}

/// Scrape one source and return its final status and counters.
///
/// Never fails: every error is recorded against the job and reflected in the
/// returned [`RunSummary`].
///
/// # Arguments
///
/// * `fetcher` - Page source for this run; the caller closes it afterwards
/// * `extractor` - Parser for `source`'s markup
/// * `cancel` - Flips to `true` to stop the run early
#[instrument(
    level = "info",
    skip_all,
    fields(source = %source.domain, max_pages = options.max_pages, details = options.scrape_details)
)]
pub async fn run_source<F: PageFetcher>(
    db: &Database,
    fetcher: &F,
    extractor: &dyn Extractor,
    source: &NewsSource,
    config: &ResolvedSourceConfig,
    options: &RunOptions,
    mut cancel: watch::Receiver<bool>,
) -> RunSummary {
    let kind = JobKind::for_run(options.max_pages, options.scrape_details);
    let job_id = match db
        .create_job(source.id, kind, options.trigger.as_str(), Utc::now())
        .await
    {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "Could not open scrape job");
            return RunSummary {
                job_id: None,
                status: JobStatus::Failed,
                counters: JobCounters::default(),
                error: Some(e.to_string()),
            };
        }
    };
    info!(job_id, kind = kind.as_str(), trigger = options.trigger.as_str(), "Scrape job started");

    let mut run = SourceRun {
        db,
        fetcher,
        extractor,
        source,
        config,
        options,
        job_id,
        counters: JobCounters::default(),
        seen_urls: HashSet::new(),
        seen_hashes: HashSet::new(),
        categories: HashMap::new(),
    };

    let outcome = tokio::select! {
        result = run.paginate() => result,
        _ = cancelled(&mut cancel) => Err(RunError::Cancelled),
        _ = deadline_reached(options.deadline) => Err(RunError::TimedOut),
    };
    run.finalize(outcome).await
}

/// Resolves once `cancel` reads `true`. A dropped sender never cancels.
pub(crate) async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

pub(crate) async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl<F: PageFetcher> SourceRun<'_, F> {
    async fn paginate(&mut self) -> Result<(), RunError> {
        let ctx = ExtractContext::new(&self.source.base_url, baku_now()).map_err(|source| {
            RunError::InvalidBaseUrl {
                url: self.source.base_url.clone(),
                source,
            }
        })?;

        let deleted = self.db.delete_articles_for_source(self.source.id).await?;
        self.counters.articles_deleted = u32::try_from(deleted).unwrap_or(u32::MAX);

        let last_page = match self.extractor.page_limit() {
            Some(limit) => self.options.max_pages.min(limit),
            None => self.options.max_pages,
        };
        let page_size = self.config.run.page_size.or_else(|| {
            self.source
                .config_u64("per_page")
                .and_then(|n| u32::try_from(n).ok())
        });

        for page in 1..=last_page {
            let url = self.extractor.build_page_url(&self.source.base_url, page);
            let request = match self.source.pagination {
                Pagination::InfiniteScroll if page > 1 => PageRequest::rendered(&url, page - 1),
                _ => PageRequest::new(&url),
            };

            let markup = match self.fetcher.fetch(&request).await {
                Ok(markup) => markup,
                Err(e) => {
                    let failure = Failure::fetch(&e, self.config.fetch.max_attempts);
                    self.page_failed(page, failure).await?;
                    continue;
                }
            };
            let summaries = match self.extractor.parse_listing(&markup, page, &ctx) {
                Ok(summaries) => summaries,
                Err(e) => {
                    self.page_failed(page, Failure::parse(&url, &e)).await?;
                    continue;
                }
            };
            self.counters.pages_scraped += 1;

            let found = summaries.len();
            let fresh: Vec<ArticleSummary> = summaries
                .into_iter()
                .filter(|s| self.seen_urls.insert(s.url.clone()))
                .collect();
            info!(page, found, fresh = fresh.len(), "Listing page parsed");
            if fresh.is_empty() {
                debug!(page, "No new articles; listing exhausted");
                break;
            }
            self.counters.articles_found += u32::try_from(fresh.len()).unwrap_or(u32::MAX);
            self.persist_page(fresh, &ctx).await?;

            if let Some(size) = page_size {
                if found < size as usize {
                    debug!(page, found, page_size = size, "Short page; last listing page");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Count a failed page and stop once the budget is spent.
    async fn page_failed(&mut self, page: u32, failure: Failure) -> Result<(), RunError> {
        self.counters.pages_failed += 1;
        warn!(
            page,
            url = %failure.url,
            category = %failure.category,
            error = %truncate_for_log(&failure.message, 200),
            "Listing page failed"
        );
        self.record(&failure).await?;

        let budget = self.config.run.max_page_failures;
        if self.counters.pages_failed > budget {
            return Err(RunError::BudgetExceeded {
                failures: self.counters.pages_failed,
                budget,
            });
        }
        Ok(())
    }

    /// Write an error row. Only a lost connection stops the run.
    async fn record(&self, failure: &Failure) -> Result<(), RunError> {
        let row = NewScrapeError {
            job_id: self.job_id,
            source_id: self.source.id,
            url: failure.url.clone(),
            error_type: failure.category.as_str().to_string(),
            message: failure.message.clone(),
            retry_count: failure.retry_count,
        };
        match self.db.insert_error(&row).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_connection_failure() => Err(e.into()),
            Err(e) => {
                warn!(error = %e, url = %failure.url, "Could not record scrape error");
                Ok(())
            }
        }
    }

    async fn persist_page(
        &mut self,
        summaries: Vec<ArticleSummary>,
        ctx: &ExtractContext,
    ) -> Result<(), RunError> {
        let mut unique = Vec::with_capacity(summaries.len());
        for summary in summaries {
            if self
                .seen_hashes
                .insert(content_hash(&summary.title, &summary.url))
            {
                unique.push(summary);
            } else {
                self.counters.articles_duplicate += 1;
                debug!(url = %summary.url, "Duplicate content hash in this run");
            }
        }

        let scraped_at = Utc::now();
        let fetched: Vec<(ArticleSummary, Option<Result<ArticleDetail, Failure>>)> =
            if self.options.scrape_details {
                let this = &*self;
                stream::iter(unique)
                    .map(|summary| async move {
                        let (summary, detail) = this.fetch_detail(summary, ctx).await;
                        (summary, Some(detail))
                    })
                    .buffer_unordered(this.config.run.detail_concurrency)
                    .collect()
                    .await
            } else {
                unique.into_iter().map(|summary| (summary, None)).collect()
            };

        for (summary, detail) in fetched {
            let detail = match detail {
                Some(Ok(detail)) => Some(detail),
                Some(Err(failure)) => {
                    warn!(
                        url = %failure.url,
                        category = %failure.category,
                        "Article page unavailable; keeping metadata only"
                    );
                    self.record(&failure).await?;
                    None
                }
                None => None,
            };
            let category_id = self.category_id(summary.category.as_deref()).await?;
            let article =
                NewArticle::from_parts(self.source.id, summary, detail, category_id, scraped_at);
            self.insert(&article).await?;
        }
        Ok(())
    }

    /// Stored id of a listing section. A failed lookup leaves the article
    /// uncategorized unless the connection is gone.
    async fn category_id(&mut self, name: Option<&str>) -> Result<Option<i64>, RunError> {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        let slug = slugify(name);
        if let Some(id) = self.categories.get(&slug) {
            return Ok(Some(*id));
        }
        match self
            .db
            .get_or_create_category(self.source.id, name, &slug)
            .await
        {
            Ok(id) => {
                self.categories.insert(slug, id);
                Ok(Some(id))
            }
            Err(e) if e.is_connection_failure() => Err(e.into()),
            Err(e) => {
                warn!(category = name, error = %e, "Could not resolve category");
                Ok(None)
            }
        }
    }

    async fn fetch_detail(
        &self,
        summary: ArticleSummary,
        ctx: &ExtractContext,
    ) -> (ArticleSummary, Result<ArticleDetail, Failure>) {
        let result = match self.fetcher.fetch(&PageRequest::new(&summary.url)).await {
            Ok(markup) => self
                .extractor
                .parse_detail(&markup, &summary.url, ctx)
                .map_err(|e| Failure::parse(&summary.url, &e)),
            Err(e) => Err(Failure::fetch(&e, self.config.fetch.max_attempts)),
        };
        (summary, result)
    }

    async fn insert(&mut self, article: &NewArticle) -> Result<(), RunError> {
        match self.db.insert_article(article).await {
            Ok(()) => {
                self.counters.articles_new += 1;
                Ok(())
            }
            Err(StoreError::ConstraintViolation(reason)) => {
                self.counters.articles_duplicate += 1;
                debug!(url = %article.url, %reason, "Article already stored");
                Ok(())
            }
            Err(e) if e.is_connection_failure() => Err(e.into()),
            Err(e) => {
                self.counters.articles_failed += 1;
                warn!(url = %article.url, error = %e, "Failed to save article");
                self.record(&Failure {
                    url: article.url.clone(),
                    category: ErrorCategory::SaveError,
                    message: e.to_string(),
                    retry_count: 0,
                })
                .await
            }
        }
    }

    /// Close the job row and sweep history. Store errors here are logged only.
    async fn finalize(self, outcome: Result<(), RunError>) -> RunSummary {
        let (status, error_message) = match &outcome {
            Ok(()) if self.counters.pages_failed > 0 => (JobStatus::Partial, None),
            Ok(()) => (JobStatus::Completed, None),
            Err(e) => (JobStatus::Failed, Some(e.to_string())),
        };

        if let Err(e) = &outcome {
            error!(job_id = self.job_id, error = %e, "Scrape run aborted");
            let failure = Failure {
                url: self.source.base_url.clone(),
                category: e.category(),
                message: e.to_string(),
                retry_count: 0,
            };
            if let Err(record_err) = self.record(&failure).await {
                warn!(error = %record_err, "Could not record run failure");
            }
        }

        let update = JobUpdate {
            status,
            completed_at: Utc::now(),
            counters: self.counters,
            error_message: error_message.clone(),
        };
        if let Err(e) = self.db.update_job(self.job_id, &update).await {
            error!(job_id = self.job_id, error = %e, "Could not finalize scrape job");
        }
        if let Err(e) = self
            .db
            .sweep_history(self.source.id, self.config.retention_days, Utc::now())
            .await
        {
            warn!(error = %e, "Retention sweep failed");
        }

        let c = &self.counters;
        info!(
            job_id = self.job_id,
            status = %status,
            deleted = c.articles_deleted,
            pages_scraped = c.pages_scraped,
            pages_failed = c.pages_failed,
            found = c.articles_found,
            new = c.articles_new,
            duplicate = c.articles_duplicate,
            failed = c.articles_failed,
            "Scrape job finished"
        );

        RunSummary {
            job_id: Some(self.job_id),
            status,
            counters: self.counters,
            error: error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::scrapers::banker::Banker;
    use crate::scrapers::oxu::Oxu;
    use chrono::Duration as ChronoDuration;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const BASE: &str = "https://banker.az";

    /// Serves canned markup; unknown URLs are 404s.
    #[derive(Default)]
    struct FakeSite {
        pages: HashMap<String, String>,
        hang_on: Option<String>,
        close_db_on: Option<(String, Database)>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn page(mut self, url: impl Into<String>, markup: impl Into<String>) -> Self {
            self.pages.insert(url.into(), markup.into());
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    impl PageFetcher for FakeSite {
        async fn fetch(&self, request: &PageRequest<'_>) -> Result<String, FetchError> {
            self.fetched.lock().unwrap().push(request.url.to_string());
            if self.hang_on.as_deref() == Some(request.url) {
                std::future::pending::<()>().await;
            }
            if let Some((url, db)) = &self.close_db_on {
                if url == request.url {
                    db.close().await;
                }
            }
            self.pages
                .get(request.url)
                .cloned()
                .ok_or_else(|| FetchError::HttpStatus {
                    url: request.url.to_string(),
                    status: 404,
                })
        }

        async fn close(self) {}
    }

    fn page_url(page: u32) -> String {
        Banker.build_page_url(BASE, page)
    }

    fn listing(items: &[(&str, &str)]) -> String {
        let cards: String = items
            .iter()
            .map(|(href, title)| {
                format!(
                    r#"<div class="td_module_wrap"><h3 class="entry-title"><a href="{href}">{title}</a></h3></div>"#
                )
            })
            .collect();
        format!("<html><body><div class=\"td-category-grid\">{cards}</div></body></html>")
    }

    fn article_page(text: &str) -> String {
        format!(
            r#"<html><body><div class="tdb_single_content"><div class="tdb-block-inner"><p>{text}</p></div></div></body></html>"#
        )
    }

    const THREE: [(&str, &str); 3] = [
        ("/kredit-portfeli-artib/", "Kredit portfeli 8% artıb"),
        ("/depozit-faizleri/", "Depozit faizləri sabit qalıb"),
        ("/manat-mezennesi/", "Manatın məzənnəsi açıqlandı"),
    ];

    fn options(max_pages: u32, scrape_details: bool) -> RunOptions {
        RunOptions {
            max_pages,
            scrape_details,
            trigger: Trigger::Ci,
            deadline: None,
        }
    }

    fn config() -> ResolvedSourceConfig {
        Config::default().resolve("banker.az")
    }

    fn never_cancel() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    async fn setup() -> (Database, NewsSource) {
        let db = Database::in_memory().await;
        let source = db.get_source("banker.az").await.unwrap().unwrap();
        (db, source)
    }

    async fn run(
        db: &Database,
        site: &FakeSite,
        source: &NewsSource,
        config: &ResolvedSourceConfig,
        options: &RunOptions,
    ) -> RunSummary {
        run_source(db, site, &Banker, source, config, options, never_cancel()).await
    }

    async fn error_types(db: &Database, job_id: i64) -> Vec<String> {
        db.errors_for_job(job_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.error_type)
            .collect()
    }

    #[tokio::test]
    async fn test_three_item_listing_stores_three_articles() {
        let (db, source) = setup().await;
        let site = FakeSite::default().page(page_url(1), listing(&THREE));

        let summary = run(&db, &site, &source, &config(), &options(1, false)).await;

        assert_eq!(summary.status, JobStatus::Completed);
        assert_eq!(summary.counters.articles_found, 3);
        assert_eq!(summary.counters.articles_new, 3);
        assert_eq!(
            db.article_urls(source.id).await.unwrap(),
            vec![
                "https://banker.az/depozit-faizleri/",
                "https://banker.az/kredit-portfeli-artib/",
                "https://banker.az/manat-mezennesi/",
            ]
        );

        let job = db.get_job(summary.job_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.kind, JobKind::Incremental);
        assert_eq!(job.triggered_by, "ci");
        assert_eq!(job.counters.articles_new, 3);
        assert!(job.completed_at.unwrap() >= job.started_at);
    }

    #[tokio::test]
    async fn test_listing_section_is_stored_as_category() {
        let db = Database::in_memory().await;
        let source = db.get_source("oxu.az").await.unwrap().unwrap();
        let markup = r#"<html><body><div class="posts">
          <div class="post-item rt-news-item" data-url="/iqtisadiyyat/manat-mezennesi-acilandi">
            <h3>Manatın məzənnəsi açıqlandı</h3></div>
          <div class="post-item rt-news-item" data-url="/iqtisadiyyat/neft-bahalasdi">
            <h3>Neft qiyməti bahalaşdı</h3></div>
        </div></body></html>"#;
        let site = FakeSite::default().page(Oxu.build_page_url(&source.base_url, 1), markup);
        let config = Config::default().resolve("oxu.az");

        let summary =
            run_source(&db, &site, &Oxu, &source, &config, &options(1, false), never_cancel())
                .await;

        assert_eq!(summary.counters.articles_new, 2);
        let category = db
            .get_or_create_category(source.id, "iqtisadiyyat", "iqtisadiyyat")
            .await
            .unwrap();
        let stored = db.recent_articles(source.id, 10).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|a| a.category_id == Some(category)));
        assert!(
            stored
                .iter()
                .any(|a| a.source_article_id.as_deref() == Some("neft-bahalasdi"))
        );
    }

    #[tokio::test]
    async fn test_malformed_page_is_recorded_and_run_is_partial() {
        let (db, source) = setup().await;
        let site = FakeSite::default()
            .page(page_url(1), "<html><body><p>Texniki işlər gedir</p></body></html>")
            .page(page_url(2), listing(&THREE[..2]));

        let summary = run(&db, &site, &source, &config(), &options(2, false)).await;

        assert_eq!(summary.status, JobStatus::Partial);
        assert_eq!(summary.counters.pages_failed, 1);
        assert_eq!(summary.counters.pages_scraped, 1);
        assert_eq!(summary.counters.articles_new, 2);
        assert_eq!(
            error_types(&db, summary.job_id.unwrap()).await,
            vec!["listing_unavailable"]
        );
    }

    #[tokio::test]
    async fn test_exceeding_failure_budget_fails_run() {
        let (db, source) = setup().await;
        let mut config = config();
        config.run.max_page_failures = 1;
        let site = FakeSite::default();

        let summary = run(&db, &site, &source, &config, &options(5, false)).await;

        assert_eq!(summary.status, JobStatus::Failed);
        assert_eq!(site.fetched(), vec![page_url(1), page_url(2)]);
        let job_id = summary.job_id.unwrap();
        assert_eq!(
            error_types(&db, job_id).await,
            vec!["http_status", "http_status", "run_aborted"]
        );
        let job = db.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_message.unwrap().contains("budget 1"));
    }

    #[tokio::test]
    async fn test_rerun_replaces_snapshot_without_duplicates() {
        let (db, source) = setup().await;
        let site = FakeSite::default().page(page_url(1), listing(&THREE));

        let first = run(&db, &site, &source, &config(), &options(1, false)).await;
        let before = db.article_urls(source.id).await.unwrap();
        let second = run(&db, &site, &source, &config(), &options(1, false)).await;

        assert_eq!(first.status, JobStatus::Completed);
        assert_eq!(second.status, JobStatus::Completed);
        assert_eq!(second.counters.articles_deleted, 3);
        assert_eq!(second.counters.articles_new, 3);
        assert_eq!(db.article_urls(source.id).await.unwrap(), before);
        assert_eq!(db.count_articles(source.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_same_content_hash_is_stored_once() {
        let (db, source) = setup().await;
        let site = FakeSite::default()
            .page(
                page_url(1),
                listing(&[
                    ("/manat-sabit/", "Manat sabit qalıb"),
                    ("/neft-bahalasib/", "Neft bahalaşıb bu gün"),
                ]),
            )
            .page(
                page_url(2),
                listing(&[
                    ("/manat-sabit", "MANAT  sabit qalıb"),
                    ("/qizil-ucuzlasib/", "Qızıl yenə ucuzlaşıb"),
                ]),
            );

        let summary = run(&db, &site, &source, &config(), &options(2, false)).await;

        assert_eq!(summary.status, JobStatus::Completed);
        assert_eq!(summary.counters.articles_duplicate, 1);
        assert_eq!(summary.counters.articles_new, 3);
        assert_eq!(db.count_articles(source.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_detail_failures_keep_metadata_only_articles() {
        let (db, source) = setup().await;
        let site = FakeSite::default()
            .page(page_url(1), listing(&THREE))
            .page(
                "https://banker.az/kredit-portfeli-artib/",
                article_page("Bankların kredit portfeli ötən ilə nisbətən səkkiz faiz artıb."),
            )
            .page(
                "https://banker.az/manat-mezennesi/",
                "<html><body><div class=\"comments\">Şərh yoxdur</div></body></html>",
            );

        let summary = run(&db, &site, &source, &config(), &options(1, true)).await;

        assert_eq!(summary.status, JobStatus::Completed);
        assert_eq!(summary.counters.articles_new, 3);
        assert_eq!(summary.counters.articles_failed, 0);
        let with_content: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE content IS NOT NULL")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(with_content, 1);

        let mut types = error_types(&db, summary.job_id.unwrap()).await;
        types.sort();
        assert_eq!(types, vec!["detail_unavailable", "http_status"]);
        assert_eq!(JobKind::for_run(1, true), JobKind::DetailScrape);
    }

    #[tokio::test]
    async fn test_short_page_ends_pagination() {
        let (db, source) = setup().await;
        let mut config = config();
        config.run.page_size = Some(10);
        let site = FakeSite::default().page(page_url(1), listing(&THREE));

        let summary = run(&db, &site, &source, &config, &options(3, false)).await;

        assert_eq!(summary.status, JobStatus::Completed);
        assert_eq!(site.fetched(), vec![page_url(1)]);
    }

    #[tokio::test]
    async fn test_repeated_listing_ends_pagination() {
        let (db, source) = setup().await;
        let site = FakeSite::default()
            .page(page_url(1), listing(&THREE))
            .page(page_url(2), listing(&THREE));

        let summary = run(&db, &site, &source, &config(), &options(3, false)).await;

        assert_eq!(summary.status, JobStatus::Completed);
        assert_eq!(summary.counters.pages_scraped, 2);
        assert_eq!(summary.counters.articles_found, 3);
        assert_eq!(site.fetched(), vec![page_url(1), page_url(2)]);
    }

    #[tokio::test]
    async fn test_cancel_finalizes_job_as_failed() {
        let (db, source) = setup().await;
        let site = FakeSite {
            hang_on: Some(page_url(1)),
            ..FakeSite::default()
        };
        let (tx, rx) = watch::channel(false);
        let config = config();
        let options = options(3, false);

        let (summary, _) = tokio::join!(
            run_source(&db, &site, &Banker, &source, &config, &options, rx),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                tx.send(true).unwrap();
            }
        );

        assert_eq!(summary.status, JobStatus::Failed);
        assert_eq!(summary.error.as_deref(), Some("run cancelled"));
        let job_id = summary.job_id.unwrap();
        let job = db.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.completed_at.is_some());
        assert_eq!(error_types(&db, job_id).await, vec!["cancelled"]);
    }

    #[tokio::test]
    async fn test_deadline_finalizes_job_as_failed() {
        let (db, source) = setup().await;
        let site = FakeSite {
            hang_on: Some(page_url(1)),
            ..FakeSite::default()
        };
        let mut options = options(3, false);
        options.deadline = Some(Instant::now() + Duration::from_millis(50));

        let summary = run(&db, &site, &source, &config(), &options).await;

        assert_eq!(summary.status, JobStatus::Failed);
        assert_eq!(summary.error.as_deref(), Some("run deadline reached"));
        let job = db.get_job(summary.job_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_lost_connection_aborts_run() {
        let (db, source) = setup().await;
        let site = FakeSite {
            close_db_on: Some((
                "https://banker.az/kredit-portfeli-artib/".to_string(),
                db.clone(),
            )),
            ..FakeSite::default()
        }
        .page(page_url(1), listing(&THREE));
        let mut config = config();
        config.run.detail_concurrency = 1;

        let summary = run(&db, &site, &source, &config, &options(1, true)).await;

        assert_eq!(summary.status, JobStatus::Failed);
        assert_eq!(summary.counters.articles_new, 0);
        assert!(summary.error.unwrap().contains("connection"));
    }

    #[tokio::test]
    async fn test_run_purges_expired_history() {
        let (db, source) = setup().await;
        let old = db
            .create_job(
                source.id,
                JobKind::Incremental,
                "scheduled",
                Utc::now() - ChronoDuration::days(8),
            )
            .await
            .unwrap();
        let site = FakeSite::default().page(page_url(1), listing(&THREE));

        let summary = run(&db, &site, &source, &config(), &options(1, false)).await;

        assert!(db.get_job(old).await.unwrap().is_none());
        assert!(db.get_job(summary.job_id.unwrap()).await.unwrap().is_some());
    }
}
