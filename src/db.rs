//! Persistence gateway over SQLite.
//!
//! All reads and writes go through [`Database`], a thin wrapper around a
//! `sqlx` connection pool. Each operation is a single statement; there is no
//! run-wide transaction, so one bad article never rolls back a page.
//!
//! # Schema
//!
//! | Table | Purpose |
//! |-------|---------|
//! | `news_sources` | One row per registered site, seeded from the extractor registry |
//! | `categories` | Listing sections per source, unique on `(source_id, slug)` |
//! | `articles` | The latest snapshot per source; unique on `url` and on `(source_id, source_article_id)` |
//! | `scrape_jobs` | One row per source run with final counters |
//! | `scrape_errors` | Per-page and per-article failures, cascaded with their job |
//!
//! Article ids are hyphenated UUID text and timestamps are RFC 3339 text;
//! age comparisons go through `julianday` so mixed precisions compare correctly.

use crate::error::StoreError;
use crate::models::{
    Article, JobCounters, JobKind, JobStatus, JobUpdate, NewArticle, NewScrapeError, NewsSource,
    ScrapeErrorRecord, ScrapeJob, SourceSeed,
};
use crate::scrapers::registry;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: [&str; 7] = [
    r#"
    CREATE TABLE IF NOT EXISTS news_sources (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        domain TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        base_url TEXT NOT NULL,
        language TEXT NOT NULL DEFAULT 'az',
        is_active INTEGER NOT NULL DEFAULT 1,
        pagination_type TEXT NOT NULL,
        scraper_config TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_id INTEGER NOT NULL REFERENCES news_sources(id),
        name TEXT NOT NULL,
        slug TEXT NOT NULL,
        UNIQUE (source_id, slug)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        source_id INTEGER NOT NULL REFERENCES news_sources(id),
        source_article_id TEXT,
        category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
        title TEXT NOT NULL,
        slug TEXT,
        url TEXT NOT NULL UNIQUE,
        excerpt TEXT,
        content TEXT,
        image_url TEXT,
        author TEXT,
        published_at TEXT,
        scraped_at TEXT NOT NULL,
        view_count INTEGER NOT NULL DEFAULT 0,
        content_hash TEXT NOT NULL,
        UNIQUE (source_id, url)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source_id)",
    r#"
    CREATE TABLE IF NOT EXISTS scrape_jobs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_id INTEGER NOT NULL REFERENCES news_sources(id),
        job_type TEXT NOT NULL,
        status TEXT NOT NULL,
        triggered_by TEXT NOT NULL,
        started_at TEXT NOT NULL,
        completed_at TEXT,
        pages_scraped INTEGER NOT NULL DEFAULT 0,
        pages_failed INTEGER NOT NULL DEFAULT 0,
        articles_found INTEGER NOT NULL DEFAULT 0,
        articles_new INTEGER NOT NULL DEFAULT 0,
        articles_updated INTEGER NOT NULL DEFAULT 0,
        articles_failed INTEGER NOT NULL DEFAULT 0,
        articles_duplicate INTEGER NOT NULL DEFAULT 0,
        articles_deleted INTEGER NOT NULL DEFAULT 0,
        error_message TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS scrape_errors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id INTEGER NOT NULL REFERENCES scrape_jobs(id) ON DELETE CASCADE,
        source_id INTEGER NOT NULL REFERENCES news_sources(id),
        url TEXT NOT NULL,
        error_type TEXT NOT NULL,
        error_message TEXT NOT NULL,
        retry_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_scrape_jobs_source ON scrape_jobs(source_id, started_at)",
];

/// `articles` columns missing from databases created by earlier releases.
const ARTICLE_COLUMNS: [(&str, &str); 3] = [
    ("source_article_id", "TEXT"),
    ("category_id", "INTEGER REFERENCES categories(id) ON DELETE SET NULL"),
    ("slug", "TEXT"),
];

const ARTICLE_SITE_ID_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_articles_site_id \
     ON articles(source_id, source_article_id)";

/// History tables swept by age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryTable {
    ScrapeJobs,
    ScrapeErrors,
}

impl HistoryTable {
    fn table(&self) -> &'static str {
        match self {
            HistoryTable::ScrapeJobs => "scrape_jobs",
            HistoryTable::ScrapeErrors => "scrape_errors",
        }
    }

    fn timestamp_column(&self) -> &'static str {
        match self {
            HistoryTable::ScrapeJobs => "started_at",
            HistoryTable::ScrapeErrors => "created_at",
        }
    }
}

/// Rows removed by one retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepResult {
    pub errors_deleted: u64,
    pub jobs_deleted: u64,
}

/// Per-source figures for the `stats` command.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    pub domain: String,
    pub name: String,
    pub is_active: bool,
    pub article_count: i64,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub jobs_total: i64,
    pub jobs_completed: i64,
    pub jobs_partial: i64,
    pub jobs_failed: i64,
    pub avg_duration_secs: Option<f64>,
}

/// Handle to the article store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

fn decode_error(message: String) -> StoreError {
    StoreError::Query(sqlx::Error::Decode(message.into()))
}

fn source_from_row(row: &SqliteRow) -> Result<NewsSource, StoreError> {
    let pagination: String = row.try_get("pagination_type")?;
    let config: String = row.try_get("scraper_config")?;
    let scraper_config: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&config).map_err(|e| decode_error(e.to_string()))?;
    Ok(NewsSource {
        id: row.try_get("id")?,
        domain: row.try_get("domain")?,
        name: row.try_get("name")?,
        base_url: row.try_get("base_url")?,
        language: row.try_get("language")?,
        is_active: row.try_get("is_active")?,
        pagination: pagination.parse().map_err(decode_error)?,
        scraper_config,
    })
}

fn article_from_row(row: &SqliteRow) -> Result<Article, StoreError> {
    let id: String = row.try_get("id")?;
    Ok(Article {
        id: Uuid::parse_str(&id).map_err(|e| decode_error(e.to_string()))?,
        source_id: row.try_get("source_id")?,
        source_article_id: row.try_get("source_article_id")?,
        category_id: row.try_get("category_id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        url: row.try_get("url")?,
        excerpt: row.try_get("excerpt")?,
        content: row.try_get("content")?,
        image_url: row.try_get("image_url")?,
        author: row.try_get("author")?,
        published_at: row.try_get("published_at")?,
        scraped_at: row.try_get("scraped_at")?,
        view_count: row.try_get("view_count")?,
        content_hash: row.try_get("content_hash")?,
    })
}

fn job_from_row(row: &SqliteRow) -> Result<ScrapeJob, StoreError> {
    let kind: String = row.try_get("job_type")?;
    let status: String = row.try_get("status")?;
    Ok(ScrapeJob {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        kind: JobKind::from_str(&kind).map_err(decode_error)?,
        status: JobStatus::from_str(&status).map_err(decode_error)?,
        triggered_by: row.try_get("triggered_by")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        counters: JobCounters {
            pages_scraped: row.try_get("pages_scraped")?,
            pages_failed: row.try_get("pages_failed")?,
            articles_found: row.try_get("articles_found")?,
            articles_new: row.try_get("articles_new")?,
            articles_updated: row.try_get("articles_updated")?,
            articles_failed: row.try_get("articles_failed")?,
            articles_duplicate: row.try_get("articles_duplicate")?,
            articles_deleted: row.try_get("articles_deleted")?,
        },
        error_message: row.try_get("error_message")?,
    })
}

impl Database {
    /// Open (creating if needed) the database at `url`, apply the schema and
    /// seed the registered sources.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConnectionFailure`] if the database cannot be opened.
    #[instrument(level = "info", skip_all, fields(url = %url, max_connections))]
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, applying the schema and seeding sources.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let db = Self { pool };
        db.migrate().await?;
        let seeded = db
            .seed_sources(registry().iter().map(|e| e.seed()))
            .await?;
        info!(seeded, "Database ready");
        Ok(db)
    }

    /// Single-connection in-memory database for tests.
    #[cfg(test)]
    pub(crate) async fn in_memory() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        Self::from_pool(pool).await.unwrap()
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        let present: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('articles')")
                .fetch_all(&self.pool)
                .await?;
        for (column, definition) in ARTICLE_COLUMNS {
            if !present.iter().any(|c| c == column) {
                sqlx::query(&format!("ALTER TABLE articles ADD COLUMN {column} {definition}"))
                    .execute(&self.pool)
                    .await?;
                info!(column, "Added articles column");
            }
        }
        sqlx::query(ARTICLE_SITE_ID_INDEX)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert sources that are not present yet. Existing rows, including
    /// their active flag, are left untouched.
    pub async fn seed_sources(
        &self,
        seeds: impl IntoIterator<Item = SourceSeed>,
    ) -> Result<u64, StoreError> {
        let mut inserted = 0;
        for seed in seeds {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO news_sources \
                 (domain, name, base_url, language, pagination_type, scraper_config) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(seed.domain)
            .bind(seed.name)
            .bind(seed.base_url)
            .bind(seed.language)
            .bind(seed.pagination.as_str())
            .bind(seed.scraper_config.to_string())
            .execute(&self.pool)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    pub async fn get_source(&self, domain: &str) -> Result<Option<NewsSource>, StoreError> {
        let row = sqlx::query("SELECT * FROM news_sources WHERE domain = ?")
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(source_from_row).transpose()
    }

    pub async fn list_sources(&self) -> Result<Vec<NewsSource>, StoreError> {
        let rows = sqlx::query("SELECT * FROM news_sources ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(source_from_row).collect()
    }

    /// Toggle whether `run-all` includes a source.
    ///
    /// # Errors
    ///
    /// [`StoreError::SourceNotFound`] for an unknown domain.
    pub async fn set_source_active(&self, domain: &str, active: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE news_sources SET is_active = ? WHERE domain = ?")
            .bind(active)
            .bind(domain)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::SourceNotFound(domain.to_string()));
        }
        Ok(())
    }

    /// Remove the current snapshot of a source. Must finish before the run
    /// inserts anything.
    #[instrument(level = "info", skip(self))]
    pub async fn delete_articles_for_source(&self, source_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM articles WHERE source_id = ?")
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        debug!(deleted = result.rows_affected(), "Cleared article snapshot");
        Ok(result.rows_affected())
    }

    /// Id of the category `slug` of a source, created on first use.
    ///
    /// A later call with a different `name` for the same slug renames it.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_or_create_category(
        &self,
        source_id: i64,
        name: &str,
        slug: &str,
    ) -> Result<i64, StoreError> {
        let id = sqlx::query_scalar(
            "INSERT INTO categories (source_id, name, slug) VALUES (?, ?, ?) \
             ON CONFLICT (source_id, slug) DO UPDATE SET name = excluded.name \
             RETURNING id",
        )
        .bind(source_id)
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Insert one article.
    ///
    /// # Errors
    ///
    /// [`StoreError::ConstraintViolation`] when the URL or the site's article id
    /// is already stored for the source.
    pub async fn insert_article(&self, article: &NewArticle) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO articles \
             (id, source_id, source_article_id, category_id, title, slug, url, excerpt, \
              content, image_url, author, published_at, scraped_at, content_hash) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(article.id.to_string())
        .bind(article.source_id)
        .bind(&article.source_article_id)
        .bind(article.category_id)
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.url)
        .bind(&article.excerpt)
        .bind(&article.content)
        .bind(&article.image_url)
        .bind(&article.author)
        .bind(article.published_at)
        .bind(article.scraped_at)
        .bind(&article.content_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count_articles(&self, source_id: i64) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE source_id = ?")
            .bind(source_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Stored articles of a source, newest publication first.
    pub async fn recent_articles(
        &self,
        source_id: i64,
        limit: u32,
    ) -> Result<Vec<Article>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM articles WHERE source_id = ? \
             ORDER BY published_at IS NULL, julianday(published_at) DESC, scraped_at DESC \
             LIMIT ?",
        )
        .bind(source_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(article_from_row).collect()
    }

    /// Stored URLs of a source, sorted.
    pub async fn article_urls(&self, source_id: i64) -> Result<Vec<String>, StoreError> {
        let urls = sqlx::query_scalar("SELECT url FROM articles WHERE source_id = ? ORDER BY url")
            .bind(source_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(urls)
    }

    /// Open a job in the `running` state and return its id.
    pub async fn create_job(
        &self,
        source_id: i64,
        kind: JobKind,
        triggered_by: &str,
        started_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO scrape_jobs (source_id, job_type, status, triggered_by, started_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(source_id)
        .bind(kind.as_str())
        .bind(JobStatus::Running.as_str())
        .bind(triggered_by)
        .bind(started_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Write the final status and counters of a job.
    pub async fn update_job(&self, job_id: i64, update: &JobUpdate) -> Result<(), StoreError> {
        let c = &update.counters;
        sqlx::query(
            "UPDATE scrape_jobs SET status = ?, completed_at = ?, \
             pages_scraped = ?, pages_failed = ?, articles_found = ?, articles_new = ?, \
             articles_updated = ?, articles_failed = ?, articles_duplicate = ?, \
             articles_deleted = ?, error_message = ? \
             WHERE id = ?",
        )
        .bind(update.status.as_str())
        .bind(update.completed_at)
        .bind(c.pages_scraped)
        .bind(c.pages_failed)
        .bind(c.articles_found)
        .bind(c.articles_new)
        .bind(c.articles_updated)
        .bind(c.articles_failed)
        .bind(c.articles_duplicate)
        .bind(c.articles_deleted)
        .bind(&update.error_message)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_job(&self, job_id: i64) -> Result<Option<ScrapeJob>, StoreError> {
        let row = sqlx::query("SELECT * FROM scrape_jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    /// Most recent jobs of a source, newest first.
    pub async fn jobs_for_source(
        &self,
        source_id: i64,
        limit: u32,
    ) -> Result<Vec<ScrapeJob>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM scrape_jobs WHERE source_id = ? ORDER BY id DESC LIMIT ?")
                .bind(source_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(job_from_row).collect()
    }

    pub async fn insert_error(&self, error: &NewScrapeError) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO scrape_errors \
             (job_id, source_id, url, error_type, error_message, retry_count, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(error.job_id)
        .bind(error.source_id)
        .bind(&error.url)
        .bind(&error.error_type)
        .bind(&error.message)
        .bind(error.retry_count)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn errors_for_job(&self, job_id: i64) -> Result<Vec<ScrapeErrorRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM scrape_errors WHERE job_id = ? ORDER BY id")
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(ScrapeErrorRecord {
                    id: row.try_get("id")?,
                    job_id: row.try_get("job_id")?,
                    source_id: row.try_get("source_id")?,
                    url: row.try_get("url")?,
                    error_type: row.try_get("error_type")?,
                    message: row.try_get("error_message")?,
                    retry_count: row.try_get("retry_count")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    /// Delete rows of `table` for `source_id` older than `cutoff`.
    pub async fn delete_older_than(
        &self,
        table: HistoryTable,
        source_id: i64,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE source_id = ? AND julianday({}) < julianday(?)",
            table.table(),
            table.timestamp_column()
        );
        let result = sqlx::query(&sql)
            .bind(source_id)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Purge job and error history older than `retention_days`, errors first.
    #[instrument(level = "info", skip(self, now))]
    pub async fn sweep_history(
        &self,
        source_id: i64,
        retention_days: u32,
        now: DateTime<Utc>,
    ) -> Result<SweepResult, StoreError> {
        let cutoff = now - Duration::days(i64::from(retention_days));
        let errors_deleted = self
            .delete_older_than(HistoryTable::ScrapeErrors, source_id, cutoff)
            .await?;
        let jobs_deleted = self
            .delete_older_than(HistoryTable::ScrapeJobs, source_id, cutoff)
            .await?;
        if errors_deleted + jobs_deleted > 0 {
            info!(errors_deleted, jobs_deleted, "Purged expired run history");
        }
        Ok(SweepResult {
            errors_deleted,
            jobs_deleted,
        })
    }

    /// Article and job figures for every source.
    pub async fn stats(&self) -> Result<Vec<SourceStats>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                s.domain,
                s.name,
                s.is_active,
                (SELECT COUNT(*) FROM articles a WHERE a.source_id = s.id) AS article_count,
                (SELECT MAX(a.scraped_at) FROM articles a WHERE a.source_id = s.id) AS last_scraped_at,
                (SELECT COUNT(*) FROM scrape_jobs j WHERE j.source_id = s.id) AS jobs_total,
                (SELECT COUNT(*) FROM scrape_jobs j
                    WHERE j.source_id = s.id AND j.status = 'completed') AS jobs_completed,
                (SELECT COUNT(*) FROM scrape_jobs j
                    WHERE j.source_id = s.id AND j.status = 'partial') AS jobs_partial,
                (SELECT COUNT(*) FROM scrape_jobs j
                    WHERE j.source_id = s.id AND j.status = 'failed') AS jobs_failed,
                (SELECT AVG((julianday(j.completed_at) - julianday(j.started_at)) * 86400.0)
                    FROM scrape_jobs j
                    WHERE j.source_id = s.id AND j.completed_at IS NOT NULL) AS avg_duration_secs
            FROM news_sources s
            ORDER BY s.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let last_scraped: Option<String> = row.try_get("last_scraped_at")?;
                Ok(SourceStats {
                    domain: row.try_get("domain")?,
                    name: row.try_get("name")?,
                    is_active: row.try_get("is_active")?,
                    article_count: row.try_get("article_count")?,
                    last_scraped_at: last_scraped
                        .as_deref()
                        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                        .map(|dt| dt.with_timezone(&Utc)),
                    jobs_total: row.try_get("jobs_total")?,
                    jobs_completed: row.try_get("jobs_completed")?,
                    jobs_partial: row.try_get("jobs_partial")?,
                    jobs_failed: row.try_get("jobs_failed")?,
                    avg_duration_secs: row.try_get("avg_duration_secs")?,
                })
            })
            .collect()
    }
}
