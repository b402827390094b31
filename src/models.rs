//! Data models for sources, articles and scrape job telemetry.
//!
//! This module defines the records that flow through a scrape run:
//! - [`NewsSource`]: A registered news site and its scraper settings
//! - [`ArticleSummary`] / [`ArticleDetail`]: What an extractor pulls out of markup
//! - [`NewArticle`] / [`Article`]: The normalized row stored per source snapshot
//! - [`ScrapeJob`] / [`ScrapeErrorRecord`]: Per-run bookkeeping with bounded retention

use crate::utils::fold_case;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How a source exposes more than one listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pagination {
    /// `?page=N` style listings.
    QueryParam,
    /// `/page/N/` style listings.
    PathBased,
    /// A single listing that loads more items as the page is scrolled.
    InfiniteScroll,
}

impl Pagination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pagination::QueryParam => "query_param",
            Pagination::PathBased => "path_based",
            Pagination::InfiniteScroll => "infinite_scroll",
        }
    }
}

impl FromStr for Pagination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query_param" => Ok(Pagination::QueryParam),
            "path_based" => Ok(Pagination::PathBased),
            "infinite_scroll" => Ok(Pagination::InfiniteScroll),
            other => Err(format!("unknown pagination type '{other}'")),
        }
    }
}

impl fmt::Display for Pagination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered news website.
///
/// Rows are seeded once from the extractor registry and afterwards only the
/// `is_active` flag is expected to change.
#[derive(Debug, Clone, Serialize)]
pub struct NewsSource {
    pub id: i64,
    /// Unique key, e.g. `"oxu.az"`.
    pub domain: String,
    pub name: String,
    pub base_url: String,
    /// Language tag such as `"az"`.
    pub language: String,
    pub is_active: bool,
    pub pagination: Pagination,
    /// Free-form extractor settings (`pagination_param`, `per_page`, `multilingual`, ...).
    pub scraper_config: BTreeMap<String, serde_json::Value>,
}

impl NewsSource {
    /// Read an integer setting from `scraper_config`.
    pub fn config_u64(&self, key: &str) -> Option<u64> {
        self.scraper_config.get(key).and_then(|v| v.as_u64())
    }
}

/// Seed data for one row of the `news_sources` table.
#[derive(Debug, Clone)]
pub struct SourceSeed {
    pub domain: &'static str,
    pub name: &'static str,
    pub base_url: &'static str,
    pub language: &'static str,
    pub pagination: Pagination,
    pub scraper_config: serde_json::Value,
}

/// One entry of a listing page, as returned by an extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleSummary {
    pub url: String,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    /// The site's own id for the article, unique within a source.
    pub source_article_id: Option<String>,
    pub slug: Option<String>,
    /// Section slug taken from the article URL, e.g. `iqtisadiyyat`.
    pub category: Option<String>,
}

/// The body and byline pulled from an article page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDetail {
    pub content: String,
    pub author: Option<String>,
    /// Some sites only show a usable timestamp on the article page.
    pub published_at: Option<DateTime<Utc>>,
}

/// A normalized article ready to be inserted for the current run.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub id: Uuid,
    pub source_id: i64,
    pub source_article_id: Option<String>,
    pub category_id: Option<i64>,
    pub title: String,
    pub slug: Option<String>,
    pub url: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    pub content_hash: String,
}

impl NewArticle {
    /// Build an article from its listing entry, with optional detail content merged in.
    ///
    /// `category_id` is the stored category matching `summary.category`.
    pub fn from_parts(
        source_id: i64,
        summary: ArticleSummary,
        detail: Option<ArticleDetail>,
        category_id: Option<i64>,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        let content_hash = content_hash(&summary.title, &summary.url);
        let (content, author, detail_date) = match detail {
            Some(d) => (Some(d.content), d.author, d.published_at),
            None => (None, None, None),
        };
        let excerpt = content.as_deref().and_then(derive_excerpt);

        Self {
            id: Uuid::new_v4(),
            source_id,
            source_article_id: summary.source_article_id,
            category_id,
            title: summary.title,
            slug: summary.slug,
            url: summary.url,
            excerpt,
            content,
            image_url: summary.image_url,
            author,
            published_at: summary.published_at.or(detail_date),
            scraped_at,
            content_hash,
        }
    }
}

/// A stored article row.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: Uuid,
    pub source_id: i64,
    pub source_article_id: Option<String>,
    pub category_id: Option<i64>,
    pub title: String,
    pub slug: Option<String>,
    pub url: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    pub view_count: i64,
    pub content_hash: String,
}

const EXCERPT_MAX_CHARS: usize = 300;

fn derive_excerpt(content: &str) -> Option<String> {
    let first = content.split("\n\n").map(str::trim).find(|p| !p.is_empty())?;
    if first.chars().count() <= EXCERPT_MAX_CHARS {
        return Some(first.to_string());
    }
    let cut: String = first.chars().take(EXCERPT_MAX_CHARS).collect();
    Some(format!("{}…", cut.trim_end()))
}

/// Fingerprint of an article's title and URL, used to spot duplicates.
///
/// Titles are compared case-insensitively (Azerbaijani i variants folded)
/// with collapsed whitespace; URLs ignore a trailing slash and fragment.
pub fn content_hash(title: &str, url: &str) -> String {
    let title = fold_case(&title.split_whitespace().collect::<Vec<_>>().join(" "));
    let url = url.trim();
    let url = url.split('#').next().unwrap_or(url).trim_end_matches('/');

    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// What a scrape job covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    FullScrape,
    Incremental,
    DetailScrape,
}

impl JobKind {
    /// Classify a run from its page budget and detail flag.
    pub fn for_run(max_pages: u32, scrape_details: bool) -> Self {
        if max_pages > 5 {
            JobKind::FullScrape
        } else if scrape_details {
            JobKind::DetailScrape
        } else {
            JobKind::Incremental
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::FullScrape => "full_scrape",
            JobKind::Incremental => "incremental",
            JobKind::DetailScrape => "detail_scrape",
        }
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_scrape" => Ok(JobKind::FullScrape),
            "incremental" => Ok(JobKind::Incremental),
            "detail_scrape" => Ok(JobKind::DetailScrape),
            other => Err(format!("unknown job kind '{other}'")),
        }
    }
}

/// Lifecycle state of a scrape job. `Running` must never outlive its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Partial,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Partial => "partial",
            JobStatus::Failed => "failed",
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "partial" => Ok(JobStatus::Partial),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    Scheduled,
    Ci,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Manual => "manual",
            Trigger::Scheduled => "scheduled",
            Trigger::Ci => "ci",
        }
    }
}

/// Counters accumulated during a run and written to the job row at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounters {
    pub pages_scraped: u32,
    pub pages_failed: u32,
    pub articles_found: u32,
    pub articles_new: u32,
    pub articles_updated: u32,
    pub articles_failed: u32,
    pub articles_duplicate: u32,
    pub articles_deleted: u32,
}

/// A stored scrape job row.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeJob {
    pub id: i64,
    pub source_id: i64,
    pub kind: JobKind,
    pub status: JobStatus,
    pub triggered_by: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub counters: JobCounters,
    pub error_message: Option<String>,
}

/// Final values written to a job row when its run ends.
#[derive(Debug, Clone)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub completed_at: DateTime<Utc>,
    pub counters: JobCounters,
    pub error_message: Option<String>,
}

/// A scrape error to record against a running job.
#[derive(Debug, Clone)]
pub struct NewScrapeError {
    pub job_id: i64,
    pub source_id: i64,
    pub url: String,
    pub error_type: String,
    pub message: String,
    pub retry_count: u32,
}

/// A stored scrape error row.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeErrorRecord {
    pub id: i64,
    pub job_id: i64,
    pub source_id: i64,
    pub url: String,
    pub error_type: String,
    pub message: String,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(title: &str, url: &str) -> ArticleSummary {
        ArticleSummary {
            url: url.to_string(),
            title: title.to_string(),
            ..ArticleSummary::default()
        }
    }

    #[test]
    fn test_content_hash_normalizes_title_and_url() {
        let a = content_hash("Neft  qiymətləri   BAHALAŞIB", "https://oxu.az/iqtisadiyyat/1/");
        let b = content_hash("neft qiymətləri bahalaşıb", "https://oxu.az/iqtisadiyyat/1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_hash("neft qiymətləri", "https://oxu.az/iqtisadiyyat/1"));
    }

    #[test]
    fn test_content_hash_folds_azerbaijani_i() {
        let url = "https://apa.az/iqtisadiyyat/bakida-yeni-zavod-861234";
        assert_eq!(
            content_hash("BAKIDA YENİ ZAVOD İŞƏ DÜŞÜB", url),
            content_hash("Bakıda yeni zavod işə düşüb", url)
        );
    }

    #[test]
    fn test_job_kind_for_run() {
        assert_eq!(JobKind::for_run(3, false), JobKind::Incremental);
        assert_eq!(JobKind::for_run(3, true), JobKind::DetailScrape);
        assert_eq!(JobKind::for_run(10, true), JobKind::FullScrape);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Partial,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("done".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_new_article_merges_detail() {
        let published = Utc::now();
        let detail = ArticleDetail {
            content: "Birinci abzas.\n\nİkinci abzas.".to_string(),
            author: Some("Müəllif".to_string()),
            published_at: Some(published),
        };
        let article = NewArticle::from_parts(
            7,
            summary("Başlıq mətni", "https://apa.az/x-1"),
            Some(detail),
            Some(3),
            Utc::now(),
        );
        assert_eq!(article.source_id, 7);
        assert_eq!(article.category_id, Some(3));
        assert_eq!(article.excerpt.as_deref(), Some("Birinci abzas."));
        assert_eq!(article.author.as_deref(), Some("Müəllif"));
        assert_eq!(article.published_at, Some(published));
        assert_eq!(
            article.content_hash,
            content_hash("Başlıq mətni", "https://apa.az/x-1")
        );
    }

    #[test]
    fn test_new_article_without_detail_is_metadata_only() {
        let mut listed = summary("Başlıq", "https://fed.az/a");
        listed.source_article_id = Some("a".to_string());
        let article = NewArticle::from_parts(1, listed, None, None, Utc::now());
        assert_eq!(article.source_article_id.as_deref(), Some("a"));
        assert!(article.content.is_none());
        assert!(article.excerpt.is_none());
        assert!(article.author.is_none());
    }

    #[test]
    fn test_long_excerpt_is_truncated() {
        let long = "ə".repeat(400);
        let excerpt = derive_excerpt(&long).unwrap();
        assert_eq!(excerpt.chars().count(), EXCERPT_MAX_CHARS + 1);
        assert!(excerpt.ends_with('…'));
    }

    #[test]
    fn test_pagination_parse() {
        assert_eq!(
            "path_based".parse::<Pagination>().unwrap(),
            Pagination::PathBased
        );
        assert!("cursor".parse::<Pagination>().is_err());
    }
}
