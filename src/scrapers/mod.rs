//! Per-site extractors for Azerbaijani news sources.
//!
//! Every source implements [`Extractor`]: it declares how its listing is
//! paginated and turns listing and article markup into summaries and detail.
//! Fetching, persistence and error bookkeeping live in the runner, so a site
//! redesign only ever touches one file here.
//!
//! # Supported Sources
//!
//! | Source | Module | Pagination | Notes |
//! |--------|--------|------------|-------|
//! | Sonxeber | [`sonxeber`] | `?start=N` | Links recognized by `/{id}/slug` |
//! | APA | [`apa`] | `?page=N` | Date and time printed separately |
//! | Report | [`report`] | `?page=N` | Slug is the article id |
//! | Modern | [`modern`] | `?page=N` | Lazy-loaded images, `Bu gün` dates |
//! | Axar | [`axar`] | infinite scroll | `18:59` means today |
//! | Banker | [`banker`] | `/page/N/` | WordPress, ISO `<time>` |
//! | Fed | [`fed`] | `/N` | Finance category only |
//! | Marja | [`marja`] | `?page=N` | Banking category only |
//! | Oxu | [`oxu`] | `/page/N` | Economy category, `data-url` cards |
//! | Qafqazinfo | [`qafqazinfo`] | `?page=N` | Economy category |
//! | Trend | [`trend`] | infinite scroll | Business section, one page |

pub mod apa;
pub mod axar;
pub mod banker;
pub mod fed;
pub mod html;
pub mod marja;
pub mod modern;
pub mod oxu;
pub mod qafqazinfo;
pub mod report;
pub mod sonxeber;
pub mod trend;

use crate::dates;
use crate::error::ParseError;
use crate::models::{ArticleDetail, ArticleSummary, Pagination, SourceSeed};
use chrono::{DateTime, FixedOffset, Utc};
use url::Url;

/// Inputs shared by every parse call of a run.
#[derive(Debug, Clone)]
pub struct ExtractContext {
    /// Base URL of the source, used to resolve relative links.
    pub base_url: Url,
    /// Reference time for relative dates ("Bu gün", "2 saat əvvəl").
    pub now: DateTime<FixedOffset>,
}

impl ExtractContext {
    pub fn new(base_url: &str, now: DateTime<FixedOffset>) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            now,
        })
    }

    /// Resolve a relative, absolute or protocol-relative link.
    ///
    /// Fragments, `javascript:` and `mailto:` links resolve to `None`.
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            return None;
        }
        let mut url = self.base_url.join(href).ok()?;
        url.set_fragment(None);
        matches!(url.scheme(), "http" | "https").then(|| url.to_string())
    }

    /// Parse a site-local date string relative to [`Self::now`].
    pub fn date(&self, raw: &str) -> Option<DateTime<Utc>> {
        dates::parse_date(raw, self.now)
    }
}

/// Build `{base}{path}` for page 1 and `{base}{path}?{param}=N` afterwards.
pub fn query_page_url(base: &str, path: &str, param: &str, page: u32) -> String {
    let root = format!("{}{}", base.trim_end_matches('/'), path);
    if page <= 1 {
        root
    } else {
        format!("{root}?{param}={page}")
    }
}

/// Build `{base}{path}` for page 1 and `{base}{path}{segment}N{suffix}` afterwards.
pub fn path_page_url(base: &str, path: &str, segment: &str, suffix: &str, page: u32) -> String {
    let root = format!("{}{}", base.trim_end_matches('/'), path);
    if page <= 1 {
        root
    } else {
        format!("{}{segment}{page}{suffix}", root.trim_end_matches('/'))
    }
}

/// Capability shared by every news source.
///
/// Parsing is synchronous and pure: the same markup and context always give
/// the same result, which keeps extractors testable against fixtures.
pub trait Extractor: Send + Sync {
    /// Unique key, e.g. `"oxu.az"`.
    fn domain(&self) -> &'static str;

    /// Display name.
    fn name(&self) -> &'static str;

    fn default_base_url(&self) -> &'static str;

    fn language(&self) -> &'static str {
        "az"
    }

    fn pagination(&self) -> Pagination;

    /// Free-form settings stored with the source row.
    fn scraper_config(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    /// URL of listing page `page` (1-based).
    ///
    /// Infinite-scroll sources return the same URL for every page; the runner
    /// scrolls the rendered page instead.
    fn build_page_url(&self, base: &str, page: u32) -> String;

    /// Hard cap on listing pages regardless of the requested count.
    fn page_limit(&self) -> Option<u32> {
        None
    }

    /// Parse a listing page into summaries, in page order.
    ///
    /// # Errors
    ///
    /// [`ParseError::ListingUnavailable`] when the listing container is missing.
    fn parse_listing(
        &self,
        markup: &str,
        page: u32,
        ctx: &ExtractContext,
    ) -> Result<Vec<ArticleSummary>, ParseError>;

    /// Parse an article page.
    ///
    /// # Errors
    ///
    /// [`ParseError::DetailUnavailable`] when no body text can be found.
    fn parse_detail(
        &self,
        markup: &str,
        url: &str,
        ctx: &ExtractContext,
    ) -> Result<ArticleDetail, ParseError>;

    /// Row used to seed the `news_sources` table.
    fn seed(&self) -> SourceSeed {
        SourceSeed {
            domain: self.domain(),
            name: self.name(),
            base_url: self.default_base_url(),
            language: self.language(),
            pagination: self.pagination(),
            scraper_config: self.scraper_config(),
        }
    }
}

/// Wrap extracted body text, turning an empty body into `DetailUnavailable`.
pub(crate) fn detail_or_unavailable(
    url: &str,
    content: Option<String>,
    author: Option<String>,
    published_at: Option<DateTime<Utc>>,
) -> Result<ArticleDetail, ParseError> {
    match content.filter(|c| !c.trim().is_empty()) {
        Some(content) => Ok(ArticleDetail {
            content,
            author,
            published_at,
        }),
        None => Err(ParseError::DetailUnavailable {
            url: url.to_string(),
        }),
    }
}

static REGISTRY: [&dyn Extractor; 11] = [
    &sonxeber::Sonxeber,
    &apa::Apa,
    &report::Report,
    &modern::Modern,
    &axar::Axar,
    &banker::Banker,
    &fed::Fed,
    &marja::Marja,
    &oxu::Oxu,
    &qafqazinfo::Qafqazinfo,
    &trend::Trend,
];

/// All registered extractors, in run order.
pub fn registry() -> &'static [&'static dyn Extractor] {
    &REGISTRY
}

/// Look up the extractor for `domain`.
pub fn find(domain: &str) -> Option<&'static dyn Extractor> {
    REGISTRY.iter().copied().find(|e| e.domain() == domain)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::ExtractContext;
    use crate::dates::baku_offset;
    use chrono::TimeZone;

    /// Context pinned to 2026-02-22 15:30 Baku time.
    pub fn ctx(base: &str) -> ExtractContext {
        ExtractContext::new(
            base,
            baku_offset().with_ymd_and_hms(2026, 2, 22, 15, 30, 0).unwrap(),
        )
        .unwrap()
    }
}
