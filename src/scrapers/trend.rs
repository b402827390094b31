//! Trend (az.trend.az) business section.
//!
//! Older items load through a timestamp cursor that cannot be addressed by
//! page number, so only the first listing page is ever read.

use super::html::{
    all_paragraphs, char_len, element_text, find_descendant, image_url, paragraphs, selector,
    url_slug,
};
use super::{ExtractContext, Extractor, detail_or_unavailable};
use crate::error::ParseError;
use crate::models::{ArticleDetail, ArticleSummary, Pagination};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

const LISTING_PATH: &str = "/business/";
const MIN_TITLE: usize = 5;
const DATELINE: &str = "Bakı. Trend:";

static LIST: Lazy<Selector> = Lazy::new(|| selector("ul.news-list.with-images"));
static ITEM: Lazy<Selector> = Lazy::new(|| selector("li"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static DATE_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new("date|time").unwrap());
static PUBLISHED_META: Lazy<Selector> =
    Lazy::new(|| selector(r#"meta[property="article:published_time"]"#));
static DATE_TIME: Lazy<Selector> = Lazy::new(|| selector("span.date-time"));
static BODY: Lazy<Selector> = Lazy::new(|| selector("div.article-content.article-paddings"));

/// First `span`/`time` in the item whose class mentions a date or time.
fn item_date(item: ElementRef<'_>) -> Option<ElementRef<'_>> {
    item.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "span" | "time"))
        .find(|e| e.value().classes().any(|c| DATE_CLASS.is_match(c)))
}

pub struct Trend;

impl Extractor for Trend {
    fn domain(&self) -> &'static str {
        "trend.az"
    }

    fn name(&self) -> &'static str {
        "Trend"
    }

    fn default_base_url(&self) -> &'static str {
        "https://az.trend.az"
    }

    fn pagination(&self) -> Pagination {
        Pagination::InfiniteScroll
    }

    fn build_page_url(&self, base: &str, _page: u32) -> String {
        format!("{}{LISTING_PATH}", base.trim_end_matches('/'))
    }

    fn page_limit(&self) -> Option<u32> {
        Some(1)
    }

    fn parse_listing(
        &self,
        markup: &str,
        page: u32,
        ctx: &ExtractContext,
    ) -> Result<Vec<ArticleSummary>, ParseError> {
        let doc = Html::parse_document(markup);
        let Some(list) = doc.select(&LIST).next() else {
            return Err(ParseError::ListingUnavailable {
                page,
                reason: "news list container missing".to_string(),
            });
        };

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for item in list.select(&ITEM) {
            let Some(link) = item.select(&LINK).next() else {
                continue;
            };
            let Some(url) = link.value().attr("href").and_then(|h| ctx.resolve(h)) else {
                continue;
            };
            let Some(id) = url_slug(&url) else {
                continue;
            };
            if !seen.insert(id.clone()) {
                continue;
            }

            let title = find_descendant(item, &["h2", "h3", "h4"])
                .map_or_else(|| element_text(link), element_text);
            if char_len(&title) < MIN_TITLE {
                continue;
            }

            out.push(ArticleSummary {
                slug: url_slug(&url),
                image_url: image_url(item, ctx, false),
                // "15 Noyabr 10:31 (UTC+04)"
                published_at: item_date(item).and_then(|d| ctx.date(&element_text(d))),
                url,
                title,
                source_article_id: Some(id),
                category: Some(LISTING_PATH.trim_matches('/').to_string()),
            });
        }
        Ok(out)
    }

    fn parse_detail(
        &self,
        markup: &str,
        url: &str,
        ctx: &ExtractContext,
    ) -> Result<ArticleDetail, ParseError> {
        let doc = Html::parse_document(markup);

        let published_at = doc
            .select(&PUBLISHED_META)
            .next()
            .and_then(|m| m.value().attr("content"))
            .and_then(|raw| ctx.date(raw))
            .or_else(|| {
                doc.select(&DATE_TIME)
                    .next()
                    .and_then(|d| ctx.date(&element_text(d)))
            });

        let content = doc
            .select(&BODY)
            .next()
            .map(|body| {
                paragraphs(body, 20, None)
                    .into_iter()
                    .filter(|p| !p.starts_with(DATELINE))
                    .collect::<Vec<_>>()
            })
            .filter(|parts| !parts.is_empty())
            .map(|parts| parts.join("\n\n"))
            .or_else(|| all_paragraphs(&doc, 20));

        detail_or_unavailable(url, content, None, published_at)
    }
}
