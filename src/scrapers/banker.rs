//! Banker.az, a WordPress (tagDiv theme) site. Only the banking category
//! is followed; cards carry an ISO `<time datetime>`.

use super::html::{
    char_len, content_from, element_text, image_url, last_segment, selector, url_slug,
};
use super::{ExtractContext, Extractor, detail_or_unavailable, path_page_url};
use crate::error::ParseError;
use crate::models::{ArticleDetail, ArticleSummary, Pagination};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

const CATEGORY_PATH: &str = "/category/xYbYrlYr/";
const MIN_TITLE: usize = 5;

static CARD: Lazy<Selector> = Lazy::new(|| selector(".td_module_wrap"));
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| selector("h3.entry-title a"));
static TIME: Lazy<Selector> = Lazy::new(|| selector("time.entry-date"));
static CONTENT: Lazy<[Selector; 4]> = Lazy::new(|| {
    [
        selector("div.tdb_single_content .tdb-block-inner"),
        selector("div.tdb_single_content"),
        selector("article .entry-content"),
        selector("div.td-post-content"),
    ]
});

fn entry_date(root: ElementRef<'_>, ctx: &ExtractContext) -> Option<DateTime<Utc>> {
    root.select(&TIME)
        .next()
        .and_then(|t| t.value().attr("datetime"))
        .and_then(|raw| ctx.date(raw))
}

pub struct Banker;

impl Extractor for Banker {
    fn domain(&self) -> &'static str {
        "banker.az"
    }

    fn name(&self) -> &'static str {
        "Banker"
    }

    fn default_base_url(&self) -> &'static str {
        "https://banker.az"
    }

    fn pagination(&self) -> Pagination {
        Pagination::PathBased
    }

    fn build_page_url(&self, base: &str, page: u32) -> String {
        path_page_url(base, CATEGORY_PATH, "/page/", "/", page)
    }

    fn parse_listing(
        &self,
        markup: &str,
        page: u32,
        ctx: &ExtractContext,
    ) -> Result<Vec<ArticleSummary>, ParseError> {
        let doc = Html::parse_document(markup);
        let cards: Vec<_> = doc.select(&CARD).collect();
        if cards.is_empty() {
            return Err(ParseError::ListingUnavailable {
                page,
                reason: "no .td_module_wrap cards".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for card in cards {
            let Some(link) = card.select(&TITLE_LINK).next() else {
                continue;
            };
            let Some(url) = link.value().attr("href").and_then(|h| ctx.resolve(h)) else {
                continue;
            };
            let Some(id) = last_segment(&url).map(str::to_string) else {
                continue;
            };
            if !seen.insert(id.clone()) {
                continue;
            }
            let title = element_text(link);
            if char_len(&title) < MIN_TITLE {
                continue;
            }
            out.push(ArticleSummary {
                slug: url_slug(&url),
                image_url: image_url(card, ctx, false),
                published_at: entry_date(card, ctx),
                url,
                title,
                source_article_id: Some(id),
                category: None,
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
        let selectors: Vec<&Selector> = CONTENT.iter().collect();
        let content = content_from(&doc, &selectors, 10, None);
        detail_or_unavailable(url, content, None, entry_date(doc.root_element(), ctx))
    }
}
