//! Fed.az finance category (`/az/maliyye`). Listing cards carry no date; the
//! article page prints date and time in two icon-prefixed spans.

use super::html::{
    char_len, content_from, element_text, find_descendant, image_url, last_segment, selector,
    url_slug,
};
use super::{ExtractContext, Extractor, detail_or_unavailable, path_page_url};
use crate::error::ParseError;
use crate::models::{ArticleDetail, ArticleSummary, Pagination};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;

const CATEGORY_PATH: &str = "/az/maliyye";
const MIN_TITLE: usize = 5;

static CARD: Lazy<Selector> = Lazy::new(|| selector("div.news"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static HEADING: Lazy<Selector> = Lazy::new(|| selector("div.heading"));
static DATE: Lazy<Selector> = Lazy::new(|| selector("div.news-detail span.time.date"));
static TIME: Lazy<Selector> = Lazy::new(|| selector("div.news-detail span.time:not(.date)"));
static BODY: Lazy<[Selector; 2]> = Lazy::new(|| {
    [
        selector(r#"div.news-text[itemprop="articleBody"]"#),
        selector("div.news-text"),
    ]
});
static EXCLUDE: Lazy<Selector> = Lazy::new(|| selector("script, style, iframe, ins"));

pub struct Fed;

impl Extractor for Fed {
    fn domain(&self) -> &'static str {
        "fed.az"
    }

    fn name(&self) -> &'static str {
        "Fed"
    }

    fn default_base_url(&self) -> &'static str {
        "https://fed.az"
    }

    fn pagination(&self) -> Pagination {
        Pagination::PathBased
    }

    fn build_page_url(&self, base: &str, page: u32) -> String {
        path_page_url(base, CATEGORY_PATH, "/", "", page)
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
                reason: "no div.news cards".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for card in cards {
            let Some(link) = card.select(&LINK).next() else {
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

            let title = link
                .select(&HEADING)
                .next()
                .or_else(|| find_descendant(link, &["h2", "h3", "h4"]))
                .map_or_else(|| element_text(link), element_text);
            if char_len(&title) < MIN_TITLE {
                continue;
            }

            out.push(ArticleSummary {
                slug: url_slug(&url),
                image_url: image_url(card, ctx, false),
                published_at: None,
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

        // Icon glyphs before the digits are ignored by the date parser.
        let published_at = doc.select(&DATE).next().and_then(|date| {
            let time = doc.select(&TIME).next().map(element_text).unwrap_or_default();
            ctx.date(&format!("{} {time}", element_text(date)))
        });

        let selectors: Vec<&Selector> = BODY.iter().collect();
        let content = content_from(&doc, &selectors, 10, Some(&EXCLUDE));
        detail_or_unavailable(url, content, None, published_at)
    }
}
