//! Marja.az banking category. Cards are `figure.snip1208` tiles; the article
//! page splits `DD.MM.YYYY` and `HH:MM` across two `<small>` tags.

use super::html::{
    char_len, content_from, element_text, find_descendant, image_url, numeric_or_last_segment,
    selector, url_slug,
};
use super::{ExtractContext, Extractor, detail_or_unavailable, query_page_url};
use crate::error::ParseError;
use crate::models::{ArticleDetail, ArticleSummary, Pagination};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;

const CATEGORY_PATH: &str = "/bank-kredit/12";
const MIN_TITLE: usize = 5;

static CARD: Lazy<Selector> = Lazy::new(|| selector("figure.snip1208"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static FIGCAPTION: Lazy<Selector> = Lazy::new(|| selector("figcaption"));
static DATE_PARTS: Lazy<Selector> = Lazy::new(|| selector("div.news-date small"));
static BODY: Lazy<Selector> = Lazy::new(|| selector("div.content-news"));
static EXCLUDE: Lazy<Selector> = Lazy::new(|| {
    selector("script, style, iframe, .middle-single, a.text-link-underline")
});
pub struct Marja;

impl Extractor for Marja {
    fn domain(&self) -> &'static str {
        "marja.az"
    }

    fn name(&self) -> &'static str {
        "Marja"
    }

    fn default_base_url(&self) -> &'static str {
        "https://marja.az"
    }

    fn pagination(&self) -> Pagination {
        Pagination::QueryParam
    }

    fn build_page_url(&self, base: &str, page: u32) -> String {
        query_page_url(base, CATEGORY_PATH, "page", page)
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
                reason: "no figure.snip1208 cards".to_string(),
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
            let Some(id) = numeric_or_last_segment(&url).map(str::to_string) else {
                continue;
            };
            if !seen.insert(id.clone()) {
                continue;
            }

            let caption = card.select(&FIGCAPTION).next().map(|fig| {
                find_descendant(fig, &["h2", "h3", "h4"])
                    .map_or_else(|| element_text(fig), element_text)
            });
            let title = match caption {
                Some(t) if char_len(&t) >= MIN_TITLE => t,
                _ => element_text(link),
            };
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

        let parts: Vec<String> = doc.select(&DATE_PARTS).take(2).map(element_text).collect();
        let published_at = match parts.as_slice() {
            [date, time] => ctx.date(&format!("{date} {time}")),
            _ => None,
        };

        let content = content_from(&doc, &[&*BODY], 10, Some(&EXCLUDE));
        detail_or_unavailable(url, content, None, published_at)
    }
}
