//! Axar.az. The front page grows as it is scrolled; each "page" is one more
//! scroll pass over the same URL. Links look like `/news/{category}/{id}.html`.

use super::html::{
    AZ_MONTHS, LinkListing, all_paragraphs, content_from, document_text, element_text,
    text_by_class,
};
use super::modern::{AUTHOR_CLASS, CONTENT};
use super::{ExtractContext, Extractor, detail_or_unavailable};
use crate::error::ParseError;
use crate::models::{ArticleDetail, ArticleSummary, Pagination};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r"/news/[^/]+/\d+\.html").unwrap());
static ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d+)\.html").unwrap());
static CATEGORY: Lazy<Regex> = Lazy::new(|| Regex::new(r"/news/([^/]+)/").unwrap());
// "21 Fevral 23:50", or just "18:59" for today
static CARD_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\d{{1,2}}\s+(?:{AZ_MONTHS})\s+\d{{1,2}}:\d{{2}}|\d{{1,2}}:\d{{2}}"
    ))
    .unwrap()
});
static DETAIL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\d{{1,2}}\s+(?:{AZ_MONTHS})\s+\d{{4}}\s+\d{{1,2}}:\d{{2}}"
    ))
    .unwrap()
});

fn card_date(card: ElementRef<'_>, ctx: &ExtractContext) -> Option<DateTime<Utc>> {
    let text = element_text(card);
    CARD_DATE.find(&text).and_then(|m| ctx.date(m.as_str()))
}

pub struct Axar;

impl Extractor for Axar {
    fn domain(&self) -> &'static str {
        "axar.az"
    }

    fn name(&self) -> &'static str {
        "Axar"
    }

    fn default_base_url(&self) -> &'static str {
        "https://axar.az"
    }

    fn pagination(&self) -> Pagination {
        Pagination::InfiniteScroll
    }

    fn build_page_url(&self, base: &str, _page: u32) -> String {
        base.trim_end_matches('/').to_string()
    }

    fn parse_listing(
        &self,
        markup: &str,
        page: u32,
        ctx: &ExtractContext,
    ) -> Result<Vec<ArticleSummary>, ParseError> {
        LinkListing {
            href: &HREF,
            id: &ID,
            category: Some(&CATEGORY),
            skip: &[],
            min_title: 10,
            title_tags: &["strong", "h3"],
            heading_tags: &["h1", "h2", "h3", "h4", "strong"],
            container_tags: &["div", "article", "li"],
            lazy_images: false,
            date: card_date,
        }
        .parse(markup, page, ctx)
    }

    fn parse_detail(
        &self,
        markup: &str,
        url: &str,
        ctx: &ExtractContext,
    ) -> Result<ArticleDetail, ParseError> {
        let doc = Html::parse_document(markup);
        let selectors: Vec<&Selector> = CONTENT.iter().collect();
        let content =
            content_from(&doc, &selectors, 20, None).or_else(|| all_paragraphs(&doc, 20));

        let text = document_text(&doc);
        let published_at = DETAIL_DATE.find(&text).and_then(|m| ctx.date(m.as_str()));
        let author = text_by_class(&doc, &["span", "div", "p"], &AUTHOR_CLASS);

        detail_or_unavailable(url, content, author, published_at)
    }
}
