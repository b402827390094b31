//! Report.az. Article paths are `/{category}/{slug}` with no numeric id, so
//! the slug doubles as the id.

use super::html::{
    AZ_MONTHS, LinkListing, all_paragraphs, content_from, document_text, selector,
    text_by_class, text_node_matching,
};
use super::{ExtractContext, Extractor, detail_or_unavailable, query_page_url};
use crate::error::ParseError;
use crate::models::{ArticleDetail, ArticleSummary, Pagination};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/[^/]+/[\w-]+$").unwrap());
static SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/[^/]+/([\w-]+)$").unwrap());
static CATEGORY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/([^/]+)/").unwrap());
// "22 fevral, 2026"
static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\d+\s+({AZ_MONTHS}),?\s+\d{{4}}")).unwrap());
static TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,2}:\d{2}").unwrap());
static AUTHOR_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)author|muellif").unwrap());

static CONTENT: Lazy<[Selector; 4]> = Lazy::new(|| {
    [
        selector("div.article-content"),
        selector("div.news-content"),
        selector(r#"div[itemprop="articleBody"]"#),
        selector("article"),
    ]
});

fn card_date(card: ElementRef<'_>, ctx: &ExtractContext) -> Option<DateTime<Utc>> {
    let date = text_node_matching(card, &DATE)?;
    let time = text_node_matching(card, &TIME).unwrap_or("00:00");
    ctx.date(&format!("{date} {time}"))
}

pub struct Report;

impl Extractor for Report {
    fn domain(&self) -> &'static str {
        "report.az"
    }

    fn name(&self) -> &'static str {
        "Report"
    }

    fn default_base_url(&self) -> &'static str {
        "https://report.az"
    }

    fn pagination(&self) -> Pagination {
        Pagination::QueryParam
    }

    fn build_page_url(&self, base: &str, page: u32) -> String {
        query_page_url(base, "", "page", page)
    }

    fn parse_listing(
        &self,
        markup: &str,
        page: u32,
        ctx: &ExtractContext,
    ) -> Result<Vec<ArticleSummary>, ParseError> {
        LinkListing {
            href: &HREF,
            id: &SLUG,
            category: Some(&CATEGORY),
            skip: &["/haqqimizda", "/elaqe", "/reklam", "/login", "/register"],
            min_title: 10,
            title_tags: &[],
            heading_tags: &["h2", "h3", "h4"],
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
        let published_at = DATE.find(&text).and_then(|d| {
            let time = TIME.find(&text).map_or("00:00", |t| t.as_str());
            ctx.date(&format!("{} {time}", d.as_str()))
        });
        let author = text_by_class(&doc, &["span", "div"], &AUTHOR_CLASS);

        detail_or_unavailable(url, content, author, published_at)
    }
}
