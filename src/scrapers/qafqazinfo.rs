//! Qafqazinfo.az economy category. Articles live under `/news/detail/{id}-slug`.

use super::html::{LinkListing, all_paragraphs, content_from, element_text, no_date, selector};
use super::{ExtractContext, Extractor, detail_or_unavailable, query_page_url};
use crate::error::ParseError;
use crate::models::{ArticleDetail, ArticleSummary, Pagination};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

const CATEGORY_PATH: &str = "/news/category/iqtisadiyyat-4";

// Relative links, or absolute ones on the site itself.
static HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:https://qafqazinfo\.az)?/news/detail/\d+").unwrap());
static ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/news/detail/(\d+)").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| selector("time[datetime]"));
static BODY: Lazy<Selector> = Lazy::new(|| selector(".panel-body.news_text"));
static EXCLUDE: Lazy<Selector> = Lazy::new(|| selector("script, style, .rek_banner"));

pub struct Qafqazinfo;

impl Extractor for Qafqazinfo {
    fn domain(&self) -> &'static str {
        "qafqazinfo.az"
    }

    fn name(&self) -> &'static str {
        "Qafqazinfo"
    }

    fn default_base_url(&self) -> &'static str {
        "https://qafqazinfo.az"
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
        LinkListing {
            href: &HREF,
            id: &ID,
            category: None,
            skip: &[],
            min_title: 5,
            title_tags: &[],
            heading_tags: &["h2", "h3", "h4"],
            container_tags: &["div", "article", "li"],
            lazy_images: false,
            date: no_date,
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

        // Text reads "09.11.2025 | 10:59"; the attribute is the fallback.
        let published_at = doc.select(&TIME).next().and_then(|t| {
            ctx.date(&element_text(t))
                .or_else(|| t.value().attr("datetime").and_then(|raw| ctx.date(raw)))
        });

        let content = content_from(&doc, &[&*BODY], 10, Some(&EXCLUDE))
            .or_else(|| all_paragraphs(&doc, 20));
        detail_or_unavailable(url, content, None, published_at)
    }
}
