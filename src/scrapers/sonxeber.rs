//! Sonxeber.az: a loose news feed where article links look like `/{id}/slug`.
//!
//! The listing has no stable card markup, so articles are recognized by URL
//! shape and dated by the first `"21 fevral"` style text inside the card.

use super::html::{
    AZ_MONTHS, LinkListing, all_paragraphs, content_from, paragraphs, selector, text_by_class,
    text_node_matching,
};
use super::{ExtractContext, Extractor, detail_or_unavailable, query_page_url};
use crate::error::ParseError;
use crate::models::{ArticleDetail, ArticleSummary, Pagination};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+/").unwrap());
static ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d+)/").unwrap());
static LISTING_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\d+\s+({AZ_MONTHS})")).unwrap());
static DETAIL_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Tarix:\s*(.+)").unwrap());
static AUTHOR_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)author|writer|muellif").unwrap());

static CONTENT: Lazy<[Selector; 5]> = Lazy::new(|| {
    [
        selector("div.article-content"),
        selector("div.content"),
        selector("div.news-content"),
        selector("article"),
        selector(r#"div[itemprop="articleBody"]"#),
    ]
});
static MAIN: Lazy<Selector> = Lazy::new(|| selector("main"));

fn card_date(card: ElementRef<'_>, ctx: &ExtractContext) -> Option<DateTime<Utc>> {
    text_node_matching(card, &LISTING_DATE).and_then(|t| ctx.date(t))
}

pub struct Sonxeber;

impl Extractor for Sonxeber {
    fn domain(&self) -> &'static str {
        "sonxeber.az"
    }

    fn name(&self) -> &'static str {
        "Sonxeber"
    }

    fn default_base_url(&self) -> &'static str {
        "https://sonxeber.az"
    }

    fn pagination(&self) -> Pagination {
        Pagination::QueryParam
    }

    fn scraper_config(&self) -> serde_json::Value {
        serde_json::json!({ "pagination_param": "start" })
    }

    fn build_page_url(&self, base: &str, page: u32) -> String {
        query_page_url(base, "/xeberler/", "start", page)
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
            heading_tags: &["h1", "h2", "h3", "h4"],
            container_tags: &["div", "article", "li", "section"],
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
        let content = content_from(&doc, &selectors, 0, None).or_else(|| {
            doc.select(&MAIN).next().and_then(|main| {
                let parts = paragraphs(main, 20, None);
                (!parts.is_empty()).then(|| parts.join("\n\n"))
            })
        });
        let content = content.or_else(|| all_paragraphs(&doc, 20));

        let published_at = doc
            .root_element()
            .text()
            .find_map(|t| DETAIL_DATE.captures(t))
            .and_then(|c| ctx.date(&c[1]));
        let author = text_by_class(&doc, &["span", "div", "p"], &AUTHOR_CLASS);

        detail_or_unavailable(url, content, author, published_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::baku_offset;
    use crate::scrapers::fixtures::ctx;
    use chrono::TimeZone;

    const LISTING: &str = r#"<html><body>
      <div class="newslist">
        <div class="nitem">
          <a href="/388358/gurcustan-azerbaycandan-qaz-alir"><img src="/uploads/388358.jpg"><h3>Gürcüstan Azərbaycandan qaz alır</h3></a>
          <span>21 fevral</span>
        </div>
        <div class="nitem">
          <a href="/388357/neft-qiymeti">Neft qiyməti yenə artıb</a>
          <span>20 fevral</span>
        </div>
        <div class="nitem">
          <a href="/388357/neft-qiymeti">Neft qiyməti yenə artıb</a>
        </div>
        <div class="nitem"><a href="https://sonxeber.az/388356/q">Qısa</a></div>
        <div class="nitem"><a href="/xeberler/">Bütün xəbərlər</a></div>
      </div></body></html>"#;

    #[test]
    fn test_listing_extracts_articles_by_url_shape() {
        let items = Sonxeber.parse_listing(LISTING, 1, &ctx("https://sonxeber.az")).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://sonxeber.az/388358/gurcustan-azerbaycandan-qaz-alir");
        assert_eq!(items[0].title, "Gürcüstan Azərbaycandan qaz alır");
        assert_eq!(items[0].image_url.as_deref(), Some("https://sonxeber.az/uploads/388358.jpg"));
        let expected = baku_offset().with_ymd_and_hms(2026, 2, 21, 0, 0, 0).unwrap();
        assert_eq!(items[0].published_at, Some(expected.with_timezone(&Utc)));
        assert_eq!(items[1].title, "Neft qiyməti yenə artıb");
    }

    #[test]
    fn test_listing_without_article_links_is_unavailable() {
        let err = Sonxeber
            .parse_listing(
                "<html><body><p>Texniki işlər</p></body></html>",
                2,
                &ctx("https://sonxeber.az"),
            )
            .unwrap_err();
        assert!(matches!(err, ParseError::ListingUnavailable { page: 2, .. }));
    }

    #[test]
    fn test_detail_reads_body_date_and_author() {
        let markup = r#"<html><body>
          <div class="article-content">
            <p>Azərbaycan Gürcüstana təbii qaz ixracını artırıb.</p>
            <p>Məlumata görə, ixrac 12 faiz çoxalıb.</p>
          </div>
          <div class="meta">Tarix: 21.02.2026 14:05</div>
          <span class="news-author">Elvin Məmmədov</span>
        </body></html>"#;
        let detail = Sonxeber
            .parse_detail(markup, "https://sonxeber.az/388358/x", &ctx("https://sonxeber.az"))
            .unwrap();
        assert!(detail.content.starts_with("Azərbaycan Gürcüstana"));
        assert!(detail.content.contains("\n\nMəlumata görə"));
        assert_eq!(detail.author.as_deref(), Some("Elvin Məmmədov"));
        let expected = baku_offset().with_ymd_and_hms(2026, 2, 21, 14, 5, 0).unwrap();
        assert_eq!(detail.published_at, Some(expected.with_timezone(&Utc)));
    }

    #[test]
    fn test_page_urls() {
        assert_eq!(
            Sonxeber.build_page_url("https://sonxeber.az", 1),
            "https://sonxeber.az/xeberler/",
        );
        assert_eq!(
            Sonxeber.build_page_url("https://sonxeber.az", 2),
            "https://sonxeber.az/xeberler/?start=2"
        );
    }
}
