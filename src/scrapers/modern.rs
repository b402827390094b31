//! Modern.az. Links look like `/az/{category}/{id}/slug`, images are
//! lazy-loaded and listing dates read `"18:28, Bu gün"`.

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

static HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(/az/[^/]+/\d+/|^https://modern\.az/az/[^/]+/\d+/)").unwrap());
static ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d+)/").unwrap());
static CATEGORY: Lazy<Regex> = Lazy::new(|| Regex::new(r"/az/([^/]+)/\d+/").unwrap());
static CARD_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(\d{{1,2}}:\d{{2}}),\s*(Bu gün|Dünən|\d+\s+(?:{AZ_MONTHS})\s+\d{{4}})"
    ))
    .unwrap()
});
static DETAIL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(\d{{1,2}}:\d{{2}}),?\s*(\d+\s+(?:{AZ_MONTHS})\s+\d{{4}})"
    ))
    .unwrap()
});
pub(super) static AUTHOR_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)author|muellif|yazar").unwrap());

/// Body containers shared with axar.az, which runs the same CMS layout.
pub(super) static CONTENT: Lazy<[Selector; 5]> = Lazy::new(|| {
    [
        selector("div.article-content"),
        selector("div.news-content"),
        selector(r#"div[itemprop="articleBody"]"#),
        selector("div.content"),
        selector("article"),
    ]
});

fn card_date(card: ElementRef<'_>, ctx: &ExtractContext) -> Option<DateTime<Utc>> {
    let text = text_node_matching(card, &CARD_DATE)?;
    let caps = CARD_DATE.captures(text)?;
    ctx.date(&format!("{} {}", &caps[2], &caps[1]))
}

pub struct Modern;

impl Extractor for Modern {
    fn domain(&self) -> &'static str {
        "modern.az"
    }

    fn name(&self) -> &'static str {
        "Modern"
    }

    fn default_base_url(&self) -> &'static str {
        "https://modern.az"
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
            id: &ID,
            category: Some(&CATEGORY),
            skip: &["/haqqinda", "/elaqe", "/reklam", "/login", "/qeydiyyat", "/arxiv"],
            min_title: 10,
            title_tags: &["strong", "h3"],
            heading_tags: &["h1", "h2", "h3", "h4", "strong"],
            container_tags: &["div", "article", "li"],
            lazy_images: true,
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
        let published_at = DETAIL_DATE
            .captures(&text)
            .and_then(|c| ctx.date(&format!("{} {}", &c[2], &c[1])));
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
      <div class="news-block">
        <div class="news-item">
          <a href="/az/iqtisadiyyat/512345/benzinin-qiymeti-deyisdi/">
            <img src="data:image/gif;base64,R0lGOD" data-src="/uploads/512345.jpg">
            <strong>Benzinin qiyməti dəyişdi</strong>
          </a>
          <span class="time">18:28, Bu gün</span>
        </div>
        <div class="news-item">
          <a href="https://modern.az/az/siyaset/512344/deputat-aciqlama-verdi/"><h3>Deputat yeni açıqlama verdi</h3></a>
          <span class="time">09:05, 21 fevral 2026</span>
        </div>
        <div class="news-item">
          <a href="/az/arxiv/512343/">Arxiv bölməsinə keçid</a>
        </div>
        <div class="news-item">
          <a href="/az/sosial/512342/x/">Bax</a>
          <h4>Sosial yardımların məbləği artırılır</h4>
        </div>
      </div></body></html>"#;

    #[test]
    fn test_listing_reads_lazy_images_and_today_dates() {
        let items = Modern.parse_listing(LISTING, 1, &ctx("https://modern.az")).unwrap();
        assert_eq!(items.len(), 3);

        assert_eq!(
            items[0].url,
            "https://modern.az/az/iqtisadiyyat/512345/benzinin-qiymeti-deyisdi/",
        );
        assert_eq!(items[0].title, "Benzinin qiyməti dəyişdi");
        assert_eq!(items[0].source_article_id.as_deref(), Some("512345"));
        assert_eq!(items[0].slug.as_deref(), Some("benzinin-qiymeti-deyisdi"));
        assert_eq!(items[0].category.as_deref(), Some("iqtisadiyyat"));
        assert_eq!(items[0].image_url.as_deref(), Some("https://modern.az/uploads/512345.jpg"));
        let today = baku_offset().with_ymd_and_hms(2026, 2, 22, 18, 28, 0).unwrap();
        assert_eq!(items[0].published_at, Some(today.with_timezone(&Utc)));

        let earlier = baku_offset().with_ymd_and_hms(2026, 2, 21, 9, 5, 0).unwrap();
        assert_eq!(items[1].published_at, Some(earlier.with_timezone(&Utc)));

        assert_eq!(items[2].title, "Sosial yardımların məbləği artırılır");
    }

    #[test]
    fn test_malformed_listing_is_unavailable() {
        let err = Modern
            .parse_listing(
                "<html><body><a href=\"/az/\">Ana səhifə</a></body></html>",
                3,
                &ctx("https://modern.az"),
            )
            .unwrap_err();
        assert!(matches!(err, ParseError::ListingUnavailable { page: 3, .. }));
    }

    #[test]
    fn test_detail_reads_time_before_date() {
        let markup = r#"<html><body>
          <div class="content">
            <span class="date">12:40, 20 fevral 2026</span>
            <p>Benzinin qiyməti bu gündən etibarən dəyişib.</p>
            <p class="yazar">Modern.az</p>
          </div>
        </body></html>"#;
        let detail = Modern
            .parse_detail(markup, "https://modern.az/az/x/1/", &ctx("https://modern.az"))
            .unwrap();
        assert_eq!(detail.content, "Benzinin qiyməti bu gündən etibarən dəyişib.");
        assert_eq!(detail.author.as_deref(), Some("Modern.az"));
        let expected = baku_offset().with_ymd_and_hms(2026, 2, 20, 12, 40, 0).unwrap();
        assert_eq!(detail.published_at, Some(expected.with_timezone(&Utc)));
    }
}
