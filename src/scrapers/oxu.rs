//! Oxu.az economy section. Cards expose their target in a `data-url`
//! attribute; article pages carry audio players, tag lists and promo blocks
//! around the text.

use super::html::{
    char_len, element_text, image_url, numeric_or_last_segment, paragraphs, selector, url_slug,
};
use super::{ExtractContext, Extractor, detail_or_unavailable, path_page_url};
use crate::error::ParseError;
use crate::models::{ArticleDetail, ArticleSummary, Pagination};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;

const CATEGORY_PATH: &str = "/iqtisadiyyat";
const MIN_TITLE: usize = 5;
const AD_MARKERS: [&str; 3] = ["newmedia", "reklam", "advertisement"];

static ANY_POST: Lazy<Selector> = Lazy::new(|| selector(".post-item"));
static CARD: Lazy<Selector> = Lazy::new(|| selector(".post-item.rt-news-item[data-url]"));
static CARD_TITLE: Lazy<Selector> = Lazy::new(|| selector("h2, h3, h4, .title, .post-title"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| selector("a"));
static FALLBACK_LINK: Lazy<Selector> =
    Lazy::new(|| selector(r#".post-item a[href*="/iqtisadiyyat/"]"#));
static DATE: Lazy<Selector> = Lazy::new(|| selector(".post-detail-meta span"));
static BODY: Lazy<[Selector; 2]> = Lazy::new(|| {
    [
        selector(".post-detail-content-inner.resize-area"),
        selector(".post-detail-content"),
    ]
});
static EXCLUDE: Lazy<Selector> = Lazy::new(|| {
    selector(
        "script, style, .audio-block, .player-area, .tag-area, .social-block2, \
         .subscribe-single-block, .tag-post-list, ins",
    )
});

pub struct Oxu;

impl Oxu {
    /// Cards without `data-url`: take category links inside post blocks.
    fn fallback_links(
        &self,
        doc: &Html,
        ctx: &ExtractContext,
        seen: &mut HashSet<String>,
    ) -> Vec<ArticleSummary> {
        let mut out = Vec::new();
        for link in doc.select(&FALLBACK_LINK) {
            let Some(url) = link.value().attr("href").and_then(|h| ctx.resolve(h)) else {
                continue;
            };
            let Some(id) = numeric_or_last_segment(&url).map(str::to_string) else {
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
                url,
                title,
                published_at: None,
                image_url: None,
                source_article_id: Some(id),
                category: Some(CATEGORY_PATH.trim_matches('/').to_string()),
            });
        }
        out
    }
}

impl Extractor for Oxu {
    fn domain(&self) -> &'static str {
        "oxu.az"
    }

    fn name(&self) -> &'static str {
        "Oxu"
    }

    fn default_base_url(&self) -> &'static str {
        "https://oxu.az"
    }

    fn pagination(&self) -> Pagination {
        Pagination::PathBased
    }

    fn build_page_url(&self, base: &str, page: u32) -> String {
        path_page_url(base, CATEGORY_PATH, "/page/", "", page)
    }

    fn parse_listing(
        &self,
        markup: &str,
        page: u32,
        ctx: &ExtractContext,
    ) -> Result<Vec<ArticleSummary>, ParseError> {
        let doc = Html::parse_document(markup);
        if doc.select(&ANY_POST).next().is_none() {
            return Err(ParseError::ListingUnavailable {
                page,
                reason: "no .post-item blocks".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for card in doc.select(&CARD) {
            let data_url = card.value().attr("data-url").unwrap_or_default();
            if !data_url.contains(CATEGORY_PATH) {
                continue;
            }
            let Some(url) = ctx.resolve(data_url) else {
                continue;
            };
            let Some(id) = numeric_or_last_segment(&url).map(str::to_string) else {
                continue;
            };
            if !seen.insert(id.clone()) {
                continue;
            }

            let title = card
                .select(&CARD_TITLE)
                .next()
                .or_else(|| card.select(&ANCHOR).next())
                .map(element_text)
                .unwrap_or_default();
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
                category: Some(CATEGORY_PATH.trim_matches('/').to_string()),
            });
        }

        if out.is_empty() {
            out = self.fallback_links(&doc, ctx, &mut seen);
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

        // "15 noyabr, 2025 / 19:44", "Bu gün / 12:18"
        let published_at = doc
            .select(&DATE)
            .next()
            .and_then(|span| ctx.date(&element_text(span)));

        let content = BODY
            .iter()
            .find_map(|sel| doc.select(sel).next())
            .map(|body| {
                paragraphs(body, 20, Some(&EXCLUDE))
                    .into_iter()
                    .filter(|p| {
                        let lower = p.to_lowercase();
                        !AD_MARKERS.iter().any(|m| lower.contains(m))
                    })
                    .collect::<Vec<_>>()
                    .join("\n\n")
            });

        detail_or_unavailable(url, content, None, published_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::baku_offset;
    use crate::scrapers::fixtures::ctx;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_listing_reads_data_url_cards() {
        let markup = r#"<html><body><div class="posts">
          <div class="post-item rt-news-item" data-url="/iqtisadiyyat/manat-mezennesi-acilandi">
            <img src="https://cdn.oxu.az/uploads/manat.jpg"><h3>Manatın məzənnəsi açıqlandı</h3></div>
          <div class="post-item rt-news-item" data-url="https://oxu.az/iqtisadiyyat/neft-bahalasdi">
            <a href="/iqtisadiyyat/neft-bahalasdi">Neft bahalaşdı</a></div>
          <div class="post-item rt-news-item" data-url="/siyaset/sammit">
            <h3>Sammit başa çatdı</h3></div>
          <div class="post-item rt-news-item" data-url="/iqtisadiyyat/manat-mezennesi-acilandi">
            <h3>Manatın məzənnəsi açıqlandı</h3></div>
        </div></body></html>"#;
        let items = Oxu.parse_listing(markup, 1, &ctx("https://oxu.az")).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://oxu.az/iqtisadiyyat/manat-mezennesi-acilandi");
        assert_eq!(items[0].image_url.as_deref(), Some("https://cdn.oxu.az/uploads/manat.jpg"));
        assert_eq!(items[1].title, "Neft bahalaşdı");
    }

    #[test]
    fn test_listing_falls_back_to_category_links() {
        let markup = r#"<html><body>
          <div class="post-item"><a href="/iqtisadiyyat/qizil-qiymeti">Qızılın qiyməti artdı</a></div>
          <div class="post-item"><a href="/idman/oyun">İdman xəbəri burada</a></div>
        </body></html>"#;
        let items = Oxu.parse_listing(markup, 1, &ctx("https://oxu.az")).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://oxu.az/iqtisadiyyat/qizil-qiymeti");
        assert_eq!(items[0].source_article_id.as_deref(), Some("qizil-qiymeti"));
        assert_eq!(items[0].category.as_deref(), Some("iqtisadiyyat"));
    }

    #[test]
    fn test_listing_without_posts_is_unavailable() {
        let err = Oxu
            .parse_listing(
                "<html><body><div class=\"error-page\"></div></body></html>",
                1,
                &ctx("https://oxu.az"),
            )
            .unwrap_err();
        assert!(matches!(err, ParseError::ListingUnavailable { .. }));
    }

    #[test]
    fn test_detail_skips_players_and_promos() {
        let markup = r#"<html><body>
          <div class="post-detail-meta"><span>Bu gün / 12:18</span></div>
          <div class="post-detail-content-inner resize-area">
            <div class="audio-block"><p>Xəbəri dinləmək üçün düyməni basın</p></div>
            <p>Mərkəzi Bank manatın rəsmi məzənnəsini açıqlayıb.</p>
            <p>Oxu.az-ın NewMedia kanalına abunə olun, ən son xəbərlər!</p>
            <div class="tag-area"><p>Teqlər: manat, məzənnə, bank, iqtisadiyyat</p></div>
          </div>
        </body></html>"#;
        let detail = Oxu
            .parse_detail(markup, "https://oxu.az/iqtisadiyyat/x", &ctx("https://oxu.az"))
            .unwrap();
        assert_eq!(detail.content, "Mərkəzi Bank manatın rəsmi məzənnəsini açıqlayıb.");
        let expected = baku_offset().with_ymd_and_hms(2026, 2, 22, 12, 18, 0).unwrap();
        assert_eq!(detail.published_at, Some(expected.with_timezone(&Utc)));
    }
}
