//! Shared HTML helpers for the per-site extractors.
//!
//! Most sites fall into one of two shapes: a card grid where every card has a
//! known selector, or a loose page where articles are only recognizable by
//! their URL shape. [`LinkListing`] handles the second shape; card-based
//! extractors use the smaller helpers directly.

use super::ExtractContext;
use crate::error::ParseError;
use crate::models::ArticleSummary;
use crate::utils::normalize_whitespace;
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Azerbaijani month names as a regex alternation.
pub const AZ_MONTHS: &str = "yanvar|fevral|mart|aprel|may|iyun|iyul|avqust|sentyabr|oktyabr|noyabr|dekabr";

/// Parse a selector known at compile time.
///
/// Only used to initialize `Lazy` statics; a bad literal is a programming error.
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector `{css}`: {e:?}"))
}

/// Concatenated, whitespace-collapsed text of an element.
pub fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Nearest ancestor whose tag is one of `tags`.
pub fn closest<'a>(el: ElementRef<'a>, tags: &[&str]) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| tags.contains(&a.value().name()))
}

/// First descendant (excluding `el` itself) whose tag is one of `tags`.
pub fn find_descendant<'a>(el: ElementRef<'a>, tags: &[&str]) -> Option<ElementRef<'a>> {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|d| tags.contains(&d.value().name()))
}

/// All descendants whose tag is one of `tags`, in document order.
pub fn find_descendants<'a>(
    el: ElementRef<'a>,
    tags: &[&str],
) -> impl Iterator<Item = ElementRef<'a>> {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |d| tags.contains(&d.value().name()))
}

/// Resolve the first image inside `container`.
///
/// `lazy_first` prefers `data-src` over `src` for sites that lazy-load images
/// behind a placeholder. Inline `data:` placeholders are ignored.
pub fn image_url(
    container: ElementRef<'_>,
    ctx: &ExtractContext,
    lazy_first: bool,
) -> Option<String> {
    let img = find_descendant(container, &["img"])?;
    let attrs: [&str; 2] = if lazy_first {
        ["data-src", "src"]
    } else {
        ["src", "data-src"]
    };
    attrs
        .iter()
        .filter_map(|a| img.value().attr(a))
        .map(str::trim)
        .find(|v| !v.is_empty() && !v.starts_with("data:"))
        .and_then(|v| ctx.resolve(v))
}

/// First text node under `root` matching `re`, trimmed.
pub fn text_node_matching<'a>(root: ElementRef<'a>, re: &Regex) -> Option<&'a str> {
    root.text().map(str::trim).find(|t| re.is_match(t))
}

/// All text of the document joined with spaces.
pub fn document_text(doc: &Html) -> String {
    doc.root_element().text().collect::<Vec<_>>().join(" ")
}

/// Last non-empty path segment of a URL.
pub fn last_segment(url: &str) -> Option<&str> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
}

/// Id of an article URL: the last path segment that starts with a number
/// (`/41234-slug`, `/41234`), else the last segment.
pub fn numeric_or_last_segment(url: &str) -> Option<&str> {
    static LEADING_DIGITS: once_cell::sync::Lazy<Regex> =
        once_cell::sync::Lazy::new(|| Regex::new(r"^(\d+)(?:-|$)").unwrap());

    let trimmed = url.trim_end_matches('/');
    trimmed
        .rsplit('/')
        .find_map(|seg| LEADING_DIGITS.captures(seg).and_then(|c| c.get(1)))
        .map(|m| m.as_str())
        .or_else(|| last_segment(trimmed))
}

/// Slug of an article URL: its last path segment, without query or `.html`.
pub fn url_slug(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    last_segment(path)
        .map(|s| s.trim_end_matches(".html"))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// For cards without a date on the listing.
pub fn no_date(_card: ElementRef<'_>, _ctx: &ExtractContext) -> Option<DateTime<Utc>> {
    None
}

/// Text of `el`, leaving out anything inside an element matched by `exclude`.
fn text_excluding(el: ElementRef<'_>, exclude: &Selector) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let excluded = node
            .ancestors()
            .take_while(|a| a.id() != el.id())
            .filter_map(ElementRef::wrap)
            .any(|a| exclude.matches(&a));
        if !excluded {
            out.push_str(text);
        }
    }
    normalize_whitespace(&out)
}

/// Whether `el` or one of its ancestors below `stop` matches `sel`.
fn inside_excluded(el: ElementRef<'_>, stop: ElementRef<'_>, sel: &Selector) -> bool {
    if sel.matches(&el) {
        return true;
    }
    for ancestor in el.ancestors().filter_map(ElementRef::wrap) {
        if ancestor.id() == stop.id() {
            return false;
        }
        if sel.matches(&ancestor) {
            return true;
        }
    }
    false
}

/// Text of every `<p>` in `container` longer than `min_chars`, skipping any
/// paragraph inside an element matched by `exclude`.
pub fn paragraphs(
    container: ElementRef<'_>,
    min_chars: usize,
    exclude: Option<&Selector>,
) -> Vec<String> {
    find_descendants(container, &["p"])
        .filter_map(|p| match exclude {
            Some(sel) if inside_excluded(p, container, sel) => None,
            Some(sel) => Some(text_excluding(p, sel)),
            None => Some(element_text(p)),
        })
        .filter(|t| char_len(t) > min_chars)
        .collect()
}

/// Try each selector in order and return the paragraphs of the first match
/// that yields any text.
pub fn content_from(
    doc: &Html,
    selectors: &[&Selector],
    min_chars: usize,
    exclude: Option<&Selector>,
) -> Option<String> {
    selectors.iter().find_map(|sel| {
        let container = doc.select(sel).next()?;
        let parts = paragraphs(container, min_chars, exclude);
        (!parts.is_empty()).then(|| parts.join("\n\n"))
    })
}

/// Every paragraph in the document longer than `min_chars`.
pub fn all_paragraphs(doc: &Html, min_chars: usize) -> Option<String> {
    let parts = paragraphs(doc.root_element(), min_chars, None);
    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

/// First element among `tags` whose class attribute matches `class_re`.
pub fn text_by_class(doc: &Html, tags: &[&str], class_re: &Regex) -> Option<String> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| tags.contains(&e.value().name()))
        .find(|e| e.value().classes().any(|c| class_re.is_match(c)))
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Listing extraction for sites whose articles are recognized by URL shape.
pub struct LinkListing<'a> {
    /// Anchors whose `href` matches this are article links.
    pub href: &'a Regex,
    /// Capture group 1 is the per-site article id used for de-duplication.
    pub id: &'a Regex,
    /// Capture group 1 is the section slug, for sites that put it in the URL.
    pub category: Option<&'a Regex>,
    /// Substrings marking static pages that happen to match `href`.
    pub skip: &'a [&'a str],
    pub min_title: usize,
    /// Elements inside the anchor that carry the title, tried before the anchor text.
    pub title_tags: &'a [&'a str],
    /// Headings searched in the surrounding container when the anchor has no usable title.
    pub heading_tags: &'a [&'a str],
    /// Tags considered the surrounding card of an anchor.
    pub container_tags: &'a [&'a str],
    pub lazy_images: bool,
    /// Pull a timestamp out of the surrounding card.
    pub date: fn(ElementRef<'_>, &ExtractContext) -> Option<DateTime<Utc>>,
}

impl LinkListing<'_> {
    fn title(&self, link: ElementRef<'_>, container: Option<ElementRef<'_>>) -> Option<String> {
        let mut title = self
            .title_tags
            .iter()
            .filter_map(|tag| find_descendant(link, &[*tag]))
            .map(element_text)
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| element_text(link));
        if title.is_empty() {
            title = link
                .value()
                .attr("title")
                .map(normalize_whitespace)
                .unwrap_or_default();
        }
        if char_len(&title) < self.min_title {
            if let Some(parent) = container {
                if let Some(heading) = find_descendants(parent, self.heading_tags)
                    .map(element_text)
                    .find(|t| char_len(t) >= self.min_title)
                {
                    title = heading;
                }
            }
        }
        (char_len(&title) >= self.min_title).then_some(title)
    }

    pub fn parse(
        &self,
        markup: &str,
        page: u32,
        ctx: &ExtractContext,
    ) -> Result<Vec<ArticleSummary>, ParseError> {
        static ANCHOR: once_cell::sync::Lazy<Selector> =
            once_cell::sync::Lazy::new(|| selector("a[href]"));

        let doc = Html::parse_document(markup);
        let links: Vec<_> = doc
            .select(&ANCHOR)
            .filter(|a| {
                let href = a.value().attr("href").unwrap_or_default();
                self.href.is_match(href) && !self.skip.iter().any(|s| href.contains(s))
            })
            .collect();

        if links.is_empty() {
            return Err(ParseError::ListingUnavailable {
                page,
                reason: "no article links found".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for link in links {
            let href = link.value().attr("href").unwrap_or_default().trim();
            let Some(id) = self.id.captures(href).and_then(|c| c.get(1)) else {
                continue;
            };
            if !seen.insert(id.as_str().to_string()) {
                continue;
            }
            let Some(url) = ctx.resolve(href) else {
                continue;
            };

            let container = closest(link, self.container_tags);
            let Some(title) = self.title(link, container) else {
                continue;
            };

            let category = self
                .category
                .and_then(|re| re.captures(href))
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());
            out.push(ArticleSummary {
                slug: url_slug(&url),
                url,
                title,
                published_at: container.and_then(|c| (self.date)(c, ctx)),
                image_url: container.and_then(|c| image_url(c, ctx, self.lazy_images)),
                source_article_id: Some(id.as_str().to_string()),
                category,
            });
        }
        Ok(out)
    }
}
