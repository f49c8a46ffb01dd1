//! HTML parser for extracting links and image references
//!
//! This module handles parsing fetched documents to extract:
//! - Links to follow (from `<a href>` tags)
//! - Image references (from `<img src>` tags)
//! - Image references inside CSS (`url(...)` in style attributes and `<style>` blocks)
//!
//! `scraper::Html` is not `Send`, so callers in async code should go through
//! [`extract_assets`], which drops the DOM before returning.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

static CSS_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(\s*['"]?(.*?)['"]?\s*\)"#).expect("Invalid CSS url() regex")
});

/// A parsed document together with the URL its references resolve against
pub struct Document {
    html: Html,
    base_url: Url,
}

/// Everything the crawler needs from one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAssets {
    /// Absolute hyperlink targets
    pub links: HashSet<String>,
    /// Image references from `<img>` tags and CSS, absolute or `data:` URIs
    pub images: HashSet<String>,
}

impl Document {
    /// Parses HTML fetched from `page_url`
    ///
    /// A `<base href>` element, when present and resolvable, replaces
    /// `page_url` as the base for relative references.
    pub fn parse(body: &str, page_url: &Url) -> Self {
        let html = Html::parse_document(body);
        let base_url = find_base_href(&html, page_url).unwrap_or_else(|| page_url.clone());
        Self { html, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn find_base_href(html: &Html, page_url: &Url) -> Option<Url> {
    let selector = Selector::parse("base[href]").ok()?;
    let href = html.select(&selector).next()?.value().attr("href")?;
    page_url.join(href.trim()).ok()
}

/// Parses `body` and extracts links plus all image references
pub fn extract_assets(body: &str, page_url: &Url) -> PageAssets {
    let document = Document::parse(body, page_url);

    let mut images = extract_images(&document);
    images.extend(extract_css_images(&document));

    PageAssets {
        links: extract_links(&document),
        images,
    }
}

/// Extracts all followable links from the document
///
/// # Link Extraction Rules
///
/// **Exclude:**
/// - Empty and fragment-only hrefs
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Anything that is not HTTP(S) after resolution
pub fn extract_links(document: &Document) -> HashSet<String> {
    let mut links = HashSet::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.html.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, &document.base_url) {
                    links.insert(absolute_url);
                }
            }
        }
    }

    links
}

/// Extracts image references from `<img src>` tags
///
/// `data:` URIs are kept verbatim and `{placeholder}` braces in templated
/// sources survive resolution.
pub fn extract_images(document: &Document) -> HashSet<String> {
    let mut images = HashSet::new();

    if let Ok(img_selector) = Selector::parse("img[src]") {
        for element in document.html.select(&img_selector) {
            if let Some(src) = element.value().attr("src") {
                if let Some(reference) = resolve_image(src, &document.base_url) {
                    images.insert(reference);
                }
            }
        }
    }

    images
}

/// Extracts image references from CSS `url(...)` values
///
/// Both inline `style` attributes and `<style>` elements are scanned.
pub fn extract_css_images(document: &Document) -> HashSet<String> {
    let mut css_blocks: Vec<String> = Vec::new();

    if let Ok(styled) = Selector::parse("[style]") {
        for element in document.html.select(&styled) {
            if let Some(style) = element.value().attr("style") {
                css_blocks.push(style.to_string());
            }
        }
    }

    if let Ok(style_tags) = Selector::parse("style") {
        for element in document.html.select(&style_tags) {
            css_blocks.push(element.text().collect::<String>());
        }
    }

    css_blocks
        .iter()
        .flat_map(|css| CSS_URL_PATTERN.captures_iter(css))
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| resolve_image(m.as_str(), &document.base_url))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}

/// Resolves an image reference, keeping data URIs and template braces intact
fn resolve_image(src: &str, base_url: &Url) -> Option<String> {
    let src = src.trim();

    if src.is_empty() {
        return None;
    }

    if src
        .get(..5)
        .map_or(false, |scheme| scheme.eq_ignore_ascii_case("data:"))
    {
        return Some(src.to_string());
    }

    let absolute_url = base_url.join(src).ok()?;
    if !matches!(absolute_url.scheme(), "http" | "https") {
        return None;
    }

    let resolved = absolute_url.to_string();
    if src.contains('{') && src.contains('}') {
        // Path encoding escapes braces; put them back for the template strategy
        Some(resolved.replace("%7B", "{").replace("%7D", "}"))
    } else {
        Some(resolved)
    }
}
