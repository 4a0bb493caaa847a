//! HTML readers for links and page metadata
//!
//! This module handles parsing page documents to extract:
//! - Page, image and asset references (with their element back-references)
//! - Title, description and the head/body fragments a page record stores

use crate::content::{ElementLocator, Link, LinkKind, PageContent};
use crate::url::{asset_path, normalize_url, repository_location, strip_fragment};
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements scanned for references, in document-independent order
const LINK_SOURCES: &[(&str, &str, &str, LinkKind)] = &[
    ("a", "a[href]", "href", LinkKind::Page),
    ("img", "img[src]", "src", LinkKind::Image),
    ("link", "link[rel~='stylesheet'][href]", "href", LinkKind::Asset),
    ("script", "script[src]", "src", LinkKind::Asset),
];

/// Tags that are kept out of the main body fragment when they sit at its edges
const EDGE_TAGS: &[&str] = &["script", "noscript"];

/// Extracts every page, image and asset reference from a page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href>` (anchors with a `download` attribute become assets)
/// - `<img src>`
/// - `<link rel="stylesheet" href>` and `<script src>`
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` and `data:` references
/// - fragment-only references (same page anchors)
/// - anything that does not resolve to an http(s) URL
///
/// Repository paths are computed for `site_name`; the fragment is stripped
/// from the URL and from the path separately.
pub fn extract_links(content: &PageContent, site_name: &str) -> Vec<Link> {
    let document = content.document();
    let mut links = Vec::new();

    for (tag, selector, attribute, kind) in LINK_SOURCES {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };

        for (ordinal, element) in document.select(&selector).enumerate() {
            let Some(raw) = element.value().attr(attribute) else {
                continue;
            };
            let Some(absolute) = resolve_reference(raw, content.url()) else {
                continue;
            };

            let kind = if *kind == LinkKind::Page && element.value().attr("download").is_some() {
                LinkKind::Asset
            } else {
                *kind
            };

            let text = match kind {
                LinkKind::Image => element.value().attr("alt").unwrap_or_default().trim().to_string(),
                _ => element_text(&element),
            };

            let element = ElementLocator {
                tag: tag.to_string(),
                attribute: attribute.to_string(),
                ordinal,
                original: raw.to_string(),
            };

            links.push(build_link(&absolute, site_name, text, element, kind));
        }
    }

    links
}

fn build_link(
    absolute: &Url,
    site_name: &str,
    text: String,
    element: ElementLocator,
    kind: LinkKind,
) -> Link {
    let (folder, name) = match kind {
        LinkKind::Page => {
            let location = repository_location(absolute, site_name);
            (location.folder, location.name)
        }
        LinkKind::Image | LinkKind::Asset => {
            let path = asset_path(absolute, site_name);
            match path.rsplit_once('/') {
                Some((folder, name)) => (folder.to_string(), name.to_string()),
                None => (String::new(), path),
            }
        }
    };

    let relative = format!("{}/{}", folder, name);

    Link {
        absolute_link: strip_fragment(absolute.as_str()).to_string(),
        relative_path_with_file_name: strip_fragment(&relative).to_string(),
        link_path: folder,
        link_text: text,
        page_name: strip_fragment(&name).to_string(),
        element,
        kind,
        resolved: false,
    }
}

/// Resolves a raw attribute value against the page URL
fn resolve_reference(raw: &str, base_url: &Url) -> Option<Url> {
    let raw = raw.trim();

    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }

    let lowered = raw.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let joined = base_url.join(raw).ok()?;
    normalize_url(joined.as_str()).ok()
}

fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fields read from a page document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub head_content: String,
    pub after_body_start: String,
    pub before_body_close: String,
    pub body_content: String,
}

/// Reads title, description and head/body fragments from a document
///
/// Leading and trailing `<script>`/`<noscript>` children of `<body>` are
/// split out into `after_body_start` and `before_body_close`.
pub fn extract_metadata(document: &Html) -> PageMetadata {
    let mut metadata = PageMetadata {
        title: select_first(document, "title")
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty()),
        description: select_first(document, "meta[name='description']")
            .and_then(|e| e.value().attr("content"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        head_content: select_first(document, "head")
            .map(|e| e.inner_html().trim().to_string())
            .unwrap_or_default(),
        ..PageMetadata::default()
    };

    let Some(body) = select_first(document, "body") else {
        return metadata;
    };

    let fragments: Vec<(bool, String)> = body
        .children()
        .filter_map(|node| match node.value() {
            Node::Element(element) => {
                let is_edge = EDGE_TAGS.contains(&element.name());
                ElementRef::wrap(node).map(|e| (is_edge, e.html()))
            }
            Node::Text(text) => {
                let text = text.to_string();
                if text.trim().is_empty() {
                    None
                } else {
                    Some((false, text))
                }
            }
            _ => None,
        })
        .collect();

    let leading = fragments.iter().take_while(|(edge, _)| *edge).count();
    let trailing = fragments[leading..]
        .iter()
        .rev()
        .take_while(|(edge, _)| *edge)
        .count();
    let middle_end = fragments.len() - trailing;

    metadata.after_body_start = join_fragments(&fragments[..leading]);
    metadata.body_content = join_fragments(&fragments[leading..middle_end]);
    metadata.before_body_close = join_fragments(&fragments[middle_end..]);

    metadata
}

fn join_fragments(fragments: &[(bool, String)]) -> String {
    fragments
        .iter()
        .map(|(_, html)| html.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}
