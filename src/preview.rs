//! Markdown preview rendering.
//!
//! Resolves wiki links, renders Markdown, sanitizes the result, then walks
//! the sanitized HTML once to build a table of what each link or image should
//! do when activated. The front end wires clicks from that table instead of
//! patching elements after they are inserted.

use crate::models::PageRef;
use crate::wiki_links::{self, EXISTS_CLASS};
use ammonia::Builder;
use once_cell::sync::Lazy;
use pulldown_cmark::{html, Event, Options, Parser};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use url::Url;

static ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(a|img)((?:\s+[^\s=/>]+(?:\s*=\s*"[^"]*")?)*)\s*/?>"#).unwrap()
});
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"([^\s=/>]+)\s*=\s*"([^"]*)""#).unwrap());

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LinkAction {
    /// Open another wiki page in the app.
    Navigate { page_id: String },
    /// Open an external site in a new tab.
    OpenExternal { url: String },
    /// Open an image on its own in a new tab.
    OpenImage { src: String },
}

/// An action bound to the `index`-th `a`/`img` element of the preview, in
/// document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedElement {
    pub index: usize,
    pub tag: String,
    #[serde(flatten)]
    pub action: LinkAction,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderedPreview {
    pub html: String,
    pub actions: Vec<AnnotatedElement>,
}

// ============================================================================
// Pipeline
// ============================================================================

pub fn render_preview(content: &str, pages: &[PageRef]) -> RenderedPreview {
    let resolved = wiki_links::resolve(content, pages);
    let html = sanitize(&render_markdown(&resolved));
    let actions = annotate(&html);
    RenderedPreview { html, actions }
}

/// Markdown to HTML. Single newlines become line breaks.
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(content, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// Strip anything unsafe, keeping the attributes wiki-link markup relies on.
pub fn sanitize(html: &str) -> String {
    Builder::default()
        .add_generic_attributes(&["class", "title"])
        .add_tag_attributes("a", &["data-page-id"])
        .clean(html)
        .to_string()
}

/// Build the action table for sanitized HTML.
pub fn annotate(html: &str) -> Vec<AnnotatedElement> {
    ELEMENT
        .captures_iter(html)
        .enumerate()
        .filter_map(|(index, caps)| {
            let tag = caps[1].to_string();
            let attrs = parse_attributes(caps.get(2).map_or("", |m| m.as_str()));
            let action = if tag == "img" {
                attrs.get("src").map(|src| LinkAction::OpenImage { src: src.clone() })
            } else {
                link_action(&attrs)
            }?;
            Some(AnnotatedElement { index, tag, action })
        })
        .collect()
}

fn link_action(attrs: &HashMap<String, String>) -> Option<LinkAction> {
    let is_wiki_link = attrs
        .get("class")
        .is_some_and(|c| c.split_whitespace().any(|cls| cls == EXISTS_CLASS));
    if is_wiki_link {
        return attrs
            .get("data-page-id")
            .filter(|id| !id.is_empty())
            .map(|id| LinkAction::Navigate {
                page_id: id.clone(),
            });
    }
    let url = external_url(attrs.get("href")?)?;
    Some(LinkAction::OpenExternal { url })
}

/// Absolute http(s) URL for an href that points off-site, if it does.
pub fn external_url(href: &str) -> Option<String> {
    let candidate = if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else if wiki_links::looks_like_url(href) {
        wiki_links::external_href(href)
    } else {
        return None;
    };
    let parsed = Url::parse(&candidate).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(candidate)
}

fn parse_attributes(raw: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(raw)
        .map(|caps| (caps[1].to_ascii_lowercase(), html_unescape(&caps[2])))
        .collect()
}

fn html_unescape(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
