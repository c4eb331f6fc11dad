//! Wiki-link resolution and extraction.
//!
//! Page bodies reference other pages with `[[Page Name]]`. Resolution turns
//! each reference into markup for the Markdown renderer; extraction returns
//! the raw names for collaborators such as backlink indexers.

use crate::models::PageRef;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;

static WIKI_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap());
static URL_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(https?://|www\.)").unwrap());
static BARE_DOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9-]+\.[a-zA-Z]{2,}").unwrap());
static HAS_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://").unwrap());

/// Class shared by every resolved wiki-link fragment.
pub const WIKI_LINK_CLASS: &str = "wiki-link";
/// Marker class on links to pages that exist.
pub const EXISTS_CLASS: &str = "wiki-link-exists";
/// Marker class on mentions of pages that do not exist.
pub const MISSING_CLASS: &str = "wiki-link-missing";
/// Hover hint on missing-page mentions.
pub const MISSING_HINT: &str = "Page not found";

// ============================================================================
// Classification
// ============================================================================

/// What a single `[[...]]` token resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedToken {
    ExternalLink { display_text: String, url: String },
    InternalLink { display_text: String, page_id: String },
    UnresolvedMention { display_text: String },
}

impl ResolvedToken {
    pub fn display_text(&self) -> &str {
        match self {
            ResolvedToken::ExternalLink { display_text, .. }
            | ResolvedToken::InternalLink { display_text, .. }
            | ResolvedToken::UnresolvedMention { display_text } => display_text,
        }
    }

    /// Markup substituted for the token in the page body.
    pub fn to_markup(&self) -> String {
        match self {
            ResolvedToken::ExternalLink { display_text, url } => {
                format!("[{}]({})", display_text, url)
            }
            ResolvedToken::InternalLink {
                display_text,
                page_id,
            } => format!(
                r#"<a href="/editor/{}" class="{} {}" data-page-id="{}">{}</a>"#,
                urlencoding::encode(page_id),
                WIKI_LINK_CLASS,
                EXISTS_CLASS,
                html_escape(page_id),
                html_escape(display_text)
            ),
            ResolvedToken::UnresolvedMention { display_text } => format!(
                r#"<span class="{} {}" title="{}">{}</span>"#,
                WIKI_LINK_CLASS,
                MISSING_CLASS,
                MISSING_HINT,
                html_escape(display_text)
            ),
        }
    }
}

/// True when the text looks like an absolute URL, a `www.` host or a bare domain.
pub fn looks_like_url(text: &str) -> bool {
    URL_PREFIX.is_match(text) || BARE_DOMAIN.is_match(text)
}

/// Href for a URL-like token: an existing http(s) scheme is kept, anything
/// else gets `https://`.
pub fn external_href(text: &str) -> String {
    if HAS_SCHEME.is_match(text) {
        text.to_string()
    } else {
        format!("https://{}", text)
    }
}

/// Classify the inner text of one wiki-link. URL shapes win over page names.
pub fn classify(inner: &str, pages: &[PageRef]) -> ResolvedToken {
    let name = inner.trim();

    if looks_like_url(name) {
        return ResolvedToken::ExternalLink {
            display_text: name.to_string(),
            url: external_href(name),
        };
    }

    match pages.iter().find(|p| p.name == name) {
        Some(page) => ResolvedToken::InternalLink {
            display_text: name.to_string(),
            page_id: page.id.clone(),
        },
        None => ResolvedToken::UnresolvedMention {
            display_text: name.to_string(),
        },
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Replace every `[[...]]` token in `text` with its resolved markup.
///
/// Unclosed brackets are left untouched. Replacement text is never scanned
/// again.
pub fn resolve(text: &str, pages: &[PageRef]) -> String {
    WIKI_LINK
        .replace_all(text, |caps: &Captures| classify(&caps[1], pages).to_markup())
        .into_owned()
}

/// The classification of every token in document order.
pub fn resolve_tokens(text: &str, pages: &[PageRef]) -> Vec<ResolvedToken> {
    WIKI_LINK
        .captures_iter(text)
        .map(|caps| classify(&caps[1], pages))
        .collect()
}

// ============================================================================
// Extraction
// ============================================================================

/// Trimmed names of every wiki-link, in document order, duplicates kept.
pub fn extract_names(text: &str) -> Vec<String> {
    WIKI_LINK
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

/// Like [`extract_names`] but each name only once, in first-seen order.
pub fn unique_names(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    extract_names(text)
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Referenced names that are neither URLs nor existing pages.
pub fn missing_names(text: &str, pages: &[PageRef]) -> Vec<String> {
    unique_names(text)
        .into_iter()
        .filter(|name| {
            matches!(
                classify(name, pages),
                ResolvedToken::UnresolvedMention { .. }
            )
        })
        .collect()
}

// ============================================================================
// Text Escaping
// ============================================================================

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages() -> Vec<PageRef> {
        vec![PageRef::new("2", "About"), PageRef::new("7", "Rust Notes")]
    }

    #[test]
    fn test_resolve_existing_page() {
        let out = resolve("See [[About]].", &pages());
        assert_eq!(
            out,
            r#"See <a href="/editor/2" class="wiki-link wiki-link-exists" data-page-id="2">About</a>."#
        );
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        let out = resolve("[[  Rust Notes ]]", &pages());
        assert!(out.contains(r#"data-page-id="7""#));
        assert!(out.contains(">Rust Notes</a>"));
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let out = resolve("[[about]]", &pages());
        assert!(out.contains(MISSING_CLASS));
        assert!(!out.contains("data-page-id"));
    }

    #[test]
    fn test_resolve_missing_page() {
        let out = resolve("[[Missing Page]]", &pages());
        assert_eq!(
            out,
            r#"<span class="wiki-link wiki-link-missing" title="Page not found">Missing Page</span>"#
        );
        assert!(!out.contains("<a"));
    }

    #[test]
    fn test_resolve_bare_domain_gets_https() {
        let out = resolve("[[example.com]]", &[]);
        assert_eq!(out, "[example.com](https://example.com)");
    }

    #[test]
    fn test_resolve_keeps_existing_scheme() {
        assert_eq!(
            resolve("[[http://example.org/a]]", &[]),
            "[http://example.org/a](http://example.org/a)"
        );
        assert_eq!(
            resolve("[[HTTPS://Example.org]]", &[]),
            "[HTTPS://Example.org](HTTPS://Example.org)"
        );
    }

    #[test]
    fn test_resolve_www_prefix() {
        assert_eq!(
            resolve("[[www.rust-lang.org]]", &[]),
            "[www.rust-lang.org](https://www.rust-lang.org)"
        );
    }

    #[test]
    fn test_url_wins_over_page_name() {
        let pages = vec![PageRef::new("9", "example.com")];
        let token = classify("example.com", &pages);
        assert!(matches!(token, ResolvedToken::ExternalLink { .. }));
    }

    #[test]
    fn test_unclosed_brackets_pass_through() {
        let text = "an [[unclosed reference and [single] brackets";
        assert_eq!(resolve(text, &pages()), text);
    }

    #[test]
    fn test_resolved_markup_is_not_rescanned() {
        let out = resolve("[[[[Nested]]", &[]);
        assert_eq!(
            out,
            r#"<span class="wiki-link wiki-link-missing" title="Page not found">[[Nested</span>"#
        );
    }

    #[test]
    fn test_resolve_escapes_html() {
        let out = resolve("[[<b>bold</b>]]", &[]);
        assert!(out.contains("&lt;b&gt;bold&lt;/b&gt;"));
    }

    #[test]
    fn test_resolve_is_pure() {
        let text = "[[About]] then [[nowhere]] and [[docs.rs]]";
        assert_eq!(resolve(text, &pages()), resolve(text, &pages()));
    }

    #[test]
    fn test_resolve_tokens_in_order() {
        let tokens = resolve_tokens("[[About]] [[gone]] [[docs.rs]]", &pages());
        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[0], ResolvedToken::InternalLink { page_id, .. } if page_id == "2"));
        assert!(matches!(&tokens[1], ResolvedToken::UnresolvedMention { .. }));
        assert!(matches!(&tokens[2], ResolvedToken::ExternalLink { url, .. } if url == "https://docs.rs"));
    }

    #[test]
    fn test_extract_names_keeps_order_and_duplicates() {
        assert_eq!(
            extract_names("[[A]] and [[B]] and [[A]]"),
            vec!["A", "B", "A"]
        );
    }

    #[test]
    fn test_extract_names_trims() {
        assert_eq!(extract_names("[[ spaced ]]"), vec!["spaced"]);
        assert!(extract_names("no links [[ here").is_empty());
    }

    #[test]
    fn test_unique_and_missing_names() {
        let text = "[[About]] [[Ghost]] [[Ghost]] [[example.com]] [[Other]]";
        assert_eq!(unique_names(text), vec!["About", "Ghost", "example.com", "Other"]);
        assert_eq!(missing_names(text, &pages()), vec!["Ghost", "Other"]);
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
