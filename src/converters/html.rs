//! HTML → Markdown.
//!
//! The document is parsed with `scraper`. Script-like elements are always
//! detached from the tree; in readability mode page chrome (navigation,
//! headers, footers, sidebars, forms) goes too and the main content node is
//! located. The chosen subtree is rendered by `html2md`.
//!
//! Relative link and image targets are resolved against the page's base
//! URL: the URL the document was fetched from, else `https://{html_host}/`.

use crate::config::ConversionConfig;
use crate::converters::DocumentConverter;
use crate::error::MarkitdownError;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use tracing::{debug, info};

/// Minimum paragraph length that counts towards a readability score.
const MIN_PARAGRAPH_CHARS: usize = 25;

static RE_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());
static RE_LINK_TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\]\(([^)\s]+)").unwrap());

/// Never document text.
static SEL_ALWAYS_SKIPPED: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script, style, noscript, template").unwrap());
/// Page chrome, removed in readability mode.
static SEL_CHROME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("nav, header, footer, aside, form, iframe, svg").unwrap());
static SEL_BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static SEL_P: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static SEL_MAIN_CANDIDATES: Lazy<[Selector; 3]> = Lazy::new(|| {
    [
        Selector::parse("article").unwrap(),
        Selector::parse("main").unwrap(),
        Selector::parse("[role=main]").unwrap(),
    ]
});

/// Converts HTML documents to markdown.
#[derive(Debug, Clone)]
pub struct HtmlConverter {
    readability: bool,
    host: Option<String>,
    base_url: Option<Url>,
}

impl HtmlConverter {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            readability: config.html_readability,
            host: config.html_host.clone(),
            base_url: config.html_base_url.clone(),
        }
    }

    /// Convert an HTML string.
    pub fn convert_str(&self, html: &str) -> Result<String, MarkitdownError> {
        let base = self.base()?;
        let shown = base.as_ref().map(Url::as_str);
        if self.readability {
            info!("Parsing HTML with readability mode enabled (base: {:?})", shown);
        } else {
            info!("Parsing raw HTML content (base: {:?})", shown);
        }

        let mut document = Html::parse_document(html);
        detach_all(&mut document, &SEL_ALWAYS_SKIPPED);
        if self.readability {
            detach_all(&mut document, &SEL_CHROME);
        }

        let root = if self.readability {
            main_content(&document)
        } else {
            document
                .select(&SEL_BODY)
                .next()
                .unwrap_or_else(|| document.root_element())
        };
        debug!("Converting <{}> subtree", root.value().name());

        let rendered = html2md::parse_html(&root.html());
        let rendered = match base {
            Some(ref base) => rebase_links(&rendered, base),
            None => rendered,
        };
        let markdown = RE_BLANK_LINES
            .replace_all(rendered.trim(), "\n\n")
            .into_owned();

        info!("Completed HTML conversion: {} chars", markdown.len());
        Ok(markdown)
    }

    /// The URL relative targets are resolved against, if any.
    fn base(&self) -> Result<Option<Url>, MarkitdownError> {
        if let Some(ref url) = self.base_url {
            return Ok(Some(url.clone()));
        }
        match self.host.as_deref() {
            Some(host) if !host.is_empty() => Url::parse(&format!("https://{host}/"))
                .map(Some)
                .map_err(|e| {
                    MarkitdownError::HtmlConversion(format!("invalid host '{host}': {e}"))
                }),
            _ => Ok(None),
        }
    }
}

impl DocumentConverter for HtmlConverter {
    fn convert(&self, bytes: Vec<u8>) -> BoxFuture<'_, Result<String, MarkitdownError>> {
        Box::pin(async move { self.convert_str(&String::from_utf8_lossy(&bytes)) })
    }
}

/// Remove every element matching `selector` from the tree.
fn detach_all(document: &mut Html, selector: &Selector) {
    let doomed: Vec<_> = document.select(selector).map(|el| el.id()).collect();
    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Locate the node holding the main content of a page.
///
/// `<article>`, `<main>` and `[role=main]` win outright. Otherwise each
/// paragraph of at least [`MIN_PARAGRAPH_CHARS`] characters adds its length
/// to its parent and half of it to its grandparent, and the best-scoring
/// `<div>`/`<section>` is chosen. Falls back to `<body>`.
fn main_content(document: &Html) -> ElementRef<'_> {
    for selector in SEL_MAIN_CANDIDATES.iter() {
        if let Some(found) = document.select(selector).next() {
            return found;
        }
    }

    let mut scores: HashMap<_, (ElementRef<'_>, usize)> = HashMap::new();
    for p in document.select(&SEL_P) {
        let len = p
            .text()
            .flat_map(str::split_whitespace)
            .map(|word| word.len() + 1)
            .sum::<usize>()
            .saturating_sub(1);
        if len < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let parent = p.parent().and_then(ElementRef::wrap);
        if let Some(parent) = parent {
            scores.entry(parent.id()).or_insert((parent, 0)).1 += len;
            if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
                scores.entry(grandparent.id()).or_insert((grandparent, 0)).1 += len / 2;
            }
        }
    }

    let best = scores
        .into_values()
        .filter(|(el, _)| matches!(el.value().name(), "div" | "section"))
        .max_by_key(|(_, score)| *score)
        .map(|(el, _)| el);

    best.or_else(|| document.select(&SEL_BODY).next())
        .unwrap_or_else(|| document.root_element())
}

/// Resolve every `](target)` in rendered markdown against `base`.
/// Fragment-only targets are left alone.
fn rebase_links(markdown: &str, base: &Url) -> String {
    RE_LINK_TARGET
        .replace_all(markdown, |caps: &Captures<'_>| {
            let target = &caps[1];
            if target.starts_with('#') {
                return format!("]({target})");
            }
            match base.join(target) {
                Ok(resolved) => format!("]({resolved})"),
                Err(_) => format!("]({target})"),
            }
        })
        .into_owned()
}
