//! Link and text extraction from a rendered page
//!
//! Work that needs the live layout (forcing hidden elements visible, reading
//! rendered text) runs in the browser through [`PREPARE_TEXT_SCRIPT`];
//! everything else works on the serialized DOM with scraper.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Elements stripped before text extraction
pub const REMOVED_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe", "svg", "canvas"];

/// Selectors whose elements usually carry page copy
pub const CONTENT_SELECTORS: &[&str] = &[
    "p",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "li",
    "td",
    "th",
    "span",
    r#"div[class*="text"]"#,
    r#"div[class*="content"]"#,
    r#"div[data-testid*="text"]"#,
    r#"div[data-testid="richTextElement"]"#,
    r#"[class*="rich-text"]"#,
];

const EXCLUDED_SCHEMES: &[&str] = &["javascript:", "mailto:"];

const ALT_TEXT_HEADER: &str = "[IMAGE ALT TEXTS]";

/// Removes non-content elements, forces hidden elements visible and returns
/// the rendered body text. Mutates the live DOM, so the serialized HTML read
/// afterwards no longer has the removed elements either.
pub const PREPARE_TEXT_SCRIPT: &str = r#"(() => {
    document
        .querySelectorAll('script, style, noscript, iframe, svg, canvas')
        .forEach(el => el.remove());
    document.querySelectorAll('*').forEach(el => {
        const style = window.getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') {
            el.style.display = 'block';
            el.style.visibility = 'visible';
            el.style.opacity = '1';
        }
    });
    return document.body ? (document.body.innerText || '') : '';
})()"#;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").expect("valid newline regex"));

/// One extracted anchor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub index: usize,
    pub url: String,
    pub text: String,
    pub title: String,
}

/// Extract the unique links of a page, in document order
///
/// `base_url` is the page location; a `<base href>` in the document takes
/// precedence, as it does in the browser.
pub fn extract_links(html: &str, base_url: &str) -> Vec<LinkRecord> {
    let doc = Html::parse_document(html);
    let base = document_base(&doc, base_url);

    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in doc.select(&anchors) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || is_excluded(href) {
            continue;
        }

        let url = resolve(base.as_ref(), href);
        if is_excluded(&url) || !seen.insert(url.clone()) {
            continue;
        }

        links.push(LinkRecord {
            index: links.len() + 1,
            url,
            text: collapse(&element_text(anchor)),
            title: anchor
                .value()
                .attr("title")
                .map(|t| t.trim().to_string())
                .unwrap_or_default(),
        });
    }

    links
}

fn document_base(doc: &Html, page_url: &str) -> Option<Url> {
    let page = Url::parse(page_url).ok();
    let declared = Selector::parse("base[href]")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .and_then(|el| el.value().attr("href"))
        .map(str::trim);

    let Some(href) = declared else {
        return page;
    };
    match page {
        Some(page) => page.join(href).ok().or(Some(page)),
        None => Url::parse(href).ok(),
    }
}

fn resolve(base: Option<&Url>, href: &str) -> String {
    let joined = match base {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };
    joined
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

fn is_excluded(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    EXCLUDED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

/// Combine the four text strategies into one cleaned blob
///
/// `rendered` is the browser's rendered body text; the remaining three
/// strategies (raw body text, content selectors, image alt texts) are read
/// from `html`.
pub fn compose_text(rendered: &str, html: &str) -> String {
    let doc = Html::parse_document(html);

    let strategies = [
        rendered.to_string(),
        body_text(&doc),
        selector_text(&doc),
        alt_text(&doc),
    ];

    let parts: Vec<&str> = strategies
        .iter()
        .map(String::as_str)
        .filter(|text| !text.trim().is_empty())
        .collect();

    clean_text(&parts.join("\n\n"))
}

/// Normalize whitespace: every whitespace run, newlines included, becomes
/// one space; any blank-line run still left over is cut to one blank line.
pub fn clean_text(text: &str) -> String {
    let text = WHITESPACE_RUN.replace_all(text, " ");
    EXCESS_NEWLINES
        .replace_all(&text, "\n\n")
        .trim()
        .to_string()
}

fn body_text(doc: &Html) -> String {
    Selector::parse("body")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .map(element_text)
        .unwrap_or_default()
}

fn selector_text(doc: &Html) -> String {
    let mut texts = Vec::new();
    for sel in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(sel) else {
            continue;
        };
        for el in doc.select(&selector) {
            let text = element_text(el);
            let text = text.trim();
            if !text.is_empty() {
                texts.push(text.to_string());
            }
        }
    }
    texts.join("\n")
}

fn alt_text(doc: &Html) -> String {
    let Ok(images) = Selector::parse("img[alt]") else {
        return String::new();
    };
    let alts: Vec<&str> = doc
        .select(&images)
        .filter_map(|img| img.value().attr("alt"))
        .filter(|alt| !alt.trim().is_empty())
        .collect();

    if alts.is_empty() {
        String::new()
    } else {
        format!("\n{}\n{}", ALT_TEXT_HEADER, alts.join("\n"))
    }
}

/// Text content of an element, skipping anything inside removed elements
fn element_text(el: ElementRef) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| REMOVED_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
