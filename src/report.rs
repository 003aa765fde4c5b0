//! Flat report rendering and output
//!
//! Text reports are the human-readable dumps; json/yaml serialize the same
//! records for tooling.

use crate::extract::LinkRecord;
use crate::harvest::{LinkPage, PageTextRecord};
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

const RULE_WIDTH: usize = 80;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
    Yaml,
}

/// A whole text run, as serialized for json/yaml output
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDump {
    pub generated: String,
    pub processing_seconds: f64,
    pub total_characters: usize,
    pub pages: Vec<PageTextRecord>,
}

impl TextDump {
    pub fn new(pages: Vec<PageTextRecord>, generated: String, elapsed: Duration) -> Self {
        Self {
            generated,
            processing_seconds: round2(elapsed.as_secs_f64()),
            total_characters: pages.iter().map(|p| p.length).sum(),
            pages,
        }
    }
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn round2(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

/// Format an integer with comma thousands separators
pub fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Hostname used to group a link; anything without one lands in "other"
fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "other".to_string())
}

/// Render the link report for one page
pub fn render_links(page: &LinkPage, elapsed: Duration) -> String {
    let mut out = String::new();
    out.push_str(&format!("EXTRACTED LINKS FROM: {}\n", page.url));
    out.push_str(&format!("Generated on: {}\n", page.timestamp));
    out.push_str(&format!(
        "Processing time: {:.2} seconds\n",
        elapsed.as_secs_f64()
    ));
    out.push_str(&format!("Total unique links: {}\n", page.total_links));
    out.push_str(&format!("{}\n\n", rule()));

    if let Some(error) = &page.error {
        out.push_str(&format!("ERROR: {}\n\n", error));
    }

    if page.links.is_empty() {
        out.push_str("No links found on this page.\n");
        return out;
    }

    let mut by_domain: BTreeMap<String, Vec<&LinkRecord>> = BTreeMap::new();
    for link in &page.links {
        by_domain.entry(domain_of(&link.url)).or_default().push(link);
    }

    for (domain, links) in &by_domain {
        out.push_str(&format!(
            "\n--- LINKS FROM: {} ({} links) ---\n\n",
            domain,
            links.len()
        ));
        for (i, link) in links.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, link.url));
            if !link.text.is_empty() {
                out.push_str(&format!("   Text: {}\n", link.text));
            }
            if !link.title.is_empty() {
                out.push_str(&format!("   Title: {}\n", link.title));
            }
            out.push('\n');
        }
    }

    out.push_str(&format!("\n{}\n", rule()));
    out.push_str("SIMPLE URL LIST (for easy copying):\n");
    out.push_str(&format!("{}\n\n", rule()));
    for link in &page.links {
        out.push_str(&link.url);
        out.push('\n');
    }

    out
}

/// Render the multi-page text dump
pub fn render_text(dump: &TextDump) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "EXTRACTED CONTENT FROM {} URLs (ENHANCED EXTRACTION)\n",
        dump.pages.len()
    ));
    out.push_str(&format!("Generated on: {}\n", dump.generated));
    out.push_str(&format!(
        "Processing time: {:.2} seconds\n",
        dump.processing_seconds
    ));
    out.push_str(&format!(
        "Total content: {} characters\n",
        thousands(dump.total_characters)
    ));
    out.push_str(&format!("{}\n\n", rule()));

    for page in &dump.pages {
        out.push_str(&format!("\n{}\n", rule()));
        out.push_str(&format!("URL: {}\n", page.url));
        out.push_str(&format!("Processed on: {}\n", page.timestamp));
        out.push_str(&format!(
            "Content length: {} characters\n",
            thousands(page.length)
        ));
        out.push_str(&format!("{}\n\n", rule()));
        out.push_str(&page.content);
        out.push_str("\n\n");
    }

    out
}

/// Serialize `value` as json or yaml
///
/// Text reports have their own renderers and are rejected here.
pub fn serialize<T: Serialize>(value: &T, format: Format) -> Result<String> {
    Ok(match format {
        Format::Json => serde_json::to_string_pretty(value)?,
        Format::Yaml => serde_yaml::to_string(value)?,
        Format::Text => bail!("Text reports are rendered, not serialized"),
    })
}

/// Write a report to disk
pub async fn write_report(path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write report: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(index: usize, url: &str, text: &str, title: &str) -> LinkRecord {
        LinkRecord {
            index,
            url: url.to_string(),
            text: text.to_string(),
            title: title.to_string(),
        }
    }

    fn page(links: Vec<LinkRecord>, error: Option<&str>) -> LinkPage {
        LinkPage {
            url: "https://site.test/blog".to_string(),
            total_links: links.len(),
            links,
            timestamp: "10/19/2026, 9:30:00 AM".to_string(),
            error: error.map(String::from),
        }
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://www.site.test/a"), "www.site.test");
        assert_eq!(domain_of("tel:+15550100"), "other");
        assert_eq!(domain_of("not a url"), "other");
    }

    #[test]
    fn test_render_links_groups_by_sorted_domain() {
        let report = render_links(
            &page(
                vec![
                    link(1, "https://zeta.test/1", "Zeta", ""),
                    link(2, "https://alpha.test/1", "", "Alpha title"),
                    link(3, "https://zeta.test/2", "", ""),
                ],
                None,
            ),
            Duration::from_millis(1500),
        );

        assert!(report.starts_with("EXTRACTED LINKS FROM: https://site.test/blog\n"));
        assert!(report.contains("Processing time: 1.50 seconds\n"));
        assert!(report.contains("Total unique links: 3\n"));

        let alpha = report.find("--- LINKS FROM: alpha.test (1 links) ---").unwrap();
        let zeta = report.find("--- LINKS FROM: zeta.test (2 links) ---").unwrap();
        assert!(alpha < zeta);
        assert!(report.contains("1. https://zeta.test/1\n   Text: Zeta\n\n2. https://zeta.test/2\n\n"));
        assert!(report.contains("   Title: Alpha title\n"));

        let list = report.split("SIMPLE URL LIST (for easy copying):\n").nth(1).unwrap();
        assert!(list.ends_with(
            "https://zeta.test/1\nhttps://alpha.test/1\nhttps://zeta.test/2\n"
        ));
    }

    #[test]
    fn test_render_links_error_and_empty() {
        let report = render_links(
            &page(vec![], Some("Navigation timeout of 45000 ms exceeded")),
            Duration::from_secs(45),
        );
        assert!(report.contains("Total unique links: 0\n"));
        assert!(report.contains("ERROR: Navigation timeout of 45000 ms exceeded\n\n"));
        assert!(report.ends_with("No links found on this page.\n"));
        assert!(!report.contains("SIMPLE URL LIST"));
    }

    #[test]
    fn test_render_text() {
        let pages = vec![
            PageTextRecord {
                url: "https://a.test".to_string(),
                content: "Hello world".to_string(),
                length: 11,
                timestamp: "ts-a".to_string(),
                index: 0,
                error: None,
            },
            PageTextRecord {
                url: "https://b.test".to_string(),
                content: "x".repeat(1200),
                length: 1200,
                timestamp: "ts-b".to_string(),
                index: 1,
                error: None,
            },
        ];
        let dump = TextDump::new(pages, "now".to_string(), Duration::from_millis(2345));
        assert_eq!(dump.total_characters, 1211);

        let report = render_text(&dump);
        assert!(report.starts_with("EXTRACTED CONTENT FROM 2 URLs (ENHANCED EXTRACTION)\n"));
        assert!(report.contains("Processing time: 2.35 seconds\n") || report.contains("Processing time: 2.34 seconds\n"));
        assert!(report.contains("Total content: 1,211 characters\n"));
        assert!(report.contains("URL: https://a.test\nProcessed on: ts-a\nContent length: 11 characters\n"));
        assert!(report.contains("Content length: 1,200 characters\n"));
        assert!(report.find("https://a.test").unwrap() < report.find("https://b.test").unwrap());
    }

    #[test]
    fn test_serialize_formats() {
        let p = page(vec![link(1, "https://a.test/", "A", "")], None);
        let json = serialize(&p, Format::Json).unwrap();
        assert!(json.contains("\"totalLinks\": 1"));
        let yaml = serialize(&p, Format::Yaml).unwrap();
        assert!(yaml.contains("totalLinks: 1"));
    }

    #[test]
    fn test_serialize_rejects_text() {
        let p = page(vec![], None);
        let err = serialize(&p, Format::Text).unwrap_err();
        assert!(err.to_string().contains("not serialized"));
    }

    #[tokio::test]
    async fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_report(&path, "hello\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
