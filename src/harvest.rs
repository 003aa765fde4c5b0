//! Per-page pipeline: navigate, reveal, extract
//!
//! The entry points never fail. A page that cannot be processed comes back
//! as a placeholder record carrying the error message.

use crate::browser::{Tab, TabSource};
use crate::error::PageError;
use crate::extract::{compose_text, extract_links, LinkRecord, PREPARE_TEXT_SCRIPT};
use crate::reveal::{reveal, RevealConfig, RevealSummary};
use chrono::Local;
use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;

/// Settle bounds applied right after navigation, before revealing
const POST_LOAD_QUIET: Duration = Duration::from_millis(1000);
const POST_LOAD_MAX: Duration = Duration::from_millis(3000);

/// Configuration shared by both extraction modes
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub timeout: Duration,
    pub reveal: RevealConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(45000),
            reveal: RevealConfig::default(),
        }
    }
}

/// Links found on one page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPage {
    pub url: String,
    pub links: Vec<LinkRecord>,
    pub timestamp: String,
    pub total_links: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cleaned text of one page
#[derive(Debug, Clone, Serialize)]
pub struct PageTextRecord {
    pub url: String,
    pub content: String,
    pub length: usize,
    pub timestamp: String,
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageTextRecord {
    fn failed(index: usize, url: &str, error: &PageError) -> Self {
        Self {
            url: url.to_string(),
            content: format!("Error extracting content from {}: {}", url, error),
            length: 0,
            timestamp: timestamp(),
            index,
            error: Some(error.to_string()),
        }
    }
}

/// Local time in the `M/D/YYYY, h:mm:ss AM` form used in reports
pub fn timestamp() -> String {
    Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// Extract the links of `url` using an already open tab
pub async fn harvest_links<T: Tab>(tab: &T, url: &str, config: &HarvestConfig) -> LinkPage {
    log::info!("Visiting: {}", url);

    match collect_links(tab, url, config).await {
        Ok(links) => {
            log::info!("Found {} unique links", links.len());
            LinkPage {
                url: url.to_string(),
                total_links: links.len(),
                links,
                timestamp: timestamp(),
                error: None,
            }
        }
        Err(e) => {
            log::error!("Error extracting links from {}: {}", url, e);
            LinkPage {
                url: url.to_string(),
                links: Vec::new(),
                timestamp: timestamp(),
                total_links: 0,
                error: Some(e.to_string()),
            }
        }
    }
}

async fn collect_links<T: Tab>(
    tab: &T,
    url: &str,
    config: &HarvestConfig,
) -> Result<Vec<LinkRecord>, PageError> {
    load(tab, url, config).await?;
    let html = tab.html().await?;
    let base = tab.location().await.unwrap_or_else(|| url.to_string());
    Ok(extract_links(&html, &base))
}

/// Extract the text of `url` using an already open tab
pub async fn harvest_text<T: Tab>(
    tab: &T,
    index: usize,
    url: &str,
    config: &HarvestConfig,
) -> PageTextRecord {
    log::info!("[{}] Starting: {}", index + 1, url);

    match collect_text(tab, url, config).await {
        Ok(content) => {
            let length = content.chars().count();
            log::info!("[{}] Completed: {} ({} characters)", index + 1, url, length);
            PageTextRecord {
                url: url.to_string(),
                content,
                length,
                timestamp: timestamp(),
                index,
                error: None,
            }
        }
        Err(e) => {
            log::error!("[{}] Error extracting text from {}: {}", index + 1, url, e);
            PageTextRecord::failed(index, url, &e)
        }
    }
}

async fn collect_text<T: Tab>(
    tab: &T,
    url: &str,
    config: &HarvestConfig,
) -> Result<String, PageError> {
    load(tab, url, config).await?;
    let rendered: String = tab.evaluate(PREPARE_TEXT_SCRIPT).await?;
    let html = tab.html().await?;
    Ok(compose_text(&rendered, &html))
}

/// Navigate, let the page settle, then run the reveal pass if enabled
///
/// Returns what the reveal pass saw, or `None` when revealing is off.
pub async fn load<T: Tab>(
    tab: &T,
    url: &str,
    config: &HarvestConfig,
) -> Result<Option<RevealSummary>, PageError> {
    tab.navigate(url, config.timeout).await?;
    tab.settle(POST_LOAD_QUIET, POST_LOAD_MAX).await?;

    if !config.reveal.enabled {
        return Ok(None);
    }

    log::info!("Scrolling to trigger lazy loading...");
    let summary = reveal(tab, &config.reveal).await?;
    log::info!(
        "Revealed {}: {} scroll steps, grew {} times, {}px tall",
        url,
        summary.steps,
        summary.growths,
        summary.final_height
    );
    tab.settle(POST_LOAD_QUIET, POST_LOAD_MAX).await?;
    Ok(Some(summary))
}

/// Extract text from every URL at once, one tab each
///
/// All pages run concurrently with no cap. The result is in input order
/// whatever order the pages finish in.
pub async fn harvest_text_all<S: TabSource>(
    source: &S,
    urls: &[String],
    config: &HarvestConfig,
) -> Vec<PageTextRecord> {
    let tasks = urls.iter().enumerate().map(|(index, url)| async move {
        match source.open().await {
            Ok(tab) => {
                let record = harvest_text(&tab, index, url, config).await;
                tab.close().await;
                record
            }
            Err(e) => {
                log::error!("[{}] Failed to open tab for {}: {}", index + 1, url, e);
                PageTextRecord::failed(index, url, &e)
            }
        }
    });

    let mut results = join_all(tasks).await;
    results.sort_by_key(|r| r.index);
    results
}
