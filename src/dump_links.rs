//! links command: Dump every anchor link of one page
//!
//! Output is a link report grouped by hostname, followed by a flat URL list.

use crate::browser::{BrowserArgs, BrowserSession, LaunchConfig, Tab, TabSource};
use crate::harvest::{harvest_links, timestamp, HarvestConfig, LinkPage};
use crate::report::{render_links, serialize, write_report, Format};
use crate::reveal::{RevealArgs, RevealConfig};
use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Args)]
pub struct DumpLinksArgs {
    /// Page to extract links from
    #[arg(value_name = "URL")]
    pub url: String,

    /// Report file
    #[arg(short, long, default_value = "extracted_links.txt")]
    pub output: PathBuf,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    #[command(flatten)]
    pub browser: BrowserArgs,

    #[command(flatten)]
    pub reveal: RevealArgs,
}

/// Run the links command
pub async fn run_dump_links(args: DumpLinksArgs) -> Result<()> {
    let url = args.url.trim();
    if url.is_empty() {
        bail!("No URL provided.");
    }

    log::info!("Extracting links from: {}", url);

    let config = HarvestConfig {
        timeout: Duration::from_millis(args.browser.timeout),
        reveal: RevealConfig::from(&args.reveal),
    };

    let session = BrowserSession::launch(&LaunchConfig::from(&args.browser)).await?;

    let started = Instant::now();
    let page = dump_links(&session, url, &config).await;
    let elapsed = started.elapsed();

    log::info!(
        "Link extraction completed in {:.2} seconds",
        elapsed.as_secs_f64()
    );
    log::info!("Total unique links found: {}", page.total_links);

    let contents = match args.format {
        Format::Text => render_links(&page, elapsed),
        format => serialize(&page, format)?,
    };
    let written = write_report(&args.output, &contents).await;

    session
        .close(Duration::from_secs(args.browser.linger))
        .await?;

    written?;
    log::info!("All links saved to: {}", args.output.display());

    Ok(())
}

/// Open a tab, extract the links of `url`, close the tab
pub async fn dump_links<S: TabSource>(source: &S, url: &str, config: &HarvestConfig) -> LinkPage {
    match source.open().await {
        Ok(tab) => {
            let page = harvest_links(&tab, url, config).await;
            tab.close().await;
            page
        }
        Err(e) => {
            log::error!("Failed to open tab for {}: {}", url, e);
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
