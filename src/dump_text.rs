//! text command: Dump the visible text of several pages into one file
//!
//! Every URL gets its own tab and all of them run at once.

use crate::browser::{BrowserArgs, BrowserSession, LaunchConfig};
use crate::harvest::{harvest_text_all, timestamp, HarvestConfig};
use crate::report::{render_text, serialize, thousands, write_report, Format, TextDump};
use crate::reveal::{RevealArgs, RevealConfig};
use anyhow::{bail, Context, Result};
use clap::Args;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Args)]
pub struct DumpTextArgs {
    /// Pages to extract text from
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Read URLs from a file (one per line, `#` starts a comment)
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Read URLs from stdin (one per line)
    #[arg(long)]
    pub stdin: bool,

    /// Report file
    #[arg(short, long, default_value = "all_extracted_content.txt")]
    pub output: PathBuf,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    #[command(flatten)]
    pub browser: BrowserArgs,

    #[command(flatten)]
    pub reveal: RevealArgs,
}

/// Run the text command
pub async fn run_dump_text(args: DumpTextArgs) -> Result<()> {
    let urls = get_urls(&args).await?;

    if urls.is_empty() {
        bail!("No URLs provided. Pass URLs as arguments, --file or --stdin.");
    }

    log::info!("Processing {} URLs in parallel...", urls.len());

    let config = HarvestConfig {
        timeout: Duration::from_millis(args.browser.timeout),
        reveal: RevealConfig::from(&args.reveal),
    };

    let session = BrowserSession::launch(&LaunchConfig::from(&args.browser)).await?;

    let started = Instant::now();
    let pages = harvest_text_all(&session, &urls, &config).await;
    let dump = TextDump::new(pages, timestamp(), started.elapsed());

    log::info!(
        "All {} URLs processed in {:.2} seconds",
        urls.len(),
        dump.processing_seconds
    );
    log::info!(
        "Total content extracted: {} characters (average {} per page)",
        thousands(dump.total_characters),
        thousands(dump.total_characters / urls.len())
    );

    let contents = match args.format {
        Format::Text => render_text(&dump),
        format => serialize(&dump, format)?,
    };
    let written = write_report(&args.output, &contents).await;

    session
        .close(Duration::from_secs(args.browser.linger))
        .await?;

    written?;
    log::info!("All content saved to: {}", args.output.display());

    Ok(())
}

/// Collect URLs from arguments, then --file, then --stdin
async fn get_urls(args: &DumpTextArgs) -> Result<Vec<String>> {
    let mut urls: Vec<String> = args
        .urls
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();

    if let Some(file) = &args.file {
        let content = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read URL list: {}", file.display()))?;
        urls.extend(parse_url_list(&content));
    }

    if args.stdin {
        let stdin = io::stdin();
        urls.extend(
            stdin
                .lock()
                .lines()
                .map_while(|line| line.ok())
                .map(|line| line.trim().to_string())
                .filter(|line| line.starts_with("http")),
        );
    }

    Ok(urls)
}

/// One URL per line; blank lines and `#` comments are skipped
fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
