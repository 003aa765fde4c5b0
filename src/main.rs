//! pagedump CLI
//!
//! Renders pages in headless Chrome, scrolls them to trigger lazy loading,
//! and dumps their links or visible text to a flat file.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

use pagedump::dump_links::{run_dump_links, DumpLinksArgs};
use pagedump::dump_text::{run_dump_text, DumpTextArgs};

#[derive(Parser)]
#[command(name = "pagedump")]
#[command(version)]
#[command(about = "Dump the links or visible text of browser-rendered pages")]
#[command(long_about = "Renders pages in headless Chrome and scrolls them so lazy-loaded content appears.\n\nCommands:\n  links   Dump the anchor links of one page\n  text    Dump the visible text of several pages in parallel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump the anchor links of one page, grouped by hostname
    Links(DumpLinksArgs),
    /// Dump the visible text of several pages into one file
    Text(DumpTextArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Links(args) => run_dump_links(args).await,
        Commands::Text(args) => run_dump_text(args).await,
    }
}
