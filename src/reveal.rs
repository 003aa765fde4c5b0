//! Scroll a page down, up and down again so lazy-loaded content renders
//!
//! Each scroll step waits for the page to settle (no DOM mutation and no
//! new network resource for a quiet window) instead of sleeping a fixed
//! amount. Best effort only: nothing guarantees all content has loaded.

use crate::browser::Tab;
use crate::error::PageError;
use clap::Args;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct RevealArgs {
    /// Skip the lazy-loading scroll pass
    #[arg(long)]
    pub no_reveal: bool,

    /// Scroll increment in pixels
    #[arg(long, default_value = "300", value_parser = clap::value_parser!(u64).range(1..))]
    pub scroll_step: u64,

    /// Quiet window (ms) after which a scroll step counts as settled
    #[arg(long, default_value = "500")]
    pub settle_quiet: u64,

    /// Upper bound (ms) on the wait after each scroll step
    #[arg(long, default_value = "3000")]
    pub settle_max: u64,
}

/// Revealer configuration
#[derive(Debug, Clone)]
pub struct RevealConfig {
    pub enabled: bool,
    pub step_px: u64,
    pub quiet: Duration,
    pub max_wait: Duration,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            step_px: 300,
            quiet: Duration::from_millis(500),
            max_wait: Duration::from_millis(3000),
        }
    }
}

impl From<&RevealArgs> for RevealConfig {
    fn from(args: &RevealArgs) -> Self {
        Self {
            enabled: !args.no_reveal,
            step_px: args.scroll_step.max(1),
            quiet: Duration::from_millis(args.settle_quiet),
            max_wait: Duration::from_millis(args.settle_max),
        }
    }
}

/// What a reveal pass observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealSummary {
    pub steps: usize,
    pub growths: usize,
    pub final_height: u64,
}

/// Run the scroll sequence on `tab`
pub async fn reveal<T: Tab>(tab: &T, config: &RevealConfig) -> Result<RevealSummary, PageError> {
    let step = config.step_px.max(1);
    let mut summary = RevealSummary::default();

    // Slow pass down; the bound moves if the page grows underneath us
    let mut bound = tab.scroll_height().await?;
    log::debug!("Revealing page of {}px", bound);
    let mut y = 0;
    while y < bound {
        scroll_and_settle(tab, y, config, &mut summary).await?;
        let height = tab.scroll_height().await?;
        if height > bound {
            log::debug!("New content: height {}px -> {}px", bound, height);
            bound = height;
            summary.growths += 1;
        }
        y += step;
    }

    let bottom = tab.scroll_height().await?;
    scroll_and_settle(tab, bottom, config, &mut summary).await?;

    // Back up, for content that loads when scrolled into view from below
    let mut y = tab.scroll_height().await?;
    loop {
        scroll_and_settle(tab, y, config, &mut summary).await?;
        if y < step {
            break;
        }
        y -= step;
    }

    let bottom = tab.scroll_height().await?;
    scroll_and_settle(tab, bottom, config, &mut summary).await?;
    scroll_and_settle(tab, 0, config, &mut summary).await?;

    summary.final_height = tab.scroll_height().await?;
    log::debug!(
        "Reveal done: {} steps, {} growths, final height {}px",
        summary.steps,
        summary.growths,
        summary.final_height
    );
    Ok(summary)
}

async fn scroll_and_settle<T: Tab>(
    tab: &T,
    y: u64,
    config: &RevealConfig,
    summary: &mut RevealSummary,
) -> Result<(), PageError> {
    tab.scroll_to(y).await?;
    tab.settle(config.quiet, config.max_wait).await?;
    summary.steps += 1;
    Ok(())
}
