//! Headless Chrome browser management via chromiumoxide
//!
//! The pipeline only talks to a page through [`Tab`] and opens pages through
//! [`TabSource`]; [`BrowserSession`] and [`BrowserPage`] are the CDP-backed
//! implementations.

use crate::error::PageError;
use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use clap::Args;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const VIEWPORT_WIDTH: i64 = 1920;
const VIEWPORT_HEIGHT: i64 = 1080;

/// Quiet window used after navigation to approximate "network idle"
const NETWORK_QUIET: Duration = Duration::from_millis(500);

/// Longest a single settle script may run. Pages that never stop mutating
/// resolve here instead of holding a CDP command open.
pub const SETTLE_CAP: Duration = Duration::from_secs(10);

/// Headroom between the longest wait we issue and the CDP command timeout
const COMMAND_MARGIN: Duration = Duration::from_secs(10);

/// Browser flags shared by every launch
const BASE_ARGS: &[&str] = &[
    "--disable-setuid-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--disable-web-security",
    "--disable-features=VizDisplayCompositor",
];

#[derive(Args, Debug, Clone)]
pub struct BrowserArgs {
    /// Navigation timeout per URL in milliseconds
    #[arg(long, env = "PAGEDUMP_TIMEOUT", default_value = "45000")]
    pub timeout: u64,

    /// Run Chrome with a visible window
    #[arg(long)]
    pub headed: bool,

    /// Keep the browser open this many seconds before closing it
    #[arg(long, default_value = "0")]
    pub linger: u64,

    /// User agent sent with every request
    #[arg(long, env = "PAGEDUMP_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Path to the Chrome/Chromium executable
    #[arg(long, env = "CHROME")]
    pub chrome: Option<PathBuf>,
}

/// Browser launch configuration
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub headed: bool,
    pub user_agent: String,
    pub chrome: Option<PathBuf>,
    /// Navigation timeout the session will be driven with
    pub navigation_timeout: Duration,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headed: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chrome: None,
            navigation_timeout: Duration::from_millis(45000),
        }
    }
}

impl From<&BrowserArgs> for LaunchConfig {
    fn from(args: &BrowserArgs) -> Self {
        Self {
            headed: args.headed,
            user_agent: args.user_agent.clone(),
            chrome: args.chrome.clone(),
            navigation_timeout: Duration::from_millis(args.timeout),
        }
    }
}

impl LaunchConfig {
    /// Extra command-line flags passed to Chrome
    pub fn chrome_args(&self) -> Vec<&'static str> {
        let mut args = BASE_ARGS.to_vec();
        args.push(if self.headed {
            "--start-maximized"
        } else {
            "--headless=new"
        });
        args
    }

    /// CDP command timeout: outlasts both the navigation timeout and the
    /// longest settle script, so our own deadlines always fire first
    pub fn command_timeout(&self) -> Duration {
        self.navigation_timeout.max(SETTLE_CAP) + COMMAND_MARGIN
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.command_timeout());
        let builder = if self.headed {
            builder.with_head()
        } else {
            builder
        };
        let builder = match &self.chrome {
            Some(chrome) => builder.chrome_executable(chrome),
            None => builder,
        };

        self.chrome_args()
            .into_iter()
            .fold(builder, |builder, arg| builder.arg(arg))
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid browser configuration: {}", e))
    }
}

/// Time left for the post-load settle, capped at [`SETTLE_CAP`]
///
/// Fails with a timeout once `elapsed` has used up the navigation budget.
pub fn settle_budget(timeout: Duration, elapsed: Duration) -> Result<Duration, PageError> {
    let remaining = timeout.saturating_sub(elapsed);
    if remaining.is_zero() {
        return Err(PageError::Timeout(timeout.as_millis() as u64));
    }
    Ok(remaining.min(SETTLE_CAP))
}

/// A CDP-level timeout during `goto` is still a navigation timeout
fn goto_error(error: CdpError, timeout: Duration) -> PageError {
    match error {
        CdpError::Timeout => PageError::Timeout(timeout.as_millis() as u64),
        other => PageError::navigation(other.to_string()),
    }
}

/// The page operations the extraction pipeline needs
#[allow(async_fn_in_trait)]
pub trait Tab {
    /// Load `url` and wait for the network to go quiet, all within `timeout`
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError>;

    /// Evaluate a script (promises are awaited) and deserialize its value
    async fn evaluate<T: DeserializeOwned>(&self, script: &str) -> Result<T, PageError>;

    /// Wait until neither the DOM nor the network changed for `quiet`,
    /// giving up after `max_wait`
    async fn settle(&self, quiet: Duration, max_wait: Duration) -> Result<(), PageError>;

    async fn scroll_height(&self) -> Result<u64, PageError>;

    async fn scroll_to(&self, y: u64) -> Result<(), PageError>;

    /// Serialized DOM of the page in its current state
    async fn html(&self) -> Result<String, PageError>;

    /// Current URL (after redirects)
    async fn location(&self) -> Option<String>;

    async fn close(self);
}

/// Something that can open fresh tabs
#[allow(async_fn_in_trait)]
pub trait TabSource {
    type Tab: Tab;

    async fn open(&self) -> Result<Self::Tab, PageError>;
}

/// A running browser process
pub struct BrowserSession {
    browser: Browser,
    user_agent: String,
}

impl BrowserSession {
    /// Launch Chrome with the given configuration
    pub async fn launch(config: &LaunchConfig) -> Result<Self> {
        let (browser, mut handler) = Browser::launch(config.browser_config()?)
            .await
            .context("Could not start Chrome; pass --chrome or set CHROME to its path")?;

        // CDP events only flow while the handler is polled
        tokio::spawn(async move { while handler.next().await.is_some() {} });

        log::debug!(
            "Browser launched ({}, command timeout {} s)",
            if config.headed { "headed" } else { "headless" },
            config.command_timeout().as_secs()
        );

        Ok(Self {
            browser,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Close the browser, optionally keeping it open for `linger` first
    pub async fn close(mut self, linger: Duration) -> Result<()> {
        if !linger.is_zero() {
            log::info!("Keeping browser open for {} seconds...", linger.as_secs());
            tokio::time::sleep(linger).await;
        }
        self.browser.close().await?;
        log::info!("Browser closed");
        Ok(())
    }
}

impl TabSource for BrowserSession {
    type Tab = BrowserPage;

    async fn open(&self) -> Result<BrowserPage, PageError> {
        let page = self.browser.new_page("about:blank").await?;

        page.execute(SetUserAgentOverrideParams::new(self.user_agent.as_str()))
            .await?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            VIEWPORT_WIDTH,
            VIEWPORT_HEIGHT,
            1.0,
            false,
        ))
        .await?;

        Ok(BrowserPage { page })
    }
}

/// A single browser tab
pub struct BrowserPage {
    page: Page,
}

impl Tab for BrowserPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError> {
        let started = Instant::now();

        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(goto_error(e, timeout)),
            Err(_) => return Err(PageError::Timeout(timeout.as_millis() as u64)),
        }

        let budget = settle_budget(timeout, started.elapsed())?;
        self.settle(NETWORK_QUIET, budget).await
    }

    async fn evaluate<T: DeserializeOwned>(&self, script: &str) -> Result<T, PageError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(PageError::Evaluation)?;

        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| PageError::Evaluation(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| PageError::Evaluation(e.to_string()))
    }

    async fn settle(&self, quiet: Duration, max_wait: Duration) -> Result<(), PageError> {
        let max_wait = max_wait.min(SETTLE_CAP);
        let waited: u64 = self.evaluate(&settle_script(quiet, max_wait)).await?;
        log::trace!("Page settled after {} ms", waited);
        Ok(())
    }

    async fn scroll_height(&self) -> Result<u64, PageError> {
        self.evaluate(
            "document.body ? document.body.scrollHeight : document.documentElement.scrollHeight",
        )
        .await
    }

    async fn scroll_to(&self, y: u64) -> Result<(), PageError> {
        let _: bool = self
            .evaluate(&format!("window.scrollTo(0, {}), true", y))
            .await?;
        Ok(())
    }

    async fn html(&self) -> Result<String, PageError> {
        Ok(self.page.content().await?)
    }

    async fn location(&self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    async fn close(self) {
        if let Err(e) = self.page.close().await {
            log::debug!("Failed to close tab: {}", e);
        }
    }
}

/// Script resolving once the page has been quiet for `quiet`, or after
/// `max_wait`; it yields the number of milliseconds waited.
///
/// Quiet means no DOM mutation and no new resource timing entry.
pub fn settle_script(quiet: Duration, max_wait: Duration) -> String {
    format!(
        r#"new Promise(resolve => {{
    const quiet = {quiet};
    const maxWait = {max_wait};
    const start = performance.now();
    let last = start;
    let resources = performance.getEntriesByType('resource').length;
    const observer = new MutationObserver(() => {{ last = performance.now(); }});
    observer.observe(document.documentElement || document, {{
        childList: true, subtree: true, attributes: true, characterData: true
    }});
    const tick = () => {{
        const now = performance.now();
        const seen = performance.getEntriesByType('resource').length;
        if (seen !== resources) {{ resources = seen; last = now; }}
        if (now - last >= quiet || now - start >= maxWait) {{
            observer.disconnect();
            resolve(Math.round(now - start));
        }} else {{
            setTimeout(tick, 50);
        }}
    }};
    setTimeout(tick, 50);
}})"#,
        quiet = quiet.as_millis(),
        max_wait = max_wait.as_millis(),
    )
}
