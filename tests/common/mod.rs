//! In-memory stand-in for a browser, for driving the pipeline without Chrome

use pagedump::{settle_budget, PageError, Tab, TabSource};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How a fake page behaves
#[derive(Clone, Default)]
pub struct FakePage {
    pub html: String,
    pub rendered: String,
    pub height: u64,
    /// Scrolling to at least `.0` grows the page to `.1`
    pub grow_at: Option<(u64, u64)>,
    pub delay: Duration,
    pub times_out: bool,
}

impl FakePage {
    pub fn html(html: &str) -> Self {
        Self {
            html: html.to_string(),
            height: 600,
            ..Self::default()
        }
    }
}

/// A set of fake pages keyed by URL; opens [`FakeTab`]s
#[derive(Clone, Default)]
pub struct FakeSite {
    pages: Arc<HashMap<String, FakePage>>,
    pub finished: Arc<Mutex<Vec<String>>>,
}

impl FakeSite {
    pub fn new(pages: Vec<(&str, FakePage)>) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(url, page)| (url.to_string(), page))
                    .collect(),
            ),
            finished: Arc::default(),
        }
    }

    pub fn tab(&self) -> FakeTab {
        FakeTab {
            site: self.clone(),
            current: Mutex::new(None),
            height: Mutex::new(0),
            scrolls: Mutex::new(Vec::new()),
            settles: Mutex::new(Vec::new()),
        }
    }
}

impl TabSource for FakeSite {
    type Tab = FakeTab;

    async fn open(&self) -> Result<FakeTab, PageError> {
        Ok(self.tab())
    }
}

pub struct FakeTab {
    site: FakeSite,
    current: Mutex<Option<(String, FakePage)>>,
    height: Mutex<u64>,
    pub scrolls: Mutex<Vec<u64>>,
    /// `max_wait` of every settle call, in order
    pub settles: Mutex<Vec<Duration>>,
}

impl FakeTab {
    fn page(&self) -> Result<(String, FakePage), PageError> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PageError::Browser("no page loaded".to_string()))
    }

    pub fn scroll_log(&self) -> Vec<u64> {
        self.scrolls.lock().unwrap().clone()
    }

    pub fn settle_log(&self) -> Vec<Duration> {
        self.settles.lock().unwrap().clone()
    }
}

impl Tab for FakeTab {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError> {
        let started = Instant::now();
        let page = self
            .site
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| PageError::navigation("net::ERR_NAME_NOT_RESOLVED"))?;

        tokio::time::sleep(page.delay).await;
        if page.times_out {
            return Err(PageError::Timeout(timeout.as_millis() as u64));
        }

        // A slow load eats the budget of the network-quiet wait
        let budget = settle_budget(timeout, started.elapsed())?;

        *self.height.lock().unwrap() = page.height;
        *self.current.lock().unwrap() = Some((url.to_string(), page));
        self.settle(Duration::from_millis(500), budget).await
    }

    async fn evaluate<T: DeserializeOwned>(&self, _script: &str) -> Result<T, PageError> {
        let (_, page) = self.page()?;
        serde_json::from_value(serde_json::Value::String(page.rendered))
            .map_err(|e| PageError::Evaluation(e.to_string()))
    }

    async fn settle(&self, _quiet: Duration, max_wait: Duration) -> Result<(), PageError> {
        self.settles.lock().unwrap().push(max_wait);
        Ok(())
    }

    async fn scroll_height(&self) -> Result<u64, PageError> {
        Ok(*self.height.lock().unwrap())
    }

    async fn scroll_to(&self, y: u64) -> Result<(), PageError> {
        let (_, page) = self.page()?;
        self.scrolls.lock().unwrap().push(y);
        if let Some((threshold, grown)) = page.grow_at {
            let mut height = self.height.lock().unwrap();
            if y >= threshold && *height < grown {
                *height = grown;
            }
        }
        Ok(())
    }

    async fn html(&self) -> Result<String, PageError> {
        let (url, page) = self.page()?;
        self.site.finished.lock().unwrap().push(url);
        Ok(page.html)
    }

    async fn location(&self) -> Option<String> {
        self.page().ok().map(|(url, _)| url)
    }

    async fn close(self) {}
}
