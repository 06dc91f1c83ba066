//! Browser capability consumed by the episode discoverers.
//!
//! The headless-browser engine itself is out of scope; adapters only need a
//! narrow surface: navigate, read the rendered document, click a control,
//! scroll. Every call tolerates "control not there" without aborting the
//! caller: listing pages drift and a missing load-more button just means no
//! more content is loadable.
//!
//! [`StaticBrowser`] is the plain-HTTP backend: good enough for listings
//! that render server-side. It reports clicks as not-found and scrolling as
//! a no-op, so the discoverer's stagnation rule terminates after two
//! evaluations. A script-capable engine can be plugged in behind the same
//! traits without touching the adapters.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Opens listing sessions. One session per show-run.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn BrowserPage>>;
}

/// One page session: sequential navigations, mutable view state.
#[async_trait]
pub trait BrowserPage: Send {
    /// Navigate the session to a new URL.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// The current rendered document.
    async fn html(&mut self) -> Result<String>;

    /// Click the first element matching `selector`. Returns `false` when the
    /// control is absent or the engine cannot interact with it; never errors
    /// for a missing control.
    async fn click(&mut self, selector: &str) -> Result<bool>;

    /// Trigger scroll-based lazy loading. No-op where unsupported.
    async fn scroll_to_bottom(&mut self) -> Result<()>;
}

/// Plain-HTTP browser backend over `reqwest`.
pub struct StaticBrowser {
    http: reqwest::Client,
}

impl StaticBrowser {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("polittalk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build browser HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Browser for StaticBrowser {
    async fn open(&self, url: &str) -> Result<Box<dyn BrowserPage>> {
        let mut page = StaticPage {
            http: self.http.clone(),
            body: String::new(),
        };
        page.goto(url).await?;
        Ok(Box::new(page))
    }
}

struct StaticPage {
    http: reqwest::Client,
    body: String,
}

#[async_trait]
impl BrowserPage for StaticPage {
    async fn goto(&mut self, url: &str) -> Result<()> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("navigation failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("navigation returned error status: {url}"))?;
        self.body = response.text().await.context("failed to read page body")?;
        debug!(url, bytes = self.body.len(), "navigated");
        Ok(())
    }

    async fn html(&mut self) -> Result<String> {
        Ok(self.body.clone())
    }

    async fn click(&mut self, selector: &str) -> Result<bool> {
        warn!(selector, "static backend cannot click; treating control as absent");
        Ok(false)
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        Ok(())
    }
}
