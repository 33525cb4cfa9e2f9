//! Headless-browser strategy
//!
//! The browser is reached through two small traits so that the render
//! sequence can be driven by the real Chromium backend (behind the
//! `headless` feature) or by a scripted page in tests.
//!
//! # Render sequence
//!
//! 1. Launch a browser session, restoring persisted cookies if any
//! 2. Navigate with a hard timeout
//! 3. Wait for the network to go idle (a timeout here is not an error)
//! 4. Sleep for the settle delay so client-side rendering can finish
//! 5. Read the rendered HTML
//! 6. Close the session, on success and on every failure path

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Failures of a single render
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation timed out after {0:?}")]
    Timeout(Duration),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("could not read page content: {0}")]
    Content(String),

    #[error("headless browser is not available")]
    Unavailable,
}

/// Timing knobs for one render
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub navigation_timeout: Duration,
    pub idle_timeout: Duration,
    pub settle: Duration,
}

impl RenderOptions {
    pub fn from_config(config: &crate::config::FetchConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_secs(config.browser_timeout_secs),
            idle_timeout: Duration::from_secs(config.network_idle_timeout_secs),
            settle: Duration::from_millis(config.settle_ms),
        }
    }
}

/// A cookie from a persisted browser session
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,

    #[serde(default = "default_cookie_path")]
    pub path: String,

    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,

    #[serde(default)]
    pub secure: bool,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

/// Persisted browser session state for one site
///
/// Read from the storage-state JSON format written by browser automation
/// tools: `{"cookies": [...], "origins": [...]}`. Only cookies are used.
/// The state is shared read-only between concurrent renders.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SessionState {
    #[serde(default)]
    pub cookies: Vec<SessionCookie>,
}

impl SessionState {
    /// Parses session state from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Loads session state from a file
    pub fn load(path: &Path) -> Result<Self, crate::HarvestError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }
}

/// Starts browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launches a fresh session with a single blank page
    async fn launch(&self, session: Option<&SessionState>)
        -> Result<Box<dyn BrowserPage>, RenderError>;
}

/// One page of a launched browser session
#[async_trait]
pub trait BrowserPage: Send {
    async fn goto(&mut self, url: &str) -> Result<(), RenderError>;

    /// Waits until the page stops loading, up to `timeout`
    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<(), RenderError>;

    async fn content(&mut self) -> Result<String, RenderError>;

    /// Closes the page and its browser session
    async fn close(self: Box<Self>);
}

/// Renders `url` and returns the final HTML
///
/// The session is closed before this returns, whatever the outcome.
pub async fn render(
    launcher: &dyn BrowserLauncher,
    url: &str,
    session: Option<&SessionState>,
    options: RenderOptions,
) -> Result<String, RenderError> {
    let mut page = launcher.launch(session).await?;
    let result = render_on(page.as_mut(), url, options).await;
    page.close().await;
    result
}

async fn render_on(
    page: &mut dyn BrowserPage,
    url: &str,
    options: RenderOptions,
) -> Result<String, RenderError> {
    match tokio::time::timeout(options.navigation_timeout, page.goto(url)).await {
        Ok(result) => result?,
        Err(_) => return Err(RenderError::Timeout(options.navigation_timeout)),
    }

    if let Err(e) = page.wait_for_network_idle(options.idle_timeout).await {
        tracing::debug!("Network never went idle on {}: {}", url, e);
    }

    tokio::time::sleep(options.settle).await;

    page.content().await
}

/// Consumes `events` until one satisfies `is_idle`, up to `timeout`
///
/// Returns `Ok(false)` when the stream ends without a match.
pub(crate) async fn wait_for_event<S, F>(
    mut events: S,
    timeout: Duration,
    mut is_idle: F,
) -> Result<bool, RenderError>
where
    S: Stream + Unpin,
    F: FnMut(&S::Item) -> bool,
{
    let matched = async {
        while let Some(event) = events.next().await {
            if is_idle(&event) {
                return true;
            }
        }
        false
    };

    tokio::time::timeout(timeout, matched)
        .await
        .map_err(|_| RenderError::Timeout(timeout))
}
