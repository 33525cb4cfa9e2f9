//! Page fetching with escalating strategies
//!
//! This module retrieves raw HTML for a URL using one of three strategies:
//! - Plain HTTP GET (fast, most likely to be blocked)
//! - Anti-bot HTTP client (browser-like headers, cookie jar, challenge retry)
//! - Headless-browser render (JavaScript content, persisted session state)
//!
//! Failures are data: every fetch returns a [`FetchResult`] whose status says
//! how it ended. Nothing in here returns an error to the caller.

mod antibot;
pub mod browser;
#[cfg(feature = "headless")]
mod chromium;
mod http;
mod resolver;

pub use antibot::AntiBotClient;
pub use browser::{BrowserLauncher, BrowserPage, RenderError, RenderOptions, SessionState};
#[cfg(feature = "headless")]
pub use chromium::ChromiumLauncher;
pub use http::{build_plain_client, looks_like_challenge};
pub use resolver::FetchResolver;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// A method of retrieving a page's HTML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Plain HTTP GET
    Plain,
    /// HTTP client that imitates a browser and retries bot challenges
    AntiBot,
    /// Headless-browser render
    Browser,
}

impl Strategy {
    /// Stable lowercase name, used as the record's source tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::AntiBot => "antibot",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    /// Accepts the canonical names and the historical tool names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "requests" | "http" => Ok(Self::Plain),
            "antibot" | "anti-bot" | "cloudscraper" => Ok(Self::AntiBot),
            "browser" | "headless" | "playwright" => Ok(Self::Browser),
            other => Err(format!("unknown fetch strategy '{}'", other)),
        }
    }
}

/// How a fetch attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    Ok,
    /// Anti-bot block, challenge page, or rate limit
    Blocked,
    TimedOut,
    Error,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Blocked => "blocked",
            Self::TimedOut => "timed-out",
            Self::Error => "error",
        }
    }
}

/// A failed attempt, before it is folded into a [`FetchResult`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub status: FetchStatus,
    pub message: String,
}

impl FetchFailure {
    pub fn new(status: FetchStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// One strategy tried for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: Strategy,
    pub status: FetchStatus,
    /// Failure description; `None` for successful attempts
    pub message: Option<String>,
}

/// Outcome of fetching one URL
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The URL that was requested
    pub url: String,

    /// Page HTML; empty unless `status` is `Ok`
    pub html: String,

    /// Strategy of the last attempt made
    pub strategy_used: Strategy,

    pub status: FetchStatus,

    /// Every attempt in the order it was made
    pub attempts: Vec<Attempt>,
}

impl FetchResult {
    /// Returns true if HTML was retrieved
    pub fn is_ok(&self) -> bool {
        self.status == FetchStatus::Ok
    }

    /// Description of the last failure, if any
    pub fn error_message(&self) -> Option<&str> {
        self.attempts.last().and_then(|a| a.message.as_deref())
    }

    /// Builds a successful single-attempt result
    pub fn ok(url: &str, html: String, strategy: Strategy) -> Self {
        Self {
            url: url.to_string(),
            html,
            strategy_used: strategy,
            status: FetchStatus::Ok,
            attempts: vec![Attempt {
                strategy,
                status: FetchStatus::Ok,
                message: None,
            }],
        }
    }

    /// Builds a failed single-attempt result
    pub fn failed(url: &str, strategy: Strategy, failure: FetchFailure) -> Self {
        Self {
            url: url.to_string(),
            html: String::new(),
            strategy_used: strategy,
            status: failure.status,
            attempts: vec![Attempt {
                strategy,
                status: failure.status,
                message: Some(failure.message),
            }],
        }
    }
}

/// Retrieves pages for the crawler and the aggregation controller
///
/// [`FetchResolver`] is the production implementation; tests substitute
/// fixtures keyed by URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` with `strategy`, escalating on failure
    async fn fetch(&self, url: &str, strategy: Strategy) -> FetchResult;

    /// Fetches an archived rendering of `url`, if an archive is configured
    async fn fetch_archived(&self, _url: &str) -> Option<FetchResult> {
        None
    }

    /// Fetches a JSON document from a site's public read API
    async fn fetch_json(&self, _url: &str) -> Option<serde_json::Value> {
        None
    }
}
