//! Plain HTTP fetching and response classification

use super::{FetchFailure, FetchStatus};
use crate::config::FetchConfig;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Title fragments of bot-verification interstitials
const CHALLENGE_TITLE_MARKERS: &[&str] = &[
    "xác minh",
    "verify",
    "captcha",
    "just a moment",
    "attention required",
    "access denied",
];

lazy_static! {
    static ref TITLE_RE: Regex = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap();
}

/// Builds the client used by the plain strategy
///
/// Sends the configured user agent, accept-language and referer on every
/// request.
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_plain_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&config.referer) {
        headers.insert(REFERER, value);
    }

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps an HTTP status code to a fetch status
///
/// | Status | Result |
/// |--------|--------|
/// | 2xx | Ok |
/// | 403, 410, 429, 451 | Blocked |
/// | anything else | Error |
pub fn classify_status(status: StatusCode) -> FetchStatus {
    if status.is_success() {
        return FetchStatus::Ok;
    }

    match status.as_u16() {
        403 | 410 | 429 | 451 => FetchStatus::Blocked,
        _ => FetchStatus::Error,
    }
}

/// Maps a transport error to a fetch failure
pub fn classify_error(error: &reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::new(FetchStatus::TimedOut, format!("request timed out: {}", error))
    } else {
        FetchFailure::new(FetchStatus::Error, error.to_string())
    }
}

/// Extracts the document title with a cheap scan
pub fn page_title(html: &str) -> Option<String> {
    TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Returns true if the page is a bot-verification interstitial
///
/// # Examples
///
/// ```
/// use bds_harvest::fetch::looks_like_challenge;
///
/// assert!(looks_like_challenge("<title>Just a moment...</title>"));
/// assert!(looks_like_challenge("<title>Xác minh bạn không phải robot</title>"));
/// assert!(!looks_like_challenge("<title>Bán nhà quận 3</title>"));
/// ```
pub fn looks_like_challenge(html: &str) -> bool {
    let Some(title) = page_title(html) else {
        return false;
    };
    let title = title.to_lowercase();
    CHALLENGE_TITLE_MARKERS.iter().any(|m| title.contains(m))
}

/// Performs one GET and classifies the outcome
///
/// Blocking statuses, challenge pages, timeouts and transport errors all
/// come back as `Err` with the matching status.
pub async fn get_html(client: &Client, url: &str) -> Result<String, FetchFailure> {
    let response = client.get(url).send().await.map_err(|e| classify_error(&e))?;
    let status = response.status();

    match classify_status(status) {
        FetchStatus::Ok => {}
        other => return Err(FetchFailure::new(other, format!("HTTP {}", status.as_u16()))),
    }

    let body = response.text().await.map_err(|e| classify_error(&e))?;

    if looks_like_challenge(&body) {
        return Err(FetchFailure::new(
            FetchStatus::Blocked,
            "bot-verification page served",
        ));
    }

    Ok(body)
}
