//! Anti-bot HTTP strategy
//!
//! Imitates a desktop browser closely enough to pass passive bot checks:
//! full browser header set, a persistent cookie jar, and one retry after a
//! challenge page so that clearance cookies set by the challenge are sent
//! back.

use super::http::{classify_error, classify_status, looks_like_challenge};
use super::{FetchFailure, FetchStatus};
use crate::config::FetchConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use std::time::Duration;

/// Headers a desktop Chrome sends on a top-level navigation
const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("sec-ch-ua", "\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\""),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "cross-site"),
    ("sec-fetch-user", "?1"),
    ("upgrade-insecure-requests", "1"),
];

/// HTTP client for sites behind passive anti-bot protection
pub struct AntiBotClient {
    client: Client,
    challenge_wait: Duration,
}

impl AntiBotClient {
    /// Builds the client from the fetch configuration
    ///
    /// The wait before retrying a challenge reuses the browser settle delay.
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }
        if let Ok(value) = HeaderValue::from_str(&config.referer) {
            headers.insert(REFERER, value);
        }
        for (name, value) in BROWSER_HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            challenge_wait: Duration::from_millis(config.settle_ms),
        })
    }

    /// Fetches a page, retrying once if a challenge is served
    pub async fn get_html(&self, url: &str) -> Result<String, FetchFailure> {
        match self.attempt(url).await {
            Err(failure) if failure.status == FetchStatus::Blocked => {
                tracing::debug!(
                    "Challenge on {} ({}), retrying after {:?}",
                    url,
                    failure.message,
                    self.challenge_wait
                );
                tokio::time::sleep(self.challenge_wait).await;
                self.attempt(url).await
            }
            other => other,
        }
    }

    async fn attempt(&self, url: &str) -> Result<String, FetchFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(&e))?;
        let status = response.status();

        // Challenge pages are often served as 403/503 with an HTML body
        let body = response.text().await.map_err(|e| classify_error(&e))?;

        if looks_like_challenge(&body) || (status.as_u16() == 503 && body.contains("cf-")) {
            return Err(FetchFailure::new(
                FetchStatus::Blocked,
                format!("challenge page (HTTP {})", status.as_u16()),
            ));
        }

        match classify_status(status) {
            FetchStatus::Ok => Ok(body),
            other => Err(FetchFailure::new(other, format!("HTTP {}", status.as_u16()))),
        }
    }
}
