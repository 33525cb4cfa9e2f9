//! Strategy selection and escalation
//!
//! # Escalation
//!
//! | Requested | On failure |
//! |-----------|------------|
//! | Browser | fall back to Plain |
//! | AntiBot | fall back to Plain |
//! | Plain | none |
//!
//! The result status is the status of the last attempt made. Every attempt
//! is recorded in [`FetchResult::attempts`].

use super::browser::{self, BrowserLauncher, RenderOptions, SessionState};
use super::{
    http, AntiBotClient, Attempt, FetchFailure, FetchResult, FetchStatus, PageFetcher, Strategy,
};
use crate::config::FetchConfig;
use crate::url::{extract_domain, matches_domain_suffix};
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;

/// Production page fetcher
pub struct FetchResolver {
    plain: Client,
    antibot: AntiBotClient,
    browser: Option<Arc<dyn BrowserLauncher>>,
    sessions: Vec<(String, Arc<SessionState>)>,
    render_options: RenderOptions,
    force: Option<Strategy>,
    archive_template: Option<String>,
}

impl FetchResolver {
    /// Builds a resolver from the fetch configuration
    ///
    /// Session files that cannot be read are skipped with a warning. With the
    /// `headless` feature enabled and the browser not disabled, a Chromium
    /// launcher is installed.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built or if
    /// `force-strategy` names an unknown strategy.
    pub fn new(config: &FetchConfig) -> Result<Self, HarvestError> {
        let force = match &config.force_strategy {
            Some(name) => Some(
                name.parse::<Strategy>()
                    .map_err(crate::ConfigError::Validation)?,
            ),
            None => None,
        };

        let sessions = config
            .session
            .iter()
            .filter_map(|entry| match SessionState::load(Path::new(&entry.path)) {
                Ok(state) => {
                    tracing::debug!(
                        "Loaded {} session cookies for {}",
                        state.cookies.len(),
                        entry.domain
                    );
                    Some((entry.domain.to_lowercase(), Arc::new(state)))
                }
                Err(e) => {
                    tracing::warn!(
                        "Ignoring session state {} for {}: {}",
                        entry.path,
                        entry.domain,
                        e
                    );
                    None
                }
            })
            .collect();

        Ok(Self {
            plain: http::build_plain_client(config)?,
            antibot: AntiBotClient::new(config)?,
            browser: default_launcher(config),
            sessions,
            render_options: RenderOptions::from_config(config),
            force,
            archive_template: config.archive_url_template.clone(),
        })
    }

    /// Replaces the browser backend
    pub fn with_browser(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = Some(launcher);
        self
    }

    /// Disables the browser strategy; browser fetches fail and fall back
    pub fn without_browser(mut self) -> Self {
        self.browser = None;
        self
    }

    /// The strategy actually used for a request
    pub fn effective_strategy(&self, requested: Strategy) -> Strategy {
        self.force.unwrap_or(requested)
    }

    fn session_for(&self, url: &str) -> Option<&SessionState> {
        let host = extract_domain(url)?;
        self.sessions
            .iter()
            .find(|(domain, _)| matches_domain_suffix(domain, &host))
            .map(|(_, state)| state.as_ref())
    }

    async fn attempt(&self, url: &str, strategy: Strategy) -> Result<String, FetchFailure> {
        match strategy {
            Strategy::Plain => http::get_html(&self.plain, url).await,
            Strategy::AntiBot => self.antibot.get_html(url).await,
            Strategy::Browser => self.render(url).await,
        }
    }

    async fn render(&self, url: &str) -> Result<String, FetchFailure> {
        let Some(launcher) = &self.browser else {
            return Err(FetchFailure::new(
                FetchStatus::Error,
                browser::RenderError::Unavailable.to_string(),
            ));
        };

        let html = browser::render(
            launcher.as_ref(),
            url,
            self.session_for(url),
            self.render_options,
        )
        .await
        .map_err(|e| match e {
            browser::RenderError::Timeout(_) => FetchFailure::new(FetchStatus::TimedOut, e.to_string()),
            other => FetchFailure::new(FetchStatus::Error, other.to_string()),
        })?;

        if http::looks_like_challenge(&html) {
            return Err(FetchFailure::new(
                FetchStatus::Blocked,
                "bot-verification page rendered",
            ));
        }
        Ok(html)
    }
}

#[cfg(feature = "headless")]
fn default_launcher(config: &FetchConfig) -> Option<Arc<dyn BrowserLauncher>> {
    if !config.browser_enabled {
        return None;
    }
    Some(Arc::new(super::ChromiumLauncher::from_config(config)))
}

#[cfg(not(feature = "headless"))]
fn default_launcher(config: &FetchConfig) -> Option<Arc<dyn BrowserLauncher>> {
    if config.browser_enabled {
        tracing::debug!("Built without the headless feature; browser fetches will fall back");
    }
    None
}

#[async_trait]
impl PageFetcher for FetchResolver {
    async fn fetch(&self, url: &str, strategy: Strategy) -> FetchResult {
        let selected = self.effective_strategy(strategy);

        let failure = match self.attempt(url, selected).await {
            Ok(html) => return FetchResult::ok(url, html, selected),
            Err(failure) => failure,
        };

        tracing::debug!(
            "{} fetch of {} ended {}: {}",
            selected,
            url,
            failure.status.as_str(),
            failure.message
        );
        let mut result = FetchResult::failed(url, selected, failure);

        if selected == Strategy::Plain {
            return result;
        }

        let (status, html, message) = match self.attempt(url, Strategy::Plain).await {
            Ok(html) => (FetchStatus::Ok, html, None),
            Err(failure) => (failure.status, String::new(), Some(failure.message)),
        };
        result.attempts.push(Attempt {
            strategy: Strategy::Plain,
            status,
            message,
        });
        result.strategy_used = Strategy::Plain;
        result.status = status;
        result.html = html;

        if !result.is_ok() {
            tracing::info!("All fetch strategies failed for {}", url);
        }
        result
    }

    async fn fetch_archived(&self, url: &str) -> Option<FetchResult> {
        let template = self.archive_template.as_ref()?;
        let archive_url = fill_archive_template(template, url);

        tracing::debug!("Trying archived copy {}", archive_url);
        Some(match http::get_html(&self.plain, &archive_url).await {
            Ok(html) => FetchResult::ok(&archive_url, html, Strategy::Plain),
            Err(failure) => FetchResult::failed(&archive_url, Strategy::Plain, failure),
        })
    }

    async fn fetch_json(&self, url: &str) -> Option<serde_json::Value> {
        let response = match self.plain.get(url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!("JSON fetch of {} returned HTTP {}", url, r.status());
                return None;
            }
            Err(e) => {
                tracing::debug!("JSON fetch of {} failed: {}", url, e);
                return None;
            }
        };

        match response.json::<serde_json::Value>().await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("JSON body of {} unreadable: {}", url, e);
                None
            }
        }
    }
}

/// Fills `{url}` in an archive template with the percent-encoded target
fn fill_archive_template(template: &str, url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
    template.replace("{url}", &encoded)
}
