//! Google Custom Search JSON API client
//!
//! # Pagination
//!
//! The API returns at most 10 items per request. Pages are requested with a
//! 1-based `start` cursor until enough unique URLs are collected, a page
//! comes back short or empty, or `max-pages` requests have been made.
//! No request ever reaches past result 100; an INVALID_ARGUMENT on a later
//! page is read as the end of the results.
//!
//! # Errors in the response body
//!
//! | Condition | Handling |
//! |-----------|----------|
//! | 400 invalid argument | retry once with a truncated query |
//! | any other `error` object | fatal, aborts the run |
//! | transport failure, unreadable body | stop, return what was collected |

use super::{truncate_query, SearchProvider};
use crate::config::SearchConfig;
use crate::url::canonicalize;
use crate::{HarvestError, SearchError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

/// Highest result index the API will serve (`start + num - 1`)
pub const RESULT_WINDOW: u32 = 100;

/// Custom Search response body
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,

    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u16,

    #[serde(default)]
    message: String,

    #[serde(default)]
    status: String,

    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}

impl ApiError {
    fn into_search_error(self) -> SearchError {
        let key_problem = self.message.to_lowercase().contains("api key")
            || self
                .errors
                .iter()
                .any(|e| e.reason.to_lowercase().contains("key"));
        let invalid_argument = self.code == 400
            && (self.status == "INVALID_ARGUMENT"
                || self.errors.iter().any(|e| e.reason == "invalid"));

        if invalid_argument && !key_problem {
            SearchError::InvalidQuery {
                message: self.message,
            }
        } else {
            SearchError::Fatal {
                code: self.code,
                message: self.message,
            }
        }
    }
}

/// Search provider backed by a Google Programmable Search Engine
pub struct GoogleSearch {
    client: Client,
    config: SearchConfig,
}

impl GoogleSearch {
    /// Creates a client for the configured search engine
    pub fn new(config: &SearchConfig) -> Result<Self, HarvestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Requests one result page starting at the 1-based `start` index
    async fn fetch_page(
        &self,
        query: &str,
        start: u32,
        num: u32,
        domain_scope: Option<&str>,
    ) -> Result<Vec<String>, SearchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("key", self.config.api_key.clone()),
            ("cx", self.config.engine_id.clone()),
            ("q", query.to_string()),
            ("num", num.to_string()),
            ("start", start.to_string()),
        ];
        if let Some(hl) = &self.config.interface_language {
            params.push(("hl", hl.clone()));
        }
        if let Some(gl) = &self.config.country {
            params.push(("gl", gl.clone()));
        }
        if let Some(lr) = &self.config.language {
            params.push(("lr", lr.clone()));
        }
        if let Some(site) = domain_scope {
            params.push(("siteSearch", site.to_string()));
            params.push(("siteSearchFilter", "i".to_string()));
        }

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: SearchResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(match status.as_u16() {
                    401 | 403 | 429 => SearchError::Fatal {
                        code: status.as_u16(),
                        message: format!("HTTP {}", status),
                    },
                    _ => SearchError::Decode(format!("HTTP {}: {}", status, e)),
                })
            }
        };

        if let Some(error) = parsed.error {
            return Err(error.into_search_error());
        }

        Ok(parsed.items.into_iter().map(|item| item.link).collect())
    }

    /// Pages through results for one query text, appending unique URLs
    async fn collect(
        &self,
        query: &str,
        want: usize,
        domain_scope: Option<&str>,
        seen: &mut HashSet<String>,
        results: &mut Vec<String>,
    ) -> Result<(), SearchError> {
        let page_size = self.config.page_size.clamp(1, 10);

        for page in 0..self.config.max_pages {
            if results.len() >= want {
                break;
            }

            let start = 1 + page * page_size;
            if start + page_size - 1 > RESULT_WINDOW {
                tracing::debug!("Search for '{}' reached the API result window", query);
                break;
            }

            let links = match self.fetch_page(query, start, page_size, domain_scope).await {
                Ok(links) => links,
                // Past the first page the query itself was accepted
                Err(SearchError::InvalidQuery { message }) if page > 0 => {
                    tracing::debug!(
                        "Search for '{}' stopped at page {}: {}",
                        query,
                        page + 1,
                        message
                    );
                    break;
                }
                Err(e) => return Err(e),
            };
            let returned = links.len();
            tracing::debug!(
                "Search page {} for '{}' (scope {:?}) returned {} items",
                page + 1,
                query,
                domain_scope,
                returned
            );

            for link in links {
                let canonical = canonicalize(&link, None);
                if seen.insert(canonical.clone()) {
                    results.push(canonical);
                    if results.len() >= want {
                        break;
                    }
                }
            }

            if returned < page_size as usize {
                break;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    async fn search(
        &self,
        query: &str,
        want: usize,
        domain_scope: Option<&str>,
    ) -> Result<Vec<String>, SearchError> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        if want == 0 {
            return Ok(results);
        }

        let mut text = query.trim().to_string();
        let mut retried = false;

        loop {
            match self
                .collect(&text, want, domain_scope, &mut seen, &mut results)
                .await
            {
                Ok(()) => break,
                Err(e) if e.is_fatal() => {
                    tracing::error!("Search aborted: {}", e);
                    return Err(e);
                }
                Err(SearchError::InvalidQuery { message }) if !retried => {
                    match truncate_query(&text) {
                        Some(shorter) => {
                            tracing::warn!(
                                "Query '{}' rejected ({}), retrying as '{}'",
                                text,
                                message,
                                shorter
                            );
                            text = shorter;
                            retried = true;
                        }
                        None => {
                            tracing::warn!("Query '{}' rejected: {}", text, message);
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Search for '{}' ended early with {} results: {}",
                        text,
                        results.len(),
                        e
                    );
                    break;
                }
            }
        }

        Ok(results)
    }
}
