//! Aggregation controller - turns a query into listing records
//!
//! A run has two phases:
//! - Discovery: quota-scoped searches per domain, an unscoped search when
//!   the first display page is still short, then sublink crawling of
//!   listing pages until the target is reached
//! - Harvest: every discovered URL is fetched and parsed by a bounded pool
//!   of workers, limited per domain, with results kept in discovery order
//!
//! Only a fatal search-provider failure aborts a run. Every other failure
//! is absorbed into the record of the URL it happened on.

use super::scheduler::DomainLimiter;
use super::sublinks::find_detail_links;
use super::{ListingRecord, RunReport, RunStatus};
use crate::config::RunConfig;
use crate::fetch::{FetchStatus, PageFetcher};
use crate::search::SearchProvider;
use crate::sites::Registry;
use crate::url::{matches_domain_suffix, CandidateUrl};
use crate::HarvestError;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Canonical detail URLs in discovery order, bounded by the run target
struct Frontier {
    seen: HashSet<String>,
    urls: Vec<String>,
    limit: usize,
}

impl Frontier {
    fn new(limit: usize) -> Self {
        Self {
            seen: HashSet::new(),
            urls: Vec::new(),
            limit,
        }
    }

    fn len(&self) -> usize {
        self.urls.len()
    }

    fn is_full(&self) -> bool {
        self.urls.len() >= self.limit
    }

    /// Adds a canonical URL; returns false if it was seen before or the
    /// frontier is full
    fn push(&mut self, canonical: String) -> bool {
        if self.is_full() || !self.seen.insert(canonical.clone()) {
            return false;
        }
        self.urls.push(canonical);
        true
    }
}

/// Outcome of the discovery phase
struct Discovery {
    frontier: Frontier,
    interrupted: bool,
}

/// Main aggregation controller
pub struct Aggregator {
    config: RunConfig,
    provider: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    registry: Registry,
}

impl Aggregator {
    /// Creates an aggregator from its collaborators
    ///
    /// `config` is expected to be validated already.
    pub fn new(
        config: RunConfig,
        provider: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        registry: Registry,
    ) -> Self {
        Self {
            config,
            provider,
            fetcher,
            registry,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs one query to completion
    ///
    /// Returns at most `target_total` records, each with a distinct canonical
    /// link. A target of zero returns immediately without any network call.
    ///
    /// # Errors
    ///
    /// Only [`SearchError::Fatal`](crate::SearchError::Fatal) is returned;
    /// all other failures surface as error-marker records.
    pub async fn run(&self, query: &str, target_total: usize) -> Result<RunReport, HarvestError> {
        self.run_with_cancel(query, target_total, CancellationToken::new())
            .await
    }

    /// Runs one query until done or until `cancel` fires
    ///
    /// Once cancelled (or once the configured deadline passes) no new search
    /// or fetch is started; fetches already in flight complete, and the
    /// records collected so far are returned with [`RunStatus::Cancelled`].
    pub async fn run_with_cancel(
        &self,
        query: &str,
        target_total: usize,
        cancel: CancellationToken,
    ) -> Result<RunReport, HarvestError> {
        if target_total == 0 {
            tracing::info!("Target of 0 records requested, nothing to do");
            return Ok(RunReport::new(query, 0, RunStatus::Completed, Vec::new()));
        }

        // Cancelling the child never cancels the caller's token
        let cancel = cancel.child_token();
        let deadline = self.config.aggregate.deadline_secs.map(|secs| {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                tracing::warn!("Run deadline of {}s reached, no new fetches will start", secs);
                token.cancel();
            })
        });

        let result = self.run_inner(query, target_total, &cancel).await;

        if let Some(task) = deadline {
            task.abort();
        }
        result
    }

    async fn run_inner(
        &self,
        query: &str,
        target_total: usize,
        cancel: &CancellationToken,
    ) -> Result<RunReport, HarvestError> {
        let start_time = Instant::now();
        let aggregate = &self.config.aggregate;
        let limiter = DomainLimiter::new(
            aggregate.per_domain_concurrency,
            Duration::from_millis(aggregate.domain_spacing_ms),
        );

        tracing::info!("Starting run for '{}' (target {})", query, target_total);

        let discovery = self.discover(query, target_total, &limiter, cancel).await?;
        let urls = discovery.frontier.urls;
        tracing::info!(
            "Discovery finished with {} detail URLs in {:.1}s",
            urls.len(),
            start_time.elapsed().as_secs_f64()
        );

        if urls.is_empty() {
            let status = if discovery.interrupted {
                RunStatus::Cancelled
            } else {
                tracing::info!("No candidate URLs found for '{}'", query);
                RunStatus::NoResults
            };
            return Ok(RunReport::new(query, target_total, status, Vec::new()));
        }

        let outcomes = self.harvest(&urls, &limiter, cancel).await;
        let skipped = outcomes.iter().filter(|o| o.is_none()).count();
        let records: Vec<ListingRecord> = outcomes.into_iter().flatten().collect();

        let status = if discovery.interrupted || skipped > 0 {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };

        tracing::info!(
            "Run finished ({}): {} records, {} skipped, {} requests, {:.1}s",
            status.as_str(),
            records.len(),
            skipped,
            limiter.total_requests(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(RunReport::new(query, target_total, status, records))
    }

    /// Collects canonical detail URLs for a query
    async fn discover(
        &self,
        query: &str,
        target_total: usize,
        limiter: &DomainLimiter,
        cancel: &CancellationToken,
    ) -> Result<Discovery, HarvestError> {
        let aggregate = &self.config.aggregate;
        let first_batch = aggregate.first_batch_size.min(target_total);
        let politeness = Duration::from_millis(aggregate.politeness_delay_ms);
        let mut frontier = Frontier::new(target_total);

        let interrupted = |frontier: Frontier| -> Result<Discovery, HarvestError> {
            tracing::info!("Discovery interrupted with {} URLs", frontier.len());
            Ok(Discovery {
                frontier,
                interrupted: true,
            })
        };

        // Phase 1: each quota domain in priority order, domain-scoped
        for (index, quota) in self.config.quota.iter().enumerate() {
            if frontier.is_full() {
                break;
            }
            if index > 0 && !pause(politeness, cancel).await {
                return interrupted(frontier);
            }

            let want = quota.count.min(target_total - frontier.len());
            let Some(results) = self.search(query, want, Some(&quota.domain), cancel).await? else {
                return interrupted(frontier);
            };

            let mut taken = 0;
            for raw in results {
                if taken >= quota.count {
                    break;
                }
                let candidate = CandidateUrl::new(&raw, None);
                if candidate.class.is_detail()
                    && matches_domain_suffix(&quota.domain, &candidate.domain)
                    && frontier.push(candidate.canonical)
                {
                    taken += 1;
                }
            }
            tracing::info!("{}: {} of {} quota filled", quota.domain, taken, quota.count);
        }

        // Phase 2: broaden to any domain while the first page is short
        let mut top_level = None;
        if frontier.len() < first_batch {
            let Some(results) = self.search(query, target_total, None, cancel).await? else {
                return interrupted(frontier);
            };
            let before = frontier.len();
            for raw in &results {
                let candidate = CandidateUrl::new(raw, None);
                if candidate.class.is_detail() {
                    frontier.push(candidate.canonical);
                }
            }
            tracing::info!(
                "Unscoped search added {} detail URLs",
                frontier.len() - before
            );
            top_level = Some(results);
        }

        // Phase 3: crawl listing pages among the top-level results
        if !frontier.is_full() {
            let results = match top_level {
                Some(results) => results,
                None => match self.search(query, target_total, None, cancel).await? {
                    Some(results) => results,
                    None => return interrupted(frontier),
                },
            };

            for raw in results {
                if frontier.is_full() {
                    break;
                }
                let candidate = CandidateUrl::new(&raw, None);
                if candidate.class.is_detail() {
                    frontier.push(candidate.canonical);
                    continue;
                }
                if cancel.is_cancelled() {
                    return interrupted(frontier);
                }

                let links = {
                    let _permit = limiter.acquire(&candidate.domain).await;
                    find_detail_links(
                        self.fetcher.as_ref(),
                        &self.registry,
                        &candidate.canonical,
                        aggregate.sublinks_per_listing,
                    )
                    .await
                };
                let before = frontier.len();
                for link in links {
                    frontier.push(link);
                }
                tracing::debug!(
                    "Sublink crawl of {} added {} URLs",
                    candidate.canonical,
                    frontier.len() - before
                );
            }
        }

        Ok(Discovery {
            frontier,
            interrupted: false,
        })
    }

    /// Queries the search provider
    ///
    /// Returns `Ok(None)` if the run was cancelled first. Non-fatal provider
    /// errors are logged and treated as an empty result.
    async fn search(
        &self,
        query: &str,
        want: usize,
        scope: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<String>>, HarvestError> {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        tokio::select! {
            _ = cancel.cancelled() => Ok(None),
            result = self.provider.search(query, want, scope) => match result {
                Ok(urls) => Ok(Some(urls)),
                Err(e) if e.is_fatal() => {
                    tracing::error!("Search provider failed fatally: {}", e);
                    Err(HarvestError::Search(e))
                }
                Err(e) => {
                    tracing::warn!("Search for '{}' ({:?}) failed: {}", query, scope, e);
                    Ok(Some(Vec::new()))
                }
            },
        }
    }

    /// Fetches and parses every URL, keeping input order
    ///
    /// URLs skipped because of cancellation come back as `None`.
    async fn harvest(
        &self,
        urls: &[String],
        limiter: &DomainLimiter,
        cancel: &CancellationToken,
    ) -> Vec<Option<ListingRecord>> {
        let workers = self.config.aggregate.max_concurrent_fetches.max(1);
        tracing::info!("Harvesting {} URLs with {} workers", urls.len(), workers);

        stream::iter(urls)
            .map(|url| self.harvest_one(url, limiter, cancel))
            .buffered(workers)
            .collect()
            .await
    }

    async fn harvest_one(
        &self,
        url: &str,
        limiter: &DomainLimiter,
        cancel: &CancellationToken,
    ) -> Option<ListingRecord> {
        if cancel.is_cancelled() {
            return None;
        }

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => return Some(ListingRecord::error(url, &e.to_string(), "none")),
        };
        let Some(parser) = self.registry.lookup(&parsed) else {
            tracing::debug!("No parser for {}", url);
            return Some(ListingRecord::unsupported(url));
        };
        let domain = parsed.host_str().unwrap_or_default().to_string();

        let permit = limiter.acquire(&domain).await;
        if cancel.is_cancelled() {
            return None;
        }

        let result = self.fetcher.fetch(url, parser.default_strategy()).await;
        if result
            .attempts
            .iter()
            .any(|a| a.status == FetchStatus::Blocked)
        {
            limiter.mark_blocked(&domain);
        }
        drop(permit);

        let (html, mut source_tag) = if result.is_ok() {
            (result.html, result.strategy_used.as_str().to_string())
        } else {
            match self.fetcher.fetch_archived(url).await {
                Some(archived) if archived.is_ok() => {
                    tracing::info!("Using archived copy of {}", url);
                    (archived.html, "archive".to_string())
                }
                _ => {
                    let message = result
                        .error_message()
                        .unwrap_or(result.status.as_str())
                        .to_string();
                    tracing::warn!("Giving up on {}: {}", url, message);
                    return Some(ListingRecord::error(
                        url,
                        &message,
                        result.strategy_used.as_str(),
                    ));
                }
            }
        };

        let mut fields = parser.parse(&parsed, &html);
        if fields.missing_required() {
            if let Some(api_url) = parser.api_url(&parsed) {
                if let Some(body) = self.fetcher.fetch_json(&api_url).await {
                    let before = fields.clone();
                    fields.fill_from(parser.parse_api(&parsed, &body));
                    if fields != before {
                        source_tag.push_str("+api");
                    }
                }
            }
        }

        if fields.is_empty() {
            tracing::warn!("No fields resolved on {}", url);
        } else {
            tracing::debug!("Parsed {} via {}", url, source_tag);
        }

        Some(ListingRecord::from_fields(url, fields, &source_tag))
    }
}

/// Sleeps for the politeness delay; returns false if cancelled meanwhile
async fn pause(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
