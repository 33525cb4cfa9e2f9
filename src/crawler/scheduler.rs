//! Per-domain request limiting
//!
//! This module handles:
//! - Per-domain concurrency limiting via semaphores
//! - Minimum spacing between requests to the same domain
//! - Per-domain request and block counting
//!
//! The global worker bound lives in the aggregator's stream; this limiter
//! only keeps any single site from seeing more than its share.

use crate::state::DomainState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Held for the duration of one request to a domain
pub struct DomainPermit {
    pub domain: String,
    _permit: Option<OwnedSemaphorePermit>,
}

struct DomainSlot {
    semaphore: Arc<Semaphore>,
    state: DomainState,
}

/// Limits concurrency and request rate per domain
pub struct DomainLimiter {
    per_domain: usize,
    spacing: Duration,
    domains: Mutex<HashMap<String, DomainSlot>>,
}

impl DomainLimiter {
    /// Creates a limiter
    ///
    /// # Arguments
    ///
    /// * `per_domain` - Requests allowed in flight per domain (at least 1)
    /// * `spacing` - Minimum time between two request starts on one domain
    pub fn new(per_domain: usize, spacing: Duration) -> Self {
        Self {
            per_domain: per_domain.max(1),
            spacing,
            domains: Mutex::new(HashMap::new()),
        }
    }

    fn semaphore(&self, domain: &str) -> Arc<Semaphore> {
        let mut domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
        domains
            .entry(domain.to_string())
            .or_insert_with(|| DomainSlot {
                semaphore: Arc::new(Semaphore::new(self.per_domain)),
                state: DomainState::new(),
            })
            .semaphore
            .clone()
    }

    /// Reserves the next request slot for a domain and returns how long to
    /// wait before using it
    fn reserve(&self, domain: &str) -> Duration {
        let mut domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
        let Some(slot) = domains.get_mut(domain) else {
            return Duration::ZERO;
        };

        let now = Instant::now();
        let wait = slot
            .state
            .time_until_next_request(self.spacing, now)
            .unwrap_or(Duration::ZERO);
        slot.state.record_request(now + wait);
        wait
    }

    /// Waits until a request to `domain` is allowed
    ///
    /// This method:
    /// 1. Waits for one of the domain's concurrency permits
    /// 2. Reserves the next spaced-out request slot
    /// 3. Sleeps until that slot
    pub async fn acquire(&self, domain: &str) -> DomainPermit {
        // Semaphores are never closed, so a permit is always granted
        let permit = self.semaphore(domain).acquire_owned().await.ok();

        let wait = self.reserve(domain);
        if !wait.is_zero() {
            tracing::debug!("Waiting {:?} before next request to {}", wait, domain);
            tokio::time::sleep(wait).await;
        }

        DomainPermit {
            domain: domain.to_string(),
            _permit: permit,
        }
    }

    /// Records that a request to `domain` ended blocked or rate limited
    pub fn mark_blocked(&self, domain: &str) {
        let mut domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = domains.get_mut(domain) {
            slot.state.mark_blocked();
            if slot.state.is_hostile() {
                tracing::warn!(
                    "Every request to {} so far has been blocked ({})",
                    domain,
                    slot.state.blocked_count
                );
            }
        }
    }

    /// Gets a snapshot of a domain's state
    pub fn domain_state(&self, domain: &str) -> Option<DomainState> {
        let domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
        domains.get(domain).map(|slot| slot.state.clone())
    }

    /// Total requests issued across all domains
    pub fn total_requests(&self) -> u32 {
        let domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
        domains.values().map(|slot| slot.state.request_count).sum()
    }
}
