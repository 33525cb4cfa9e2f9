use std::time::{Duration, Instant};

/// Tracks the requests made to one domain during a run
///
/// This structure holds the per-domain information needed to space requests
/// out and to notice a site that has started blocking us.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Number of requests made to this domain in the current run
    pub request_count: u32,

    /// When the last request to this domain was (or is scheduled to be) sent
    pub last_request_time: Option<Instant>,

    /// Fetches that ended blocked or rate limited
    pub blocked_count: u32,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self {
            request_count: 0,
            last_request_time: None,
            blocked_count: 0,
        }
    }

    /// Checks if a request can be made to this domain without waiting
    pub fn can_request(&self, spacing: Duration, now: Instant) -> bool {
        self.time_until_next_request(spacing, now).is_none()
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, spacing: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let ready_at = last + spacing;
        if ready_at > now {
            Some(ready_at - now)
        } else {
            None
        }
    }

    /// Records a request sent at `at`
    ///
    /// `at` may lie in the future when the caller reserves a slot and sleeps
    /// until it.
    pub fn record_request(&mut self, at: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(at);
    }

    /// Records a fetch that ended blocked or rate limited
    pub fn mark_blocked(&mut self) {
        self.blocked_count += 1;
    }

    /// Returns true if every request so far was blocked
    pub fn is_hostile(&self) -> bool {
        self.request_count > 0 && self.blocked_count >= self.request_count
    }
}

impl Default for DomainState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPACING: Duration = Duration::from_millis(1000);

    #[test]
    fn test_new_domain_state() {
        let state = DomainState::new();
        assert_eq!(state.request_count, 0);
        assert!(state.last_request_time.is_none());
        assert_eq!(state.blocked_count, 0);
    }

    #[test]
    fn test_can_request_initially() {
        let state = DomainState::new();
        assert!(state.can_request(SPACING, Instant::now()));
    }

    #[test]
    fn test_cannot_request_too_soon() {
        let mut state = DomainState::new();
        let now = Instant::now();
        state.record_request(now);

        assert!(!state.can_request(SPACING, now));
        assert!(!state.can_request(SPACING, now + Duration::from_millis(500)));
        assert!(state.can_request(SPACING, now + Duration::from_millis(1100)));
    }

    #[test]
    fn test_zero_spacing_never_waits() {
        let mut state = DomainState::new();
        let now = Instant::now();
        state.record_request(now);

        assert!(state.can_request(Duration::ZERO, now));
    }

    #[test]
    fn test_time_until_next_request() {
        let mut state = DomainState::new();
        let now = Instant::now();

        assert!(state.time_until_next_request(SPACING, now).is_none());

        state.record_request(now);
        assert_eq!(
            state.time_until_next_request(SPACING, now),
            Some(Duration::from_millis(1000))
        );
        assert_eq!(
            state.time_until_next_request(SPACING, now + Duration::from_millis(500)),
            Some(Duration::from_millis(500))
        );
        assert!(state
            .time_until_next_request(SPACING, now + Duration::from_millis(1100))
            .is_none());
    }

    #[test]
    fn test_reserved_slot_in_future() {
        let mut state = DomainState::new();
        let now = Instant::now();
        state.record_request(now + Duration::from_millis(800));

        assert_eq!(
            state.time_until_next_request(SPACING, now),
            Some(Duration::from_millis(1800))
        );
        assert_eq!(state.request_count, 1);
    }

    #[test]
    fn test_hostile_domain() {
        let mut state = DomainState::new();
        assert!(!state.is_hostile());

        state.record_request(Instant::now());
        state.mark_blocked();
        assert!(state.is_hostile());

        state.record_request(Instant::now());
        assert!(!state.is_hostile());
    }
}
