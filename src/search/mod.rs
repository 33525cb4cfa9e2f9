//! Search provider module
//!
//! Candidate URLs are discovered through an external web search API. The
//! [`SearchProvider`] trait is the seam the aggregation controller depends on;
//! [`GoogleSearch`] is the production client.

mod google;

pub use google::{GoogleSearch, RESULT_WINDOW};

use crate::SearchError;
use async_trait::async_trait;

/// Source of candidate URLs for a free-text query
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns up to `want` canonical, deduplicated result URLs
    ///
    /// With `domain_scope` set, results are restricted to that site through
    /// the API's site-restriction parameter.
    ///
    /// # Errors
    ///
    /// Only failures that make further discovery impossible are returned
    /// (see [`SearchError::is_fatal`]); anything else ends the search early
    /// with whatever was already collected.
    async fn search(
        &self,
        query: &str,
        want: usize,
        domain_scope: Option<&str>,
    ) -> Result<Vec<String>, SearchError>;
}

/// Widens a query the API rejected by dropping its last clause
///
/// The last comma-separated clause is dropped if there is one, otherwise the
/// last word. Returns `None` when nothing meaningful would remain.
///
/// # Examples
///
/// ```
/// use bds_harvest::search::truncate_query;
///
/// assert_eq!(
///     truncate_query("Bán nhà Quận 3, hẻm xe hơi"),
///     Some("Bán nhà Quận 3".to_string())
/// );
/// assert_eq!(truncate_query("Bán nhà Quận 3"), Some("Bán nhà Quận".to_string()));
/// assert_eq!(truncate_query("nhà"), None);
/// ```
pub fn truncate_query(query: &str) -> Option<String> {
    let query = query.trim();

    if let Some((head, _)) = query.rsplit_once(',') {
        let head = head.trim();
        if !head.is_empty() {
            return Some(head.to_string());
        }
    }

    let words: Vec<&str> = query.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }
    Some(words[..words.len() - 1].join(" "))
}
