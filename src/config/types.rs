use serde::Deserialize;

/// Main configuration structure, constructed once and passed to every component
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub aggregate: AggregateConfig,
    /// Per-domain quotas, in priority order
    #[serde(default = "default_quotas")]
    pub quota: Vec<QuotaEntry>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            fetch: FetchConfig::default(),
            aggregate: AggregateConfig::default(),
            quota: default_quotas(),
        }
    }
}

/// External search API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search API endpoint
    pub endpoint: String,

    /// API key sent with every request
    #[serde(rename = "api-key")]
    pub api_key: String,

    /// Search engine identifier
    #[serde(rename = "engine-id")]
    pub engine_id: String,

    /// Results per request (the API refuses more than 10)
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Safety ceiling on the number of pages requested per search
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Result language restriction, e.g. "lang_vi"
    pub language: Option<String>,

    /// Country bias, e.g. "vn"
    pub country: Option<String>,

    /// Interface language, e.g. "vi"
    #[serde(rename = "interface-language")]
    pub interface_language: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            api_key: String::new(),
            engine_id: String::new(),
            page_size: 10,
            max_pages: 5,
            language: Some("lang_vi".to_string()),
            country: Some("vn".to_string()),
            interface_language: Some("vi".to_string()),
        }
    }
}

/// Page fetching settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,

    pub referer: String,

    /// Timeout for the plain and anti-bot HTTP strategies (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Whether the headless-browser strategy may be used at all
    #[serde(rename = "browser-enabled")]
    pub browser_enabled: bool,

    #[serde(rename = "browser-headless")]
    pub browser_headless: bool,

    /// Navigation timeout for the headless browser (seconds)
    #[serde(rename = "browser-timeout-secs")]
    pub browser_timeout_secs: u64,

    /// Upper bound on waiting for the network to go idle (seconds)
    #[serde(rename = "network-idle-timeout-secs")]
    pub network_idle_timeout_secs: u64,

    /// Extra delay after network idle so client-side rendering can finish
    #[serde(rename = "settle-ms")]
    pub settle_ms: u64,

    /// Overrides every site's default strategy when set
    #[serde(rename = "force-strategy")]
    pub force_strategy: Option<String>,

    /// Archived-copy URL template; `{url}` is replaced with the percent-encoded page URL
    #[serde(rename = "archive-url-template")]
    pub archive_url_template: Option<String>,

    /// Persisted browser session files for domains gated by human verification
    #[serde(default)]
    pub session: Vec<SessionEntry>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "vi-VN,vi;q=0.9,en-US;q=0.8".to_string(),
            referer: "https://www.google.com/".to_string(),
            timeout_secs: 25,
            browser_enabled: true,
            browser_headless: true,
            browser_timeout_secs: 45,
            network_idle_timeout_secs: 15,
            settle_ms: 1500,
            force_strategy: None,
            archive_url_template: None,
            session: Vec::new(),
        }
    }
}

/// Persisted browser storage state for one domain
#[derive(Debug, Clone, Deserialize)]
pub struct SessionEntry {
    /// Domain suffix the session applies to
    pub domain: String,

    /// Path to the storage-state JSON file
    pub path: String,
}

/// Aggregation controller settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// Size of the first display page
    #[serde(rename = "first-batch-size")]
    pub first_batch_size: usize,

    /// Default total when the caller does not pass one
    #[serde(rename = "target-total")]
    pub target_total: usize,

    /// Pause between per-domain batches (milliseconds)
    #[serde(rename = "politeness-delay-ms")]
    pub politeness_delay_ms: u64,

    /// Fetch+parse workers running at once
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: usize,

    /// Concurrent fetches allowed against a single domain
    #[serde(rename = "per-domain-concurrency")]
    pub per_domain_concurrency: usize,

    /// Minimum gap between two requests to the same domain (milliseconds)
    #[serde(rename = "domain-spacing-ms")]
    pub domain_spacing_ms: u64,

    /// Detail links harvested from each listing page
    #[serde(rename = "sublinks-per-listing")]
    pub sublinks_per_listing: usize,

    /// Whole-run deadline (seconds); no new fetches start after it passes
    #[serde(rename = "deadline-secs")]
    pub deadline_secs: Option<u64>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            first_batch_size: 10,
            target_total: 30,
            politeness_delay_ms: 800,
            max_concurrent_fetches: 4,
            per_domain_concurrency: 1,
            domain_spacing_ms: 500,
            sublinks_per_listing: 3,
            deadline_secs: None,
        }
    }
}

/// Maximum contribution of one domain to a run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuotaEntry {
    /// Domain suffix, e.g. "batdongsan.com.vn"
    pub domain: String,

    /// Records this domain may contribute
    pub count: usize,
}

impl QuotaEntry {
    pub fn new(domain: &str, count: usize) -> Self {
        Self {
            domain: domain.to_string(),
            count,
        }
    }
}

/// Most reliable domain first
fn default_quotas() -> Vec<QuotaEntry> {
    vec![
        QuotaEntry::new("batdongsan.com.vn", 6),
        QuotaEntry::new("alonhadat.com.vn", 4),
    ]
}
