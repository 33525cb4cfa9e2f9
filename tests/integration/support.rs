//! Shared fixtures for the integration tests

use async_trait::async_trait;
use bds_harvest::config::RunConfig;
use bds_harvest::fetch::{FetchFailure, FetchResult, FetchStatus, PageFetcher, Strategy};
use bds_harvest::search::SearchProvider;
use bds_harvest::SearchError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Search provider returning fixed results
#[derive(Default)]
pub struct FixedSearch {
    pub scoped: HashMap<String, Vec<String>>,
    pub unscoped: Vec<String>,
    /// Never answers; the run must be cancelled to finish
    pub hang: bool,
    pub calls: Mutex<Vec<(usize, Option<String>)>>,
}

#[async_trait]
impl SearchProvider for FixedSearch {
    async fn search(
        &self,
        _query: &str,
        want: usize,
        domain_scope: Option<&str>,
    ) -> Result<Vec<String>, SearchError> {
        self.calls
            .lock()
            .unwrap()
            .push((want, domain_scope.map(str::to_string)));
        if self.hang {
            std::future::pending::<()>().await;
        }
        let results = match domain_scope {
            Some(domain) => self.scoped.get(domain).cloned().unwrap_or_default(),
            None => self.unscoped.clone(),
        };
        Ok(results.into_iter().take(want).collect())
    }
}

/// Page fetcher serving fixture HTML keyed by URL
#[derive(Default)]
pub struct FixturePages {
    pub pages: HashMap<String, String>,
    /// Cancelled as soon as the first fetch starts
    pub cancel_on_fetch: Option<CancellationToken>,
    pub fetched: Mutex<Vec<String>>,
    pub fetches: AtomicUsize,
}

impl FixturePages {
    pub fn insert(&mut self, url: &str, html: String) {
        self.pages.insert(url.to_string(), html);
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetched
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl PageFetcher for FixturePages {
    async fn fetch(&self, url: &str, strategy: Strategy) -> FetchResult {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().unwrap().push(url.to_string());
        if let Some(token) = &self.cancel_on_fetch {
            token.cancel();
        }
        match self.pages.get(url) {
            Some(html) => FetchResult::ok(url, html.clone(), strategy),
            None => FetchResult::failed(
                url,
                strategy,
                FetchFailure::new(FetchStatus::Error, "HTTP 404"),
            ),
        }
    }
}

/// Run configuration without delays or quotas
pub fn quick_config() -> RunConfig {
    let mut config = RunConfig::default();
    config.quota = Vec::new();
    config.aggregate.politeness_delay_ms = 0;
    config.aggregate.domain_spacing_ms = 0;
    config.aggregate.first_batch_size = 10;
    config.aggregate.sublinks_per_listing = 3;
    config
}

pub fn alonhadat_detail(id: u32) -> String {
    format!(
        "https://alonhadat.com.vn/ban-nha-quan-3--{}.html",
        17_000_000 + id
    )
}

pub fn alonhadat_listing(page: u32) -> String {
    format!("https://alonhadat.com.vn/nha-dat/can-ban/nha/quan-3/trang-{}", page)
}

/// A detail page the alonhadat rules can read
pub fn detail_html(title: &str, price: &str) -> String {
    format!(
        r#"<html><head><meta property="og:image" content="https://img.alonhadat.com.vn/a.jpg"></head><body>
        <div class="title"><h1>{}</h1></div>
        <div class="moreinfor">
          <span class="price"><span class="label">Giá:</span> <span class="value">{}</span></span>
          <span class="square"><span class="label">Diện tích:</span> <span class="value">52 m²</span></span>
        </div>
        <div class="detail text-content">Nhà hẻm xe hơi, sổ hồng riêng.</div>
        <div class="info-contact"><div class="name">Anh Tuấn</div><a href="tel:0909123456">0909 123 456</a></div>
        </body></html>"#,
        title, price
    )
}

/// A category page linking to the given detail URLs
pub fn listing_html(links: &[String]) -> String {
    let items: String = links
        .iter()
        .map(|link| {
            format!(
                r#"<div class="content-item"><div class="ct_title"><a href="{}">Tin đăng</a></div></div>"#,
                link
            )
        })
        .collect();
    format!(
        r#"<html><body><a href="/dang-tin">Đăng tin</a>{}<a href="https://facebook.com/alonhadat">fb</a></body></html>"#,
        items
    )
}
