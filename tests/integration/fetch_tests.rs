//! Fetch strategy tests against a mock site

use async_trait::async_trait;
use bds_harvest::config::FetchConfig;
use bds_harvest::fetch::{
    BrowserLauncher, BrowserPage, FetchResolver, FetchStatus, PageFetcher, RenderError,
    SessionState, Strategy,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = "<html><head><title>Bán nhà Quận 3</title></head><body><h1>Nhà</h1></body></html>";
const CHALLENGE: &str = "<html><head><title>Just a moment...</title></head><body></body></html>";

fn fetch_config() -> FetchConfig {
    FetchConfig {
        timeout_secs: 5,
        browser_enabled: false,
        browser_timeout_secs: 1,
        network_idle_timeout_secs: 1,
        settle_ms: 0,
        ..FetchConfig::default()
    }
}

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    closes: AtomicUsize,
}

/// Browser whose navigation never finishes
struct HangingLauncher {
    counters: Arc<Counters>,
}

struct HangingPage {
    counters: Arc<Counters>,
}

#[async_trait]
impl BrowserLauncher for HangingLauncher {
    async fn launch(
        &self,
        _session: Option<&SessionState>,
    ) -> Result<Box<dyn BrowserPage>, RenderError> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HangingPage {
            counters: self.counters.clone(),
        }))
    }
}

#[async_trait]
impl BrowserPage for HangingPage {
    async fn goto(&mut self, _url: &str) -> Result<(), RenderError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    async fn wait_for_network_idle(&mut self, _timeout: Duration) -> Result<(), RenderError> {
        Ok(())
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        Ok(String::new())
    }

    async fn close(self: Box<Self>) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

async fn mount_page(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_plain_fetch() {
    let server = MockServer::start().await;
    mount_page(&server, "/ban-nha-1234567.html", 200, PAGE).await;
    let resolver = FetchResolver::new(&fetch_config()).unwrap();

    let url = format!("{}/ban-nha-1234567.html", server.uri());
    let result = resolver.fetch(&url, Strategy::Plain).await;

    assert!(result.is_ok());
    assert_eq!(result.html, PAGE);
    assert_eq!(result.strategy_used, Strategy::Plain);
    assert_eq!(result.attempts.len(), 1);
}

#[tokio::test]
async fn test_plain_forbidden_is_blocked() {
    let server = MockServer::start().await;
    mount_page(&server, "/a-1234567.html", 403, "Forbidden").await;
    let resolver = FetchResolver::new(&fetch_config()).unwrap();

    let result = resolver
        .fetch(&format!("{}/a-1234567.html", server.uri()), Strategy::Plain)
        .await;

    assert_eq!(result.status, FetchStatus::Blocked);
    assert!(result.html.is_empty());
    assert_eq!(result.error_message(), Some("HTTP 403"));
}

#[tokio::test]
async fn test_plain_challenge_page_is_blocked() {
    let server = MockServer::start().await;
    mount_page(&server, "/a-1234567.html", 200, CHALLENGE).await;
    let resolver = FetchResolver::new(&fetch_config()).unwrap();

    let result = resolver
        .fetch(&format!("{}/a-1234567.html", server.uri()), Strategy::Plain)
        .await;

    assert_eq!(result.status, FetchStatus::Blocked);
}

#[tokio::test]
async fn test_antibot_retries_after_challenge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a-pr39912345"))
        .respond_with(ResponseTemplate::new(403).set_body_string(CHALLENGE))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/a-pr39912345", 200, PAGE).await;
    let resolver = FetchResolver::new(&fetch_config()).unwrap();

    let result = resolver
        .fetch(&format!("{}/a-pr39912345", server.uri()), Strategy::AntiBot)
        .await;

    assert!(result.is_ok());
    assert_eq!(result.strategy_used, Strategy::AntiBot);
    assert_eq!(result.html, PAGE);
}

#[tokio::test]
async fn test_antibot_failure_falls_back_to_plain() {
    let server = MockServer::start().await;
    mount_page(&server, "/a-pr39912345", 429, "Too Many Requests").await;
    let resolver = FetchResolver::new(&fetch_config()).unwrap();

    let result = resolver
        .fetch(&format!("{}/a-pr39912345", server.uri()), Strategy::AntiBot)
        .await;

    let strategies: Vec<Strategy> = result.attempts.iter().map(|a| a.strategy).collect();
    assert_eq!(strategies, vec![Strategy::AntiBot, Strategy::Plain]);
    assert_eq!(result.status, FetchStatus::Blocked);
    assert_eq!(result.strategy_used, Strategy::Plain);
}

#[tokio::test]
async fn test_browser_timeout_falls_back_to_plain_and_closes_session() {
    let server = MockServer::start().await;
    mount_page(&server, "/post/ban-nha-1234567", 200, PAGE).await;
    let counters = Arc::new(Counters::default());
    let resolver = FetchResolver::new(&fetch_config())
        .unwrap()
        .with_browser(Arc::new(HangingLauncher {
            counters: counters.clone(),
        }));

    let result = resolver
        .fetch(
            &format!("{}/post/ban-nha-1234567", server.uri()),
            Strategy::Browser,
        )
        .await;

    assert!(result.is_ok());
    assert_eq!(result.html, PAGE);
    assert_eq!(result.strategy_used, Strategy::Plain);
    assert_eq!(result.attempts[0].strategy, Strategy::Browser);
    assert_eq!(result.attempts[0].status, FetchStatus::TimedOut);
    assert_eq!(counters.launches.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_forced_strategy_overrides_site_default() {
    let server = MockServer::start().await;
    mount_page(&server, "/post/ban-nha-1234567", 200, PAGE).await;
    let config = FetchConfig {
        force_strategy: Some("plain".to_string()),
        ..fetch_config()
    };
    let counters = Arc::new(Counters::default());
    let resolver = FetchResolver::new(&config)
        .unwrap()
        .with_browser(Arc::new(HangingLauncher {
            counters: counters.clone(),
        }));

    let result = resolver
        .fetch(
            &format!("{}/post/ban-nha-1234567", server.uri()),
            Strategy::Browser,
        )
        .await;

    assert!(result.is_ok());
    assert_eq!(result.attempts.len(), 1);
    assert_eq!(counters.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_archived_copy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web"))
        .and(query_param("url", "https://guland.vn/post/a-1234567"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .mount(&server)
        .await;
    let config = FetchConfig {
        archive_url_template: Some(format!("{}/web?url={{url}}", server.uri())),
        ..fetch_config()
    };
    let resolver = FetchResolver::new(&config).unwrap();

    let result = resolver
        .fetch_archived("https://guland.vn/post/a-1234567")
        .await
        .unwrap();

    assert!(result.is_ok());
    assert_eq!(result.html, PAGE);
}

#[tokio::test]
async fn test_fetch_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/public/ad-listing/113456789"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"ad": {"subject": "Nhà hẻm"}})),
        )
        .mount(&server)
        .await;
    let resolver = FetchResolver::new(&fetch_config()).unwrap();

    let value = resolver
        .fetch_json(&format!("{}/v1/public/ad-listing/113456789", server.uri()))
        .await
        .unwrap();

    assert_eq!(value["ad"]["subject"], "Nhà hẻm");
}
