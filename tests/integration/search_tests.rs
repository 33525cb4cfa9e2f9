//! Search provider tests against a mock Custom Search endpoint

use bds_harvest::config::SearchConfig;
use bds_harvest::search::{GoogleSearch, SearchProvider};
use bds_harvest::SearchError;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn search_config(server: &MockServer, page_size: u32) -> SearchConfig {
    SearchConfig {
        endpoint: format!("{}/customsearch/v1", server.uri()),
        api_key: "test-key".to_string(),
        engine_id: "test-cx".to_string(),
        page_size,
        max_pages: 5,
        ..SearchConfig::default()
    }
}

fn items(links: &[&str]) -> serde_json::Value {
    json!({
        "items": links.iter().map(|link| json!({"link": link, "title": "x"})).collect::<Vec<_>>()
    })
}

#[tokio::test]
async fn test_paginates_and_deduplicates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("start", "1"))
        .and(query_param("num", "2"))
        .and(query_param("key", "test-key"))
        .and(query_param("cx", "test-cx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(&[
            "https://alonhadat.com.vn/a-1000001.html",
            "https://alonhadat.com.vn/a-1000002.html",
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("start", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(&[
            "https://alonhadat.com.vn/a-1000002.html?utm_source=google",
            "https://alonhadat.com.vn/a-1000003.html/",
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("start", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(&[
            "https://alonhadat.com.vn/a-1000004.html",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let search = GoogleSearch::new(&search_config(&server, 2)).unwrap();
    let results = search.search("Bán nhà Quận 3", 10, None).await.unwrap();

    assert_eq!(
        results,
        vec![
            "https://alonhadat.com.vn/a-1000001.html",
            "https://alonhadat.com.vn/a-1000002.html",
            "https://alonhadat.com.vn/a-1000003.html",
            "https://alonhadat.com.vn/a-1000004.html",
        ]
    );
}

#[tokio::test]
async fn test_stops_once_enough_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(&[
            "https://guland.vn/post/a-1234561",
            "https://guland.vn/post/b-1234562",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let search = GoogleSearch::new(&search_config(&server, 2)).unwrap();
    let results = search.search("Bán nhà", 1, None).await.unwrap();

    assert_eq!(results, vec!["https://guland.vn/post/a-1234561"]);
}

#[tokio::test]
async fn test_domain_scope_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("siteSearch", "batdongsan.com.vn"))
        .and(query_param("siteSearchFilter", "i"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(&[
            "https://batdongsan.com.vn/ban-nha-rieng-quan-3/nha-pr39912345",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let search = GoogleSearch::new(&search_config(&server, 10)).unwrap();
    let results = search
        .search("Bán nhà", 5, Some("batdongsan.com.vn"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_quota_error_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "Quota exceeded for quota metric 'Queries' of service 'customsearch.googleapis.com'",
                "status": "RESOURCE_EXHAUSTED",
                "errors": [{"reason": "rateLimitExceeded"}]
            }
        })))
        .mount(&server)
        .await;

    let search = GoogleSearch::new(&search_config(&server, 10)).unwrap();
    let err = search.search("Bán nhà", 5, None).await.unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(err, SearchError::Fatal { code: 429, .. }));
}

#[tokio::test]
async fn test_invalid_query_is_retried_truncated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("q", "Bán nhà Quận 3, hẻm xe hơi"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "Request contains an invalid argument.",
                "status": "INVALID_ARGUMENT",
                "errors": [{"reason": "invalid"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("q", "Bán nhà Quận 3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(&[
            "https://alonhadat.com.vn/a-1000001.html",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let search = GoogleSearch::new(&search_config(&server, 10)).unwrap();
    let results = search
        .search("Bán nhà Quận 3, hẻm xe hơi", 5, None)
        .await
        .unwrap();

    assert_eq!(results, vec!["https://alonhadat.com.vn/a-1000001.html"]);
}

#[tokio::test]
async fn test_unreadable_response_ends_search_quietly() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
        .mount(&server)
        .await;

    let search = GoogleSearch::new(&search_config(&server, 10)).unwrap();
    let results = search.search("Bán nhà", 5, None).await.unwrap();

    assert!(results.is_empty());
}

fn invalid_argument() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": {
            "code": 400,
            "message": "Request contains an invalid argument.",
            "status": "INVALID_ARGUMENT",
            "errors": [{"reason": "invalid"}]
        }
    }))
}

#[tokio::test]
async fn test_paging_stays_inside_result_window() {
    let server = MockServer::start().await;

    for page in 0..10u32 {
        let start = 1 + page * 10;
        let links: Vec<String> = (start..start + 10)
            .map(|i| format!("https://alonhadat.com.vn/ban-nha-quan-3-{}.html", 1_000_000 + i))
            .collect();
        let links: Vec<&str> = links.iter().map(String::as_str).collect();
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("q", "Ban nha Quan 3"))
            .and(query_param("start", start.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(items(&links)))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("start", "101"))
        .respond_with(invalid_argument())
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("q", "Ban nha Quan"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(&[
            "https://alonhadat.com.vn/ban-nha-quan-9999999.html",
        ])))
        .expect(0)
        .mount(&server)
        .await;

    let config = SearchConfig {
        max_pages: 15,
        ..search_config(&server, 10)
    };
    let search = GoogleSearch::new(&config).unwrap();
    let results = search.search("Ban nha Quan 3", 150, None).await.unwrap();

    assert_eq!(results.len(), 100);
    assert!(results.iter().all(|r| r.contains("ban-nha-quan-3-")));
}

#[tokio::test]
async fn test_invalid_argument_after_first_page_ends_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("q", "Bán nhà Quận 3"))
        .and(query_param("start", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(&[
            "https://alonhadat.com.vn/a-1000001.html",
            "https://alonhadat.com.vn/a-1000002.html",
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("q", "Bán nhà Quận 3"))
        .and(query_param("start", "3"))
        .respond_with(invalid_argument())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("q", "Bán nhà Quận"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(&[
            "https://alonhadat.com.vn/b-2000001.html",
        ])))
        .expect(0)
        .mount(&server)
        .await;

    let search = GoogleSearch::new(&search_config(&server, 2)).unwrap();
    let results = search.search("Bán nhà Quận 3", 10, None).await.unwrap();

    assert_eq!(
        results,
        vec![
            "https://alonhadat.com.vn/a-1000001.html",
            "https://alonhadat.com.vn/a-1000002.html",
        ]
    );
}
