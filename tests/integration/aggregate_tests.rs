//! End-to-end tests of the aggregation controller

use crate::support::{
    alonhadat_detail, alonhadat_listing, detail_html, listing_html, quick_config, FixedSearch,
    FixturePages,
};
use bds_harvest::config::QuotaEntry;
use bds_harvest::crawler::{Aggregator, RecordKind, RunStatus};
use bds_harvest::sites::Registry;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Five detail results, two category pages with five detail links each
fn search_and_pages() -> (FixedSearch, FixturePages) {
    let mut search = FixedSearch::default();
    for id in 1..=5 {
        search.unscoped.push(alonhadat_detail(id));
    }
    search.unscoped.push(alonhadat_listing(1));
    search.unscoped.push(alonhadat_listing(2));

    let mut pages = FixturePages::default();
    for id in 1..=24 {
        pages.insert(
            &alonhadat_detail(id),
            detail_html(&format!("Nhà số {}", id), "5,2 tỷ"),
        );
    }
    for page in 1..=2 {
        let links: Vec<String> = (0..5).map(|i| alonhadat_detail(page * 10 + i)).collect();
        pages.insert(&alonhadat_listing(page), listing_html(&links));
    }

    (search, pages)
}

fn aggregator(
    config: bds_harvest::RunConfig,
    search: FixedSearch,
    pages: FixturePages,
) -> (Aggregator, Arc<FixedSearch>, Arc<FixturePages>) {
    let search = Arc::new(search);
    let pages = Arc::new(pages);
    let aggregator = Aggregator::new(
        config,
        search.clone(),
        pages.clone(),
        Registry::with_defaults(),
    );
    (aggregator, search, pages)
}

#[tokio::test]
async fn test_end_to_end_fills_target_from_results_and_sublinks() {
    let (search, pages) = search_and_pages();
    let (aggregator, _, pages) = aggregator(quick_config(), search, pages);

    let report = aggregator.run("Bán nhà Quận 3", 10).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.records.len(), 10);

    let links: Vec<String> = report.records.iter().map(|r| r.link.clone()).collect();
    let mut expected: Vec<String> = (1..=5).map(alonhadat_detail).collect();
    // Three links from the first category page, then what still fits
    expected.extend([10, 11, 12].into_iter().map(alonhadat_detail));
    expected.extend([20, 21].into_iter().map(alonhadat_detail));
    assert_eq!(links, expected);

    let unique: HashSet<&String> = links.iter().collect();
    assert_eq!(unique.len(), links.len());

    for record in &report.records {
        assert_eq!(record.kind, RecordKind::Listing);
        assert_eq!(record.price, "5,2 tỷ");
        assert_eq!(record.area, "52 m²");
        assert_eq!(record.contact, "Anh Tuấn - 0909123456");
        assert_eq!(record.source_tag, "plain");
    }
    assert_eq!(report.records[0].title, "Nhà số 1");

    // Each category page is fetched exactly once, each detail page once
    assert_eq!(pages.fetch_count(&alonhadat_listing(1)), 1);
    assert_eq!(pages.fetch_count(&alonhadat_listing(2)), 1);
    assert_eq!(pages.fetch_count(&alonhadat_detail(1)), 1);
    assert_eq!(pages.fetches.load(Ordering::SeqCst), 12);
}

#[tokio::test]
async fn test_result_count_never_exceeds_target() {
    let (search, pages) = search_and_pages();
    let (aggregator, _, _) = aggregator(quick_config(), search, pages);

    let report = aggregator.run("Bán nhà Quận 3", 3).await.unwrap();

    assert_eq!(report.records.len(), 3);
    assert_eq!(report.records[2].link, alonhadat_detail(3));
}

#[tokio::test]
async fn test_quota_domain_comes_first() {
    let (mut search, mut pages) = search_and_pages();
    let guland = "https://guland.vn/post/ban-nha-hem-quan-3-1234567".to_string();
    search
        .scoped
        .insert("guland.vn".to_string(), vec![guland.clone()]);
    pages.insert(&guland, "<html><body><h1>Nhà Guland</h1></body></html>".to_string());

    let mut config = quick_config();
    config.quota = vec![QuotaEntry::new("guland.vn", 2)];
    let (aggregator, search, _) = aggregator(config, search, pages);

    let report = aggregator.run("Bán nhà Quận 3", 4).await.unwrap();

    assert_eq!(report.records.len(), 4);
    assert_eq!(report.records[0].link, guland);
    assert_eq!(report.records[0].title, "Nhà Guland");
    assert_eq!(report.records[0].source_tag, "browser");

    let calls = search.calls.lock().unwrap();
    assert_eq!(calls[0], (2, Some("guland.vn".to_string())));
    assert_eq!(calls[1], (4, None));
}

#[tokio::test]
async fn test_zero_target_returns_immediately() {
    let (search, pages) = search_and_pages();
    let (aggregator, search, pages) = aggregator(quick_config(), search, pages);

    let report = aggregator.run("Bán nhà Quận 3", 0).await.unwrap();

    assert!(report.records.is_empty());
    assert_eq!(report.status, RunStatus::Completed);
    assert!(search.calls.lock().unwrap().is_empty());
    assert_eq!(pages.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_results() {
    let (aggregator, _, pages) =
        aggregator(quick_config(), FixedSearch::default(), FixturePages::default());

    let report = aggregator.run("không có kết quả", 10).await.unwrap();

    assert!(report.is_no_results());
    assert!(report.records.is_empty());
    assert_eq!(pages.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_keeps_records_already_harvested() {
    let mut search = FixedSearch::default();
    let mut pages = FixturePages::default();
    for id in 1..=4 {
        search.unscoped.push(alonhadat_detail(id));
        pages.insert(&alonhadat_detail(id), detail_html("Nhà", "3 tỷ"));
    }
    let cancel = CancellationToken::new();
    pages.cancel_on_fetch = Some(cancel.clone());

    let mut config = quick_config();
    config.aggregate.max_concurrent_fetches = 1;
    let (aggregator, _, pages) = aggregator(config, search, pages);

    let report = aggregator
        .run_with_cancel("Bán nhà", 4, cancel)
        .await
        .unwrap();

    // The fetch in flight completes; nothing new starts afterwards
    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].link, alonhadat_detail(1));
    assert_eq!(pages.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_deadline_interrupts_hanging_search() {
    let search = FixedSearch {
        hang: true,
        ..FixedSearch::default()
    };
    let mut config = quick_config();
    config.aggregate.deadline_secs = Some(1);
    let (aggregator, _, _) = aggregator(config, search, FixturePages::default());

    let report = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        aggregator.run("Bán nhà", 5),
    )
    .await
    .expect("deadline should end the run");
    let report = report.unwrap();

    assert_eq!(report.status, RunStatus::Cancelled);
    assert!(report.records.is_empty());
}

#[tokio::test]
async fn test_unsupported_domains_become_sentinels() {
    let mut search = FixedSearch::default();
    search.unscoped = vec![
        "https://example.com/tin-123456".to_string(),
        alonhadat_detail(1),
    ];
    let mut pages = FixturePages::default();
    pages.insert(&alonhadat_detail(1), detail_html("Nhà", "3 tỷ"));
    let (aggregator, _, pages) = aggregator(quick_config(), search, pages);

    let report = aggregator.run("Bán nhà", 2).await.unwrap();

    assert_eq!(report.records[0].kind, RecordKind::Unsupported);
    assert_eq!(report.records[0].title, "Unsupported domain");
    assert_eq!(report.records[1].kind, RecordKind::Listing);
    assert_eq!(pages.fetch_count("https://example.com/tin-123456"), 0);
}
