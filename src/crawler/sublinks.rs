//! Sublink crawler
//!
//! Harvests detail-page links from a listing or category page. A miss here
//! is never an error: any fetch or parse problem yields an empty list.

use crate::fetch::{PageFetcher, Strategy};
use crate::sites::Registry;
use crate::url::{matches_domain_suffix, CandidateUrl};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a[href]").unwrap();
}

/// Finds up to `max_links` canonical detail URLs linked from `listing_url`
///
/// A URL that already classifies as a detail page is returned as-is without
/// being fetched. Otherwise the page is fetched with its site's default
/// strategy (plain HTTP for unregistered sites) and scanned for same-domain
/// links that classify as detail pages.
pub async fn find_detail_links(
    fetcher: &dyn PageFetcher,
    registry: &Registry,
    listing_url: &str,
    max_links: usize,
) -> Vec<String> {
    if max_links == 0 {
        return Vec::new();
    }

    let listing = CandidateUrl::new(listing_url, None);
    if listing.class.is_detail() {
        return vec![listing.canonical];
    }
    if listing.domain.is_empty() {
        tracing::debug!("Skipping sublink crawl of non-absolute URL {}", listing_url);
        return Vec::new();
    }

    let parser = registry.lookup_str(&listing.canonical);
    let strategy = parser
        .map(|p| p.default_strategy())
        .unwrap_or(Strategy::Plain);
    let containers = parser.map(|p| p.link_containers()).unwrap_or(&[]);

    let result = fetcher.fetch(&listing.canonical, strategy).await;
    if !result.is_ok() {
        tracing::warn!(
            "Sublink crawl of {} failed ({}): {}",
            listing.canonical,
            result.status.as_str(),
            result.error_message().unwrap_or("no detail")
        );
        return Vec::new();
    }

    let links = extract_detail_links(&listing, &result.html, containers, max_links);
    tracing::debug!(
        "Found {} detail links on {}",
        links.len(),
        listing.canonical
    );
    links
}

/// Extracts detail links from a fetched listing page
///
/// Container selectors are tried first, in order; the first one that yields
/// any detail link wins. Without containers, or when none of them yields
/// anything, every anchor on the page is scanned.
///
/// Links under the listing's own top-level path section come first; document
/// order is kept within each group.
pub fn extract_detail_links(
    listing: &CandidateUrl,
    html: &str,
    containers: &[&str],
    max_links: usize,
) -> Vec<String> {
    let document = Html::parse_document(html);

    let mut links = Vec::new();
    for container in containers {
        let selector = match Selector::parse(container) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Invalid container selector '{}': {:?}", container, e);
                continue;
            }
        };
        let hrefs = document.select(&selector).flat_map(container_hrefs);
        links = filter_links(listing, hrefs);
        if !links.is_empty() {
            break;
        }
    }

    if links.is_empty() {
        let hrefs = document
            .select(&ANCHOR)
            .filter_map(|a| a.value().attr("href"));
        links = filter_links(listing, hrefs);
    }

    let section = path_section(&listing.canonical);
    let (mut preferred, others): (Vec<String>, Vec<String>) = links
        .into_iter()
        .partition(|link| section.as_deref().map_or(false, |s| in_section(link, s)));
    preferred.extend(others);
    preferred.truncate(max_links);
    preferred
}

/// The container's own href when it is an anchor, else its descendant anchors
fn container_hrefs<'a>(container: ElementRef<'a>) -> Vec<&'a str> {
    if container.value().name() == "a" {
        return container.value().attr("href").into_iter().collect();
    }
    container
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .collect()
}

fn filter_links<'a>(listing: &CandidateUrl, hrefs: impl Iterator<Item = &'a str>) -> Vec<String> {
    let site = listing
        .domain
        .strip_prefix("www.")
        .unwrap_or(listing.domain.as_str());
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in hrefs {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            continue;
        }

        let candidate = CandidateUrl::new(href, Some(&listing.canonical));
        if !candidate.class.is_detail()
            || !matches_domain_suffix(site, &candidate.domain)
            || candidate.canonical == listing.canonical
        {
            continue;
        }
        if seen.insert(candidate.canonical.clone()) {
            links.push(candidate.canonical);
        }
    }

    links
}

/// First path segment of a listing URL with at least two segments
fn path_section(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let first = segments.next()?;
    segments.next()?;
    Some(first.to_string())
}

fn in_section(link: &str, section: &str) -> bool {
    Url::parse(link)
        .ok()
        .and_then(|u| u.path_segments().and_then(|mut s| s.next().map(str::to_string)))
        .map_or(false, |first| first == section)
}
