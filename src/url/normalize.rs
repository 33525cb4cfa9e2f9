use url::Url;

/// Canonicalizes a URL for deduplication
///
/// # Canonicalization Steps
///
/// 1. Resolve `raw` against `base` when it is relative
/// 2. Remove the query string (tracking parameters are not part of listing identity)
/// 3. Remove the fragment
/// 4. Remove trailing slashes from the path, keeping the root `/`
///
/// The host is lowercased by the URL parser; scheme and `www.` are left alone
/// because they still matter when the page is fetched.
///
/// Never fails: if the input cannot be resolved, it is returned trimmed but
/// otherwise unchanged. Canonicalizing a canonical URL returns it unchanged.
///
/// # Examples
///
/// ```
/// use bds_harvest::url::canonicalize;
///
/// let canon = canonicalize("/ban-nha-17025352.html?utm_source=x#top", Some("https://alonhadat.com.vn/nha-dat/"));
/// assert_eq!(canon, "https://alonhadat.com.vn/ban-nha-17025352.html");
/// ```
pub fn canonicalize(raw: &str, base: Option<&str>) -> String {
    let raw = raw.trim();

    let parsed = match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => base
            .and_then(|b| Url::parse(b).ok())
            .and_then(|b| b.join(raw).ok()),
        Err(_) => None,
    };

    match parsed {
        Some(url) => canonicalize_url(url).to_string(),
        None => raw.to_string(),
    }
}

/// Canonicalizes an already parsed URL
pub fn canonicalize_url(mut url: Url) -> Url {
    url.set_query(None);
    url.set_fragment(None);

    if !url.cannot_be_a_base() {
        let trimmed = trim_trailing_slashes(url.path()).to_string();
        url.set_path(&trimmed);
    }

    url
}

/// Removes trailing slashes unless the path is the root
fn trim_trailing_slashes(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
