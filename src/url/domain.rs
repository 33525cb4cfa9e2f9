use url::Url;

/// Extracts the lowercase host from a URL string
///
/// Returns `None` for unparseable URLs and URLs without a host.
///
/// # Examples
///
/// ```
/// use bds_harvest::url::extract_domain;
///
/// assert_eq!(
///     extract_domain("https://WWW.Nhatot.com/mua-ban-nha-dat/113456789.htm"),
///     Some("www.nhatot.com".to_string())
/// );
/// assert_eq!(extract_domain("/relative/path"), None);
/// ```
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}
