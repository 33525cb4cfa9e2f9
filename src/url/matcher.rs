/// Checks if a host belongs to a registered domain
///
/// The registered domain matches the host itself and any of its subdomains,
/// but never a host that merely ends with the same characters:
///
/// - "alonhadat.com.vn" matches "alonhadat.com.vn" and "www.alonhadat.com.vn"
/// - "batdongsan.com.vn" does not match "i-batdongsan.com.vn"
///
/// # Examples
///
/// ```
/// use bds_harvest::url::matches_domain_suffix;
///
/// assert!(matches_domain_suffix("batdongsan.com.vn", "batdongsan.com.vn"));
/// assert!(matches_domain_suffix("batdongsan.com.vn", "www.batdongsan.com.vn"));
/// assert!(!matches_domain_suffix("batdongsan.com", "i-batdongsan.com"));
/// ```
pub fn matches_domain_suffix(domain: &str, host: &str) -> bool {
    if domain.is_empty() {
        return false;
    }

    host == domain
        || host
            .strip_suffix(domain)
            .map_or(false, |prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_domain_suffix("nhatot.com", "nhatot.com"));
        assert!(matches_domain_suffix("muaban.net", "muaban.net"));
    }

    #[test]
    fn test_subdomain_match() {
        assert!(matches_domain_suffix("nhatot.com", "www.nhatot.com"));
        assert!(matches_domain_suffix("alonhadat.com.vn", "m.alonhadat.com.vn"));
        assert!(matches_domain_suffix("guland.vn", "deep.sub.guland.vn"));
    }

    #[test]
    fn test_no_partial_label_match() {
        assert!(!matches_domain_suffix("batdongsan.com", "i-batdongsan.com"));
        assert!(!matches_domain_suffix("land.vn", "guland.vn"));
    }

    #[test]
    fn test_different_domain() {
        assert!(!matches_domain_suffix("nhatot.com", "chotot.com"));
        assert!(!matches_domain_suffix("nhatot.com", "nhatot.com.evil.org"));
    }

    #[test]
    fn test_empty_strings() {
        assert!(!matches_domain_suffix("", "example.com"));
        assert!(!matches_domain_suffix("example.com", ""));
    }
}
