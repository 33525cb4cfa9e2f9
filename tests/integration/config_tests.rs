//! Configuration loading from files on disk

use bds_harvest::config::{load_config, load_config_with_hash, QuotaEntry};
use bds_harvest::ConfigError;
use std::io::Write;
use tempfile::NamedTempFile;

const SAMPLE: &str = include_str!("../../harvest.example.toml");

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_sample_config_loads() {
    let file = write_temp(SAMPLE);

    let (config, hash) = load_config_with_hash(file.path()).unwrap();

    assert_eq!(hash.len(), 64);
    assert_eq!(config.search.api_key, "YOUR-API-KEY");
    assert_eq!(config.aggregate.first_batch_size, 10);
    assert_eq!(config.aggregate.domain_spacing_ms, 500);
    assert_eq!(config.aggregate.deadline_secs, None);
    assert_eq!(
        config.quota,
        vec![
            QuotaEntry::new("batdongsan.com.vn", 6),
            QuotaEntry::new("alonhadat.com.vn", 4),
        ]
    );
}

#[test]
fn test_sessions_and_overrides() {
    let file = write_temp(
        r#"
[fetch]
force-strategy = "antibot"
archive-url-template = "https://web.archive.org/web/2/{url}"

[[fetch.session]]
domain = "batdongsan.com.vn"
path = "sessions/batdongsan.json"

[aggregate]
deadline-secs = 90

[[quota]]
domain = "guland.vn"
count = 3
"#,
    );

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.fetch.force_strategy.as_deref(), Some("antibot"));
    assert_eq!(config.fetch.session.len(), 1);
    assert_eq!(config.fetch.session[0].domain, "batdongsan.com.vn");
    assert_eq!(config.aggregate.deadline_secs, Some(90));
    assert_eq!(config.quota, vec![QuotaEntry::new("guland.vn", 3)]);
}

#[test]
fn test_invalid_config_is_rejected() {
    let file = write_temp("[search]\npage-size = 20\n");

    let err = load_config(file.path()).unwrap_err();

    assert!(matches!(err, ConfigError::Validation(_)));
}
