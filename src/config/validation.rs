use crate::config::types::{AggregateConfig, FetchConfig, QuotaEntry, RunConfig, SearchConfig};
use crate::fetch::Strategy;
use crate::search::RESULT_WINDOW;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &RunConfig) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_fetch_config(&config.fetch)?;
    validate_aggregate_config(&config.aggregate)?;
    validate_quotas(&config.quota)?;
    Ok(())
}

/// Validates search API configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid search endpoint: {}", e)))?;

    if config.page_size < 1 || config.page_size > 10 {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and 10, got {}",
            config.page_size
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1".to_string(),
        ));
    }

    let window = config.page_size.saturating_mul(config.max_pages);
    if window > RESULT_WINDOW {
        return Err(ConfigError::Validation(format!(
            "page-size * max-pages must not exceed {} (the API result window), got {}",
            RESULT_WINDOW, window
        )));
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.browser_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch timeouts must be >= 1 second".to_string(),
        ));
    }

    if let Some(name) = &config.force_strategy {
        if name.parse::<Strategy>().is_err() {
            return Err(ConfigError::Validation(format!(
                "force-strategy must be one of plain, antibot, browser; got '{}'",
                name
            )));
        }
    }

    if let Some(template) = &config.archive_url_template {
        if !template.contains("{url}") {
            return Err(ConfigError::Validation(format!(
                "archive-url-template must contain a {{url}} placeholder, got '{}'",
                template
            )));
        }
    }

    for entry in &config.session {
        validate_domain_string(&entry.domain)?;
        if entry.path.is_empty() {
            return Err(ConfigError::Validation(format!(
                "session path for '{}' cannot be empty",
                entry.domain
            )));
        }
    }

    Ok(())
}

/// Validates aggregation configuration
fn validate_aggregate_config(config: &AggregateConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-fetches must be between 1 and 64, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.per_domain_concurrency < 1 {
        return Err(ConfigError::Validation(
            "per-domain-concurrency must be >= 1".to_string(),
        ));
    }

    if config.first_batch_size > config.target_total {
        return Err(ConfigError::Validation(format!(
            "first-batch-size ({}) cannot exceed target-total ({})",
            config.first_batch_size, config.target_total
        )));
    }

    Ok(())
}

/// Validates the ordered quota list
fn validate_quotas(quotas: &[QuotaEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in quotas {
        validate_domain_string(&entry.domain)?;

        if entry.count == 0 {
            return Err(ConfigError::Validation(format!(
                "Quota for '{}' must be >= 1",
                entry.domain
            )));
        }

        if !seen.insert(entry.domain.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate quota entry for '{}'",
                entry.domain
            )));
        }
    }

    Ok(())
}

/// Validates a bare domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::Validation("Domain cannot be empty".to_string()));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
        || domain.contains("..")
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' is malformed",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
