//! Integration tests for bds-harvest
//!
//! Search and fetch tests run against wiremock servers; aggregation tests
//! run the whole controller over fixture pages keyed by URL.

mod aggregate_tests;
mod config_tests;
mod fetch_tests;
mod search_tests;
mod support;
