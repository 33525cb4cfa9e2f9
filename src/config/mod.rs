//! Configuration module for bds-harvest
//!
//! A single [`RunConfig`] is loaded from TOML, validated once, and handed to
//! every component. Nothing in the crate reads process environment.
//!
//! # Example
//!
//! ```no_run
//! use bds_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! for quota in &config.quota {
//!     println!("{} may contribute {} listings", quota.domain, quota.count);
//! }
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AggregateConfig, FetchConfig, QuotaEntry, RunConfig, SearchConfig, SessionEntry,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
