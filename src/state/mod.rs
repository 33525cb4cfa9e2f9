//! State module for tracking run progress
//!
//! `DomainState` tracks per-domain request timing and block counts so the
//! crawler can keep its politeness contract with each site.

mod domain_state;

pub use domain_state::DomainState;
