//! Site parser registry
//!
//! Each supported domain has one [`SiteParser`] implementation that knows
//! the domain's markup and its most reliable fetch strategy. The
//! [`Registry`] picks the parser for a URL by domain suffix.

mod alonhadat;
mod batdongsan;
pub mod cascade;
pub mod extractors;
mod guland;
mod i_batdongsan;
mod muaban;
mod nhatot;

pub use alonhadat::Alonhadat;
pub use batdongsan::Batdongsan;
pub use cascade::{assemble_contact, Cascade, Field, FieldExtractor, FieldPlan, PageContext, Tier};
pub use guland::Guland;
pub use i_batdongsan::IBatdongsan;
pub use muaban::Muaban;
pub use nhatot::Nhatot;

use crate::fetch::Strategy;
use crate::url::matches_domain_suffix;
use serde::Serialize;
use url::Url;

/// Fields extracted from one listing page
///
/// Unresolved fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingFields {
    pub title: String,
    pub price: String,
    pub area: String,
    pub description: String,
    pub image: String,
    pub contact: String,
}

impl ListingFields {
    /// Returns true if no field was resolved
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.price.is_empty()
            && self.area.is_empty()
            && self.description.is_empty()
            && self.image.is_empty()
            && self.contact.is_empty()
    }

    /// Returns true if a field a listing cannot do without is unresolved
    pub fn missing_required(&self) -> bool {
        self.title.is_empty() || self.price.is_empty()
    }

    /// Fills empty fields from `other`, keeping fields already resolved
    pub fn fill_from(&mut self, other: ListingFields) {
        fn fill(slot: &mut String, value: String) {
            if slot.is_empty() {
                *slot = value;
            }
        }

        fill(&mut self.title, other.title);
        fill(&mut self.price, other.price);
        fill(&mut self.area, other.area);
        fill(&mut self.description, other.description);
        fill(&mut self.image, other.image);
        fill(&mut self.contact, other.contact);
    }
}

/// Parser for one listing site
pub trait SiteParser: Send + Sync {
    /// Registered domain, matched as a suffix of the URL host
    fn domain(&self) -> &'static str;

    /// The fetch strategy that works most reliably for this site
    fn default_strategy(&self) -> Strategy;

    /// Extracts listing fields from a detail page
    fn parse(&self, url: &Url, html: &str) -> ListingFields;

    /// Selectors of listing-card containers used when harvesting detail
    /// links; empty means the whole page is scanned
    fn link_containers(&self) -> &'static [&'static str] {
        &[]
    }

    /// Public read API endpoint for a listing, used as the last extraction tier
    fn api_url(&self, _url: &Url) -> Option<String> {
        None
    }

    /// Extracts listing fields from the read API's JSON response
    fn parse_api(&self, _url: &Url, _body: &serde_json::Value) -> ListingFields {
        ListingFields::default()
    }
}

/// Domain-suffix lookup over the registered parsers
pub struct Registry {
    parsers: Vec<Box<dyn SiteParser>>,
}

impl Registry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Creates a registry with every built-in site parser
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Batdongsan::new());
        registry.register(Alonhadat::new());
        registry.register(Guland::new());
        registry.register(Nhatot::new());
        registry.register(Muaban::new());
        registry.register(IBatdongsan::new());
        registry
    }

    /// Adds a parser; earlier registrations win on overlapping domains
    pub fn register(&mut self, parser: impl SiteParser + 'static) {
        tracing::debug!(
            "Registered parser for {} ({})",
            parser.domain(),
            parser.default_strategy()
        );
        self.parsers.push(Box::new(parser));
    }

    /// Finds the parser responsible for a URL
    ///
    /// # Examples
    ///
    /// ```
    /// use bds_harvest::sites::Registry;
    /// use bds_harvest::Strategy;
    /// use url::Url;
    ///
    /// let registry = Registry::with_defaults();
    /// let url = Url::parse("https://www.nhatot.com/mua-ban-nha-dat/113456789.htm").unwrap();
    /// let parser = registry.lookup(&url).unwrap();
    /// assert_eq!(parser.default_strategy(), Strategy::Browser);
    ///
    /// let unknown = Url::parse("https://example.com/tin-1234567").unwrap();
    /// assert!(registry.lookup(&unknown).is_none());
    /// ```
    pub fn lookup(&self, url: &Url) -> Option<&dyn SiteParser> {
        let host = url.host_str()?.to_lowercase();
        self.parsers
            .iter()
            .find(|p| matches_domain_suffix(p.domain(), &host))
            .map(|p| p.as_ref())
    }

    /// Like [`Registry::lookup`] for an unparsed URL string
    pub fn lookup_str(&self, url: &str) -> Option<&dyn SiteParser> {
        Url::parse(url).ok().and_then(|u| self.lookup(&u))
    }

    /// Registered domains in registration order
    pub fn domains(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.domain()).collect()
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
