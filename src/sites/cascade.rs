//! Generic field-extraction cascade
//!
//! Every output field is resolved on its own through an ordered list of
//! [`FieldExtractor`]s; the first non-empty value wins. A record can therefore
//! combine a title taken from markup with a price taken from a JSON island.
//!
//! # Tier order
//!
//! Extractors run in canonical tier order regardless of the order a site
//! declares them in:
//!
//! 1. [`Tier::Selector`] - known markup locations, most specific first
//! 2. [`Tier::Label`] - label-anchored or unit-anchored text scanning
//! 3. [`Tier::StructuredData`] - JSON-LD islands
//! 4. [`Tier::EmbeddedState`] - hydration payloads such as `__NEXT_DATA__`
//!
//! Within a tier the declared order is kept. A site that needs a different
//! order for one field opts out with [`FieldPlan::in_declared_order`].
//!
//! Documents are parsed and queried synchronously; nothing here holds a
//! parsed document across an await point.

use super::extractors::normalize_phone;
use super::ListingFields;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::cell::OnceCell;
use url::Url;

lazy_static! {
    static ref JSON_LD: Selector = Selector::parse("script[type='application/ld+json']").unwrap();
    static ref NEXT_DATA: Selector = Selector::parse("script#__NEXT_DATA__").unwrap();
    static ref SCRIPT: Selector = Selector::parse("script").unwrap();
    static ref WINDOW_STATE: Regex =
        Regex::new(r"(?s)^\s*window\.__[A-Za-z_]+__\s*=\s*(\{.*\})\s*;?\s*$").unwrap();
}

/// Extraction technique class, in canonical priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Selector,
    Label,
    StructuredData,
    EmbeddedState,
}

/// A resolvable output field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Price,
    Area,
    Description,
    Image,
    ContactName,
    Phone,
}

/// One way of finding one field's value in a page
///
/// Implementations never fail: finding nothing is `None`.
pub trait FieldExtractor: Send + Sync {
    fn tier(&self) -> Tier;

    fn extract(&self, page: &PageContext) -> Option<String>;
}

/// A parsed page with lazily computed views shared by all extractors
pub struct PageContext<'a> {
    pub url: &'a Url,
    pub document: Html,
    text: OnceCell<String>,
    json_ld: OnceCell<Vec<Value>>,
    state: OnceCell<Vec<Value>>,
}

impl<'a> PageContext<'a> {
    pub fn new(url: &'a Url, html: &str) -> Self {
        Self {
            url,
            document: Html::parse_document(html),
            text: OnceCell::new(),
            json_ld: OnceCell::new(),
            state: OnceCell::new(),
        }
    }

    /// Visible text of the whole page, one space between text nodes
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| visible_text(&self.document))
    }

    /// Every JSON-LD object on the page, with arrays and `@graph` flattened
    pub fn json_ld(&self) -> &[Value] {
        self.json_ld.get_or_init(|| {
            let mut items = Vec::new();
            for script in self.document.select(&JSON_LD) {
                let raw: String = script.text().collect();
                match serde_json::from_str::<Value>(raw.trim()) {
                    Ok(value) => flatten_json_ld(value, &mut items),
                    Err(e) => tracing::trace!("Skipping unreadable JSON-LD block: {}", e),
                }
            }
            items
        })
    }

    /// Embedded application-state payloads (`__NEXT_DATA__`, `window.__X__ = {...}`)
    pub fn state(&self) -> &[Value] {
        self.state.get_or_init(|| {
            let mut payloads = Vec::new();
            for script in self.document.select(&NEXT_DATA) {
                let raw: String = script.text().collect();
                if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
                    payloads.push(value);
                }
            }
            for script in self.document.select(&SCRIPT) {
                let raw: String = script.text().collect();
                if let Some(json) = WINDOW_STATE.captures(&raw).and_then(|c| c.get(1)) {
                    if let Ok(value) = serde_json::from_str::<Value>(json.as_str()) {
                        payloads.push(value);
                    }
                }
            }
            payloads
        })
    }
}

fn flatten_json_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_json_ld(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_json_ld(graph, out);
            }
            if !map.is_empty() {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

fn is_hidden_container(name: &str) -> bool {
    matches!(name, "script" | "style" | "noscript" | "template")
}

fn visible_text(document: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map_or(false, |e| is_hidden_container(e.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}

/// Text of an element, one space between text nodes
pub fn element_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The ordered extractors for one field
pub struct FieldPlan {
    field: Field,
    extractors: Vec<Box<dyn FieldExtractor>>,
    declared_order: bool,
}

impl FieldPlan {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            extractors: Vec::new(),
            declared_order: false,
        }
    }

    /// Appends an extractor
    pub fn then(mut self, extractor: impl FieldExtractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    /// Runs extractors exactly in the order they were added
    pub fn in_declared_order(mut self) -> Self {
        self.declared_order = true;
        self
    }

    pub fn field(&self) -> Field {
        self.field
    }

    /// Returns the first non-empty value any extractor finds
    pub fn resolve(&self, page: &PageContext) -> Option<String> {
        let mut order: Vec<&dyn FieldExtractor> =
            self.extractors.iter().map(|e| e.as_ref()).collect();
        if !self.declared_order {
            order.sort_by_key(|e| e.tier());
        }

        for extractor in order {
            if let Some(value) = extractor.extract(page) {
                let value = value.trim();
                if !value.is_empty() {
                    tracing::trace!(
                        "{:?} resolved from {:?} tier on {}",
                        self.field,
                        extractor.tier(),
                        page.url
                    );
                    return Some(value.to_string());
                }
            }
        }

        None
    }
}

/// All field plans of one site
pub struct Cascade {
    plans: Vec<FieldPlan>,
}

impl Cascade {
    pub fn new(plans: Vec<FieldPlan>) -> Self {
        Self { plans }
    }

    /// Resolves every field of a page
    ///
    /// Fields with no plan, or whose plan finds nothing, stay empty. The
    /// image is made absolute against the page URL and the contact is
    /// assembled from name and phone.
    pub fn run(&self, url: &Url, html: &str) -> ListingFields {
        let page = PageContext::new(url, html);
        let mut fields = ListingFields::default();
        let mut name = String::new();
        let mut phone = String::new();

        for plan in &self.plans {
            let Some(value) = plan.resolve(&page) else {
                continue;
            };
            match plan.field() {
                Field::Title => fields.title = value,
                Field::Price => fields.price = value,
                Field::Area => fields.area = value,
                Field::Description => fields.description = value,
                Field::Image => fields.image = absolutize(url, &value),
                Field::ContactName => name = value,
                Field::Phone => phone = normalize_phone(&value),
            }
        }

        fields.contact = assemble_contact(&name, &phone);
        fields
    }
}

/// Resolves a possibly relative image reference against the page URL
pub fn absolutize(base: &Url, reference: &str) -> String {
    base.join(reference.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| reference.trim().to_string())
}

/// Joins a contact name and phone as "name - phone"
///
/// # Examples
///
/// ```
/// use bds_harvest::sites::assemble_contact;
///
/// assert_eq!(assemble_contact("Anh Tuấn", "0903123456"), "Anh Tuấn - 0903123456");
/// assert_eq!(assemble_contact("", "0903123456"), "0903123456");
/// assert_eq!(assemble_contact("Chị Lan", ""), "Chị Lan");
/// ```
pub fn assemble_contact(name: &str, phone: &str) -> String {
    let joined = if phone.trim().is_empty() {
        name.to_string()
    } else {
        format!("{} - {}", name.trim(), phone.trim())
    };
    joined
        .trim_matches(|c: char| c == ' ' || c == '-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Tier, Option<&'static str>);

    impl FieldExtractor for Fixed {
        fn tier(&self) -> Tier {
            self.0
        }

        fn extract(&self, _page: &PageContext) -> Option<String> {
            self.1.map(str::to_string)
        }
    }

    fn page_url() -> Url {
        Url::parse("https://example.com/a/b-1234567.html").unwrap()
    }

    #[test]
    fn test_first_non_empty_wins() {
        let url = page_url();
        let page = PageContext::new(&url, "<html></html>");
        let plan = FieldPlan::new(Field::Price)
            .then(Fixed(Tier::Selector, None))
            .then(Fixed(Tier::Selector, Some("   ")))
            .then(Fixed(Tier::Label, Some(" 7,9 tỷ ")))
            .then(Fixed(Tier::StructuredData, Some("7900000000 VND")));

        assert_eq!(plan.resolve(&page), Some("7,9 tỷ".to_string()));
    }

    #[test]
    fn test_canonical_order_overrides_declaration() {
        let url = page_url();
        let page = PageContext::new(&url, "<html></html>");
        let plan = FieldPlan::new(Field::Area)
            .then(Fixed(Tier::EmbeddedState, Some("from-state")))
            .then(Fixed(Tier::Label, Some("from-label")));

        assert_eq!(plan.resolve(&page), Some("from-label".to_string()));
    }

    #[test]
    fn test_declared_order_override() {
        let url = page_url();
        let page = PageContext::new(&url, "<html></html>");
        let plan = FieldPlan::new(Field::Area)
            .then(Fixed(Tier::EmbeddedState, Some("from-state")))
            .then(Fixed(Tier::Label, Some("from-label")))
            .in_declared_order();

        assert_eq!(plan.resolve(&page), Some("from-state".to_string()));
    }

    #[test]
    fn test_visible_text_skips_scripts_and_styles() {
        let url = page_url();
        let page = PageContext::new(
            &url,
            r#"<html><head><style>.a{}</style><script>var x = "0903123456";</script></head>
               <body><h1> Bán nhà </h1><p>Diện tích <b>62 m²</b></p></body></html>"#,
        );
        assert_eq!(page.text(), "Bán nhà Diện tích 62 m²");
    }

    #[test]
    fn test_json_ld_flattens_graph_and_arrays() {
        let url = page_url();
        let page = PageContext::new(
            &url,
            r#"<script type="application/ld+json">
                 {"@context": "https://schema.org", "@graph": [{"@type": "Product", "name": "A"}, {"@type": "BreadcrumbList"}]}
               </script>
               <script type="application/ld+json">[{"@type": "Offer", "price": 5}]</script>
               <script type="application/ld+json">{not json</script>"#,
        );
        assert_eq!(page.json_ld().len(), 4);
    }

    #[test]
    fn test_state_payloads() {
        let url = page_url();
        let page = PageContext::new(
            &url,
            r#"<script id="__NEXT_DATA__" type="application/json">{"props": {"ad": {"subject": "X"}}}</script>
               <script>window.__INITIAL_STATE__ = {"adView": {"price": 1}};</script>
               <script>console.log("hi")</script>"#,
        );
        assert_eq!(page.state().len(), 2);
    }

    #[test]
    fn test_run_assembles_contact_and_absolute_image() {
        let url = page_url();
        let cascade = Cascade::new(vec![
            FieldPlan::new(Field::Image).then(Fixed(Tier::Selector, Some("/img/1.jpg"))),
            FieldPlan::new(Field::ContactName).then(Fixed(Tier::Selector, Some("Anh Nam"))),
            FieldPlan::new(Field::Phone).then(Fixed(Tier::Selector, Some("0903123456"))),
        ]);

        let fields = cascade.run(&url, "<html></html>");
        assert_eq!(fields.image, "https://example.com/img/1.jpg");
        assert_eq!(fields.contact, "Anh Nam - 0903123456");
        assert!(fields.title.is_empty());
    }

    #[test]
    fn test_assemble_contact_trims_separators() {
        assert_eq!(assemble_contact("", ""), "");
        assert_eq!(assemble_contact("  Anh Nam ", ""), "Anh Nam");
        assert_eq!(assemble_contact("- Anh Nam", ""), "Anh Nam");
    }
}
