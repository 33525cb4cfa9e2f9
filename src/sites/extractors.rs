//! Reusable field extractors
//!
//! Site parsers compose these into [`FieldPlan`](super::FieldPlan)s. Every
//! constructor accepts plain selector/regex strings; a string that does not
//! compile yields an extractor that never matches, with a warning logged.

use super::cascade::{element_text, FieldExtractor, PageContext, Tier};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::Selector;
use serde_json::Value;

lazy_static! {
    /// "62 m²", "1.200,5 m2"
    pub static ref AREA_RE: Regex = Regex::new(r"(?i)\d[\d.,]*\s*m(?:2\b|²)").unwrap();
    /// Vietnamese mobile and landline numbers
    pub static ref VN_PHONE_RE: Regex = Regex::new(r"(?:\+?84|0)\d{8,11}").unwrap();
    /// "Giá: 7,9 tỷ", "Price - 12 triệu/tháng"
    pub static ref PRICE_LABEL_RE: Regex = Regex::new(
        r"(?i)(?:Mức giá|Giá|Price)\s*[:\-]?\s*(\S.{0,50}?)(?:$|\s{2,}|\s(?:Diện tích|Area|Hướng|Phòng ngủ)\b)"
    )
    .unwrap();
    static ref TEL_LINK: Selector = Selector::parse("a[href^='tel:']").unwrap();
    static ref NON_PHONE_CHARS: Regex = Regex::new(r"[^\d+]").unwrap();
    static ref NON_MASK_CHARS: Regex = Regex::new(r"[^0-9+*xX•● ]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Characters sites use to hide phone digits
const MASK_CHARS: &[char] = &['*', 'x', 'X', '•', '●'];

/// JSON-LD `@type`s that describe a listing or its page
const LISTING_LD_TYPES: &[&str] = &[
    "product",
    "offer",
    "apartment",
    "house",
    "singlefamilyresidence",
    "place",
    "realestatelisting",
    "realestateagent",
    "newsarticle",
    "article",
    "webpage",
];

fn compile_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!("Invalid selector '{}': {:?}", selector, e);
            None
        }
    }
}

fn compile_regex(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(r) => Some(r),
        Err(e) => {
            tracing::warn!("Invalid pattern '{}': {}", pattern, e);
            None
        }
    }
}

/// Keeps only digits and `+`
pub fn clean_phone(raw: &str) -> String {
    NON_PHONE_CHARS.replace_all(raw, "").into_owned()
}

/// Reduces a revealed number to digits; masked numbers are kept as shown
pub fn normalize_phone(raw: &str) -> String {
    if raw.contains(MASK_CHARS) {
        raw.trim().to_string()
    } else {
        clean_phone(raw)
    }
}

/// Text of the first element matching a selector
pub struct Css {
    selector: Option<Selector>,
}

/// Text of the first element matching `selector`
pub fn css(selector: &str) -> Css {
    Css {
        selector: compile_selector(selector),
    }
}

impl FieldExtractor for Css {
    fn tier(&self) -> Tier {
        Tier::Selector
    }

    fn extract(&self, page: &PageContext) -> Option<String> {
        let selector = self.selector.as_ref()?;
        page.document
            .select(selector)
            .map(element_text)
            .find(|t| !t.is_empty())
    }
}

/// Text of the n-th element matching a selector
pub struct NthCss {
    selector: Option<Selector>,
    index: usize,
}

/// Text of the `index`-th (0-based) element matching `selector`
pub fn nth(selector: &str, index: usize) -> NthCss {
    NthCss {
        selector: compile_selector(selector),
        index,
    }
}

impl FieldExtractor for NthCss {
    fn tier(&self) -> Tier {
        Tier::Selector
    }

    fn extract(&self, page: &PageContext) -> Option<String> {
        let selector = self.selector.as_ref()?;
        page.document
            .select(selector)
            .nth(self.index)
            .map(element_text)
    }
}

/// First non-empty attribute among matching elements
pub struct Attr {
    selector: Option<Selector>,
    names: &'static [&'static str],
}

/// First non-empty attribute out of `names` on elements matching `selector`
///
/// Elements are tried in document order; on each, attributes are tried in
/// the order given.
pub fn attr(selector: &str, names: &'static [&'static str]) -> Attr {
    Attr {
        selector: compile_selector(selector),
        names,
    }
}

/// Content of an Open Graph `<meta property=...>` tag
pub fn og(property: &str) -> Attr {
    attr(&format!("meta[property='{}']", property), &["content"])
}

/// Image source attributes, lazy-loading variants included
pub const IMG_SRC: &[&str] = &["src", "data-src", "data-lazy", "data-original"];

impl FieldExtractor for Attr {
    fn tier(&self) -> Tier {
        Tier::Selector
    }

    fn extract(&self, page: &PageContext) -> Option<String> {
        let selector = self.selector.as_ref()?;
        page.document.select(selector).find_map(|el| {
            self.names
                .iter()
                .filter_map(|name| el.value().attr(name))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .map(str::to_string)
        })
    }
}

/// Regex capture from the first row whose text carries a label
pub struct LabelScan {
    rows: Option<Selector>,
    label: Option<Regex>,
    value: Regex,
    group: usize,
}

/// Scans `rows` for one whose text matches `label`, then captures `value`
///
/// With `group` 0 the whole match is returned.
pub fn label_scan(rows: &str, label: &str, value: &Regex, group: usize) -> LabelScan {
    LabelScan {
        rows: compile_selector(rows),
        label: compile_regex(label),
        value: value.clone(),
        group,
    }
}

impl FieldExtractor for LabelScan {
    fn tier(&self) -> Tier {
        Tier::Label
    }

    fn extract(&self, page: &PageContext) -> Option<String> {
        let rows = self.rows.as_ref()?;
        let label = self.label.as_ref()?;

        page.document
            .select(rows)
            .map(element_text)
            .filter(|text| label.is_match(text))
            .find_map(|text| {
                self.value
                    .captures(&text)
                    .and_then(|c| c.get(self.group))
                    .map(|m| m.as_str().trim().to_string())
            })
    }
}

/// Regex over the visible text of the whole page
pub struct TextRegex {
    re: Regex,
    group: usize,
}

/// First match of `re` in the page's visible text
pub fn text_regex(re: &Regex, group: usize) -> TextRegex {
    TextRegex {
        re: re.clone(),
        group,
    }
}

impl FieldExtractor for TextRegex {
    fn tier(&self) -> Tier {
        Tier::Label
    }

    fn extract(&self, page: &PageContext) -> Option<String> {
        self.re
            .captures(page.text())
            .and_then(|c| c.get(self.group))
            .map(|m| m.as_str().to_string())
    }
}

/// Phone number taken from an element's text or its `tel:` link
pub struct PhoneLink {
    selector: Option<Selector>,
}

/// Phone from the first `a[href^='tel:']` on the page
pub fn tel_link() -> PhoneLink {
    PhoneLink {
        selector: Some(TEL_LINK.clone()),
    }
}

/// Phone from the first element matching `selector`, digits only
pub fn phone_at(selector: &str) -> PhoneLink {
    PhoneLink {
        selector: compile_selector(selector),
    }
}

impl FieldExtractor for PhoneLink {
    fn tier(&self) -> Tier {
        Tier::Selector
    }

    fn extract(&self, page: &PageContext) -> Option<String> {
        let selector = self.selector.as_ref()?;
        page.document.select(selector).find_map(|el| {
            let from_text = clean_phone(&element_text(el));
            if !from_text.is_empty() {
                return Some(from_text);
            }
            el.value()
                .attr("href")
                .and_then(|h| h.strip_prefix("tel:"))
                .map(clean_phone)
                .filter(|p| !p.is_empty())
        })
    }
}

/// Phone box that may show a partially hidden number
///
/// A revealed number (nine or more digits) is returned digits-only. A masked
/// number such as "0903 *** ***" is kept with its mask characters, as long
/// as it carries at least one digit.
pub struct MaskedPhone {
    selector: Option<Selector>,
}

pub fn masked_phone(selector: &str) -> MaskedPhone {
    MaskedPhone {
        selector: compile_selector(selector),
    }
}

/// Interprets the text of a phone box
pub fn read_phone_box(raw: &str) -> Option<String> {
    let digits = clean_phone(raw);
    if digits.chars().filter(|c| c.is_ascii_digit()).count() >= 9 {
        return Some(digits);
    }

    let masked = NON_MASK_CHARS.replace_all(raw, "");
    let masked = WHITESPACE.replace_all(masked.trim(), " ").into_owned();
    let has_mask = masked.contains(MASK_CHARS);
    let has_digit = masked.chars().any(|c| c.is_ascii_digit());

    (has_mask && has_digit).then_some(masked)
}

impl FieldExtractor for MaskedPhone {
    fn tier(&self) -> Tier {
        Tier::Selector
    }

    fn extract(&self, page: &PageContext) -> Option<String> {
        let selector = self.selector.as_ref()?;
        page.document
            .select(selector)
            .find_map(|el| read_phone_box(&element_text(el)))
    }
}

/// Returns a display string for a JSON value
///
/// Strings and numbers are returned as-is. Arrays yield their first
/// displayable element; objects their `url`, `full_path` or `contentUrl`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(scalar_text),
        Value::Object(map) => ["url", "full_path", "contentUrl"]
            .iter()
            .filter_map(|k| map.get(*k))
            .find_map(scalar_text),
        _ => None,
    }
}

/// Depth-first search for the first recognized key with a displayable value
///
/// Key comparison ignores ASCII case. A matching key whose value is not
/// displayable is searched into rather than returned.
pub fn find_key(value: &Value, keys: &[&str]) -> Option<String> {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if keys.iter().any(|key| key.eq_ignore_ascii_case(k)) {
                    if let Some(text) = scalar_text(v) {
                        return Some(text);
                    }
                }
                if let Some(found) = find_key(v, keys) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| find_key(item, keys)),
        _ => None,
    }
}

fn is_listing_ld(item: &Value) -> bool {
    let matches = |t: &str| LISTING_LD_TYPES.contains(&t.to_ascii_lowercase().as_str());
    match item.get("@type") {
        Some(Value::String(t)) => matches(t),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

/// Recognized keys in JSON-LD listing objects
pub struct JsonLd {
    keys: &'static [&'static str],
}

/// First of `keys` found in a listing-typed JSON-LD object
pub fn json_ld(keys: &'static [&'static str]) -> JsonLd {
    JsonLd { keys }
}

impl FieldExtractor for JsonLd {
    fn tier(&self) -> Tier {
        Tier::StructuredData
    }

    fn extract(&self, page: &PageContext) -> Option<String> {
        page.json_ld()
            .iter()
            .filter(|item| is_listing_ld(item))
            .find_map(|item| find_key(item, self.keys))
    }
}

/// Offer price with its currency from JSON-LD
pub struct JsonLdPrice;

pub fn json_ld_price() -> JsonLdPrice {
    JsonLdPrice
}

fn offer_price(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(price) = map.get("price").and_then(scalar_text) {
                let currency = map
                    .get("priceCurrency")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                return Some(format!("{} {}", price, currency).trim().to_string());
            }
            map.values().find_map(offer_price)
        }
        Value::Array(items) => items.iter().find_map(offer_price),
        _ => None,
    }
}

impl FieldExtractor for JsonLdPrice {
    fn tier(&self) -> Tier {
        Tier::StructuredData
    }

    fn extract(&self, page: &PageContext) -> Option<String> {
        page.json_ld()
            .iter()
            .filter(|item| is_listing_ld(item))
            .find_map(offer_price)
    }
}

/// Recognized keys in embedded application state
pub struct StateKey {
    keys: &'static [&'static str],
}

/// First of `keys` found anywhere in the page's hydration payloads
pub fn state_key(keys: &'static [&'static str]) -> StateKey {
    StateKey { keys }
}

impl FieldExtractor for StateKey {
    fn tier(&self) -> Tier {
        Tier::EmbeddedState
    }

    fn extract(&self, page: &PageContext) -> Option<String> {
        page.state().iter().find_map(|payload| find_key(payload, self.keys))
    }
}
