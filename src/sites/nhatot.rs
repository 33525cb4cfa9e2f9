//! nhatot.com
//!
//! A Next.js site: rendered markup uses hashed class names that drift with
//! every deploy, so the cascade leans on JSON-LD and the `__NEXT_DATA__`
//! payload. When those still leave the title or price empty, the public ad
//! API is queried with the listing id from the URL.

use super::cascade::{Cascade, Field, FieldPlan};
use super::extractors::{
    attr, css, find_key, json_ld, json_ld_price, normalize_phone, og, phone_at, scalar_text,
    state_key, text_regex, AREA_RE, IMG_SRC,
};
use super::{ListingFields, SiteParser};
use crate::fetch::Strategy;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use url::Url;

lazy_static! {
    static ref AD_ID: Regex = Regex::new(r"/(\d{6,})\.htm").unwrap();
}

const AD_API: &str = "https://gateway.chotot.com/v1/public/ad-listing/";

const CONTAINER: &str = "#__next div.pty-container-detail div.ct-detail";

pub struct Nhatot {
    cascade: Cascade,
}

impl Nhatot {
    pub fn new() -> Self {
        let cascade = Cascade::new(vec![
            FieldPlan::new(Field::Title)
                .then(css(&format!("{} div.col-md-8 h1", CONTAINER)))
                .then(css("div.pty-container-detail h1, h1"))
                .then(json_ld(&["name", "headline"]))
                .then(state_key(&["subject", "title", "headline"])),
            FieldPlan::new(Field::Price)
                .then(css(".plmkxo3 .r9vw5if > div > b, .plmkxo3 b"))
                .then(css("[itemprop='price'], .price b, .price"))
                .then(json_ld_price())
                .then(state_key(&["price_string", "price"])),
            // The payload's size field is more reliable than any "m²" in the page text
            FieldPlan::new(Field::Area)
                .then(css(".plmkxo3 .r9vw5if span.brnpcl3.t19tc1ar strong"))
                .then(css(".plmkxo3 .r9vw5if strong"))
                .then(state_key(&["area", "size", "square"]))
                .then(text_regex(&AREA_RE, 0))
                .in_declared_order(),
            FieldPlan::new(Field::Description)
                .then(css(".styles_adBodyCollapse__1Xvk7 p, [itemprop='description']"))
                .then(css(".adBody p, .adBody, .ct-detail p"))
                .then(json_ld(&["description"]))
                .then(state_key(&["body", "description", "content"])),
            FieldPlan::new(Field::Image)
                .then(og("og:image"))
                .then(attr(
                    ".i12je7dy img, .sbxypvz img, img[data-src], img[src$='.jpg'], img[src$='.jpeg']",
                    IMG_SRC,
                ))
                .then(json_ld(&["image"]))
                .then(state_key(&["images", "image"])),
            FieldPlan::new(Field::ContactName)
                .then(css("[class*='SellerInfo_nameBounder'] a [class*='SellerInfo_flexDiv']"))
                .then(css("[class*='SellerInfo'] a"))
                .then(state_key(&["account_name", "sellername", "seller_name", "accountname"])),
            FieldPlan::new(Field::Phone)
                .then(phone_at("a[href^='tel:'], [class*='phone'] a, .js__phone a, .phone a"))
                .then(state_key(&["phone", "phonenum", "phone_number"])),
        ]);

        Self { cascade }
    }
}

impl Default for Nhatot {
    fn default() -> Self {
        Self::new()
    }
}

/// Listing id embedded in a detail URL ("/.../113456789.htm")
fn ad_id(url: &Url) -> Option<&str> {
    AD_ID
        .captures(url.path())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

impl SiteParser for Nhatot {
    fn domain(&self) -> &'static str {
        "nhatot.com"
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Browser
    }

    fn parse(&self, url: &Url, html: &str) -> ListingFields {
        self.cascade.run(url, html)
    }

    fn link_containers(&self) -> &'static [&'static str] {
        &["li[itemprop='itemListElement']", "[class*='AdItem']"]
    }

    fn api_url(&self, url: &Url) -> Option<String> {
        ad_id(url).map(|id| format!("{}{}", AD_API, id))
    }

    fn parse_api(&self, url: &Url, body: &Value) -> ListingFields {
        let Some(ad) = body.get("ad") else {
            return ListingFields::default();
        };
        let text = |keys: &[&str]| find_key(ad, keys).unwrap_or_default();

        let area = match ad.get("size").and_then(scalar_text) {
            Some(size) => format!("{} m²", size),
            None => text(&["area"]),
        };
        let image = ad
            .get("images")
            .and_then(scalar_text)
            .map(|src| super::cascade::absolutize(url, &src))
            .unwrap_or_default();

        ListingFields {
            title: text(&["subject"]),
            price: text(&["price_string", "price"]),
            area,
            description: text(&["body"]),
            image,
            contact: super::assemble_contact(
                &text(&["account_name"]),
                &normalize_phone(&text(&["phone"])),
            ),
        }
    }
}
