//! i-batdongsan.com
//!
//! Server-rendered. Price and area live in a key/value table whose row order
//! is not stable between listing types, so the fixed-row selectors are backed
//! by a label scan over the same table.

use super::cascade::{Cascade, Field, FieldPlan};
use super::extractors::{
    attr, css, label_scan, og, phone_at, text_regex, AREA_RE, IMG_SRC, PRICE_LABEL_RE,
    VN_PHONE_RE,
};
use super::{ListingFields, SiteParser};
use crate::fetch::Strategy;
use url::Url;

const PROPERTY: &str = "#left > div.property";

const INFO_ROWS: &str =
    "#left > div.property > div.moreinfor1 > div.infor table tr, .moreinfor1 .infor table tr";

pub struct IBatdongsan {
    cascade: Cascade,
}

impl IBatdongsan {
    pub fn new() -> Self {
        let price_row = format!(
            "{} > div.moreinfor1 > div.infor > table > tbody > tr:nth-child(7)",
            PROPERTY
        );

        let cascade = Cascade::new(vec![
            FieldPlan::new(Field::Title)
                .then(css(&format!("{} > div.title > h1", PROPERTY)))
                .then(css("div.property .title h1, h1"))
                .then(og("og:title")),
            FieldPlan::new(Field::Price)
                .then(css(&format!("{} > td.price", price_row)))
                .then(label_scan(INFO_ROWS, r"(?i)\b(Giá|Price)\b", &PRICE_LABEL_RE, 1)),
            FieldPlan::new(Field::Area)
                .then(css(&format!("{} > td:nth-child(2)", price_row)))
                .then(label_scan(INFO_ROWS, r"(?i)(Diện tích|Area)", &AREA_RE, 0))
                .then(text_regex(&AREA_RE, 0)),
            FieldPlan::new(Field::Description)
                .then(css(&format!("{} > div.detail.text-content", PROPERTY)))
                .then(css(".property .detail, .text-content"))
                .then(og("og:description")),
            FieldPlan::new(Field::Image)
                .then(og("og:image"))
                .then(attr("#limage, img#limage, #limage img", IMG_SRC))
                .then(attr(".property img, img[src$='.jpg']", IMG_SRC)),
            FieldPlan::new(Field::ContactName)
                .then(css(".property .contact .contact-info .content .name, .contact .name")),
            FieldPlan::new(Field::Phone)
                .then(phone_at(
                    ".property .contact .contact-info .content .fone a, a[href^='tel:']",
                ))
                .then(text_regex(&VN_PHONE_RE, 0)),
        ]);

        Self { cascade }
    }
}

impl Default for IBatdongsan {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteParser for IBatdongsan {
    fn domain(&self) -> &'static str {
        "i-batdongsan.com"
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Plain
    }

    fn parse(&self, url: &Url, html: &str) -> ListingFields {
        self.cascade.run(url, html)
    }

    fn link_containers(&self) -> &'static [&'static str] {
        &[".content-item .ct_title", ".content-items .content-item"]
    }
}
