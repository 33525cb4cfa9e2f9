//! alonhadat.com.vn
//!
//! Static pages; a plain GET is enough unless the site starts serving its
//! verification page, in which case a persisted browser session helps.

use super::cascade::{Cascade, Field, FieldPlan};
use super::extractors::{
    attr, css, label_scan, nth, og, tel_link, text_regex, AREA_RE, IMG_SRC, PRICE_LABEL_RE,
    VN_PHONE_RE,
};
use super::{ListingFields, SiteParser};
use crate::fetch::Strategy;
use url::Url;

const INFO_ROWS: &str = ".moreinfor > span, .moreinfor1 tr, .infor tr, .property-info li";

pub struct Alonhadat {
    cascade: Cascade,
}

impl Alonhadat {
    pub fn new() -> Self {
        let cascade = Cascade::new(vec![
            FieldPlan::new(Field::Title)
                .then(css(".title h1, h1.title"))
                .then(css("h1"))
                .then(og("og:title")),
            FieldPlan::new(Field::Price)
                .then(nth("span.value", 0))
                .then(label_scan(INFO_ROWS, r"(?i)\bGiá\b", &PRICE_LABEL_RE, 1))
                .then(text_regex(&PRICE_LABEL_RE, 1)),
            FieldPlan::new(Field::Area)
                .then(nth("span.value", 1))
                .then(label_scan(INFO_ROWS, r"(?i)Diện tích", &AREA_RE, 0))
                .then(text_regex(&AREA_RE, 0)),
            FieldPlan::new(Field::Description)
                .then(css("div.detail.text-content, #content, .description, .post-content"))
                .then(og("og:description")),
            FieldPlan::new(Field::Image)
                .then(attr("img#limage, #limage img", IMG_SRC))
                .then(attr(".gallery img, .images img", IMG_SRC))
                .then(og("og:image")),
            FieldPlan::new(Field::ContactName)
                .then(css(".info-contact .name, .contact .name, .name a, .name span")),
            FieldPlan::new(Field::Phone)
                .then(tel_link())
                .then(text_regex(&VN_PHONE_RE, 0)),
        ]);

        Self { cascade }
    }
}

impl Default for Alonhadat {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteParser for Alonhadat {
    fn domain(&self) -> &'static str {
        "alonhadat.com.vn"
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Plain
    }

    fn parse(&self, url: &Url, html: &str) -> ListingFields {
        self.cascade.run(url, html)
    }

    fn link_containers(&self) -> &'static [&'static str] {
        &[".content-item .ct_title", ".content-item"]
    }
}
