//! batdongsan.com.vn
//!
//! Server-rendered, but behind passive bot protection that refuses plain
//! clients with 403; the anti-bot client gets through.

use super::cascade::{Cascade, Field, FieldPlan};
use super::extractors::{
    attr, css, json_ld, json_ld_price, label_scan, og, tel_link, text_regex, AREA_RE, IMG_SRC,
    PRICE_LABEL_RE,
};
use super::{ListingFields, SiteParser};
use crate::fetch::Strategy;
use url::Url;

const INFO_ROWS: &str =
    ".re__pr-short-info-item, .re__pr-shortinfo, .re__pr-config, .re__info, .re__pr-specs, .re__list, .re__box-info, ul li";

pub struct Batdongsan {
    cascade: Cascade,
}

impl Batdongsan {
    pub fn new() -> Self {
        let cascade = Cascade::new(vec![
            FieldPlan::new(Field::Title)
                .then(css("#product-detail-web > h1"))
                .then(css("h1.re__pr-title, h1"))
                .then(og("og:title"))
                .then(json_ld(&["name", "headline"])),
            FieldPlan::new(Field::Price)
                .then(css(
                    "#product-detail-web .re__pr-short-info > div:nth-child(1) span.value",
                ))
                .then(css(".re__pr-short-info-item:nth-child(1) .value"))
                .then(label_scan(INFO_ROWS, r"(?i)\b(Mức giá|Giá|Price)\b", &PRICE_LABEL_RE, 1))
                .then(json_ld_price()),
            FieldPlan::new(Field::Area)
                .then(css(
                    "#product-detail-web .re__pr-short-info > div:nth-child(2) span.value",
                ))
                .then(css(".re__pr-short-info-item:nth-child(2) .value"))
                .then(label_scan(INFO_ROWS, r"(?i)(Diện tích|Area)", &AREA_RE, 0))
                .then(text_regex(&AREA_RE, 0)),
            FieldPlan::new(Field::Description)
                .then(css("#product-detail-web .re__section.re__pr-description > div"))
                .then(css(
                    ".re__section-body, .re__pr-description, .re__content, .re__section-content, #article, .article, .post-content",
                ))
                .then(json_ld(&["description"])),
            FieldPlan::new(Field::Image)
                .then(og("og:image"))
                .then(attr(
                    "img.pr-img, img[data-src], img[src*='cloudfront'], img[src$='.jpg'], img[src$='.jpeg']",
                    IMG_SRC,
                ))
                .then(json_ld(&["image"])),
            FieldPlan::new(Field::ContactName)
                .then(css("div.re__main-sidebar .re__agent-infor.re__agent-name > a"))
                .then(css(".re__contact-name, .re__agent-name")),
            FieldPlan::new(Field::Phone).then(tel_link()),
        ]);

        Self { cascade }
    }
}

impl Default for Batdongsan {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteParser for Batdongsan {
    fn domain(&self) -> &'static str {
        "batdongsan.com.vn"
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::AntiBot
    }

    fn parse(&self, url: &Url, html: &str) -> ListingFields {
        self.cascade.run(url, html)
    }

    fn link_containers(&self) -> &'static [&'static str] {
        &[".js__product-link-for-product-id", ".re__card-full", ".js__card"]
    }
}
