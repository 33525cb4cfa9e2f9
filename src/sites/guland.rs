//! guland.vn
//!
//! Client-rendered detail pages; needs the browser strategy.

use super::cascade::{Cascade, Field, FieldPlan};
use super::extractors::{
    attr, css, json_ld, og, state_key, tel_link, text_regex, AREA_RE, IMG_SRC, VN_PHONE_RE,
};
use super::{ListingFields, SiteParser};
use crate::fetch::Strategy;
use url::Url;

const MAIN: &str = "body > div.sdb-picker-site > div.sdb-content-picker > div > div:nth-child(1) \
                    > div.dtl-row-wrp > div.dtl-col-lft";

pub struct Guland {
    cascade: Cascade,
}

impl Guland {
    pub fn new() -> Self {
        let cascade = Cascade::new(vec![
            FieldPlan::new(Field::Title)
                .then(css(&format!("{} > div.dtl-col-lft__wrp > div > div.dtl-main > h1", MAIN)))
                .then(css(".dtl-main h1, h1"))
                .then(og("og:title")),
            FieldPlan::new(Field::Price)
                .then(css(&format!(
                    "{} div.dtl-main div.dtl-prc__sgl.dtl-prc__ttl",
                    MAIN
                )))
                .then(css(".dtl-prc__ttl, .price, [class*='prc']"))
                .then(json_ld(&["price"]))
                .then(state_key(&["price", "price_text"])),
            FieldPlan::new(Field::Area)
                .then(css(&format!(
                    "{} div.dtl-main div.dtl-prc__sgl.dtl-prc__dtc",
                    MAIN
                )))
                .then(css(".dtl-prc__dtc, .area, [class*='dtc']"))
                .then(text_regex(&AREA_RE, 0)),
            FieldPlan::new(Field::Description)
                .then(css(&format!("{} > div.dtl-inf.dtl-stn > div > div.dtl-inf__dsr", MAIN)))
                .then(css(".dtl-inf__dsr, .dtl-inf, [class*='description'], .post-content"))
                .then(json_ld(&["description"])),
            FieldPlan::new(Field::Image)
                .then(og("og:image"))
                .then(attr(
                    "#SlickSlider-DetailView .slick-current img, #SlickSlider-DetailView img",
                    IMG_SRC,
                ))
                .then(attr(".detail-media__full img, .detail-media img, img", IMG_SRC)),
            FieldPlan::new(Field::ContactName)
                .then(css(".dtl-col-rgt .dtl-aut.dtl-crd .dtl-aut__cxt > h5"))
                .then(css(".dtl-aut__cxt h5, .dtl-aut h5, [class*='author'] h5, [class*='seller'] h5")),
            FieldPlan::new(Field::Phone)
                .then(tel_link())
                .then(text_regex(&VN_PHONE_RE, 0)),
        ]);

        Self { cascade }
    }
}

impl Default for Guland {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteParser for Guland {
    fn domain(&self) -> &'static str {
        "guland.vn"
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Browser
    }

    fn parse(&self, url: &Url, html: &str) -> ListingFields {
        self.cascade.run(url, html)
    }

    fn link_containers(&self) -> &'static [&'static str] {
        &[".c-sdb-card", ".l-sdb-list__single"]
    }
}
