//! muaban.net
//!
//! Client-rendered. The seller's phone sits in a box that shows a masked
//! number ("0903 *** ***") until a "reveal" button is clicked; the masked
//! form is accepted as the phone value.

use super::cascade::{Cascade, Field, FieldPlan};
use super::extractors::{
    attr, css, masked_phone, og, state_key, tel_link, text_regex, AREA_RE, IMG_SRC, VN_PHONE_RE,
};
use super::{ListingFields, SiteParser};
use crate::fetch::Strategy;
use url::Url;

pub struct Muaban {
    cascade: Cascade,
}

impl Muaban {
    pub fn new() -> Self {
        let cascade = Cascade::new(vec![
            FieldPlan::new(Field::Title)
                .then(css("div.sc-6orc5o-8 > h1"))
                .then(css("h1"))
                .then(og("og:title"))
                .then(state_key(&["title", "name"])),
            FieldPlan::new(Field::Price)
                .then(css("div.sc-6orc5o-8 > div.price"))
                .then(css(".price"))
                .then(state_key(&["price_display", "price"])),
            FieldPlan::new(Field::Area)
                .then(css("div.sc-6orc5o-15 ul li span:nth-child(2) a.link"))
                .then(css("[class*='area']"))
                .then(text_regex(&AREA_RE, 0)),
            FieldPlan::new(Field::Description)
                .then(css("div.sc-6orc5o-9 > div"))
                .then(css("div.sc-6orc5o-9, [class*='description']"))
                .then(state_key(&["description", "body"])),
            FieldPlan::new(Field::Image)
                .then(og("og:image"))
                .then(attr(
                    "div.slick-slider img, img[data-lazy], img[data-src], img[src$='.jpg'], img[src$='.jpeg']",
                    IMG_SRC,
                )),
            FieldPlan::new(Field::ContactName)
                .then(css("div.sc-lohvv8-2 p span.title"))
                .then(css("[class*='Seller'], [class*='Contact'] [class*='title']")),
            FieldPlan::new(Field::Phone)
                .then(masked_phone("span.phone-hidden, .phone-hidden"))
                .then(tel_link())
                .then(text_regex(&VN_PHONE_RE, 0)),
        ]);

        Self { cascade }
    }
}

impl Default for Muaban {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteParser for Muaban {
    fn domain(&self) -> &'static str {
        "muaban.net"
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Browser
    }

    fn parse(&self, url: &Url, html: &str) -> ListingFields {
        self.cascade.run(url, html)
    }

    fn link_containers(&self) -> &'static [&'static str] {
        &["[class*='ListItem']", ".list-item"]
    }
}
