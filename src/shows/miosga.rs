//! Caren Miosga (ARD).
//!
//! The ARD archive paginates through numbered index pages instead of lazy
//! loading, and episode URLs carry no date; each teaser prints a localized
//! `DD.MM.YYYY` next to the link. Episode pages list guests as `"Name, Role"`
//! lines; sparse pages fall back to teaser prose.

use super::{
    EpisodeRef, ShowAdapter, absolute_url, meta_description, paginate_listing,
};
use crate::browser::BrowserPage;
use crate::dates;
use crate::extract::{self, GuestMention};
use crate::llm::AskAsync;
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;

const NAME: &str = "Caren Miosga";
const LISTING_URL: &str =
    "https://www.daserste.de/information/talk/caren-miosga/videos/index.html";

const GUEST_LIST_SELECTOR: &str = "div.besetzung li";
const NEXT_PAGE_SELECTOR: &str = "li.entry__next a, a.next";

pub struct CarenMiosga;

fn collect_listing(html: &str) -> Vec<EpisodeRef> {
    let document = Html::parse_document(html);
    let teaser_sel = Selector::parse("div.teaser").expect("static selector");
    let link_sel = Selector::parse("a[href]").expect("static selector");
    document
        .select(&teaser_sel)
        .filter_map(|teaser| {
            let href = teaser
                .select(&link_sel)
                .find_map(|a| a.value().attr("href"))?;
            let text = teaser.text().collect::<Vec<_>>().join(" ");
            let date = dates::parse(&text, dates::DateFormat::Numeric)?;
            let url = absolute_url(LISTING_URL, href)?;
            Some(EpisodeRef { url, date })
        })
        .collect()
}

fn next_page_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let sel = Selector::parse(NEXT_PAGE_SELECTOR).expect("static selector");
    document
        .select(&sel)
        .find_map(|el| el.value().attr("href"))
        .and_then(|href| absolute_url(LISTING_URL, href))
}

fn extract_sync(html: &str) -> Vec<GuestMention> {
    let structured = {
        let document = Html::parse_document(html);
        extract::comma_pairs(&document, GUEST_LIST_SELECTOR)
    };
    let mentions = if structured.is_empty() {
        match meta_description(html) {
            Some(teaser) => extract::prose_names(&teaser, &[NAME]),
            None => Vec::new(),
        }
    } else {
        structured
    };
    extract::finalize(NAME, mentions)
}

#[async_trait]
impl ShowAdapter for CarenMiosga {
    fn name(&self) -> &'static str {
        NAME
    }

    fn listing_url(&self) -> &'static str {
        LISTING_URL
    }

    async fn discover_episodes(
        &self,
        page: &mut dyn BrowserPage,
        watermark: Option<&str>,
        settle: Duration,
    ) -> Result<Vec<EpisodeRef>> {
        paginate_listing(page, settle, watermark, collect_listing, next_page_url).await
    }

    async fn extract_guests(&self, html: &str, _llm: &dyn AskAsync) -> Result<Vec<GuestMention>> {
        Ok(extract_sync(html))
    }

    fn description(&self, html: &str) -> Option<String> {
        meta_description(html)
    }
}
