//! Markus Lanz (ZDF).
//!
//! The listing reveals older episodes through a load-more button, and the
//! episode date is embedded in each URL slug (`markus-lanz-vom-12-maerz-2024`).
//! Episode pages carry a structured guest block most of the time; two
//! fallbacks cover redesigns and sparse pages.

use super::{EpisodeRef, LoadMore, ShowAdapter, absolute_url, expand_listing, meta_description};
use crate::browser::BrowserPage;
use crate::dates;
use crate::extract::{self, GuestMention};
use crate::llm::AskAsync;
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;

const NAME: &str = "Markus Lanz";
const LISTING_URL: &str = "https://www.zdf.de/talk/markus-lanz-114";
const LOAD_MORE_SELECTOR: &str = "button.load-more-button";

const GUEST_LIST_SELECTOR: &str = "div.post-content ul li b";
const BROAD_SELECTOR: &str = "main b";
const HERO_IMAGE_SELECTOR: &str = "div.stage picture img";

pub struct MarkusLanz;

fn collect_listing(html: &str) -> Vec<EpisodeRef> {
    let document = Html::parse_document(html);
    let sel = Selector::parse("a[href]").expect("static selector");
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| href.contains("markus-lanz-vom"))
        .filter_map(|href| {
            let date = dates::parse(href, dates::DateFormat::UrlSlug)?;
            let url = absolute_url(LISTING_URL, href)?;
            Some(EpisodeRef { url, date })
        })
        .collect()
}

fn extract_sync(html: &str) -> Vec<GuestMention> {
    let document = Html::parse_document(html);
    let structured = |doc: &Html| extract::comma_pairs(doc, GUEST_LIST_SELECTOR);
    let broad = |doc: &Html| extract::comma_pairs(doc, BROAD_SELECTOR);
    let alt = |doc: &Html| extract::alt_text_guests(doc, HERO_IMAGE_SELECTOR);
    let mentions = extract::first_non_empty(&document, &[&structured, &broad, &alt]);
    extract::finalize(NAME, mentions)
}

#[async_trait]
impl ShowAdapter for MarkusLanz {
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
        expand_listing(
            page,
            LoadMore::Click(LOAD_MORE_SELECTOR),
            settle,
            watermark,
            collect_listing,
        )
        .await
    }

    async fn extract_guests(&self, html: &str, _llm: &dyn AskAsync) -> Result<Vec<GuestMention>> {
        Ok(extract_sync(html))
    }

    fn description(&self, html: &str) -> Option<String> {
        meta_description(html)
    }
}
