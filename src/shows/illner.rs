//! maybrit illner (ZDF).
//!
//! Same platform as Markus Lanz: load-more listing, date in the URL slug.
//! Episode pages carry the guest block in a panel rather than the article
//! body, with only the broad selector as fallback.

use super::{EpisodeRef, LoadMore, ShowAdapter, absolute_url, expand_listing, meta_description};
use crate::browser::BrowserPage;
use crate::dates;
use crate::extract::{self, GuestMention};
use crate::llm::AskAsync;
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;

const NAME: &str = "maybrit illner";
const LISTING_URL: &str = "https://www.zdf.de/talk/maybrit-illner-128";
const LOAD_MORE_SELECTOR: &str = "button.load-more-button";

const GUEST_LIST_SELECTOR: &str = "div.guest-panel li b";
const BROAD_SELECTOR: &str = "main b";

pub struct MaybritIllner;

fn collect_listing(html: &str) -> Vec<EpisodeRef> {
    let document = Html::parse_document(html);
    let sel = Selector::parse("a[href]").expect("static selector");
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| href.contains("maybrit-illner-vom"))
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
    let mentions = extract::first_non_empty(&document, &[&structured, &broad]);
    extract::finalize(NAME, mentions)
}

#[async_trait]
impl ShowAdapter for MaybritIllner {
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
