//! maischberger (ARD).
//!
//! Paginated archive like Caren Miosga, same teaser-date convention. Episode
//! pages have no structured guest markup at all; the teaser prose names the
//! guests in free text, so extraction is model-assisted with the plain regex
//! strategy as fallback when the model is unavailable or off-script.

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
use tracing::warn;

const NAME: &str = "maischberger";
const LISTING_URL: &str =
    "https://www.daserste.de/information/talk/maischberger/videos/index.html";

const NEXT_PAGE_SELECTOR: &str = "li.entry__next a, a.next";

const SYSTEM_PROMPT: &str = "Du extrahierst die Namen der Gäste aus \
Ankündigungstexten deutscher Talkshows. Antworte ausschließlich mit einem \
JSON-Array vollständiger Personennamen, ohne weiteren Text.";

pub struct Maischberger;

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

#[async_trait]
impl ShowAdapter for Maischberger {
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

    async fn extract_guests(&self, html: &str, llm: &dyn AskAsync) -> Result<Vec<GuestMention>> {
        let Some(teaser) = meta_description(html) else {
            return Ok(Vec::new());
        };

        let model_mentions = match llm.ask(SYSTEM_PROMPT, &teaser).await {
            Ok(raw) => extract::parse_model_names(&raw),
            Err(e) => {
                warn!(error = %e, "model extraction failed; falling back to prose regex");
                None
            }
        };
        let mentions = match model_mentions {
            Some(mentions) if !mentions.is_empty() => mentions,
            _ => extract::prose_names(&teaser, &[NAME, "Sandra Maischberger"]),
        };
        Ok(extract::finalize(NAME, mentions))
    }

    fn description(&self, html: &str) -> Option<String> {
        meta_description(html)
    }
}
