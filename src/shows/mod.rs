//! Per-show adapters for episode discovery and guest extraction.
//!
//! Each show implements the same [`ShowAdapter`] contract behind which the
//! orchestrator stays generic. Adapters differ in how their broadcaster
//! structures listings and episode pages:
//!
//! | Show | Module | Discovery | Extraction ladder |
//! |------|--------|-----------|-------------------|
//! | Markus Lanz | [`lanz`] | load-more expansion | guest list → broad DOM → image alt |
//! | maybrit illner | [`illner`] | load-more expansion | guest list → broad DOM |
//! | Caren Miosga | [`miosga`] | pagination | link list → teaser prose |
//! | maischberger | [`maischberger`] | pagination | model-assisted → teaser prose |
//!
//! Discovery is incremental: a persisted watermark (latest known episode
//! date) bounds how far back a listing session needs to load. The shared
//! engines in this module implement the two traversal styles, lazy-load
//! expansion ([`expand_listing`]) and true pagination ([`paginate_listing`]),
//! with identical termination logic.

use crate::browser::BrowserPage;
use crate::extract::GuestMention;
use crate::llm::AskAsync;
use anyhow::Result;
use async_trait::async_trait;
use itertools::Itertools;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

pub mod illner;
pub mod lanz;
pub mod maischberger;
pub mod miosga;

/// Defensive cap against infinite lazy-load expansion.
const MAX_LOAD_ATTEMPTS: usize = 60;
/// Defensive cap against infinite pagination.
const MAX_PAGES: usize = 50;

/// A discovered episode: absolute URL plus canonical `YYYY-MM-DD` date.
/// Candidates with unparseable dates never make it into one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRef {
    pub url: String,
    pub date: String,
}

/// Uniform per-show capability consumed by the orchestrator.
#[async_trait]
pub trait ShowAdapter: Send + Sync {
    /// Canonical show name, used as partition key throughout.
    fn name(&self) -> &'static str;

    /// Entry URL of the show's public episode listing.
    fn listing_url(&self) -> &'static str;

    /// Incrementally reveal the listing until coverage reaches `watermark`
    /// and return all visible episodes.
    async fn discover_episodes(
        &self,
        page: &mut dyn BrowserPage,
        watermark: Option<&str>,
        settle: Duration,
    ) -> Result<Vec<EpisodeRef>>;

    /// Extract guest mentions from a rendered episode page.
    async fn extract_guests(&self, html: &str, llm: &dyn AskAsync) -> Result<Vec<GuestMention>>;

    /// The episode's teaser/description text, fed to topic classification.
    fn description(&self, html: &str) -> Option<String>;
}

/// All registered adapters, in crawl order.
pub fn all() -> Vec<Box<dyn ShowAdapter>> {
    vec![
        Box::new(lanz::MarkusLanz),
        Box::new(illner::MaybritIllner),
        Box::new(miosga::CarenMiosga),
        Box::new(maischberger::Maischberger),
    ]
}

/// Look up a registered adapter by its canonical name (case-insensitive).
pub fn by_name(name: &str) -> Option<Box<dyn ShowAdapter>> {
    all()
        .into_iter()
        .find(|a| a.name().eq_ignore_ascii_case(name))
}

/// How a lazy-loading listing reveals more episodes.
pub enum LoadMore {
    /// Click the first element matching this selector.
    Click(&'static str),
    /// Scroll-triggered lazy load.
    Scroll,
}

/// Expand a lazy-loading listing until the watermark is covered.
///
/// State machine over one page session: evaluate visible links, then either
/// stop or perform a load step and settle. Termination, first true wins:
/// (a) oldest visible date ≤ watermark, (b) link count unchanged for two
/// consecutive evaluations, (c) attempt cap, (d) load-more control gone.
pub async fn expand_listing(
    page: &mut dyn BrowserPage,
    action: LoadMore,
    settle: Duration,
    watermark: Option<&str>,
    collect: fn(&str) -> Vec<EpisodeRef>,
) -> Result<Vec<EpisodeRef>> {
    let mut refs: Vec<EpisodeRef> = Vec::new();
    let mut last_count: Option<usize> = None;
    let mut stagnant = 0usize;
    let mut attempt = 0usize;

    loop {
        let html = page.html().await?;
        refs = collect(&html);

        let oldest = refs.iter().map(|r| r.date.as_str()).min();
        if let (Some(watermark), Some(oldest)) = (watermark, oldest) {
            if oldest <= watermark {
                debug!(oldest, watermark, "listing covers watermark");
                break;
            }
        }
        if last_count == Some(refs.len()) {
            stagnant += 1;
            if stagnant >= 2 {
                debug!(count = refs.len(), "listing stopped growing");
                break;
            }
        } else {
            stagnant = 0;
        }
        last_count = Some(refs.len());

        attempt += 1;
        if attempt > MAX_LOAD_ATTEMPTS {
            warn!(attempt, "load attempt cap reached; stopping expansion");
            break;
        }

        let progressed = match action {
            LoadMore::Click(selector) => page.click(selector).await?,
            LoadMore::Scroll => {
                page.scroll_to_bottom().await?;
                true
            }
        };
        if !progressed {
            // Control gone or inert; pick up anything a pending load added.
            let html = page.html().await?;
            refs = collect(&html);
            break;
        }
        sleep(settle).await;
    }

    Ok(dedup_by_url(refs))
}

/// Follow a next-page link repeatedly, same termination logic per page.
pub async fn paginate_listing(
    page: &mut dyn BrowserPage,
    settle: Duration,
    watermark: Option<&str>,
    collect: fn(&str) -> Vec<EpisodeRef>,
    next_url: fn(&str) -> Option<String>,
) -> Result<Vec<EpisodeRef>> {
    let mut all: Vec<EpisodeRef> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut stagnant = 0usize;

    let mut html = page.html().await?;
    for page_no in 0..MAX_PAGES {
        let refs = collect(&html);
        let oldest = refs.iter().map(|r| r.date.as_str()).min().map(String::from);
        let mut added = 0usize;
        for r in refs {
            if seen.insert(r.url.clone()) {
                all.push(r);
                added += 1;
            }
        }
        debug!(page_no, added, total = all.len(), "collected listing page");

        if let (Some(watermark), Some(oldest)) = (watermark, oldest.as_deref()) {
            if oldest <= watermark {
                break;
            }
        }
        if added == 0 {
            stagnant += 1;
            if stagnant >= 2 {
                break;
            }
        } else {
            stagnant = 0;
        }

        let Some(next) = next_url(&html) else { break };
        page.goto(&next).await?;
        sleep(settle).await;
        html = page.html().await?;
    }

    Ok(all)
}

fn dedup_by_url(refs: Vec<EpisodeRef>) -> Vec<EpisodeRef> {
    refs.into_iter().unique_by(|r| r.url.clone()).collect()
}

/// Resolve a possibly relative `href` against a base URL.
pub fn absolute_url(base: &str, href: &str) -> Option<String> {
    let base = url::Url::parse(base).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// The page's `og:description` meta content, the usual home of episode
/// teasers on both broadcasters' sites.
pub fn meta_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"meta[property="og:description"], meta[name="description"]"#)
        .expect("static selector");
    document
        .select(&selector)
        .find_map(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::ScriptedPage;

    fn listing(urls: &[(&str, &str)]) -> String {
        let links: String = urls
            .iter()
            .map(|(url, _)| format!(r#"<a class="ep" href="{url}">Folge</a>"#))
            .collect();
        format!("<main>{links}</main>")
    }

    fn collect_fixture(html: &str) -> Vec<EpisodeRef> {
        let document = Html::parse_document(html);
        let sel = Selector::parse("a.ep").unwrap();
        document
            .select(&sel)
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| {
                crate::dates::parse_slug_date(href).map(|date| EpisodeRef {
                    url: href.to_string(),
                    date,
                })
            })
            .collect()
    }

    #[tokio::test]
    async fn test_expand_stops_at_watermark() {
        let s1 = listing(&[("/vom-10-maerz-2024", "")]);
        let s2 = listing(&[("/vom-10-maerz-2024", ""), ("/vom-3-maerz-2024", "")]);
        let s3 = listing(&[
            ("/vom-10-maerz-2024", ""),
            ("/vom-3-maerz-2024", ""),
            ("/vom-25-februar-2024", ""),
        ]);
        let mut page = ScriptedPage::lazy(vec![s1, s2, s3]);
        let refs = expand_listing(
            &mut page,
            LoadMore::Click("button.load-more"),
            Duration::ZERO,
            Some("2024-03-03"),
            collect_fixture,
        )
        .await
        .unwrap();
        // Second state already reaches the watermark; the third is never loaded.
        assert_eq!(refs.len(), 2);
        assert_eq!(page.clicks, 1);
    }

    #[tokio::test]
    async fn test_expand_stops_when_listing_stagnates() {
        let s = listing(&[("/vom-10-maerz-2024", "")]);
        let mut page = ScriptedPage::lazy(vec![s.clone(), s.clone(), s.clone(), s]);
        let refs = expand_listing(
            &mut page,
            LoadMore::Scroll,
            Duration::ZERO,
            None,
            collect_fixture,
        )
        .await
        .unwrap();
        assert_eq!(refs.len(), 1);
        // Two consecutive unchanged evaluations end the session.
        assert!(page.scrolls <= 3);
    }

    #[tokio::test]
    async fn test_expand_handles_missing_control() {
        let s = listing(&[("/vom-10-maerz-2024", "")]);
        let mut page = ScriptedPage::lazy(vec![s]);
        let refs = expand_listing(
            &mut page,
            LoadMore::Click("button.gone"),
            Duration::ZERO,
            None,
            collect_fixture,
        )
        .await
        .unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[tokio::test]
    async fn test_expand_excludes_unparseable_dates_and_dedups() {
        let s = listing(&[
            ("/vom-10-maerz-2024", ""),
            ("/vom-10-maerz-2024", ""),
            ("/folge-ohne-datum", ""),
        ]);
        let mut page = ScriptedPage::lazy(vec![s]);
        let refs = expand_listing(
            &mut page,
            LoadMore::Scroll,
            Duration::ZERO,
            None,
            collect_fixture,
        )
        .await
        .unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].date, "2024-03-10");
    }

    #[tokio::test]
    async fn test_paginate_follows_next_links_until_watermark() {
        use std::collections::HashMap;

        let page1 = format!(
            "{}{}",
            listing(&[("/vom-10-maerz-2024", "")]),
            r#"<a class="next" href="http://t/page/2">weiter</a>"#
        );
        let page2 = format!(
            "{}{}",
            listing(&[("/vom-3-maerz-2024", "")]),
            r#"<a class="next" href="http://t/page/3">weiter</a>"#
        );
        let page3 = listing(&[("/vom-25-februar-2024", "")]);

        let mut routes = HashMap::new();
        routes.insert("http://t/page/2".to_string(), page2);
        routes.insert("http://t/page/3".to_string(), page3);
        let mut page = ScriptedPage::routed(page1, routes);

        fn next(html: &str) -> Option<String> {
            let document = Html::parse_document(html);
            let sel = Selector::parse("a.next").unwrap();
            document
                .select(&sel)
                .find_map(|el| el.value().attr("href"))
                .map(String::from)
        }

        let refs = paginate_listing(
            &mut page,
            Duration::ZERO,
            Some("2024-03-03"),
            collect_fixture,
            next,
        )
        .await
        .unwrap();
        // Page 2 reaches the watermark; page 3 is never requested.
        assert_eq!(refs.len(), 2);
    }

    #[tokio::test]
    async fn test_paginate_stops_without_next_link() {
        let page1 = listing(&[("/vom-10-maerz-2024", "")]);
        let mut page = ScriptedPage::lazy(vec![page1]);

        fn next(_html: &str) -> Option<String> {
            None
        }

        let refs = paginate_listing(&mut page, Duration::ZERO, None, collect_fixture, next)
            .await
            .unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("https://www.zdf.de/talk/markus-lanz-114", "/talk/folge-1").as_deref(),
            Some("https://www.zdf.de/talk/folge-1")
        );
        assert_eq!(
            absolute_url("https://www.zdf.de/", "https://example.org/x").as_deref(),
            Some("https://example.org/x")
        );
    }

    #[test]
    fn test_meta_description() {
        let html = r#"<head><meta property="og:description" content="Zu Gast: Olaf Scholz."></head>"#;
        assert_eq!(meta_description(html).as_deref(), Some("Zu Gast: Olaf Scholz."));
        assert_eq!(meta_description("<p>nichts</p>"), None);
    }

    #[test]
    fn test_adapter_registry() {
        let names: Vec<&str> = all().iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec!["Markus Lanz", "maybrit illner", "Caren Miosga", "maischberger"]
        );
        assert!(by_name("markus lanz").is_some());
        assert!(by_name("unknown show").is_none());
    }
}
