//! Crawl orchestration: one incremental run per show.
//!
//! A run reads the persisted watermark (latest known episode date), asks the
//! adapter to discover the listing down to that date, then processes only
//! episodes strictly newer than the watermark. Episode pages are fetched in
//! small parallel batches; extraction, resolution, and classification run
//! sequentially per episode so registry rate limiting stays predictable.
//!
//! A failing episode is logged and counted, never fatal for the run; the
//! watermark advances implicitly through successful appearance upserts, so
//! an interrupted run resumes where it stopped.

use crate::browser::Browser;
use crate::extract::GuestMention;
use crate::llm::AskAsync;
use crate::models::{Appearance, EpisodeUrl, RunStats, TopicLink};
use crate::registry::LookupPoliticians;
use crate::resolve::Resolver;
use crate::shows::{EpisodeRef, ShowAdapter};
use crate::store::{Gateway, Store};
use crate::topics;
use anyhow::{Context, Result};
use futures::future::join_all;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Shared wiring for a crawl run, borrowed by every show.
pub struct CrawlContext<'a, R, S> {
    pub browser: &'a dyn Browser,
    pub llm: &'a dyn AskAsync,
    pub resolver: &'a Resolver<R>,
    pub gateway: &'a Gateway<S>,
    /// Wait after each load-more/pagination step.
    pub settle: Duration,
    /// Wait between consecutive registry lookups.
    pub lookup_delay: Duration,
    /// Episode pages fetched concurrently per batch.
    pub batch_size: usize,
    /// Log what would be written without touching the store.
    pub dry_run: bool,
}

struct EpisodeOutcome {
    appearances: usize,
    topics: usize,
}

/// Run one show end to end and return its counters.
#[instrument(level = "info", skip_all, fields(show = adapter.name()))]
pub async fn run_show<R, S>(
    adapter: &dyn ShowAdapter,
    ctx: &CrawlContext<'_, R, S>,
) -> Result<RunStats>
where
    R: LookupPoliticians,
    S: Store,
{
    let mut stats = RunStats::default();

    let watermark = ctx
        .gateway
        .latest_episode_date(adapter.name())
        .await
        .context("failed to read watermark")?;
    info!(
        watermark = watermark.as_deref().unwrap_or("none"),
        "starting crawl"
    );

    let mut page = ctx
        .browser
        .open(adapter.listing_url())
        .await
        .context("failed to open listing")?;
    let discovered = adapter
        .discover_episodes(page.as_mut(), watermark.as_deref(), ctx.settle)
        .await
        .context("episode discovery failed")?;
    stats.episodes_discovered = discovered.len();

    // The episode at the watermark date is already persisted; only strictly
    // newer dates are work.
    let mut fresh: Vec<EpisodeRef> = discovered
        .into_iter()
        .filter(|r| {
            watermark
                .as_deref()
                .is_none_or(|w| r.date.as_str() > w)
        })
        .collect();
    // Oldest first, so the watermark advances even when a run is cut short.
    fresh.sort_by(|a, b| a.date.cmp(&b.date));

    if fresh.is_empty() {
        info!("no new episodes");
        return Ok(stats);
    }
    info!(count = fresh.len(), "processing new episodes");

    let batch_size = ctx.batch_size.max(1);
    for chunk in fresh.chunks(batch_size) {
        let bodies = join_all(chunk.iter().map(|r| fetch_episode(ctx.browser, &r.url))).await;
        for (episode, body) in chunk.iter().zip(bodies) {
            let html = match body {
                Ok(html) => html,
                Err(e) => {
                    warn!(url = %episode.url, error = %e, "episode fetch failed");
                    stats.episodes_with_errors += 1;
                    continue;
                }
            };
            match process_episode(adapter, ctx, episode, &html).await {
                Ok(outcome) => {
                    stats.episodes_processed += 1;
                    stats.politicians_upserted += outcome.appearances;
                    stats.topics_upserted += outcome.topics;
                }
                Err(e) => {
                    error!(url = %episode.url, error = %e, "episode processing failed");
                    stats.episodes_with_errors += 1;
                }
            }
        }
    }

    info!(
        discovered = stats.episodes_discovered,
        processed = stats.episodes_processed,
        politicians = stats.politicians_upserted,
        topics = stats.topics_upserted,
        errors = stats.episodes_with_errors,
        "crawl finished"
    );
    Ok(stats)
}

async fn fetch_episode(browser: &dyn Browser, url: &str) -> Result<String> {
    let mut page = browser.open(url).await?;
    page.html().await
}

async fn process_episode<R, S>(
    adapter: &dyn ShowAdapter,
    ctx: &CrawlContext<'_, R, S>,
    episode: &EpisodeRef,
    html: &str,
) -> Result<EpisodeOutcome>
where
    R: LookupPoliticians,
    S: Store,
{
    let mentions = adapter.extract_guests(html, ctx.llm).await?;
    if mentions.is_empty() {
        info!(url = %episode.url, date = %episode.date, "no guests extracted; skipping episode");
        return Ok(EpisodeOutcome {
            appearances: 0,
            topics: 0,
        });
    }
    let appearances = resolve_mentions(adapter.name(), ctx, &episode.date, mentions).await;

    let description = adapter.description(html).unwrap_or_default();
    let topic_links: Vec<TopicLink> = topics::classify(&ctx.llm, &description)
        .await
        .into_iter()
        .map(|id| TopicLink {
            show_name: adapter.name().to_string(),
            episode_date: episode.date.clone(),
            political_area_id: id,
        })
        .collect();

    let outcome = EpisodeOutcome {
        appearances: appearances.len(),
        topics: topic_links.len(),
    };

    if ctx.dry_run {
        info!(
            url = %episode.url,
            date = %episode.date,
            politicians = outcome.appearances,
            topics = outcome.topics,
            "dry run; skipping persistence"
        );
        return Ok(outcome);
    }

    if !appearances.is_empty() {
        ctx.gateway.upsert_appearances(&appearances).await?;
        // The source URL is only worth keeping for episodes that produced
        // at least one appearance.
        ctx.gateway
            .upsert_episode_url(&EpisodeUrl {
                show_name: adapter.name().to_string(),
                episode_date: episode.date.clone(),
                url: episode.url.clone(),
            })
            .await?;
    }
    if !topic_links.is_empty() {
        ctx.gateway.upsert_topic_links(&topic_links).await?;
    }

    info!(
        date = %episode.date,
        politicians = outcome.appearances,
        topics = outcome.topics,
        "episode processed"
    );
    Ok(outcome)
}

/// Resolve extracted mentions to appearance rows, spacing out registry
/// lookups and collapsing mentions that resolve to the same politician.
async fn resolve_mentions<R, S>(
    show: &str,
    ctx: &CrawlContext<'_, R, S>,
    date: &str,
    mentions: Vec<GuestMention>,
) -> Vec<Appearance>
where
    R: LookupPoliticians,
    S: Store,
{
    let mut rows: Vec<Appearance> = Vec::new();
    for (i, mention) in mentions.iter().enumerate() {
        if i > 0 {
            sleep(ctx.lookup_delay).await;
        }
        let Some(politician) = ctx
            .resolver
            .resolve(&mention.name, mention.role.as_deref())
            .await
        else {
            continue;
        };
        if rows.iter().any(|r| r.politician_id == politician.id) {
            continue;
        }
        rows.push(Appearance {
            show_name: show.to_string(),
            episode_date: date.to_string(),
            politician_id: politician.id,
            politician_name: politician.name,
            party_id: politician.party_id,
            party_name: politician.party,
        });
    }
    rows
}
