//! # polittalk
//!
//! An incremental crawler that tracks politician appearances on German TV
//! talk shows. Each run discovers new episodes per show, extracts guest
//! names from the episode pages, resolves them against the politician
//! registry, classifies episode topics, and upserts the results into a
//! shared relational store.
//!
//! ## Features
//!
//! - Covers four shows (Markus Lanz, maybrit illner, Caren Miosga,
//!   maischberger) behind a uniform adapter interface
//! - Incremental crawling bounded by a per-show watermark, so re-runs only
//!   touch episodes newer than what is already persisted
//! - Ranked extraction strategies per show, from structured guest lists down
//!   to model-assisted prose parsing
//! - Registry resolution with role-based disambiguation and a static
//!   override table for known-bad entries
//! - Idempotent conflict-keyed upserts; interrupted runs simply resume
//!
//! ## Usage
//!
//! ```sh
//! polittalk --show all --config ./config.yaml
//! ```

use clap::Parser;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod browser;
mod cli;
mod config;
mod dates;
mod extract;
mod llm;
mod models;
mod pipeline;
mod registry;
mod resolve;
mod shows;
mod store;
mod topics;
mod utils;

use browser::StaticBrowser;
use cli::Cli;
use llm::{ChatClient, RetryAsk};
use models::RunStats;
use pipeline::CrawlContext;
use registry::RegistryClient;
use resolve::{OverrideTable, Resolver};
use shows::ShowAdapter;
use store::{Gateway, RestStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("polittalk starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.show, ?args.config, args.dry_run, "parsed CLI arguments");

    let config = config::load(&args.config)?;

    // Resolve the show selection before building any clients.
    let adapters: Vec<Box<dyn ShowAdapter>> = if args.show.eq_ignore_ascii_case("all") {
        shows::all()
    } else {
        match shows::by_name(&args.show) {
            Some(adapter) => vec![adapter],
            None => {
                let known = shows::all()
                    .iter()
                    .map(|a| a.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                anyhow::bail!("unknown show {:?}; known shows: {known}", args.show);
            }
        }
    };

    // --- Wiring ---
    let browser = StaticBrowser::new()?;
    let llm = RetryAsk::new(
        ChatClient::new(&config.llm.base_url, &config.llm.api_key, &config.llm.model)?,
        3,
        Duration::from_secs(1),
    );
    let registry = RegistryClient::new(config.registry_base_url.as_deref())?;
    let resolver = Resolver::new(registry, OverrideTable::builtin());
    let gateway = Gateway::new(RestStore::new(&config.store.base_url, &config.store.api_key)?);

    let ctx = CrawlContext {
        browser: &browser,
        llm: &llm,
        resolver: &resolver,
        gateway: &gateway,
        settle: Duration::from_millis(config.settle_delay_ms),
        lookup_delay: Duration::from_millis(config.lookup_delay_ms),
        batch_size: config.episode_batch_size,
        dry_run: args.dry_run,
    };

    // --- Crawl, one show at a time ---
    let mut totals = RunStats::default();
    let mut failed_shows = 0usize;
    for adapter in &adapters {
        match pipeline::run_show(adapter.as_ref(), &ctx).await {
            Ok(stats) => totals.merge(&stats),
            Err(e) => {
                error!(show = adapter.name(), error = %e, "show crawl failed");
                failed_shows += 1;
            }
        }
    }

    info!(
        shows = adapters.len(),
        failed_shows,
        episodes_discovered = totals.episodes_discovered,
        episodes_processed = totals.episodes_processed,
        politicians_upserted = totals.politicians_upserted,
        topics_upserted = totals.topics_upserted,
        episodes_with_errors = totals.episodes_with_errors,
        elapsed_s = start_time.elapsed().as_secs(),
        "all crawls finished"
    );

    if failed_shows > 0 {
        anyhow::bail!("{failed_shows} of {} show crawls failed", adapters.len());
    }
    Ok(())
}
