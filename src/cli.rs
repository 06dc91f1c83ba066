//! Command-line interface definitions.
//!
//! All options can be provided via command-line flags; the config path can
//! also come from the environment.

use clap::Parser;

/// Command-line arguments for the talk show crawler.
///
/// # Examples
///
/// ```sh
/// # Crawl every registered show
/// polittalk
///
/// # Crawl a single show against a specific config
/// polittalk --show "Markus Lanz" --config ./config.yaml
///
/// # See what a run would write without touching the store
/// polittalk --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Show to crawl by name, or "all" for every registered show
    #[arg(short, long, default_value = "all")]
    pub show: String,

    /// Path to the config.yaml file
    #[arg(short, long, env = "POLITTALK_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Discover, extract, and resolve, but write nothing to the store
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
