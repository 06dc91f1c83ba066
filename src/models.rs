//! Persisted row types and run counters.
//!
//! - [`Appearance`]: one politician's appearance on one episode
//! - [`TopicLink`]: episode-to-topic-area association
//! - [`EpisodeUrl`]: source URL of a persisted episode
//!
//! Field names match the column names of the shared store, so rows serialize
//! directly into upsert payloads. Dates are canonical `YYYY-MM-DD` strings
//! throughout, so plain string comparison is chronological.

use serde::Serialize;

/// A politician's appearance on one episode.
///
/// Unique per `(show_name, episode_date, politician_id)`; re-crawling the
/// same episode updates party/name fields in place (registry data can be
/// corrected later, e.g. party relabeling).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Appearance {
    pub show_name: String,
    pub episode_date: String,
    pub politician_id: i64,
    pub politician_name: String,
    pub party_id: Option<i64>,
    pub party_name: Option<String>,
}

/// Episode-to-topic-area link, unique per
/// `(show_name, episode_date, political_area_id)`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopicLink {
    pub show_name: String,
    pub episode_date: String,
    pub political_area_id: u8,
}

/// Source URL of an episode, unique per `(show_name, episode_date)`. Only
/// written once at least one politician resolved for the episode.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EpisodeUrl {
    pub show_name: String,
    pub episode_date: String,
    pub url: String,
}

/// Counters aggregated over one show's crawl run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub episodes_discovered: usize,
    pub episodes_processed: usize,
    pub politicians_upserted: usize,
    pub topics_upserted: usize,
    pub episodes_with_errors: usize,
}

impl RunStats {
    /// Fold another run's counters into this one, for the all-shows summary.
    pub fn merge(&mut self, other: &RunStats) {
        self.episodes_discovered += other.episodes_discovered;
        self.episodes_processed += other.episodes_processed;
        self.politicians_upserted += other.politicians_upserted;
        self.topics_upserted += other.topics_upserted;
        self.episodes_with_errors += other.episodes_with_errors;
    }
}
