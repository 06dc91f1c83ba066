//! Persistence against the shared relational store.
//!
//! The store is consumed as a capability with exactly two operations:
//! conflict-keyed upsert and latest-row selection. [`RestStore`] talks to a
//! PostgREST-style endpoint; tests use an in-memory implementation honoring
//! the same conflict-key semantics.
//!
//! All writes are idempotent upserts keyed by natural uniqueness
//! constraints, so repeated or interrupted runs converge without locking:
//!
//! - appearances: `(show_name, episode_date, politician_id)`
//! - topic links: `(show_name, episode_date, political_area_id)`
//! - episode URLs: `(show_name, episode_date)`

use crate::models::{Appearance, EpisodeUrl, TopicLink};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

const APPEARANCES_TABLE: &str = "talkshow_politicians";
const TOPICS_TABLE: &str = "talkshow_topics";
const EPISODE_URLS_TABLE: &str = "talkshow_episode_urls";

/// Relational-store capability: upsert-with-conflict-key and
/// select-latest-by-key.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert `rows`, resolving conflicts on `conflict_keys`. With
    /// `ignore_duplicates` a conflicting row is left untouched; otherwise
    /// its non-key fields are updated in place.
    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Value>,
        conflict_keys: &[&str],
        ignore_duplicates: bool,
    ) -> Result<()>;

    /// The row with the greatest `order_by` value among rows matching all
    /// equality `filters`, or `None` when no row matches.
    async fn select_latest(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        order_by: &str,
    ) -> Result<Option<Value>>;
}

#[async_trait]
impl<T: Store + ?Sized> Store for &T {
    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Value>,
        conflict_keys: &[&str],
        ignore_duplicates: bool,
    ) -> Result<()> {
        (**self).upsert(table, rows, conflict_keys, ignore_duplicates).await
    }

    async fn select_latest(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        order_by: &str,
    ) -> Result<Option<Value>> {
        (**self).select_latest(table, filters, order_by).await
    }
}

#[async_trait]
impl<T: Store + ?Sized> Store for Box<T> {
    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Value>,
        conflict_keys: &[&str],
        ignore_duplicates: bool,
    ) -> Result<()> {
        (**self).upsert(table, rows, conflict_keys, ignore_duplicates).await
    }

    async fn select_latest(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        order_by: &str,
    ) -> Result<Option<Value>> {
        (**self).select_latest(table, filters, order_by).await
    }
}

/// PostgREST-style REST backend.
pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build store HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Store for RestStore {
    #[instrument(level = "debug", skip(self, rows), fields(count = rows.len()))]
    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Value>,
        conflict_keys: &[&str],
        ignore_duplicates: bool,
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let resolution = if ignore_duplicates {
            "resolution=ignore-duplicates"
        } else {
            "resolution=merge-duplicates"
        };
        self.http
            .post(format!("{}/{}", self.base_url, table))
            .query(&[("on_conflict", conflict_keys.join(","))])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", format!("{resolution},return=minimal"))
            .json(&rows)
            .send()
            .await
            .with_context(|| format!("upsert request to {table} failed"))?
            .error_for_status()
            .with_context(|| format!("upsert into {table} rejected"))?;
        debug!(table, "upsert completed");
        Ok(())
    }

    async fn select_latest(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        order_by: &str,
    ) -> Result<Option<Value>> {
        let mut query: Vec<(String, String)> = filters
            .iter()
            .map(|(k, v)| (k.to_string(), format!("eq.{v}")))
            .collect();
        query.push(("order".to_string(), format!("{order_by}.desc")));
        query.push(("limit".to_string(), "1".to_string()));

        let rows: Vec<Value> = self
            .http
            .get(format!("{}/{}", self.base_url, table))
            .query(&query)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("select request to {table} failed"))?
            .error_for_status()
            .with_context(|| format!("select from {table} rejected"))?
            .json()
            .await
            .context("malformed select response")?;
        Ok(rows.into_iter().next())
    }
}

/// Typed persistence operations over the raw [`Store`] capability.
pub struct Gateway<S> {
    store: S,
}

impl<S: Store> Gateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Watermark query: the maximum persisted `episode_date` for a show, or
    /// `None` for a show never crawled. Implicitly advances as new
    /// appearances are inserted.
    pub async fn latest_episode_date(&self, show: &str) -> Result<Option<String>> {
        let row = self
            .store
            .select_latest(APPEARANCES_TABLE, &[("show_name", show)], "episode_date")
            .await?;
        Ok(row
            .and_then(|r| r.get("episode_date").and_then(Value::as_str).map(String::from)))
    }

    /// Upsert appearances, updating party/name fields in place on conflict.
    pub async fn upsert_appearances(&self, rows: &[Appearance]) -> Result<()> {
        let rows = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.store
            .upsert(
                APPEARANCES_TABLE,
                rows,
                &["show_name", "episode_date", "politician_id"],
                false,
            )
            .await
    }

    pub async fn upsert_topic_links(&self, rows: &[TopicLink]) -> Result<()> {
        let rows = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.store
            .upsert(
                TOPICS_TABLE,
                rows,
                &["show_name", "episode_date", "political_area_id"],
                true,
            )
            .await
    }

    pub async fn upsert_episode_url(&self, row: &EpisodeUrl) -> Result<()> {
        self.store
            .upsert(
                EPISODE_URLS_TABLE,
                vec![serde_json::to_value(row)?],
                &["show_name", "episode_date"],
                true,
            )
            .await
    }
}
