//! Client for the external politician registry (abgeordnetenwatch-style API).
//!
//! Lookup is by first/last name and may return zero, one, or many candidate
//! records. The registry is consulted for every guest mention that survives
//! the person-name filter, so failures here must degrade to "not a
//! politician" instead of aborting a whole crawl.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_BASE_URL: &str = "https://www.abgeordnetenwatch.de/api/v2";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);
const LOOKUP_RETRIES: usize = 2;

/// A candidate politician record returned by the registry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: i64,
    pub label: String,
    #[serde(default)]
    pub party: Option<Party>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Party {
    pub id: i64,
    pub label: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    data: Vec<Candidate>,
}

/// Name-lookup capability of the registry, split out so resolution can be
/// exercised without the live API.
#[async_trait]
pub trait LookupPoliticians: Send + Sync {
    async fn lookup(&self, first_name: &str, last_name: &str) -> Vec<Candidate>;
}

pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .user_agent(concat!("polittalk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build registry HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// Split a guest's display name into `(first_name, last_name)`.
    ///
    /// Names with fewer than two space-separated tokens are rejected before
    /// any network call; the first token is the first name and the remaining
    /// tokens joined by spaces form the last name, so nobiliary particles end
    /// up on the last-name side ("Jan van Aken" -> ("Jan", "van Aken")).
    pub fn split_name(full: &str) -> Option<(String, String)> {
        let tokens: Vec<&str> = full.split_whitespace().collect();
        if tokens.len() < 2 {
            return None;
        }
        Some((tokens[0].to_string(), tokens[1..].join(" ")))
    }

    async fn try_lookup(&self, first_name: &str, last_name: &str) -> Result<Vec<Candidate>> {
        let response = self
            .http
            .get(format!("{}/politicians", self.base_url))
            .query(&[("first_name", first_name), ("last_name", last_name)])
            .send()
            .await?
            .error_for_status()?;
        let parsed: LookupResponse = response.json().await?;
        Ok(parsed.data)
    }
}

#[async_trait]
impl LookupPoliticians for RegistryClient {
    /// Look up candidates by first/last name.
    ///
    /// Retries immediately a small fixed number of times; on persistent
    /// failure the guest is treated as "not a politician" and an empty list
    /// is returned rather than an error.
    #[instrument(level = "debug", skip(self))]
    async fn lookup(&self, first_name: &str, last_name: &str) -> Vec<Candidate> {
        let mut last_err = None;
        for attempt in 0..=LOOKUP_RETRIES {
            match self.try_lookup(first_name, last_name).await {
                Ok(candidates) => {
                    debug!(
                        first_name,
                        last_name,
                        count = candidates.len(),
                        "registry lookup"
                    );
                    return candidates;
                }
                Err(e) => {
                    warn!(attempt, first_name, last_name, error = %e, "registry lookup failed");
                    last_err = Some(e);
                }
            }
        }
        if let Some(e) = last_err {
            warn!(first_name, last_name, error = %e, "registry unreachable; treating as non-politician");
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name_two_tokens() {
        assert_eq!(
            RegistryClient::split_name("Friedrich Merz"),
            Some(("Friedrich".to_string(), "Merz".to_string()))
        );
    }

    #[test]
    fn test_split_name_particle_goes_to_last_name() {
        assert_eq!(
            RegistryClient::split_name("Jan van Aken"),
            Some(("Jan".to_string(), "van Aken".to_string()))
        );
    }

    #[test]
    fn test_split_name_single_token_rejected() {
        assert_eq!(RegistryClient::split_name("Moderation"), None);
        assert_eq!(RegistryClient::split_name(""), None);
        assert_eq!(RegistryClient::split_name("   "), None);
    }

    #[test]
    fn test_candidate_deserialization() {
        let json = r#"{
            "data": [
                { "id": 79109, "label": "Friedrich Merz", "party": { "id": 2, "label": "CDU" } },
                { "id": 12345, "label": "Friedrich Merz" }
            ]
        }"#;
        let parsed: LookupResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].party.as_ref().unwrap().label, "CDU");
        assert!(parsed.data[1].party.is_none());
    }

    #[test]
    fn test_empty_data_field_tolerated() {
        let parsed: LookupResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(parsed.data.is_empty());
    }
}
