//! Text-generation API access with exponential backoff retry logic.
//!
//! Two call sites use the model: guest-name extraction from teaser prose
//! (expects a JSON array of strings) and topic classification (expects a JSON
//! array of integers). The provider enforces no schema, so callers validate
//! every response themselves.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait defining async model interaction; dyn-safe so
//!   adapters can take a capability reference
//! - [`ChatClient`]: OpenAI-compatible chat-completions client over `reqwest`
//! - [`RetryAsk`]: decorator adding retry logic to any `AskAsync`
//!   implementation; the pipeline wraps the client once at startup
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rand::{Rng, rng};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Trait for async model interaction.
///
/// Implementors send a system instruction plus user text to a model and
/// return the raw response text. The abstraction exists so decorators (retry
/// logic) and test doubles can stand in for the real client.
#[async_trait]
pub trait AskAsync: Send + Sync {
    async fn ask(&self, system: &str, user: &str) -> Result<String>;
}

#[async_trait]
impl<T: AskAsync + ?Sized> AskAsync for &T {
    async fn ask(&self, system: &str, user: &str) -> Result<String> {
        (**self).ask(system, user).await
    }
}

/// OpenAI-compatible chat-completions client.
///
/// Requests are deterministic (temperature 0) because both call sites expect
/// machine-parseable JSON back, not prose.
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build chat HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl AskAsync for ChatClient {
    #[instrument(level = "info", skip_all)]
    async fn ask(&self, system: &str, user: &str) -> Result<String> {
        let t0 = Instant::now();
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });
        let res = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await;
        let dt = t0.elapsed();

        let response = match res {
            Ok(r) => r,
            Err(e) => {
                warn!(elapsed_ms = dt.as_millis() as u128, error = %e, "chat API call failed");
                return Err(e.into());
            }
        };
        let response = response
            .error_for_status()
            .context("chat API returned error status")?;
        let parsed: ChatResponse = response.json().await.context("malformed chat API body")?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("chat API returned no choices"))
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`]
/// implementation.
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

#[async_trait]
impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    #[instrument(level = "info", skip_all)]
    async fn ask(&self, system: &str, user: &str) -> Result<String> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(system, user).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Strip Markdown code fences some models wrap around JSON output.
pub fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim_end_matches('`').trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyAsk {
        fail_times: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AskAsync for FlakyAsk {
        async fn ask(&self, _system: &str, _user: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(anyhow!("transient"))
            } else {
                Ok("ok".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failures() {
        let inner = FlakyAsk {
            fail_times: 2,
            calls: AtomicUsize::new(0),
        };
        let retry = RetryAsk::new(inner, 3, Duration::from_millis(1));
        let out = retry.ask("s", "u").await.unwrap();
        assert_eq!(out, "ok");
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let inner = FlakyAsk {
            fail_times: 10,
            calls: AtomicUsize::new(0),
        };
        let retry = RetryAsk::new(inner, 2, Duration::from_millis(1));
        assert!(retry.ask("s", "u").await.is_err());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("[1,2]"), "[1,2]");
        assert_eq!(strip_code_fences("```json\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_code_fences("```\n[\"a\"]\n```"), "[\"a\"]");
    }
}
