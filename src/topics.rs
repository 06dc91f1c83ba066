//! Topic classification of episode descriptions.
//!
//! Each episode is tagged with zero or more of a fixed enumeration of seven
//! political topic areas. The model receives the description plus the
//! enumeration and is instructed to respond with strictly a JSON array of
//! integers from it. The provider enforces nothing, so everything is
//! validated here; any parse failure degrades to an empty list.

use crate::llm::{AskAsync, strip_code_fences};
use crate::utils::truncate_for_log;
use tracing::{debug, warn};

/// The fixed topic-area enumeration. IDs are persisted, labels feed the
/// classification prompt.
pub const TOPIC_AREAS: &[(u8, &str)] = &[
    (1, "Wirtschaft & Soziales"),
    (2, "Außenpolitik & Sicherheit"),
    (3, "Migration & Integration"),
    (4, "Klima, Umwelt & Energie"),
    (5, "Gesundheit & Pflege"),
    (6, "Innere Sicherheit & Justiz"),
    (7, "Bildung, Digitales & Gesellschaft"),
];

const SYSTEM_PROMPT: &str = "Du ordnest Beschreibungen von Talkshow-Folgen \
politischen Themenbereichen zu. Antworte ausschließlich mit einem JSON-Array \
von Ganzzahlen aus der vorgegebenen Liste, ohne weiteren Text.";

/// Classify a description into topic-area IDs.
///
/// Never raises: model failure, malformed output, or out-of-range IDs all
/// degrade to an empty (or filtered) list.
pub async fn classify(llm: &impl AskAsync, description: &str) -> Vec<u8> {
    if description.trim().is_empty() {
        return Vec::new();
    }

    let areas = TOPIC_AREAS
        .iter()
        .map(|(id, label)| format!("{id} = {label}"))
        .collect::<Vec<_>>()
        .join("\n");
    let user = format!("Themenbereiche:\n{areas}\n\nBeschreibung:\n{description}");

    let raw = match llm.ask(SYSTEM_PROMPT, &user).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "topic classification call failed; no topics assigned");
            return Vec::new();
        }
    };

    let ids = parse_topic_ids(&raw);
    debug!(?ids, "classified topics");
    ids
}

/// Validate the model reply: must be a JSON array of integers; anything else
/// yields an empty list. Out-of-range IDs are dropped, duplicates collapsed.
pub fn parse_topic_ids(raw: &str) -> Vec<u8> {
    let cleaned = strip_code_fences(raw);
    let Ok(ids) = serde_json::from_str::<Vec<i64>>(cleaned) else {
        if !cleaned.is_empty() {
            warn!(
                reply = %truncate_for_log(cleaned, 200),
                "non-conforming topic reply; ignoring"
            );
        }
        return Vec::new();
    };
    let mut out: Vec<u8> = Vec::new();
    for id in ids {
        let Ok(id) = u8::try_from(id) else { continue };
        if TOPIC_AREAS.iter().any(|(known, _)| *known == id) && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct CannedAsk(&'static str);

    #[async_trait]
    impl AskAsync for CannedAsk {
        async fn ask(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingAsk;

    #[async_trait]
    impl AskAsync for FailingAsk {
        async fn ask(&self, _system: &str, _user: &str) -> Result<String> {
            anyhow::bail!("model unavailable")
        }
    }

    #[test]
    fn test_parse_valid_array() {
        assert_eq!(parse_topic_ids("[1, 4, 2]"), vec![1, 4, 2]);
    }

    #[test]
    fn test_parse_filters_unknown_ids() {
        assert_eq!(parse_topic_ids("[1, 99, 0, -3, 7]"), vec![1, 7]);
    }

    #[test]
    fn test_parse_collapses_duplicates() {
        assert_eq!(parse_topic_ids("[2, 2, 2]"), vec![2]);
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(parse_topic_ids(r#"{"topics": [1]}"#).is_empty());
        assert!(parse_topic_ids("Die Folge behandelt Themenbereich 1.").is_empty());
        assert!(parse_topic_ids(r#"["Wirtschaft"]"#).is_empty());
    }

    #[test]
    fn test_parse_tolerates_code_fences() {
        assert_eq!(parse_topic_ids("```json\n[3, 5]\n```"), vec![3, 5]);
    }

    #[tokio::test]
    async fn test_classify_happy_path() {
        let ids = classify(&CannedAsk("[2, 3]"), "Debatte über Migration und Außenpolitik").await;
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_classify_model_failure_yields_empty() {
        let ids = classify(&FailingAsk, "irgendeine Beschreibung").await;
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_classify_empty_description_skips_call() {
        let ids = classify(&FailingAsk, "   ").await;
        assert!(ids.is_empty());
    }
}
