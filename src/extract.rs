//! Guest extraction building blocks shared by the per-show adapters.
//!
//! Episode pages are noisy and inconsistently structured, so each adapter
//! runs a ranked ladder of strategies, each attempted only if the previous
//! yielded zero results:
//!
//! 1. structured DOM selector parsing `"Name, Role"` text nodes
//! 2. the same parsing over a much broader selector
//! 3. hero-image alt text split on `:` then `,`
//! 4. free-text regex over teaser prose
//! 5. model-assisted extraction (adapter-level, async; falls back to 4)
//!
//! Regardless of source, every candidate passes through the person-name
//! heuristic and host exclusion in [`finalize`], which also deduplicates by
//! exact name while preserving first-occurrence order.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};

/// A raw `(name, role?)` pair extracted from one episode page. Transient:
/// consumed immediately by resolution, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct GuestMention {
    pub name: String,
    pub role: Option<String>,
}

impl GuestMention {
    pub fn new(name: impl Into<String>, role: Option<String>) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// Known hosts/moderators, excluded by name+show pair so a host showing up
/// as a guest elsewhere is still counted there.
const HOSTS: &[(&str, &str)] = &[
    ("Markus Lanz", "Markus Lanz"),
    ("maybrit illner", "Maybrit Illner"),
    ("Caren Miosga", "Caren Miosga"),
    ("maischberger", "Sandra Maischberger"),
];

/// Lowercase nobiliary particles allowed between capitalized name tokens.
/// Matches "Jan van Aken", "Ursula von der Leyen", "Karl-Theodor zu
/// Guttenberg" while rejecting UI noise like "Mehr laden".
static PERSON_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\p{Lu}[\p{L}\-.']*(?:\s+(?:von|van|de|der|den|zu|zur|zum|vom|ter|te|da|di|la|le|el|al|\p{Lu}[\p{L}\-.']*))*\s+\p{Lu}[\p{L}\-.']*$",
    )
    .unwrap()
});

/// Capitalized two-or-more-word sequences in prose, tolerating particles.
static PROSE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\p{Lu}[\p{L}\-.']+(?:\s+(?:von|van|de|der|den|zu|zur|zum))*(?:\s+\p{Lu}[\p{L}\-.']+)+",
    )
    .unwrap()
});

/// Heuristic: does this string look like a person's name?
///
/// Requires at least two space-separated tokens with capitalized first
/// letters, allowing a closed set of lowercase German nobiliary particles
/// between name tokens.
pub fn seems_like_person_name(s: &str) -> bool {
    PERSON_NAME.is_match(s.trim())
}

/// Run sync strategies in rank order, short-circuiting on the first
/// non-empty result.
pub fn first_non_empty(
    document: &Html,
    strategies: &[&dyn Fn(&Html) -> Vec<GuestMention>],
) -> Vec<GuestMention> {
    for (rank, strategy) in strategies.iter().enumerate() {
        let found = strategy(document);
        if !found.is_empty() {
            debug!(rank, count = found.len(), "extraction strategy produced mentions");
            return found;
        }
    }
    Vec::new()
}

/// Strategy 1/2: parse `"Name, Role"` formatted text nodes under `selector`.
/// Entries without a comma are discarded as non-guest text.
pub fn comma_pairs(document: &Html, selector: &str) -> Vec<GuestMention> {
    let Ok(sel) = Selector::parse(selector) else {
        warn!(selector, "invalid guest selector");
        return Vec::new();
    };
    let mut mentions = Vec::new();
    for element in document.select(&sel) {
        let text = element.text().collect::<Vec<_>>().join(" ");
        let text = text.trim();
        let Some((name, role)) = text.split_once(',') else {
            continue;
        };
        let name = name.trim();
        let role = role.trim();
        if name.is_empty() {
            continue;
        }
        mentions.push(GuestMention::new(
            name,
            (!role.is_empty()).then(|| role.to_string()),
        ));
    }
    mentions
}

/// Strategy 3: parse a hero image's alt text, split on `:` then `,`.
/// Lowest-confidence DOM source; roles are not recoverable here.
pub fn alt_text_guests(document: &Html, selector: &str) -> Vec<GuestMention> {
    let Ok(sel) = Selector::parse(selector) else {
        warn!(selector, "invalid alt-text selector");
        return Vec::new();
    };
    let Some(alt) = document
        .select(&sel)
        .find_map(|el| el.value().attr("alt"))
    else {
        return Vec::new();
    };
    let names = alt.rsplit(':').next().unwrap_or(alt);
    names
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| GuestMention::new(segment, None))
        .collect()
}

/// Strategy 4: regex extraction of capitalized multi-word sequences from
/// teaser prose, with an explicit exclusion list (show name, host).
pub fn prose_names(text: &str, exclude: &[&str]) -> Vec<GuestMention> {
    PROSE_NAME
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|name| !exclude.iter().any(|ex| name.contains(ex)))
        .map(|name| GuestMention::new(name, None))
        .collect()
}

/// Final pass over all candidates regardless of source: person-name filter,
/// host exclusion for this show, and order-preserving dedup by exact name.
pub fn finalize(show: &str, mentions: Vec<GuestMention>) -> Vec<GuestMention> {
    let mut seen: HashSet<String> = HashSet::new();
    mentions
        .into_iter()
        .filter(|m| seems_like_person_name(&m.name))
        .filter(|m| {
            !HOSTS
                .iter()
                .any(|(host_show, host)| *host_show == show && *host == m.name)
        })
        .filter(|m| seen.insert(m.name.clone()))
        .collect()
}

/// Parse the model's "JSON array of name strings" reply. Malformed output
/// yields `None` so the caller can fall back to the prose strategy.
pub fn parse_model_names(raw: &str) -> Option<Vec<GuestMention>> {
    let cleaned = crate::llm::strip_code_fences(raw);
    let names: Vec<String> = serde_json::from_str(cleaned).ok()?;
    Some(
        names
            .into_iter()
            .map(|name| GuestMention::new(name.trim().to_string(), None))
            .collect(),
    )
}
