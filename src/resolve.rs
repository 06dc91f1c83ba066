//! Guest-name to politician resolution.
//!
//! Resolution runs in a fixed order for every extracted guest mention:
//!
//! 1. [`OverrideTable`]: hard-coded identities for names the registry does
//!    not know or cannot disambiguate automatically; checked before any
//!    network call.
//! 2. Registry lookup via [`RegistryClient`](crate::registry::RegistryClient).
//! 3. [`pick`]: narrows multiple candidates using the guest's role text
//!    (party keywords, then top-office keywords).
//! 4. Last resort: first candidate in registry order, logged as
//!    unresolved-but-assumed.

use crate::registry::{Candidate, LookupPoliticians, RegistryClient};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A fully resolved politician identity ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPolitician {
    pub id: i64,
    pub name: String,
    pub party_id: Option<i64>,
    pub party: Option<String>,
}

impl ResolvedPolitician {
    fn from_candidate(c: &Candidate) -> Self {
        Self {
            id: c.id,
            name: c.label.clone(),
            party_id: c.party.as_ref().map(|p| p.id),
            party: c.party.as_ref().map(|p| correct_party(&p.label).to_string()),
        }
    }
}

/// Party name to uppercase keyword variants recognized in role text.
///
/// Checked in order; the first party whose variant appears in the uppercased
/// role text wins. Variants cover both abbreviations and spelled-out names
/// as they show up in show teasers ("CSU-Chef", "Grünen-Politikerin").
const PARTY_KEYWORDS: &[(&str, &[&str])] = &[
    ("CSU", &["CSU", "CHRISTLICH-SOZIALE UNION"]),
    ("CDU", &["CDU", "CHRISTLICH DEMOKRATISCHE UNION"]),
    ("SPD", &["SPD", "SOZIALDEMOKRAT"]),
    ("GRÜNE", &["GRÜNE", "GRUENE", "BÜNDNIS 90"]),
    ("FDP", &["FDP", "FREIE DEMOKRAT"]),
    ("AfD", &["AFD", "ALTERNATIVE FÜR DEUTSCHLAND"]),
    ("DIE LINKE", &["LINKE", "LINKSPARTEI"]),
    ("BSW", &["BSW", "BÜNDNIS SAHRA WAGENKNECHT", "WAGENKNECHT"]),
    ("FREIE WÄHLER", &["FREIE WÄHLER", "FREIE WAEHLER"]),
];

/// Top-office keywords. Office holders rank first in the registry's default
/// ordering, so a match selects the first candidate.
const OFFICE_KEYWORDS: &[&str] = &[
    "BUNDESKANZLER",
    "MINISTERPRÄSIDENT",
    "BUNDESMINISTER",
    "BUNDESPRÄSIDENT",
    "VIZEKANZLER",
];

/// Narrow multiple registry candidates to one using role text.
///
/// Pure function: same candidate list and role text always yield the same
/// output. Returns `None` when no rule matched; the caller decides on the
/// first-candidate fallback.
pub fn pick<'a>(candidates: &'a [Candidate], role_text: Option<&str>) -> Option<&'a Candidate> {
    match candidates {
        [] => None,
        [only] => Some(only),
        many => {
            let role_upper = role_text?.to_uppercase();
            for (party_token, variants) in PARTY_KEYWORDS {
                if variants.iter().any(|v| role_upper.contains(v)) {
                    if let Some(hit) = many.iter().find(|c| {
                        c.party
                            .as_ref()
                            .is_some_and(|p| p.label.to_uppercase().contains(&party_token.to_uppercase()))
                    }) {
                        return Some(hit);
                    }
                }
            }
            if OFFICE_KEYWORDS.iter().any(|k| role_upper.contains(k)) {
                return many.first();
            }
            None
        }
    }
}

/// Rewrite known-bad registry party labels.
///
/// Single enumerated correction: the registry labels one Bavarian
/// state-level politician "Bayernpartei" where the federal affiliation is
/// CSU. Not a template for a broader rule.
pub fn correct_party(label: &str) -> &str {
    if label == "Bayernpartei" { "CSU" } else { label }
}

/// Static exception map bypassing registry lookup for known-bad or missing
/// entries. Immutable, initialized once, injected into the resolver.
pub struct OverrideTable {
    entries: HashMap<&'static str, ResolvedPolitician>,
}

static DEFAULT_OVERRIDES: Lazy<HashMap<&'static str, ResolvedPolitician>> = Lazy::new(|| {
    let mut m = HashMap::new();
    // Not in the registry (state-level office, never ran federally).
    m.insert(
        "Manuela Schwesig",
        ResolvedPolitician {
            id: 78973,
            name: "Manuela Schwesig".to_string(),
            party_id: Some(1),
            party: Some("SPD".to_string()),
        },
    );
    // Registry lists several same-named entries; disambiguation by role text
    // fails because teasers only ever say "Politikerin".
    m.insert(
        "Gitta Connemann",
        ResolvedPolitician {
            id: 78899,
            name: "Gitta Connemann".to_string(),
            party_id: Some(2),
            party: Some("CDU".to_string()),
        },
    );
    m
});

impl OverrideTable {
    pub fn builtin() -> Self {
        Self {
            entries: DEFAULT_OVERRIDES.clone(),
        }
    }

    #[cfg(test)]
    pub fn from_entries(entries: HashMap<&'static str, ResolvedPolitician>) -> Self {
        Self { entries }
    }

    /// Exact-string-match lookup, consulted before any registry call.
    pub fn lookup(&self, literal_name: &str) -> Option<&ResolvedPolitician> {
        self.entries.get(literal_name)
    }
}

/// Resolves guest mentions to registry politician records.
pub struct Resolver<R = RegistryClient> {
    registry: R,
    overrides: OverrideTable,
}

impl<R: LookupPoliticians> Resolver<R> {
    pub fn new(registry: R, overrides: OverrideTable) -> Self {
        Self { registry, overrides }
    }

    /// Resolve one guest mention. `None` means "not a politician"; the
    /// mention is dropped without error.
    pub async fn resolve(&self, name: &str, role: Option<&str>) -> Option<ResolvedPolitician> {
        if let Some(hit) = self.overrides.lookup(name) {
            info!(name, politician_id = hit.id, "resolved via override table");
            return Some(hit.clone());
        }

        let (first_name, last_name) = RegistryClient::split_name(name)?;
        let candidates = self.registry.lookup(&first_name, &last_name).await;
        if candidates.is_empty() {
            debug!(name, "no registry candidates");
            return None;
        }

        let chosen = match pick(&candidates, role) {
            Some(c) => c,
            None => {
                // Registry ordering is not documented as stable; this is a
                // heuristic, kept as observed behavior.
                warn!(
                    name,
                    candidates = candidates.len(),
                    role = role.unwrap_or(""),
                    "ambiguous registry result; assuming first candidate"
                );
                &candidates[0]
            }
        };
        Some(ResolvedPolitician::from_candidate(chosen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Party;

    fn candidate(id: i64, label: &str, party: Option<(i64, &str)>) -> Candidate {
        Candidate {
            id,
            label: label.to_string(),
            party: party.map(|(pid, plabel)| Party {
                id: pid,
                label: plabel.to_string(),
            }),
        }
    }

    #[test]
    fn test_pick_zero_candidates() {
        assert_eq!(pick(&[], Some("CSU-Chef")), None);
    }

    #[test]
    fn test_pick_single_candidate_ignores_role() {
        let cands = vec![candidate(1, "Friedrich Merz", Some((2, "CDU")))];
        assert_eq!(pick(&cands, None).unwrap().id, 1);
        assert_eq!(pick(&cands, Some("irrelevant")).unwrap().id, 1);
    }

    #[test]
    fn test_pick_disambiguates_by_party_keyword() {
        let cands = vec![
            candidate(1, "Markus Huber", Some((1, "SPD"))),
            candidate(2, "Markus Huber", Some((3, "CSU"))),
        ];
        assert_eq!(pick(&cands, Some("CSU-Chef")).unwrap().id, 2);
    }

    #[test]
    fn test_pick_party_variant_spelled_out() {
        let cands = vec![
            candidate(1, "Anna Schmidt", Some((4, "FDP"))),
            candidate(2, "Anna Schmidt", Some((1, "SPD"))),
        ];
        assert_eq!(
            pick(&cands, Some("Sozialdemokratin und Abgeordnete"))
                .unwrap()
                .id,
            2
        );
    }

    #[test]
    fn test_pick_office_keyword_takes_first() {
        let cands = vec![
            candidate(7, "Stephan Weil", None),
            candidate(8, "Stephan Weil", Some((1, "SPD"))),
        ];
        assert_eq!(
            pick(&cands, Some("Ministerpräsident von Niedersachsen"))
                .unwrap()
                .id,
            7
        );
    }

    #[test]
    fn test_pick_no_rule_matched() {
        let cands = vec![
            candidate(1, "Peter Meyer", Some((1, "SPD"))),
            candidate(2, "Peter Meyer", Some((2, "CDU"))),
        ];
        assert_eq!(pick(&cands, Some("Autor und Journalist")), None);
        assert_eq!(pick(&cands, None), None);
    }

    #[test]
    fn test_pick_is_deterministic() {
        let cands = vec![
            candidate(1, "Markus Huber", Some((1, "SPD"))),
            candidate(2, "Markus Huber", Some((3, "CSU"))),
        ];
        let first = pick(&cands, Some("CSU-Chef")).map(|c| c.id);
        for _ in 0..10 {
            assert_eq!(pick(&cands, Some("CSU-Chef")).map(|c| c.id), first);
        }
    }

    #[test]
    fn test_correct_party_bayernpartei() {
        assert_eq!(correct_party("Bayernpartei"), "CSU");
        assert_eq!(correct_party("CSU"), "CSU");
        assert_eq!(correct_party("SPD"), "SPD");
    }

    #[test]
    fn test_override_lookup_exact_match_only() {
        let table = OverrideTable::builtin();
        assert!(table.lookup("Manuela Schwesig").is_some());
        assert!(table.lookup("manuela schwesig").is_none());
        assert!(table.lookup("Unknown Person").is_none());
    }

    #[test]
    fn test_resolved_from_candidate_applies_party_correction() {
        let c = candidate(5, "Sepp Obermaier", Some((9, "Bayernpartei")));
        let resolved = ResolvedPolitician::from_candidate(&c);
        assert_eq!(resolved.party.as_deref(), Some("CSU"));
    }

    struct StaticLookup(Vec<Candidate>);

    #[async_trait::async_trait]
    impl crate::registry::LookupPoliticians for StaticLookup {
        async fn lookup(&self, _first_name: &str, _last_name: &str) -> Vec<Candidate> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_resolve_override_short_circuits_registry() {
        // An empty lookup result would otherwise yield None.
        let resolver = Resolver::new(StaticLookup(Vec::new()), OverrideTable::builtin());
        let hit = resolver.resolve("Manuela Schwesig", None).await.unwrap();
        assert_eq!(hit.id, 78973);
        assert_eq!(hit.party.as_deref(), Some("SPD"));
    }

    #[tokio::test]
    async fn test_resolve_unknown_name_is_not_a_politician() {
        let resolver = Resolver::new(StaticLookup(Vec::new()), OverrideTable::builtin());
        assert!(resolver.resolve("Hans Beispiel", None).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_single_token_name_skips_lookup() {
        let resolver = Resolver::new(
            StaticLookup(vec![candidate(1, "Moderation", None)]),
            OverrideTable::builtin(),
        );
        assert!(resolver.resolve("Moderation", None).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_ambiguous_falls_back_to_first_candidate() {
        let resolver = Resolver::new(
            StaticLookup(vec![
                candidate(10, "Peter Meyer", Some((1, "SPD"))),
                candidate(11, "Peter Meyer", Some((2, "CDU"))),
            ]),
            OverrideTable::builtin(),
        );
        let hit = resolver
            .resolve("Peter Meyer", Some("Autor und Journalist"))
            .await
            .unwrap();
        assert_eq!(hit.id, 10);
    }

    #[tokio::test]
    async fn test_resolve_uses_role_for_disambiguation() {
        let resolver = Resolver::new(
            StaticLookup(vec![
                candidate(10, "Markus Huber", Some((1, "SPD"))),
                candidate(11, "Markus Huber", Some((3, "CSU"))),
            ]),
            OverrideTable::builtin(),
        );
        let hit = resolver
            .resolve("Markus Huber", Some("CSU-Generalsekretär"))
            .await
            .unwrap();
        assert_eq!(hit.id, 11);
    }
}
