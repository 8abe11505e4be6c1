//! Near-duplicate detection for candidate cards.
//!
//! The resolver only classifies: it reports whether a candidate is new,
//! has duplicate candidates, or could not be checked. What to do about it
//! is decided by [`decide`] from the user's choice.

mod decision;

pub use decision::{Action, Choice, ChoiceContext, decide, parse_choice};

use std::cmp::Ordering;

use serde::Serialize;

use crate::card::embedding_text;
use crate::errors::Error;
use crate::index::VectorStore;
use crate::sqlite::IndexedCard;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_ADD_THRESHOLD: f64 = 0.8;
pub const DEFAULT_IMPORT_THRESHOLD: f64 = 0.9;

/// A stored card close to a candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatch {
    pub candidate_text: String,
    pub card: IndexedCard,
    pub distance: f64,
}

impl SimilarityMatch {
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance
    }
}

/// Classification of a candidate card.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Nothing at or above the threshold.
    New,
    /// Matches at or above the threshold, most similar first.
    DuplicateCandidates(Vec<SimilarityMatch>),
    /// The store could not be reached.
    Unavailable { reason: String },
    /// This candidate could not be checked, e.g. its text failed to embed.
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverOptions {
    pub top_k: usize,
    pub embed_back: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions {
            top_k: DEFAULT_TOP_K,
            embed_back: true,
        }
    }
}

pub struct DuplicateResolver<'a> {
    store: &'a dyn VectorStore,
    options: ResolverOptions,
}

fn by_similarity(a: &SimilarityMatch, b: &SimilarityMatch) -> Ordering {
    b.similarity()
        .partial_cmp(&a.similarity())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.card.remote_id.cmp(&b.card.remote_id))
}

impl<'a> DuplicateResolver<'a> {
    pub fn new(store: &'a dyn VectorStore, options: ResolverOptions) -> Self {
        DuplicateResolver { store, options }
    }

    /// Stored cards whose similarity to the candidate is at least `threshold`.
    ///
    /// Results are scoped to `deck` when given, ordered by descending
    /// similarity with ties broken by ascending remote id.
    ///
    /// # Errors
    ///
    /// Returns error if the candidate front is blank or the store query fails.
    pub fn find_similar(
        &self,
        front: &str,
        back: &str,
        deck: Option<&str>,
        threshold: f64,
    ) -> Result<Vec<SimilarityMatch>, Error> {
        if front.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        let text = embedding_text(front, back, self.options.embed_back);
        let hits = self.store.query(&text, self.options.top_k, deck)?;

        let mut matches: Vec<SimilarityMatch> = hits
            .into_iter()
            .filter(|hit| deck.is_none_or(|d| hit.card.deck_name == d))
            .map(|hit| SimilarityMatch {
                candidate_text: text.clone(),
                card: hit.card,
                distance: hit.distance,
            })
            .filter(|m| m.similarity() >= threshold)
            .collect();
        matches.sort_by(by_similarity);
        tracing::debug!(deck, threshold, matches = matches.len(), "similarity query");
        Ok(matches)
    }

    /// Classify a candidate card.
    ///
    /// Connectivity errors become `Unavailable`; any other error only
    /// concerns this candidate and becomes `Failed`.
    pub fn resolve(&self, front: &str, back: &str, deck: Option<&str>, threshold: f64) -> Resolution {
        match self.find_similar(front, back, deck, threshold) {
            Ok(matches) if matches.is_empty() => Resolution::New,
            Ok(matches) => Resolution::DuplicateCandidates(matches),
            Err(e) if e.is_connectivity() => {
                tracing::error!(error = %e, "duplicate check failed");
                Resolution::Unavailable {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not check candidate");
                Resolution::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::StoreMatch;
    use crate::test_utils::{FixedStore, FlakyStore, indexed, memory_index};

    fn hit(id: &str, deck: &str, distance: f64) -> StoreMatch {
        StoreMatch {
            card: indexed(id, deck, &format!("card {id}")),
            distance,
        }
    }

    fn ids(matches: &[SimilarityMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.card.remote_id.as_str()).collect()
    }

    #[test]
    fn test_threshold_keeps_only_close_match() {
        let store = FixedStore {
            matches: vec![hit("a", "CS", 0.15), hit("b", "CS", 0.25)],
        };
        let resolver = DuplicateResolver::new(&store, ResolverOptions::default());

        let matches = resolver.find_similar("Big O", "", Some("CS"), 0.8).unwrap();
        assert_eq!(ids(&matches), vec!["a"]);
        assert!((matches[0].similarity() - 0.85).abs() < 1e-9);

        match resolver.resolve("Big O", "", Some("CS"), 0.8) {
            Resolution::DuplicateCandidates(m) => assert_eq!(ids(&m), vec!["a"]),
            other => panic!("expected duplicates, got {other:?}"),
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let store = FixedStore {
            matches: vec![hit("a", "CS", 0.25)],
        };
        let resolver = DuplicateResolver::new(&store, ResolverOptions::default());
        let matches = resolver.find_similar("q", "", None, 0.75).unwrap();
        assert_eq!(ids(&matches), vec!["a"]);
    }

    #[test]
    fn test_ties_ordered_by_remote_id() {
        let store = FixedStore {
            matches: vec![hit("b", "CS", 0.1), hit("c", "CS", 0.05), hit("a", "CS", 0.1)],
        };
        let resolver = DuplicateResolver::new(&store, ResolverOptions::default());
        let matches = resolver.find_similar("q", "", None, 0.5).unwrap();
        assert_eq!(ids(&matches), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_filters_deck_after_query() {
        let store = FixedStore {
            matches: vec![hit("a", "Math", 0.0), hit("b", "CS", 0.1)],
        };
        let resolver = DuplicateResolver::new(&store, ResolverOptions::default());
        let matches = resolver.find_similar("q", "", Some("CS"), 0.5).unwrap();
        assert_eq!(ids(&matches), vec!["b"]);

        let unscoped = resolver.find_similar("q", "", None, 0.5).unwrap();
        assert_eq!(ids(&unscoped), vec!["a", "b"]);
    }

    #[test]
    fn test_no_match_is_new() {
        let store = FixedStore {
            matches: vec![hit("a", "CS", 0.9)],
        };
        let resolver = DuplicateResolver::new(&store, ResolverOptions::default());
        assert_eq!(resolver.resolve("q", "", Some("CS"), 0.8), Resolution::New);
    }

    #[test]
    fn test_unreachable_store_is_unavailable() {
        let mut store = FlakyStore::new(memory_index());
        store.offline = true;
        let resolver = DuplicateResolver::new(&store, ResolverOptions::default());
        assert!(matches!(
            resolver.resolve("q", "", None, 0.8),
            Resolution::Unavailable { reason } if reason.contains("unavailable")
        ));
    }

    #[test]
    fn test_candidate_error_is_failed_not_unavailable() {
        let mut store = FlakyStore::new(memory_index());
        store.failing_queries.insert("bad text".to_string());
        let resolver = DuplicateResolver::new(&store, ResolverOptions::default());

        assert!(matches!(
            resolver.resolve("bad text", "", None, 0.8),
            Resolution::Failed { reason } if reason.contains("cannot tokenize")
        ));
        assert!(matches!(
            resolver.resolve("  ", "", None, 0.8),
            Resolution::Failed { .. }
        ));
        assert_eq!(resolver.resolve("good text", "", None, 0.8), Resolution::New);
    }

    #[test]
    fn test_blank_front_rejected() {
        let store = FixedStore { matches: vec![] };
        let resolver = DuplicateResolver::new(&store, ResolverOptions::default());
        assert!(matches!(
            resolver.find_similar("  ", "back", None, 0.8),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn test_real_index_finds_identical_card() {
        let index = memory_index();
        let meta = crate::card::CardMetadata {
            deck_name: "CS".to_string(),
            front: "Define recursion".to_string(),
            back: String::new(),
            last_modified: 1,
        };
        index.upsert("2", "Define recursion", &meta).unwrap();
        let options = ResolverOptions {
            top_k: 5,
            embed_back: false,
        };
        let resolver = DuplicateResolver::new(&index, options);

        let matches = resolver
            .find_similar("define recursion", "ignored back", Some("CS"), 0.99)
            .unwrap();
        assert_eq!(ids(&matches), vec!["2"]);
        assert_eq!(matches[0].candidate_text, "define recursion");
    }
}
