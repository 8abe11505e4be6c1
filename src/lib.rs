//! ankivec - mirror Anki decks into a local vector index and catch
//! near-duplicate cards.
//!
//! The core is synchronous. A [`SyncEngine`] reconciles a deck in a
//! [`CardSource`] against a [`VectorStore`], and a [`DuplicateResolver`]
//! classifies candidate cards against the store. Interactive choices are
//! turned into actions by the pure [`decide`] function and carried out by
//! a [`CardWriter`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use ankivec::{
//!     AnkiConnect, Config, DuplicateResolver, EmbeddingEngine, LocalIndex, Resolution,
//!     ResolverOptions, SyncEngine, SyncMode, SyncOptions,
//! };
//!
//! let config = Config::default();
//! let anki = AnkiConnect::new(&config.anki_url, Duration::from_secs(5)).unwrap();
//! let engine = EmbeddingEngine::new(&config.embedding_model, &config.model_cache).unwrap();
//! let index = LocalIndex::open(&config.database_path, engine).unwrap();
//!
//! // Mirror the deck, embedding only new and changed cards
//! let sync = SyncEngine::new(&anki, &index, SyncOptions::default()).unwrap();
//! let report = sync.sync("CS", SyncMode::Incremental).unwrap();
//! println!("{} added, {} failed", report.summary.added, report.summary.failed);
//!
//! // Check a candidate card before adding it
//! let resolver = DuplicateResolver::new(&index, ResolverOptions::default());
//! match resolver.resolve("What is Big O?", "", Some("CS"), 0.8) {
//!     Resolution::New => println!("no duplicates"),
//!     Resolution::DuplicateCandidates(matches) => {
//!         for m in matches {
//!             println!("{:.2}: {}", m.similarity(), m.card.front);
//!         }
//!     }
//!     Resolution::Unavailable { reason } | Resolution::Failed { reason } => eprintln!("{reason}"),
//! }
//! ```

pub mod apply;
pub mod card;
pub mod commands;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod import;
pub mod index;
pub mod logging;
pub mod output;
pub mod remote;
pub mod resolver;
pub mod sqlite;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export public API
pub use apply::CardWriter;
pub use card::{Card, CardMetadata, CardStamp};
pub use config::Config;
pub use embedding::{EMBEDDING_DIMS, Embedder, EmbeddingEngine};
pub use errors::Error;
pub use import::{CardDraft, ImportReport, ParseIssue, ParsedFile, run_import};
pub use index::{LocalIndex, StoreMatch, VectorStore};
pub use remote::{AnkiConnect, CardSource};
pub use resolver::{
    Action, Choice, ChoiceContext, DuplicateResolver, Resolution, ResolverOptions,
    SimilarityMatch, decide, parse_choice,
};
pub use sqlite::IndexedCard;
pub use sync::{
    CardStatus, ItemOutcome, SyncEngine, SyncMode, SyncOptions, SyncPlan, SyncReport, SyncSummary,
};
