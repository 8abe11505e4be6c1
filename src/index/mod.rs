//! Vector store abstraction over the card index.
//!
//! `VectorStore` is the narrow interface the sync engine and the duplicate
//! resolver depend on. `LocalIndex` implements it on top of the SQLite
//! database and an [`Embedder`](crate::embedding::Embedder).

mod local;

pub use local::LocalIndex;

use crate::card::CardMetadata;
use crate::errors::Error;
use crate::sqlite::IndexedCard;

/// One hit from a vector query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreMatch {
    pub card: IndexedCard,
    /// Cosine distance (`1 - cosine similarity`), lower is closer.
    pub distance: f64,
}

/// Persistent embedding index keyed by remote card id.
///
/// Implementations must be shareable across the sync worker pool: upserts
/// for distinct ids may run concurrently.
pub trait VectorStore: Send + Sync {
    /// Embed `text` and store it under `remote_id`, replacing any previous entry.
    fn upsert(&self, remote_id: &str, text: &str, metadata: &CardMetadata) -> Result<(), Error>;

    /// Remove the given ids; ids that are not stored are ignored.
    fn delete(&self, remote_ids: &[String]) -> Result<usize, Error>;

    /// Return up to `top_k` entries closest to `text`, closest first.
    ///
    /// `deck_filter` is a hint: stores that cannot filter may return
    /// entries from other decks.
    fn query(
        &self,
        text: &str,
        top_k: usize,
        deck_filter: Option<&str>,
    ) -> Result<Vec<StoreMatch>, Error>;

    /// All stored entries, optionally for a single deck.
    fn list(&self, deck_filter: Option<&str>) -> Result<Vec<IndexedCard>, Error>;
}

impl<T: VectorStore + ?Sized> VectorStore for &T {
    fn upsert(&self, remote_id: &str, text: &str, metadata: &CardMetadata) -> Result<(), Error> {
        (**self).upsert(remote_id, text, metadata)
    }

    fn delete(&self, remote_ids: &[String]) -> Result<usize, Error> {
        (**self).delete(remote_ids)
    }

    fn query(
        &self,
        text: &str,
        top_k: usize,
        deck_filter: Option<&str>,
    ) -> Result<Vec<StoreMatch>, Error> {
        (**self).query(text, top_k, deck_filter)
    }

    fn list(&self, deck_filter: Option<&str>) -> Result<Vec<IndexedCard>, Error> {
        (**self).list(deck_filter)
    }
}
