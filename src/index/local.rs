//! SQLite + local embedding model implementation of `VectorStore`.

use std::path::{Component, Path};
use std::sync::{Mutex, MutexGuard};

use crate::card::CardMetadata;
use crate::embedding::Embedder;
use crate::errors::Error;
use crate::sqlite::{Database, IndexedCard};

use super::{StoreMatch, VectorStore};

/// Local card index: one SQLite file plus an in-process embedder.
///
/// Both halves sit behind their own mutex so worker threads can share a
/// `&LocalIndex`. Embedding happens outside the database lock.
pub struct LocalIndex<E: Embedder> {
    db: Mutex<Database>,
    embedder: Mutex<E>,
}

impl<E: Embedder> LocalIndex<E> {
    /// Open (or create) the index file at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the path contains `..` components
    /// - the parent directory does not exist
    /// - the database cannot be opened
    pub fn open(db_path: &Path, embedder: E) -> Result<Self, Error> {
        if db_path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(Error::Config(
                "Invalid database path: contains '..' which may escape the intended directory"
                    .to_string(),
            ));
        }

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::canonicalize(parent).map_err(|e| {
                    Error::Config(format!(
                        "Invalid database path: parent directory not accessible: {e}"
                    ))
                })?;
            }
        }

        let db = Database::open(db_path).map_err(|e| Error::store(e.to_string()))?;
        Ok(Self::from_parts(db, embedder))
    }

    /// Wrap an already opened database.
    pub fn from_parts(db: Database, embedder: E) -> Self {
        LocalIndex {
            db: Mutex::new(db),
            embedder: Mutex::new(embedder),
        }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>, Error> {
        self.db
            .lock()
            .map_err(|e| Error::store(format!("database lock poisoned: {e}")))
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, Error> {
        let mut embedder = self
            .embedder
            .lock()
            .map_err(|e| Error::store(format!("embedder lock poisoned: {e}")))?;
        embedder.embed(text)
    }

    /// Number of stored entries, optionally for one deck.
    pub fn count(&self, deck_filter: Option<&str>) -> Result<usize, Error> {
        Ok(self.db()?.count(deck_filter)?)
    }

    /// Fetch one stored entry.
    pub fn get(&self, remote_id: &str) -> Result<Option<IndexedCard>, Error> {
        Ok(self.db()?.get(remote_id)?)
    }
}

impl<E: Embedder> VectorStore for LocalIndex<E> {
    fn upsert(&self, remote_id: &str, text: &str, metadata: &CardMetadata) -> Result<(), Error> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        let embedding = self.embed(text)?;
        self.db()?.upsert(remote_id, text, &embedding, metadata)?;
        Ok(())
    }

    fn delete(&self, remote_ids: &[String]) -> Result<usize, Error> {
        if remote_ids.is_empty() {
            return Ok(0);
        }
        Ok(self.db()?.delete_many(remote_ids)?)
    }

    fn query(
        &self,
        text: &str,
        top_k: usize,
        deck_filter: Option<&str>,
    ) -> Result<Vec<StoreMatch>, Error> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        let embedding = self.embed(text)?;
        let hits = self.db()?.nearest(&embedding, top_k, deck_filter)?;
        Ok(hits
            .into_iter()
            .map(|(card, similarity)| StoreMatch {
                card,
                distance: 1.0 - similarity,
            })
            .collect())
    }

    fn list(&self, deck_filter: Option<&str>) -> Result<Vec<IndexedCard>, Error> {
        Ok(self.db()?.list(deck_filter)?)
    }
}
