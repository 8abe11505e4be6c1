//! SQLite backend for the local card index.
//!
//! This module provides:
//! - `Database`: connection, schema and keyed card writes
//! - `IndexedCard`: a mirrored card as stored next to its vector
//! - `embedding`: BLOB conversion and cosine similarity
//! - `search`: brute-force nearest-neighbour queries

pub mod embedding;
pub mod search;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;

use crate::card::CardMetadata;

pub use self::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};

/// A card mirrored into the index.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IndexedCard {
    pub remote_id: String,
    pub deck_name: String,
    pub front: String,
    pub back: String,
    pub embedding_text: String,
    /// Remote modification time recorded when the card was last embedded.
    pub last_modified: i64,
    pub indexed_at: String,
}

/// Error types for SQLite operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid BLOB size: expected {expected} bytes, got {actual} bytes")]
    InvalidBlobSize { expected: usize, actual: usize },

    #[error("Mismatched dimensions: expected {expected} dimensions, got {actual} dimensions")]
    MismatchedDimensions { expected: usize, actual: usize },

    #[error("Cannot compute similarity with empty vector")]
    EmptyVector,

    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// SQLite database holding card vectors and their metadata.
pub struct Database {
    conn: Connection,
}

const CARD_COLUMNS: &str =
    "remote_id, deck_name, front, back, embedding_text, last_modified, indexed_at";

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS cards (
            remote_id TEXT PRIMARY KEY,
            deck_name TEXT NOT NULL,
            front TEXT NOT NULL,
            back TEXT NOT NULL,
            embedding_text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            last_modified INTEGER NOT NULL,
            indexed_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_name);
        "#,
    )?;
    Ok(())
}

pub(crate) fn row_to_card(row: &Row<'_>) -> rusqlite::Result<IndexedCard> {
    Ok(IndexedCard {
        remote_id: row.get(0)?,
        deck_name: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        embedding_text: row.get(4)?,
        last_modified: row.get(5)?,
        indexed_at: row.get(6)?,
    })
}

impl Database {
    /// Open or create the index at the given path.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or schema initialization fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open a throwaway in-memory index.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Insert or replace the entry for `remote_id`.
    ///
    /// The card keeps a single row no matter how often it is written; the
    /// deck tag follows the latest write, which is how moved cards end up
    /// under their new deck.
    pub fn upsert(
        &self,
        remote_id: &str,
        embedding_text: &str,
        embedding: &[f32],
        metadata: &CardMetadata,
    ) -> Result<()> {
        let blob = vec_to_blob(embedding)?;
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            r#"
            INSERT INTO cards (remote_id, deck_name, front, back, embedding_text, embedding, last_modified, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(remote_id) DO UPDATE SET
                deck_name = excluded.deck_name,
                front = excluded.front,
                back = excluded.back,
                embedding_text = excluded.embedding_text,
                embedding = excluded.embedding,
                last_modified = excluded.last_modified,
                indexed_at = excluded.indexed_at
            "#,
            params![
                remote_id,
                &metadata.deck_name,
                &metadata.front,
                &metadata.back,
                embedding_text,
                &blob,
                metadata.last_modified,
                &now
            ],
        )?;

        Ok(())
    }

    /// Retrieve a single card by remote id.
    pub fn get(&self, remote_id: &str) -> Result<Option<IndexedCard>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE remote_id = ?1");
        let card = self
            .conn
            .query_row(&sql, [remote_id], row_to_card)
            .optional()?;
        Ok(card)
    }

    /// List indexed cards, optionally restricted to one deck, ordered by remote id.
    pub fn list(&self, deck_name: Option<&str>) -> Result<Vec<IndexedCard>> {
        let cards = match deck_name {
            Some(deck) => {
                let sql = format!(
                    "SELECT {CARD_COLUMNS} FROM cards WHERE deck_name = ?1 ORDER BY remote_id"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                stmt.query_map([deck], row_to_card)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let sql = format!("SELECT {CARD_COLUMNS} FROM cards ORDER BY remote_id");
                let mut stmt = self.conn.prepare(&sql)?;
                stmt.query_map([], row_to_card)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(cards)
    }

    /// Delete all given ids in one transaction. Missing ids are ignored.
    ///
    /// Returns the number of rows removed.
    pub fn delete_many(&mut self, remote_ids: &[String]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM cards WHERE remote_id = ?1")?;
            for id in remote_ids {
                removed += stmt.execute([id])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Number of indexed cards, optionally for one deck.
    pub fn count(&self, deck_name: Option<&str>) -> Result<usize> {
        let count: i64 = match deck_name {
            Some(deck) => self.conn.query_row(
                "SELECT COUNT(*) FROM cards WHERE deck_name = ?1",
                [deck],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?,
        };
        Ok(count as usize)
    }
}
