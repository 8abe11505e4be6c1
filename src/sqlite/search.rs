//! Nearest-neighbour queries over stored card vectors.

use std::cmp::Ordering;

use super::{Database, Error, IndexedCard, embedding};

pub type Result<T> = std::result::Result<T, Error>;

/// Upper bound for `top_k` on a single query.
pub const MAX_QUERY_LIMIT: usize = 10_000;

/// Validate a query limit is within acceptable bounds.
pub fn validate_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(Error::InvalidLimit(
            "Limit must be greater than 0".to_string(),
        ));
    }
    if limit > MAX_QUERY_LIMIT {
        return Err(Error::InvalidLimit(format!(
            "Limit {limit} exceeds maximum allowed ({MAX_QUERY_LIMIT})"
        )));
    }
    Ok(())
}

/// Order by descending similarity, then ascending remote id.
pub(crate) fn rank(a: &(IndexedCard, f64), b: &(IndexedCard, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.remote_id.cmp(&b.0.remote_id))
}

impl Database {
    /// Return the `limit` cards closest to `query_embedding` by cosine similarity.
    ///
    /// Scans every row of the deck (or the whole index) and ranks in memory.
    pub fn nearest(
        &self,
        query_embedding: &[f32],
        limit: usize,
        deck_name: Option<&str>,
    ) -> Result<Vec<(IndexedCard, f64)>> {
        validate_limit(limit)?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT remote_id, deck_name, front, back, embedding_text, last_modified, indexed_at, embedding
            FROM cards
            WHERE ?1 IS NULL OR deck_name = ?1
            "#,
        )?;

        let rows = stmt.query_map([deck_name], |row| {
            Ok((super::row_to_card(row)?, row.get::<_, Vec<u8>>(7)?))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (card, blob) = row?;
            let stored = embedding::blob_to_vec(&blob)?;
            let similarity = embedding::cosine_similarity(query_embedding, &stored)?;
            scored.push((card, similarity));
        }

        scored.sort_by(rank);
        scored.truncate(limit);
        Ok(scored)
    }
}
