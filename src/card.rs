//! Card types shared by the sync engine, the resolver and the card source.

use serde::Serialize;

/// A card as the remote source knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub remote_id: String,
    pub deck_name: String,
    pub front: String,
    pub back: String,
    /// Modification time in unix seconds, assigned by the remote source.
    pub last_modified: i64,
}

/// Identity and modification time of a remote card, without its content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardStamp {
    pub remote_id: String,
    pub last_modified: i64,
}

/// Metadata stored next to each vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardMetadata {
    pub deck_name: String,
    pub front: String,
    pub back: String,
    pub last_modified: i64,
}

/// Build the text that gets embedded for a card.
///
/// With `embed_back` the front and back are joined by a single space.
pub fn embedding_text(front: &str, back: &str, embed_back: bool) -> String {
    if embed_back && !back.trim().is_empty() {
        format!("{} {}", front.trim(), back.trim())
    } else {
        front.trim().to_string()
    }
}

impl Card {
    pub fn stamp(&self) -> CardStamp {
        CardStamp {
            remote_id: self.remote_id.clone(),
            last_modified: self.last_modified,
        }
    }

    pub fn metadata(&self) -> CardMetadata {
        CardMetadata {
            deck_name: self.deck_name.clone(),
            front: self.front.clone(),
            back: self.back.clone(),
            last_modified: self.last_modified,
        }
    }

    /// Metadata tagged with `deck`, the deck whose listing produced this card.
    ///
    /// A note with cards in several decks reports only one of them, so the
    /// index records the deck the card was listed under instead.
    pub fn metadata_in(&self, deck: &str) -> CardMetadata {
        CardMetadata {
            deck_name: deck.to_string(),
            ..self.metadata()
        }
    }

    pub fn embedding_text(&self, embed_back: bool) -> String {
        embedding_text(&self.front, &self.back, embed_back)
    }
}
