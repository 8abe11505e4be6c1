//! Remote flashcard source.
//!
//! The core only needs the operations on [`CardSource`]. [`AnkiConnect`]
//! implements them against the AnkiConnect plugin's HTTP API.

mod anki;

pub use anki::AnkiConnect;

use crate::card::{Card, CardStamp};
use crate::errors::Error;

/// Operations the sync engine and card writer need from the flashcard app.
pub trait CardSource: Send + Sync {
    /// All deck names.
    fn list_decks(&self) -> Result<Vec<String>, Error>;

    /// Ids of the cards currently in `deck`.
    fn list_card_ids(&self, deck: &str) -> Result<Vec<String>, Error>;

    /// Full cards for `ids`. Ids the source no longer knows are left out.
    fn get_cards(&self, ids: &[String]) -> Result<Vec<Card>, Error>;

    /// Create a card and return its new id.
    fn add_card(&self, deck: &str, front: &str, back: &str) -> Result<String, Error>;

    /// Overwrite the fields of an existing card.
    fn update_card(&self, remote_id: &str, front: &str, back: &str) -> Result<(), Error>;

    /// Modification times for `ids`.
    ///
    /// Sources with a cheaper call than fetching whole cards should
    /// override this.
    fn card_stamps(&self, ids: &[String]) -> Result<Vec<CardStamp>, Error> {
        Ok(self.get_cards(ids)?.iter().map(Card::stamp).collect())
    }
}
