//! Executes add/replace decisions against the card source.

use crate::errors::Error;
use crate::index::VectorStore;
use crate::remote::CardSource;
use crate::resolver::Action;
use crate::sync::{CardStatus, ItemOutcome};

/// Writes cards to the source and refreshes their index entries.
pub struct CardWriter<'a> {
    source: &'a dyn CardSource,
    store: &'a dyn VectorStore,
    embed_back: bool,
}

impl<'a> CardWriter<'a> {
    pub fn new(source: &'a dyn CardSource, store: &'a dyn VectorStore, embed_back: bool) -> Self {
        CardWriter {
            source,
            store,
            embed_back,
        }
    }

    /// Carry out `action` for the card `front`/`back` in `deck`.
    ///
    /// The outcome reflects the remote write. If re-indexing the written
    /// card fails, the next sync picks it up.
    ///
    /// # Errors
    ///
    /// Returns error if the source rejects the add or update.
    pub fn apply(&self, deck: &str, front: &str, back: &str, action: &Action) -> Result<ItemOutcome, Error> {
        match action {
            Action::AddNew => {
                let remote_id = self.source.add_card(deck, front, back)?;
                tracing::info!(deck, remote_id = %remote_id, "card added");
                self.reindex(deck, &remote_id);
                Ok(ItemOutcome::ok(remote_id, CardStatus::Added))
            }
            Action::Replace { remote_id } => {
                self.source.update_card(remote_id, front, back)?;
                tracing::info!(deck, remote_id = %remote_id, "card replaced");
                self.reindex(deck, remote_id);
                Ok(ItemOutcome::ok(remote_id.as_str(), CardStatus::Updated))
            }
            Action::Skip | Action::Quit => Ok(ItemOutcome::skipped()),
        }
    }

    fn reindex(&self, deck: &str, remote_id: &str) {
        if let Err(e) = self.try_reindex(deck, remote_id) {
            tracing::warn!(remote_id, error = %e, "card written but not indexed");
        }
    }

    /// The entry is tagged with `deck`, the deck a sync of it would list it under.
    fn try_reindex(&self, deck: &str, remote_id: &str) -> Result<(), Error> {
        let cards = self.source.get_cards(&[remote_id.to_string()])?;
        let card = cards
            .into_iter()
            .find(|c| c.remote_id == remote_id)
            .ok_or_else(|| Error::InvalidInput(format!("card {remote_id} not returned by source")))?;
        self.store.upsert(
            &card.remote_id,
            &card.embedding_text(self.embed_back),
            &card.metadata_in(deck),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FlakyStore, MemorySource, card, memory_index};

    #[test]
    fn test_add_new_creates_and_indexes() {
        let source = MemorySource::new(&["CS"]);
        let index = memory_index();
        let writer = CardWriter::new(&source, &index, true);

        let outcome = writer
            .apply("CS", "What is a heap?", "A tree with the heap property", &Action::AddNew)
            .unwrap();

        assert_eq!(outcome.status, CardStatus::Added);
        let stored = index.get(&outcome.remote_id).unwrap().unwrap();
        assert_eq!(stored.deck_name, "CS");
        assert_eq!(
            stored.embedding_text,
            "What is a heap? A tree with the heap property"
        );
        assert_eq!(source.get(&outcome.remote_id).unwrap().front, "What is a heap?");
    }

    #[test]
    fn test_replace_updates_remote_and_index() {
        let source = MemorySource::new(&["CS"]);
        source.insert(card("7", "CS", "Define recursion", "old", 10));
        let index = memory_index();
        let writer = CardWriter::new(&source, &index, false);
        let action = Action::Replace {
            remote_id: "7".to_string(),
        };

        let outcome = writer
            .apply("CS", "Define recursion precisely", "new", &action)
            .unwrap();

        assert_eq!(outcome, ItemOutcome::ok("7", CardStatus::Updated));
        assert_eq!(source.get("7").unwrap().back, "new");
        let stored = index.get("7").unwrap().unwrap();
        assert_eq!(stored.embedding_text, "Define recursion precisely");
        assert!(stored.last_modified > 10);
    }

    #[test]
    fn test_skip_touches_nothing() {
        let source = MemorySource::new(&["CS"]);
        let index = memory_index();
        let writer = CardWriter::new(&source, &index, true);

        for action in [Action::Skip, Action::Quit] {
            let outcome = writer.apply("CS", "q", "a", &action).unwrap();
            assert_eq!(outcome.status, CardStatus::Skipped);
        }
        assert_eq!(index.count(None).unwrap(), 0);
        assert!(source.list_card_ids("CS").unwrap().is_empty());
    }

    #[test]
    fn test_index_failure_keeps_remote_write() {
        let source = MemorySource::new(&["CS"]);
        let mut store = FlakyStore::new(memory_index());
        store.offline = true;
        let writer = CardWriter::new(&source, &store, true);

        let outcome = writer.apply("CS", "q", "a", &Action::AddNew).unwrap();

        assert_eq!(outcome.status, CardStatus::Added);
        assert!(source.get(&outcome.remote_id).is_some());
    }

    #[test]
    fn test_source_errors_propagate() {
        let source = MemorySource::new(&["CS"]);
        let index = memory_index();
        let writer = CardWriter::new(&source, &index, true);

        assert!(matches!(
            writer.apply("Biology", "q", "a", &Action::AddNew),
            Err(Error::DeckNotFound(_))
        ));

        source.set_offline(true);
        let err = writer.apply("CS", "q", "a", &Action::AddNew).unwrap_err();
        assert!(err.is_connectivity());
    }
}
