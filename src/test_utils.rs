//! Test doubles shared by unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::card::{Card, CardMetadata, CardStamp};
use crate::embedding::{EMBEDDING_DIMS, Embedder};
use crate::errors::Error;
use crate::index::{LocalIndex, StoreMatch, VectorStore};
use crate::remote::CardSource;
use crate::sqlite::{Database, IndexedCard};

/// Deterministic bag-of-words embedder: each lowercase word hashes to one dimension.
pub struct HashEmbedder;

impl Embedder for HashEmbedder {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>, Error> {
        let mut v = vec![0.0f32; EMBEDDING_DIMS];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                    (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
                });
            v[(hash % EMBEDDING_DIMS as u64) as usize] += 1.0;
        }
        Ok(v)
    }
}

pub fn memory_index() -> LocalIndex<HashEmbedder> {
    LocalIndex::from_parts(Database::open_in_memory().unwrap(), HashEmbedder)
}

pub fn card(id: &str, deck: &str, front: &str, back: &str, modified: i64) -> Card {
    Card {
        remote_id: id.to_string(),
        deck_name: deck.to_string(),
        front: front.to_string(),
        back: back.to_string(),
        last_modified: modified,
    }
}

#[derive(Default)]
struct SourceState {
    decks: BTreeSet<String>,
    cards: BTreeMap<String, Card>,
    hidden: BTreeSet<String>,
    /// Extra (deck, id) listings, for notes with cards in several decks.
    also_listed: BTreeSet<(String, String)>,
    broken_decks: BTreeSet<String>,
    fetched: Vec<String>,
    offline: bool,
    next_id: u64,
    clock: i64,
}

/// In-memory card source with failure injection.
#[derive(Default)]
pub struct MemorySource {
    state: Mutex<SourceState>,
}

impl MemorySource {
    pub fn new(decks: &[&str]) -> Self {
        let source = MemorySource::default();
        {
            let mut state = source.state.lock().unwrap();
            state.decks = decks.iter().map(|d| d.to_string()).collect();
            state.next_id = 1000;
            state.clock = 100;
        }
        source
    }

    pub fn insert(&self, card: Card) {
        let mut state = self.state.lock().unwrap();
        state.decks.insert(card.deck_name.clone());
        state.cards.insert(card.remote_id.clone(), card);
    }

    pub fn edit(&self, id: &str, front: &str, modified: i64) {
        let mut state = self.state.lock().unwrap();
        let card = state.cards.get_mut(id).unwrap();
        card.front = front.to_string();
        card.last_modified = modified;
    }

    pub fn move_to(&self, id: &str, deck: &str) {
        let mut state = self.state.lock().unwrap();
        state.decks.insert(deck.to_string());
        state.cards.get_mut(id).unwrap().deck_name = deck.to_string();
    }

    pub fn remove(&self, id: &str) {
        self.state.lock().unwrap().cards.remove(id);
    }

    /// Listed in its deck but left out of `get_cards` answers.
    pub fn hide(&self, id: &str) {
        self.state.lock().unwrap().hidden.insert(id.to_string());
    }

    /// List `id` under `deck` too, while its card keeps reporting its own deck.
    pub fn also_list(&self, deck: &str, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.decks.insert(deck.to_string());
        state.also_listed.insert((deck.to_string(), id.to_string()));
    }

    /// Listing this deck fails with a connectivity error.
    pub fn break_deck(&self, deck: &str) {
        self.state.lock().unwrap().broken_decks.insert(deck.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Ids requested through `get_cards`, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.state.lock().unwrap().fetched.clone()
    }

    pub fn clear_fetched(&self) {
        self.state.lock().unwrap().fetched.clear();
    }

    pub fn get(&self, id: &str) -> Option<Card> {
        self.state.lock().unwrap().cards.get(id).cloned()
    }

    fn check_online(state: &SourceState) -> Result<(), Error> {
        if state.offline {
            return Err(Error::anki("connection refused"));
        }
        Ok(())
    }
}

impl CardSource for MemorySource {
    fn list_decks(&self) -> Result<Vec<String>, Error> {
        let state = self.state.lock().unwrap();
        Self::check_online(&state)?;
        Ok(state.decks.iter().cloned().collect())
    }

    fn list_card_ids(&self, deck: &str) -> Result<Vec<String>, Error> {
        let state = self.state.lock().unwrap();
        Self::check_online(&state)?;
        if state.broken_decks.contains(deck) {
            return Err(Error::anki(format!("findNotes failed for {deck}")));
        }
        Ok(state
            .cards
            .values()
            .filter(|c| {
                c.deck_name == deck
                    || state
                        .also_listed
                        .contains(&(deck.to_string(), c.remote_id.clone()))
            })
            .map(|c| c.remote_id.clone())
            .collect())
    }

    fn get_cards(&self, ids: &[String]) -> Result<Vec<Card>, Error> {
        let mut state = self.state.lock().unwrap();
        Self::check_online(&state)?;
        state.fetched.extend(ids.iter().cloned());
        Ok(ids
            .iter()
            .filter(|id| !state.hidden.contains(*id))
            .filter_map(|id| state.cards.get(id).cloned())
            .collect())
    }

    fn add_card(&self, deck: &str, front: &str, back: &str) -> Result<String, Error> {
        let mut state = self.state.lock().unwrap();
        Self::check_online(&state)?;
        if !state.decks.contains(deck) {
            return Err(Error::DeckNotFound(deck.to_string()));
        }
        state.next_id += 1;
        state.clock += 1;
        let id = state.next_id.to_string();
        let card = card(&id, deck, front, back, state.clock);
        state.cards.insert(id.clone(), card);
        Ok(id)
    }

    fn update_card(&self, remote_id: &str, front: &str, back: &str) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        Self::check_online(&state)?;
        state.clock += 1;
        let clock = state.clock;
        let card = state
            .cards
            .get_mut(remote_id)
            .ok_or_else(|| Error::anki(format!("note {remote_id} not found")))?;
        card.front = front.to_string();
        card.back = back.to_string();
        card.last_modified = clock;
        Ok(())
    }

    /// Stamps ignore `hide`, like a note whose mod time is readable but
    /// whose fields are not.
    fn card_stamps(&self, ids: &[String]) -> Result<Vec<CardStamp>, Error> {
        let state = self.state.lock().unwrap();
        Self::check_online(&state)?;
        Ok(ids
            .iter()
            .filter_map(|id| state.cards.get(id).map(Card::stamp))
            .collect())
    }
}

/// Store wrapper that fails upserts for chosen ids, queries for chosen
/// texts, or every call when offline.
pub struct FlakyStore<S: VectorStore> {
    pub inner: S,
    pub failing: BTreeSet<String>,
    pub failing_queries: BTreeSet<String>,
    pub offline: bool,
}

impl<S: VectorStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        FlakyStore {
            inner,
            failing: BTreeSet::new(),
            failing_queries: BTreeSet::new(),
            offline: false,
        }
    }

    fn check(&self) -> Result<(), Error> {
        if self.offline {
            return Err(Error::store("index file unavailable"));
        }
        Ok(())
    }
}

impl<S: VectorStore> VectorStore for FlakyStore<S> {
    fn upsert(&self, remote_id: &str, text: &str, metadata: &CardMetadata) -> Result<(), Error> {
        self.check()?;
        if self.failing.contains(remote_id) {
            return Err(Error::Inference(format!("cannot embed {remote_id}")));
        }
        self.inner.upsert(remote_id, text, metadata)
    }

    fn delete(&self, remote_ids: &[String]) -> Result<usize, Error> {
        self.check()?;
        self.inner.delete(remote_ids)
    }

    fn query(
        &self,
        text: &str,
        top_k: usize,
        deck_filter: Option<&str>,
    ) -> Result<Vec<StoreMatch>, Error> {
        self.check()?;
        if self.failing_queries.contains(text) {
            return Err(Error::Inference(format!("cannot tokenize {text}")));
        }
        self.inner.query(text, top_k, deck_filter)
    }

    fn list(&self, deck_filter: Option<&str>) -> Result<Vec<IndexedCard>, Error> {
        self.check()?;
        self.inner.list(deck_filter)
    }
}

/// Store returning a fixed answer to every query, ignoring the deck filter.
pub struct FixedStore {
    pub matches: Vec<StoreMatch>,
}

pub fn indexed(id: &str, deck: &str, front: &str) -> IndexedCard {
    IndexedCard {
        remote_id: id.to_string(),
        deck_name: deck.to_string(),
        front: front.to_string(),
        back: String::new(),
        embedding_text: front.to_string(),
        last_modified: 1,
        indexed_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

impl VectorStore for FixedStore {
    fn upsert(&self, _: &str, _: &str, _: &CardMetadata) -> Result<(), Error> {
        Ok(())
    }

    fn delete(&self, _: &[String]) -> Result<usize, Error> {
        Ok(0)
    }

    fn query(&self, _: &str, top_k: usize, _: Option<&str>) -> Result<Vec<StoreMatch>, Error> {
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }

    fn list(&self, _: Option<&str>) -> Result<Vec<IndexedCard>, Error> {
        Ok(self.matches.iter().map(|m| m.card.clone()).collect())
    }
}

/// Store wrapper that logs every write, as `upsert:<id>` or `delete:<id,id>`.
/// With `reject_deletes` set, deletes fail with a non-connectivity error.
pub struct RecordingStore<S: VectorStore> {
    pub inner: S,
    pub reject_deletes: bool,
    calls: Mutex<Vec<String>>,
}

impl<S: VectorStore> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        RecordingStore {
            inner,
            reject_deletes: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl<S: VectorStore> VectorStore for RecordingStore<S> {
    fn upsert(&self, remote_id: &str, text: &str, metadata: &CardMetadata) -> Result<(), Error> {
        self.calls.lock().unwrap().push(format!("upsert:{remote_id}"));
        self.inner.upsert(remote_id, text, metadata)
    }

    fn delete(&self, remote_ids: &[String]) -> Result<usize, Error> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("delete:{}", remote_ids.join(",")));
        if self.reject_deletes {
            return Err(Error::InvalidInput("delete rejected".to_string()));
        }
        self.inner.delete(remote_ids)
    }

    fn query(
        &self,
        text: &str,
        top_k: usize,
        deck_filter: Option<&str>,
    ) -> Result<Vec<StoreMatch>, Error> {
        self.inner.query(text, top_k, deck_filter)
    }

    fn list(&self, deck_filter: Option<&str>) -> Result<Vec<IndexedCard>, Error> {
        self.inner.list(deck_filter)
    }
}
