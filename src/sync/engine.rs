//! Deck reconciliation: plan, fetch in batches, upsert in parallel, delete last.

use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::card::Card;
use crate::errors::Error;
use crate::index::VectorStore;
use crate::remote::CardSource;

use super::plan::{SyncMode, SyncPlan};
use super::report::{CardStatus, ItemOutcome, SyncReport};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_BATCH_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Upsert threads per batch.
    pub workers: usize,
    /// Cards fetched from the source per request.
    pub batch_size: usize,
    /// Embed the back text along with the front.
    pub embed_back: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            embed_back: true,
        }
    }
}

/// Per-deck sync results from [`SyncEngine::sync_all`].
pub type DeckResults = Vec<(String, Result<SyncReport, Error>)>;

/// Mirrors decks of a [`CardSource`] into a [`VectorStore`].
pub struct SyncEngine<'a> {
    source: &'a dyn CardSource,
    store: &'a dyn VectorStore,
    options: SyncOptions,
    pool: ThreadPool,
}

impl<'a> SyncEngine<'a> {
    /// # Errors
    ///
    /// Returns error if the worker pool cannot be started.
    pub fn new(
        source: &'a dyn CardSource,
        store: &'a dyn VectorStore,
        options: SyncOptions,
    ) -> Result<Self, Error> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.workers.max(1))
            .thread_name(|i| format!("ankivec-sync-{i}"))
            .build()?;
        Ok(SyncEngine {
            source,
            store,
            options,
            pool,
        })
    }

    /// Sync one deck.
    ///
    /// # Errors
    ///
    /// - `DeckNotFound` if the source has no deck named `deck`
    /// - connectivity errors from the source or the store
    ///
    /// Failures of individual cards are recorded in the report instead.
    pub fn sync(&self, deck: &str, mode: SyncMode) -> Result<SyncReport, Error> {
        let decks = self.source.list_decks()?;
        if !decks.iter().any(|d| d == deck) {
            return Err(Error::DeckNotFound(deck.to_string()));
        }
        self.sync_deck(deck, mode)
    }

    /// Sync every deck the source lists. A failing deck does not stop the
    /// others; only failing to list decks is an error.
    pub fn sync_all(&self, mode: SyncMode) -> Result<DeckResults, Error> {
        let decks = self.source.list_decks()?;
        tracing::info!(decks = decks.len(), ?mode, "syncing all decks");

        let mut results = Vec::with_capacity(decks.len());
        for deck in decks {
            let result = self.sync_deck(&deck, mode);
            if let Err(e) = &result {
                tracing::error!(deck = %deck, error = %e, "deck sync failed");
            }
            results.push((deck, result));
        }
        Ok(results)
    }

    fn sync_deck(&self, deck: &str, mode: SyncMode) -> Result<SyncReport, Error> {
        let ids = self.source.list_card_ids(deck)?;
        let remote = self.source.card_stamps(&ids)?;
        let stored = self.store.list(Some(deck))?;
        let plan = SyncPlan::build(&remote, &stored, mode);
        tracing::info!(
            deck,
            ?mode,
            remote = remote.len(),
            stored = stored.len(),
            add = plan.to_add.len(),
            update = plan.to_update.len(),
            delete = plan.to_delete.len(),
            "sync plan"
        );

        let mut report = SyncReport::new(deck, mode);
        let new_ids: BTreeSet<&str> = plan.to_add.iter().map(|s| s.remote_id.as_str()).collect();
        let pending = plan.ids_to_embed();

        for batch in pending.chunks(self.options.batch_size.max(1)) {
            for outcome in self.index_batch(deck, batch, &new_ids)? {
                report.record(outcome);
            }
        }

        // Every batch has drained at this point.
        self.delete_vanished(&plan, &mut report)?;

        tracing::info!(
            deck,
            added = report.summary.added,
            updated = report.summary.updated,
            deleted = report.summary.deleted,
            failed = report.summary.failed,
            "deck synced"
        );
        Ok(report)
    }

    /// Fetch one batch on this thread and upsert it on the pool.
    fn index_batch(
        &self,
        deck: &str,
        batch: &[String],
        new_ids: &BTreeSet<&str>,
    ) -> Result<Vec<ItemOutcome>, Error> {
        let cards = match self.source.get_cards(batch) {
            Ok(cards) => cards,
            Err(e) if e.is_connectivity() => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, size = batch.len(), "batch fetch failed");
                let reason = e.to_string();
                return Ok(batch
                    .iter()
                    .map(|id| ItemOutcome::failed(id.as_str(), reason.as_str()))
                    .collect());
            }
        };
        let by_id: HashMap<&str, &Card> = cards.iter().map(|c| (c.remote_id.as_str(), c)).collect();

        let outcomes = self.pool.install(|| {
            batch
                .par_iter()
                .map(|id| {
                    let status = if new_ids.contains(id.as_str()) {
                        CardStatus::Added
                    } else {
                        CardStatus::Updated
                    };
                    self.index_card(deck, id, by_id.get(id.as_str()).copied(), status)
                })
                .collect()
        });
        Ok(outcomes)
    }

    /// Upsert one card, tagged with the deck being synced.
    fn index_card(
        &self,
        deck: &str,
        remote_id: &str,
        card: Option<&Card>,
        status: CardStatus,
    ) -> ItemOutcome {
        let Some(card) = card else {
            tracing::warn!(remote_id, "card missing from source response");
            return ItemOutcome::failed(remote_id, "card not returned by source");
        };
        let text = card.embedding_text(self.options.embed_back);
        match self.store.upsert(&card.remote_id, &text, &card.metadata_in(deck)) {
            Ok(()) => ItemOutcome::ok(remote_id, status),
            Err(e) => {
                tracing::warn!(remote_id, error = %e, "failed to index card");
                ItemOutcome::failed(remote_id, e.to_string())
            }
        }
    }

    fn delete_vanished(&self, plan: &SyncPlan, report: &mut SyncReport) -> Result<(), Error> {
        if plan.to_delete.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = plan.to_delete.iter().cloned().collect();
        match self.store.delete(&ids) {
            Ok(_) => {
                for id in ids {
                    report.record(ItemOutcome::ok(id, CardStatus::Deleted));
                }
                Ok(())
            }
            Err(e) if e.is_connectivity() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, count = ids.len(), "failed to delete vanished cards");
                let reason = e.to_string();
                for id in ids {
                    report.record(ItemOutcome::failed(id, reason.as_str()));
                }
                Ok(())
            }
        }
    }
}
