//! Incremental synchronization of remote decks into the vector store.
//!
//! A sync lists the deck's remote ids and modification times, diffs them
//! against what the store holds for that deck ([`SyncPlan`]), fetches and
//! upserts only the planned cards, and finally deletes ids the deck no
//! longer has. Deck membership always comes from the remote listing.

mod engine;
mod plan;
mod report;

pub use engine::{DEFAULT_BATCH_SIZE, DEFAULT_WORKERS, DeckResults, SyncEngine, SyncOptions};
pub use plan::{SyncMode, SyncPlan};
pub use report::{CardStatus, ItemOutcome, SyncReport, SyncSummary};
