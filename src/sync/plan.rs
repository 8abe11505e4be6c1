//! Reconciliation plan between the remote deck and the index.

use std::collections::{BTreeMap, BTreeSet};

use crate::card::CardStamp;
use crate::sqlite::IndexedCard;

/// How much of a deck to re-embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Embed new cards and cards modified since they were indexed.
    Incremental,
    /// Re-embed every remote card.
    Full,
}

/// Work for one deck sync. Sets are ordered by remote id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub to_add: BTreeSet<CardStamp>,
    pub to_update: BTreeSet<CardStamp>,
    pub to_delete: BTreeSet<String>,
}

impl SyncPlan {
    /// Diff `remote` against `stored`.
    ///
    /// Duplicate remote ids collapse to one entry (the newest stamp wins),
    /// so every id lands in at most one set.
    pub fn build(remote: &[CardStamp], stored: &[IndexedCard], mode: SyncMode) -> Self {
        let mut remote_by_id: BTreeMap<&str, &CardStamp> = BTreeMap::new();
        for stamp in remote {
            remote_by_id
                .entry(stamp.remote_id.as_str())
                .and_modify(|seen| {
                    if stamp.last_modified > seen.last_modified {
                        *seen = stamp;
                    }
                })
                .or_insert(stamp);
        }
        let stored_by_id: BTreeMap<&str, i64> = stored
            .iter()
            .map(|c| (c.remote_id.as_str(), c.last_modified))
            .collect();

        let mut plan = SyncPlan::default();
        for (id, stamp) in &remote_by_id {
            match stored_by_id.get(id) {
                None => {
                    plan.to_add.insert((*stamp).clone());
                }
                Some(&stored_modified) => {
                    let changed = stamp.last_modified > stored_modified;
                    if mode == SyncMode::Full || changed {
                        plan.to_update.insert((*stamp).clone());
                    }
                }
            }
        }
        plan.to_delete = stored_by_id
            .keys()
            .filter(|id| !remote_by_id.contains_key(*id))
            .map(|id| id.to_string())
            .collect();
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Ids whose full content must be fetched and embedded, adds first.
    pub fn ids_to_embed(&self) -> Vec<String> {
        self.to_add
            .iter()
            .chain(self.to_update.iter())
            .map(|s| s.remote_id.clone())
            .collect()
    }
}
