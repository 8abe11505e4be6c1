//! Per-card outcomes and summaries for syncs and imports.

use serde::Serialize;

use super::SyncMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Added,
    Updated,
    Skipped,
    Deleted,
    Failed,
}

impl CardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CardStatus::Added => "added",
            CardStatus::Updated => "updated",
            CardStatus::Skipped => "skipped",
            CardStatus::Deleted => "deleted",
            CardStatus::Failed => "failed",
        }
    }
}

/// What happened to one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    /// Empty for cards that were skipped before reaching the source.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remote_id: String,
    pub status: CardStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ItemOutcome {
    pub fn ok(remote_id: impl Into<String>, status: CardStatus) -> Self {
        ItemOutcome {
            remote_id: remote_id.into(),
            status,
            reason: None,
        }
    }

    pub fn skipped() -> Self {
        ItemOutcome::ok(String::new(), CardStatus::Skipped)
    }

    pub fn failed(remote_id: impl Into<String>, reason: impl Into<String>) -> Self {
        ItemOutcome {
            remote_id: remote_id.into(),
            status: CardStatus::Failed,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Result of syncing one deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub deck: String,
    pub mode: SyncMode,
    pub summary: SyncSummary,
    pub items: Vec<ItemOutcome>,
}

impl SyncReport {
    pub fn new(deck: &str, mode: SyncMode) -> Self {
        SyncReport {
            deck: deck.to_string(),
            mode,
            summary: SyncSummary::default(),
            items: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome.status {
            CardStatus::Added => self.summary.added += 1,
            CardStatus::Updated => self.summary.updated += 1,
            CardStatus::Deleted => self.summary.deleted += 1,
            CardStatus::Failed => self.summary.failed += 1,
            CardStatus::Skipped => {}
        }
        self.items.push(outcome);
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    /// Outcomes with the given status, in the order they were recorded.
    pub fn with_status(&self, status: CardStatus) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(move |i| i.status == status)
    }
}
