//! JSON response types and formatting for CLI output.

use serde::Serialize;

use crate::resolver::SimilarityMatch;
use crate::sync::SyncReport;

/// Response for `list-decks`.
#[derive(Serialize)]
pub struct DecksResponse {
    pub decks: Vec<String>,
}

/// One stored card close to a candidate.
#[derive(Serialize)]
pub struct CandidateItem {
    pub id: String,
    pub deck: String,
    pub front: String,
    pub back: String,
    pub similarity: f64,
}

impl From<&SimilarityMatch> for CandidateItem {
    fn from(m: &SimilarityMatch) -> Self {
        CandidateItem {
            id: m.card.remote_id.clone(),
            deck: m.card.deck_name.clone(),
            front: m.card.front.clone(),
            back: m.card.back.clone(),
            similarity: m.similarity(),
        }
    }
}

/// Response for `add`.
#[derive(Serialize)]
pub struct AddResponse {
    /// `added`, `updated`, `skipped` or `duplicates`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<CandidateItem>,
}

/// Response for `similar`.
#[derive(Serialize)]
pub struct SimilarResponse {
    pub query: String,
    pub threshold: f64,
    pub matches: Vec<CandidateItem>,
}

/// Per-deck entry of a sync response.
#[derive(Serialize)]
pub struct DeckSyncResponse {
    pub deck: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for `sync`.
#[derive(Serialize)]
pub struct SyncResponse {
    pub decks: Vec<DeckSyncResponse>,
}

/// Response for errors.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Print a value as formatted JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize JSON: {e}");
            std::process::exit(1);
        }
    }
}
