//! Error types for ankivec.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for ankivec operations.
///
/// Per-card failures during a sync or import are not errors: they are
/// recorded as `ItemOutcome`s and only show up in the summary.
#[derive(Error, Debug)]
pub enum Error {
    /// A collaborator (AnkiConnect or the vector store) could not be reached
    /// or refused the request.
    #[error("{service} unavailable: {message}")]
    Connectivity {
        service: &'static str,
        message: String,
    },

    /// Deck name does not match any deck known to the card source.
    #[error("Deck not found: {0}")]
    DeckNotFound(String),

    /// Response or document that does not match the expected schema.
    #[error("Parse error: {0}")]
    Parse(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Vector store database error.
    #[error("Store error: {0}")]
    Store(#[from] crate::sqlite::Error),

    /// ONNX inference error.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Tokenization error.
    #[error("Tokenization error: {0}")]
    Tokenization(#[from] tokenizers::Error),

    /// ONNX session error.
    #[error("ONNX session error: {0}")]
    Onnx(#[from] ort::Error),

    /// HuggingFace Hub error.
    #[error("HuggingFace Hub error: {0}")]
    HfHub(#[from] hf_hub::api::sync::ApiError),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker pool could not be started.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Card text is empty or whitespace only.
    #[error("Card text cannot be empty")]
    EmptyInput,
}

impl Error {
    pub(crate) fn anki(message: impl Into<String>) -> Self {
        Error::Connectivity {
            service: "AnkiConnect",
            message: message.into(),
        }
    }

    pub(crate) fn store(message: impl Into<String>) -> Self {
        Error::Connectivity {
            service: "vector store",
            message: message.into(),
        }
    }

    /// Whether this error means a collaborator is gone, as opposed to a
    /// problem with one request.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Connectivity { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_display_names_service() {
        let err = Error::anki("connection refused");
        assert_eq!(err.to_string(), "AnkiConnect unavailable: connection refused");
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_deck_not_found_is_not_connectivity() {
        let err = Error::DeckNotFound("Biology".to_string());
        assert!(!err.is_connectivity());
        assert!(err.to_string().contains("Biology"));
    }
}
