// File: src/error.rs
use thiserror::Error;

/// Errors surfaced by the index, resolver and vocabulary store.
///
/// Malformed source records never show up here: the builder counts them in
/// its `BuildReport` and keeps going. Empty lookups are ordinary values too.
#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("index schema version {found} does not match required version {required}")]
    SchemaMismatch { found: u32, required: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("binary encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LexiconError {
    /// Logic errors (bad ids, bad ratings) are not worth retrying.
    pub fn is_retriable(&self) -> bool {
        matches!(self, LexiconError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, LexiconError>;
