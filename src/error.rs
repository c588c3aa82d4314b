//! Error taxonomy for the ingestion run.
//!
//! Failures are isolated to their unit of work (one verse, one book,
//! one sub-book). Only persistence and filesystem failures abort a run.

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while ingesting the corpus
#[derive(Debug, Error)]
pub enum IngestError {
    /// Transport failure after the retry budget or deadline was spent
    #[error("Network error for {path}: {message}")]
    Network { path: String, message: String },

    /// Malformed JSON or a payload of unexpected shape
    #[error("Parse error ({context}): {message}")]
    Parse { context: String, message: String },

    /// The API answered with an `error` field
    #[error("API reported an error for {path}: {message}")]
    Api { path: String, message: String },

    /// Book schema missing or unusable
    #[error("Schema error for '{title}': {message}")]
    Schema { title: String, message: String },

    /// Citation that cannot be mapped to (chapter, verse)
    #[error("Unresolved reference '{raw}' (normalized: '{normalized}')")]
    Reference { raw: String, normalized: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Build a parse error from any displayable cause
    pub fn parse(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Whether this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Io(_))
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse("json", err)
    }
}
