//! Error types shared across the generation and revision pipeline.
//!
//! Core components (parser, streaming adapter, backend client) produce
//! [`CoreError`]. The service layer logs those with their full cause and
//! re-signals them as the opaque [`ServiceError::GenerationFailed`] or
//! [`ServiceError::ModificationFailed`].

use crate::api_connection::connection::ApiConnectionError;
use crate::store::StoreError;

/// Backend text that could not be interpreted as a recipe record.
///
/// `raw` is kept for diagnostics. It is deliberately left out of the
/// `Display` output so it cannot leak into a user-facing message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to parse recipe response: {reason}")]
pub struct ParseFailure {
    pub reason: String,
    pub raw: String,
}

impl ParseFailure {
    pub fn new(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}

/// Transport-level failure while consuming an incremental response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stream failure: {0}")]
pub struct StreamFailure(pub String);

/// Failures raised inside the core pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("backend failure: {0}")]
    Backend(#[from] ApiConnectionError),

    #[error(transparent)]
    Parse(#[from] ParseFailure),

    #[error(transparent)]
    Stream(#[from] StreamFailure),

    #[error("failed to encode recipe for prompt: {0}")]
    Encode(serde_json::Error),
}

impl CoreError {
    /// Raw backend text attached to a parse failure, if any.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            CoreError::Parse(failure) => Some(failure.raw.as_str()),
            _ => None,
        }
    }
}

/// Errors surfaced to callers of [`crate::service::RecipeService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("Recipe not found: {0}")]
    NotFound(String),

    #[error("Failed to generate recipe")]
    GenerationFailed,

    #[error("Failed to modify recipe")]
    ModificationFailed,

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Storage(other.to_string()),
        }
    }
}
