//! Posting workflow errors

use thiserror::Error;

use domain_ledger::LedgerError;

/// Errors that can occur while posting a document
#[derive(Debug, Error)]
pub enum PostingError {
    /// The referenced document does not exist (404 semantics)
    #[error("document not found: {0}")]
    NotFound(String),

    /// The document has already been posted (409 semantics)
    #[error("document already posted: {0}")]
    AlreadyPosted(String),

    /// A domain rule rejected the posting (400 semantics)
    #[error("posting rejected: {0}")]
    Business(String),

    /// Transient infrastructure failure; nothing partial persisted, the
    /// whole call is safe to retry (5xx semantics)
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<LedgerError> for PostingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnbalancedTransaction { .. }
            | LedgerError::Validation(_)
            | LedgerError::Referential(_)
            | LedgerError::AccountNotFound(_) => PostingError::Business(err.to_string()),
            LedgerError::Conflict(message) => PostingError::AlreadyPosted(message),
            LedgerError::Storage(message) => PostingError::Storage(message),
        }
    }
}
