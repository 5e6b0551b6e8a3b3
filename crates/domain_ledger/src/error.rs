//! Ledger domain errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Account not found
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Transaction splits do not sum to zero
    #[error("unbalanced transaction: split values sum to {sum}")]
    UnbalancedTransaction { sum: Decimal },

    /// A split references a missing account or other broken reference
    #[error("referential integrity violation: {0}")]
    Referential(String),

    /// Caller-supplied data violates an invariant
    #[error("validation error: {0}")]
    Validation(String),

    /// Duplicate business key or concurrent conflicting write
    #[error("conflict: {0}")]
    Conflict(String),

    /// Transient infrastructure failure; the whole operation is retryable
    /// because all mutations are atomic
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        LedgerError::Conflict(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::Storage(message.into())
    }
}
