//! Closing domain errors

use thiserror::Error;

use core_kernel::ClosingTaskId;
use domain_ledger::LedgerError;

use crate::task::ClosingStatus;

/// Errors that can occur in the period-closing procedure
#[derive(Debug, Error)]
pub enum ClosingError {
    /// The referenced task does not exist
    #[error("closing task not found: {0}")]
    TaskNotFound(ClosingTaskId),

    /// The requested transition is not allowed from the task's current state
    #[error("closing task {task} cannot move from {from} to {to}")]
    InvalidState {
        task: ClosingTaskId,
        from: ClosingStatus,
        to: ClosingStatus,
    },

    /// Another closing run is already active against the same books
    #[error("another closing run is already in progress")]
    AlreadyRunning,

    /// A domain rule rejected the closing (e.g., the computed splits do not
    /// sum to zero)
    #[error("closing rejected: {0}")]
    Business(String),

    /// A ledger operation failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Transient infrastructure failure
    #[error("storage error: {0}")]
    Storage(String),
}
