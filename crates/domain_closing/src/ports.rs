//! Closing domain ports

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{ClosingTaskId, TransactionId};
use domain_ledger::NewTransaction;

use crate::error::ClosingError;
use crate::task::ClosingTask;

/// Persistence seam for closing tasks
///
/// `begin_run` is the single-flight gate: implementations must perform the
/// `Pending -> InProgress` transition under a guard that serializes closing
/// runs per book (the PostgreSQL adapter takes a transaction-scoped advisory
/// lock around the check-and-set), rejecting a second active run with
/// [`ClosingError::AlreadyRunning`] and a non-pending task with
/// [`ClosingError::InvalidState`].
#[async_trait]
pub trait ClosingStore: Send + Sync {
    /// Persists a freshly-requested pending task
    async fn create(&self, task: &ClosingTask) -> Result<(), ClosingError>;

    /// Fetches a task by guid
    async fn fetch(&self, guid: ClosingTaskId) -> Result<Option<ClosingTask>, ClosingError>;

    /// Lists tasks, most recently requested first
    async fn list_recent(&self, limit: i64) -> Result<Vec<ClosingTask>, ClosingError>;

    /// Claims a pending task for execution (`Pending -> InProgress`)
    async fn begin_run(&self, guid: ClosingTaskId) -> Result<ClosingTask, ClosingError>;

    /// Marks the task completed, persisting the closing transaction (if any)
    /// and the task update in one atomic unit
    async fn complete(
        &self,
        guid: ClosingTaskId,
        txn: Option<NewTransaction>,
    ) -> Result<Option<TransactionId>, ClosingError>;

    /// Marks the task failed, capturing the error message; the ledger is
    /// left untouched
    async fn fail(&self, guid: ClosingTaskId, message: &str) -> Result<(), ClosingError>;

    /// Fails `InProgress` tasks started before the cutoff (crash recovery);
    /// returns how many were swept
    async fn fail_stale(&self, started_before: DateTime<Utc>) -> Result<u64, ClosingError>;
}
