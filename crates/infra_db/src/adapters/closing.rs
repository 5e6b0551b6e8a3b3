//! Closing store adapter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use core_kernel::{ClosingTaskId, TransactionId};
use domain_closing::task::{ClosingStatus, ClosingTask};
use domain_closing::{ClosingError, ClosingStore};
use domain_ledger::NewTransaction;

use crate::error::DatabaseError;
use crate::repositories::{ClaimOutcome, ClosingRepository};

fn to_closing_error(err: DatabaseError) -> ClosingError {
    match err {
        DatabaseError::LockUnavailable(_) => ClosingError::AlreadyRunning,
        DatabaseError::ConstraintViolation(message) => ClosingError::Business(message),
        other => ClosingError::Storage(other.to_string()),
    }
}

/// [`ClosingStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgClosingStore {
    tasks: ClosingRepository,
}

impl PgClosingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { tasks: ClosingRepository::new(pool) }
    }

    /// Resolves a finish-time constraint violation to the task's actual state.
    ///
    /// The repository rejects finishing a task that is not `InProgress`; the
    /// fetch recovers the from-status so callers see the same
    /// [`ClosingError::InvalidState`] the state machine itself reports.
    async fn state_conflict(
        &self,
        guid: ClosingTaskId,
        to: ClosingStatus,
        message: String,
    ) -> ClosingError {
        match self.tasks.fetch(guid).await {
            Ok(Some(task)) if task.status != ClosingStatus::InProgress => {
                ClosingError::InvalidState { task: task.guid, from: task.status, to }
            }
            Ok(None) => ClosingError::TaskNotFound(guid),
            _ => ClosingError::Business(message),
        }
    }
}

#[async_trait]
impl ClosingStore for PgClosingStore {
    async fn create(&self, task: &ClosingTask) -> Result<(), ClosingError> {
        self.tasks.create(task).await.map_err(to_closing_error)
    }

    async fn fetch(&self, guid: ClosingTaskId) -> Result<Option<ClosingTask>, ClosingError> {
        self.tasks.fetch(guid).await.map_err(to_closing_error)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<ClosingTask>, ClosingError> {
        self.tasks.list_recent(limit).await.map_err(to_closing_error)
    }

    async fn begin_run(&self, guid: ClosingTaskId) -> Result<ClosingTask, ClosingError> {
        match self.tasks.claim(guid).await {
            Ok(ClaimOutcome::Claimed(task)) => Ok(task),
            Ok(ClaimOutcome::NotPending(task)) => Err(ClosingError::InvalidState {
                task: task.guid,
                from: task.status,
                to: ClosingStatus::InProgress,
            }),
            Err(DatabaseError::NotFound(_)) => Err(ClosingError::TaskNotFound(guid)),
            Err(err) => Err(to_closing_error(err)),
        }
    }

    async fn complete(
        &self,
        guid: ClosingTaskId,
        txn: Option<NewTransaction>,
    ) -> Result<Option<TransactionId>, ClosingError> {
        match self.tasks.complete(guid, txn.as_ref()).await {
            Ok(result) => Ok(result),
            Err(DatabaseError::ConstraintViolation(message)) => {
                Err(self.state_conflict(guid, ClosingStatus::Completed, message).await)
            }
            Err(err) => Err(to_closing_error(err)),
        }
    }

    async fn fail(&self, guid: ClosingTaskId, message: &str) -> Result<(), ClosingError> {
        match self.tasks.fail(guid, message).await {
            Ok(()) => Ok(()),
            Err(DatabaseError::ConstraintViolation(message)) => {
                Err(self.state_conflict(guid, ClosingStatus::Failed, message).await)
            }
            Err(err) => Err(to_closing_error(err)),
        }
    }

    async fn fail_stale(&self, started_before: DateTime<Utc>) -> Result<u64, ClosingError> {
        self.tasks.fail_stale(started_before).await.map_err(to_closing_error)
    }
}
