//! Closing task persistence
//!
//! `claim` is the single-flight gate for the closing procedure. It takes a
//! transaction-scoped advisory lock, verifies no other run is in progress,
//! then performs the `pending -> in_progress` check-and-set; two concurrent
//! runs can never both claim a task.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres};
use tracing::{debug, warn};
use uuid::Uuid;

use core_kernel::{ClosingTaskId, TransactionId};
use domain_closing::task::{ClosingStatus, ClosingTask, ClosingType};
use domain_ledger::NewTransaction;

use crate::error::DatabaseError;
use crate::repositories::insert_transaction_with_splits;

/// Advisory lock key serializing closing runs per database.
const CLOSING_LOCK_KEY: i64 = 0x6c65_6467_636c_7473; // "ledgclts"

/// Outcome of a claim attempt.
pub enum ClaimOutcome {
    /// The task moved `pending -> in_progress`.
    Claimed(ClosingTask),
    /// The task exists but is not pending; nothing changed.
    NotPending(ClosingTask),
}

#[derive(sqlx::FromRow)]
struct ClosingTaskRow {
    guid: Uuid,
    closing_type: String,
    period_end: NaiveDate,
    status: String,
    error_message: Option<String>,
    result_txn: Option<Uuid>,
    requested_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl ClosingTaskRow {
    fn into_task(self) -> Result<ClosingTask, DatabaseError> {
        let status: ClosingStatus = self
            .status
            .parse()
            .map_err(|e: domain_closing::task::ParseClosingStatusError| {
                DatabaseError::Sql(e.to_string())
            })?;
        if self.closing_type != ClosingType::IncomeExpense.as_str() {
            return Err(DatabaseError::Sql(format!(
                "unknown closing type: {}",
                self.closing_type
            )));
        }
        Ok(ClosingTask {
            guid: ClosingTaskId::from_uuid(self.guid),
            closing_type: ClosingType::IncomeExpense,
            period_end: self.period_end,
            status,
            error_message: self.error_message,
            result_txn: self.result_txn.map(TransactionId::from_uuid),
            requested_at: self.requested_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}

const TASK_COLUMNS: &str = "guid, closing_type, period_end, status, error_message, result_txn, \
                            requested_at, started_at, finished_at";

/// SQL access to closing tasks.
#[derive(Clone)]
pub struct ClosingRepository {
    pool: PgPool,
}

impl ClosingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a freshly-requested pending task.
    pub async fn create(&self, task: &ClosingTask) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO closing_tasks
                (guid, closing_type, period_end, status, requested_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(task.guid.as_uuid())
        .bind(task.closing_type.as_str())
        .bind(task.period_end)
        .bind(task.status.as_str())
        .bind(task.requested_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetches a task by guid.
    pub async fn fetch(&self, guid: ClosingTaskId) -> Result<Option<ClosingTask>, DatabaseError> {
        let row: Option<ClosingTaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM closing_tasks WHERE guid = $1"
        ))
        .bind(guid.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ClosingTaskRow::into_task).transpose()
    }

    /// Lists tasks, most recently requested first.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<ClosingTask>, DatabaseError> {
        let rows: Vec<ClosingTaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM closing_tasks ORDER BY requested_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ClosingTaskRow::into_task).collect()
    }

    /// Claims a pending task for execution.
    ///
    /// # Errors
    ///
    /// - [`DatabaseError::LockUnavailable`] when another session holds the
    ///   closing lock or another task is already in progress
    /// - [`DatabaseError::NotFound`] when the task does not exist
    pub async fn claim(&self, guid: ClosingTaskId) -> Result<ClaimOutcome, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
            .bind(CLOSING_LOCK_KEY)
            .fetch_one(&mut *tx)
            .await?;
        if !locked {
            return Err(DatabaseError::LockUnavailable(
                "closing lock held by another session".into(),
            ));
        }

        let other_running: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM closing_tasks
                 WHERE status = 'in_progress' AND guid <> $1
             )",
        )
        .bind(guid.as_uuid())
        .fetch_one(&mut *tx)
        .await?;
        if other_running {
            return Err(DatabaseError::LockUnavailable(
                "another closing task is in progress".into(),
            ));
        }

        let claimed: Option<ClosingTaskRow> = sqlx::query_as(&format!(
            "UPDATE closing_tasks
             SET status = 'in_progress', started_at = NOW()
             WHERE guid = $1 AND status = 'pending'
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(guid.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        match claimed {
            Some(row) => {
                let task = row.into_task()?;
                tx.commit().await?;
                debug!(task = %task.guid, period_end = %task.period_end, "closing task claimed");
                Ok(ClaimOutcome::Claimed(task))
            }
            None => {
                let row: Option<ClosingTaskRow> = sqlx::query_as(&format!(
                    "SELECT {TASK_COLUMNS} FROM closing_tasks WHERE guid = $1"
                ))
                .bind(guid.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
                match row {
                    Some(row) => Ok(ClaimOutcome::NotPending(row.into_task()?)),
                    None => Err(DatabaseError::not_found("closing task", guid)),
                }
            }
        }
    }

    /// Completes a claimed task, persisting the closing transaction (if any)
    /// and the status update in one atomic unit.
    pub async fn complete(
        &self,
        guid: ClosingTaskId,
        txn: Option<&NewTransaction>,
    ) -> Result<Option<TransactionId>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let result_txn = match txn {
            Some(txn) => {
                insert_transaction_with_splits(&mut tx, txn).await?;
                Some(txn.guid)
            }
            None => None,
        };

        let updated = finish_task(&mut tx, guid, "completed", None, result_txn).await?;
        if updated != 1 {
            return Err(DatabaseError::ConstraintViolation(format!(
                "closing task {guid} is not in progress"
            )));
        }

        tx.commit().await?;
        Ok(result_txn)
    }

    /// Fails a claimed task, capturing the error message. The ledger is
    /// left untouched.
    pub async fn fail(&self, guid: ClosingTaskId, message: &str) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let updated = finish_task(&mut tx, guid, "failed", Some(message), None).await?;
        if updated != 1 {
            return Err(DatabaseError::ConstraintViolation(format!(
                "closing task {guid} is not in progress"
            )));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Sweeps `in_progress` tasks whose runner died (crash recovery).
    pub async fn fail_stale(&self, started_before: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE closing_tasks
             SET status = 'failed',
                 error_message = 'closing run abandoned: runner did not finish',
                 finished_at = NOW()
             WHERE status = 'in_progress' AND started_at < $1",
        )
        .bind(started_before)
        .execute(&self.pool)
        .await?;

        let swept = result.rows_affected();
        if swept > 0 {
            warn!(swept, "stale closing tasks failed");
        }
        Ok(swept)
    }
}

async fn finish_task(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    guid: ClosingTaskId,
    status: &str,
    message: Option<&str>,
    result_txn: Option<TransactionId>,
) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        "UPDATE closing_tasks
         SET status = $2, error_message = $3, result_txn = $4, finished_at = NOW()
         WHERE guid = $1 AND status = 'in_progress'",
    )
    .bind(guid.as_uuid())
    .bind(status)
    .bind(message)
    .bind(result_txn.as_ref().map(|t| *t.as_uuid()))
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}
