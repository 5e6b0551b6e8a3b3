//! The period-closing service
//!
//! `request_closing` is the synchronous entry point: it records a pending
//! task and returns it immediately. The actual computation runs in
//! `run_closing`, usually detached via [`ClosingService::spawn_run`], with
//! its own store session; callers observe the outcome by polling the task.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tracing::{error, info, warn};

use core_kernel::{AccountId, ClosingTaskId, TransactionId};
use domain_ledger::{AccountSource, AccountType, BalanceQuery, NewTransaction};

use crate::error::ClosingError;
use crate::plan::{ClosingEntry, ClosingPlan};
use crate::ports::ClosingStore;
use crate::task::ClosingTask;

/// Orchestrates period-end income/expense closings
pub struct ClosingService {
    accounts: Arc<dyn AccountSource>,
    store: Arc<dyn ClosingStore>,
    /// Profit-and-loss account the period result is booked against;
    /// injected configuration, never a hardcoded guid
    profit_loss: AccountId,
}

impl ClosingService {
    pub fn new(
        accounts: Arc<dyn AccountSource>,
        store: Arc<dyn ClosingStore>,
        profit_loss: AccountId,
    ) -> Self {
        Self { accounts, store, profit_loss }
    }

    /// Creates a pending closing task and returns it immediately
    ///
    /// The caller is expected to hand the task guid to [`Self::spawn_run`];
    /// the request itself never waits for the closing to execute.
    pub async fn request_closing(&self, period_end: NaiveDate) -> Result<ClosingTask, ClosingError> {
        let task = ClosingTask::new(period_end);
        self.store.create(&task).await?;
        info!(task = %task.guid, %period_end, "closing task requested");
        Ok(task)
    }

    /// Detaches a closing run onto the async runtime
    ///
    /// Fire-and-forget: the handle is returned for tests, but no caller
    /// observes the run's result directly. Failures are captured in the
    /// task row and logged here.
    pub fn spawn_run(self: &Arc<Self>, guid: ClosingTaskId) -> tokio::task::JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = service.run_closing(guid).await {
                error!(task = %guid, %err, "closing run failed");
            }
        })
    }

    /// Executes a pending closing task
    ///
    /// Claims the task (single-flight, `Pending -> InProgress`), computes
    /// the closing plan from period-end balances, persists one system-
    /// closing transaction together with the completed-task update, or
    /// records the failure on the task. Everything before the final persist
    /// is pure computation and safe to recompute.
    pub async fn run_closing(
        &self,
        guid: ClosingTaskId,
    ) -> Result<Option<TransactionId>, ClosingError> {
        let task = self.store.begin_run(guid).await?;
        info!(task = %guid, period_end = %task.period_end, "closing run started");

        match self.compute_closing_transaction(&task).await {
            Ok(None) => {
                info!(task = %guid, "no balances to close for the period");
                match self.store.complete(guid, None).await {
                    Ok(_) => Ok(None),
                    Err(err) => Err(self.record_failure(guid, err).await),
                }
            }
            Ok(Some(txn)) => {
                let split_count = txn.splits.len();
                match self.store.complete(guid, Some(txn)).await {
                    Ok(result) => {
                        info!(task = %guid, splits = split_count, "closing run completed");
                        Ok(result)
                    }
                    Err(err) => Err(self.record_failure(guid, err).await),
                }
            }
            Err(err) => Err(self.record_failure(guid, err).await),
        }
    }

    /// Marks the task `Failed` so the period can be closed again
    ///
    /// Tasks are claimed single-flight, so a task stuck `InProgress` blocks
    /// every later run until the stale sweep. Recording the failure is
    /// best-effort; the original error is returned either way.
    async fn record_failure(&self, guid: ClosingTaskId, err: ClosingError) -> ClosingError {
        if let Err(fail_err) = self.store.fail(guid, &err.to_string()).await {
            error!(task = %guid, %fail_err, "could not record closing failure");
        }
        err
    }

    /// Fetches a task for status polling
    pub async fn task(&self, guid: ClosingTaskId) -> Result<ClosingTask, ClosingError> {
        self.store
            .fetch(guid)
            .await?
            .ok_or(ClosingError::TaskNotFound(guid))
    }

    /// Lists recent closing tasks, newest request first
    pub async fn recent_tasks(&self, limit: i64) -> Result<Vec<ClosingTask>, ClosingError> {
        self.store.list_recent(limit).await
    }

    /// Fails `InProgress` tasks older than `max_age`
    ///
    /// A crash between claim and persist leaves a task `InProgress` with no
    /// ledger side effects; this sweep turns such orphans into `Failed` so
    /// the period can be closed again.
    pub async fn sweep_stale(&self, max_age: Duration) -> Result<u64, ClosingError> {
        let cutoff = Utc::now() - max_age;
        let swept = self.store.fail_stale(cutoff).await?;
        if swept > 0 {
            warn!(swept, "failed stale in-progress closing tasks");
        }
        Ok(swept)
    }

    async fn compute_closing_transaction(
        &self,
        task: &ClosingTask,
    ) -> Result<Option<NewTransaction>, ClosingError> {
        let accounts = self
            .accounts
            .accounts_by_type(AccountType::closing_types())
            .await?;
        if accounts.is_empty() {
            warn!(task = %task.guid, "no income/expense accounts exist");
            return Ok(None);
        }

        // Point-in-time balances: prior closings must be included so an
        // already-closed account reads as zero and is skipped.
        let query = BalanceQuery::as_of(task.period_end);
        let mut entries = Vec::with_capacity(accounts.len());
        for account in accounts {
            let balance = self.accounts.balance(account.guid, query).await?;
            entries.push(ClosingEntry { account, balance });
        }

        let plan = ClosingPlan::build(&entries, self.profit_loss, task.period_end)?;
        if plan.is_empty() {
            return Ok(None);
        }

        info!(
            task = %task.guid,
            total_income = %plan.total_income,
            total_expense = %plan.total_expense,
            net_profit = %plan.net_profit,
            "closing plan computed"
        );

        let txn = plan.into_transaction(task.period_end);
        txn.validate()?;
        Ok(Some(txn))
    }
}
