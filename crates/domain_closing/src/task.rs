//! Closing task entity and state machine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use core_kernel::{ClosingTaskId, TransactionId};

use crate::error::ClosingError;

/// What the closing task closes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosingType {
    /// Zero income/revenue/expense accounts into profit-and-loss
    IncomeExpense,
}

impl ClosingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosingType::IncomeExpense => "income_expense",
        }
    }
}

impl fmt::Display for ClosingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosingStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ClosingStatus {
    /// Returns true for terminal states
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClosingStatus::Completed | ClosingStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClosingStatus::Pending => "pending",
            ClosingStatus::InProgress => "in_progress",
            ClosingStatus::Completed => "completed",
            ClosingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ClosingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown closing status string
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown closing status: {0}")]
pub struct ParseClosingStatusError(pub String);

impl FromStr for ClosingStatus {
    type Err = ParseClosingStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ClosingStatus::Pending),
            "in_progress" => Ok(ClosingStatus::InProgress),
            "completed" => Ok(ClosingStatus::Completed),
            "failed" => Ok(ClosingStatus::Failed),
            other => Err(ParseClosingStatusError(other.to_string())),
        }
    }
}

/// A period-closing task
///
/// A first-class entity with its own storage row; never a string-tagged
/// transaction. The result transaction reference is set only on successful
/// completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosingTask {
    pub guid: ClosingTaskId,
    pub closing_type: ClosingType,
    /// Closing cutoff: balances are taken as of this date (inclusive)
    pub period_end: NaiveDate,
    pub status: ClosingStatus,
    /// Captured failure message, set only in `Failed`
    pub error_message: Option<String>,
    /// The generated closing transaction, set only in `Completed`
    pub result_txn: Option<TransactionId>,
    pub requested_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ClosingTask {
    /// Creates a pending income/expense closing task
    pub fn new(period_end: NaiveDate) -> Self {
        Self {
            guid: ClosingTaskId::new(),
            closing_type: ClosingType::IncomeExpense,
            period_end,
            status: ClosingStatus::Pending,
            error_message: None,
            result_txn: None,
            requested_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Transitions `Pending -> InProgress`
    ///
    /// # Errors
    ///
    /// [`ClosingError::InvalidState`] from any other state; re-running a
    /// completed or failed task is rejected.
    pub fn start(&mut self) -> Result<(), ClosingError> {
        if self.status != ClosingStatus::Pending {
            return Err(ClosingError::InvalidState {
                task: self.guid,
                from: self.status,
                to: ClosingStatus::InProgress,
            });
        }
        self.status = ClosingStatus::InProgress;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Transitions `InProgress -> Completed`, recording the result
    pub fn complete(&mut self, result_txn: Option<TransactionId>) -> Result<(), ClosingError> {
        if self.status != ClosingStatus::InProgress {
            return Err(ClosingError::InvalidState {
                task: self.guid,
                from: self.status,
                to: ClosingStatus::Completed,
            });
        }
        self.status = ClosingStatus::Completed;
        self.result_txn = result_txn;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Transitions `InProgress -> Failed`, capturing the error
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), ClosingError> {
        if self.status != ClosingStatus::InProgress {
            return Err(ClosingError::InvalidState {
                task: self.guid,
                from: self.status,
                to: ClosingStatus::Failed,
            });
        }
        self.status = ClosingStatus::Failed;
        self.error_message = Some(message.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut task = ClosingTask::new(period_end());
        assert_eq!(task.status, ClosingStatus::Pending);

        task.start().unwrap();
        assert_eq!(task.status, ClosingStatus::InProgress);
        assert!(task.started_at.is_some());

        let txn = TransactionId::new();
        task.complete(Some(txn)).unwrap();
        assert_eq!(task.status, ClosingStatus::Completed);
        assert_eq!(task.result_txn, Some(txn));
        assert!(task.status.is_terminal());
    }

    #[test]
    fn test_failure_captures_message() {
        let mut task = ClosingTask::new(period_end());
        task.start().unwrap();
        task.fail("splits do not balance").unwrap();

        assert_eq!(task.status, ClosingStatus::Failed);
        assert_eq!(task.error_message.as_deref(), Some("splits do not balance"));
        assert!(task.result_txn.is_none());
    }

    #[test]
    fn test_restarting_terminal_task_rejected() {
        let mut task = ClosingTask::new(period_end());
        task.start().unwrap();
        task.complete(None).unwrap();

        assert!(matches!(task.start(), Err(ClosingError::InvalidState { .. })));
    }

    #[test]
    fn test_completing_pending_task_rejected() {
        let mut task = ClosingTask::new(period_end());
        assert!(matches!(task.complete(None), Err(ClosingError::InvalidState { .. })));
    }
}
