//! Closing Domain - Period-End Income/Expense Closing
//!
//! At period end, every income and expense account is zeroed into a
//! designated profit-and-loss account by one system-generated transaction.
//! The request is synchronous (a pending task is created and returned
//! immediately); the computation and posting run in a detached background
//! worker whose outcome is observable only through the task's status.
//!
//! # Task lifecycle
//!
//! `Pending -> InProgress -> Completed | Failed`
//!
//! The transition into `InProgress` is single-flight: only one closing run
//! may be active at a time, and re-execution of a non-pending task is
//! rejected. Everything before the final persist is pure computation, so a
//! crash mid-run leaves the ledger untouched; the stale-task sweep fails
//! abandoned `InProgress` rows.

pub mod error;
pub mod plan;
pub mod ports;
pub mod service;
pub mod task;

pub use error::ClosingError;
pub use plan::{ClosingEntry, ClosingPlan};
pub use ports::ClosingStore;
pub use service::ClosingService;
pub use task::{ClosingStatus, ClosingTask, ClosingType, ParseClosingStatusError};
