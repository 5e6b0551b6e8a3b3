//! SQLx repository implementations
//!
//! Each repository owns the SQL for one aggregate. Cross-aggregate writes
//! that must commit together (posting a document, completing a closing run)
//! share one database transaction and reuse the transaction-insert helper
//! from the ledger repository.

mod accounts;
mod closing;
mod documents;
mod ledger;

pub use accounts::AccountRepository;
pub use closing::{ClaimOutcome, ClosingRepository};
pub use documents::DocumentRepository;
pub use ledger::LedgerRepository;

pub(crate) use ledger::insert_transaction_with_splits;
