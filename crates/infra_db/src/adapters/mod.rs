//! Port adapters
//!
//! Thin wrappers implementing the domain ports on top of the repositories,
//! translating [`crate::error::DatabaseError`] into each domain's error
//! vocabulary.

mod closing;
mod documents;
mod ledger;

pub use closing::PgClosingStore;
pub use documents::PgDocumentGateway;
pub use ledger::PgLedgerGateway;
