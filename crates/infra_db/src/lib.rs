//! PostgreSQL persistence for the ledger
//!
//! Layout:
//!
//! - [`pool`]: connection pool construction and migrations
//! - [`config`]: environment-driven runtime configuration
//! - [`repositories`]: SQL per aggregate (accounts, transactions,
//!   documents, closing tasks)
//! - [`adapters`]: implementations of the domain ports on top of the
//!   repositories
//!
//! All multi-row writes are atomic: a posting commits the transaction, its
//! splits, and the document's posted reference together or not at all, and
//! a completed closing run commits the closing transaction with the task's
//! status flip.

pub mod adapters;
pub mod config;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PgClosingStore, PgDocumentGateway, PgLedgerGateway};
pub use config::LedgerConfig;
pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig};
pub use repositories::{
    AccountRepository, ClosingRepository, DocumentRepository, LedgerRepository,
};
