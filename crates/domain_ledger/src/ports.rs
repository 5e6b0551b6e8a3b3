//! Ledger domain ports
//!
//! These traits are the seams between the ledger domain and its data store.
//! The production adapter lives in `infra_db` (PostgreSQL via SQLx); tests
//! use the in-memory adapter from `test_utils`.

use async_trait::async_trait;
use rust_decimal::Decimal;

use core_kernel::{AccountId, TransactionId};

use crate::account::{Account, AccountType};
use crate::balance::BalanceQuery;
use crate::error::LedgerError;
use crate::transaction::NewTransaction;

/// Read access to the chart of accounts and the balance engine
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Fetches a single account by guid
    async fn account(&self, guid: AccountId) -> Result<Option<Account>, LedgerError>;

    /// Fetches all accounts whose type is in `types`
    async fn accounts_by_type(&self, types: &[AccountType]) -> Result<Vec<Account>, LedgerError>;

    /// Computes the natural balance of an account
    ///
    /// An account with no activity has a balance of zero; this is a valid
    /// result, not an error.
    async fn balance(&self, guid: AccountId, query: BalanceQuery) -> Result<Decimal, LedgerError>;
}

/// The transaction builder's persistence seam
///
/// Implementations must persist the transaction row and every split row in
/// one atomic unit; a failed call leaves no partial state observable.
#[async_trait]
pub trait TransactionWriter: Send + Sync {
    /// Validates and persists a balanced transaction batch
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnbalancedTransaction`] if the batch fails validation
    /// - [`LedgerError::Referential`] if a split references a missing account
    /// - [`LedgerError::Storage`] for transient failures; the whole batch is
    ///   safe to retry
    async fn create_transaction(&self, txn: NewTransaction) -> Result<TransactionId, LedgerError>;
}
