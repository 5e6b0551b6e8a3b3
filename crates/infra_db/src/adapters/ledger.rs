//! Ledger port adapter

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use core_kernel::{AccountId, TransactionId};
use domain_ledger::{
    Account, AccountSource, AccountType, BalanceQuery, LedgerError, NewTransaction,
    TransactionWriter,
};

use crate::error::DatabaseError;
use crate::repositories::{AccountRepository, LedgerRepository};

pub(crate) fn to_ledger_error(err: DatabaseError) -> LedgerError {
    match err {
        DatabaseError::NotFound(message) => LedgerError::AccountNotFound(message),
        DatabaseError::ForeignKeyViolation(message) => LedgerError::Referential(message),
        DatabaseError::DuplicateEntry(message) => LedgerError::Conflict(message),
        DatabaseError::ConstraintViolation(message) => LedgerError::Validation(message),
        other => LedgerError::Storage(other.to_string()),
    }
}

/// [`AccountSource`] and [`TransactionWriter`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgLedgerGateway {
    accounts: AccountRepository,
    ledger: LedgerRepository,
}

impl PgLedgerGateway {
    pub fn new(pool: PgPool) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            ledger: LedgerRepository::new(pool),
        }
    }
}

#[async_trait]
impl AccountSource for PgLedgerGateway {
    async fn account(&self, guid: AccountId) -> Result<Option<Account>, LedgerError> {
        self.accounts.fetch(guid).await.map_err(to_ledger_error)
    }

    async fn accounts_by_type(&self, types: &[AccountType]) -> Result<Vec<Account>, LedgerError> {
        self.accounts.by_type(types).await.map_err(to_ledger_error)
    }

    async fn balance(&self, guid: AccountId, query: BalanceQuery) -> Result<Decimal, LedgerError> {
        self.accounts.balance(guid, &query).await.map_err(to_ledger_error)
    }
}

#[async_trait]
impl TransactionWriter for PgLedgerGateway {
    async fn create_transaction(&self, txn: NewTransaction) -> Result<TransactionId, LedgerError> {
        txn.validate()?;
        self.ledger.create_transaction(&txn).await.map_err(to_ledger_error)
    }
}
