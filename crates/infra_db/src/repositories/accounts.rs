//! Chart-of-accounts persistence
//!
//! Balances are computed in SQL (a filtered sum over split values) and the
//! natural-balance sign adjustment is applied in Rust, mirroring the
//! reference computation in `domain_ledger::balance`.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error};
use uuid::Uuid;

use core_kernel::{round_amount, AccountId};
use domain_ledger::{natural_balance, would_create_cycle, Account, AccountType, BalanceQuery};

use crate::error::DatabaseError;

#[derive(sqlx::FromRow)]
struct AccountRow {
    guid: Uuid,
    name: String,
    account_type: String,
    parent_guid: Option<Uuid>,
    code: Option<String>,
    description: Option<String>,
    hidden: bool,
    placeholder: bool,
}

impl AccountRow {
    fn into_account(self) -> Result<Account, DatabaseError> {
        let account_type: AccountType = self
            .account_type
            .parse()
            .map_err(|e: domain_ledger::ParseAccountTypeError| DatabaseError::Sql(e.to_string()))?;
        Ok(Account {
            guid: AccountId::from_uuid(self.guid),
            name: self.name,
            account_type,
            parent_guid: self.parent_guid.map(AccountId::from_uuid),
            code: self.code,
            description: self.description,
            hidden: self.hidden,
            placeholder: self.placeholder,
        })
    }
}

const ACCOUNT_COLUMNS: &str =
    "guid, name, account_type, parent_guid, code, description, hidden, placeholder";

/// SQL access to the chart of accounts.
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new account.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::ForeignKeyViolation`] when the parent does not exist,
    /// [`DatabaseError::DuplicateEntry`] on a guid collision.
    pub async fn create(&self, account: &Account) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO accounts
                (guid, name, account_type, parent_guid, code, description, hidden, placeholder)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(account.guid.as_uuid())
        .bind(&account.name)
        .bind(account.account_type.as_str())
        .bind(account.parent_guid.as_ref().map(|p| *p.as_uuid()))
        .bind(&account.code)
        .bind(&account.description)
        .bind(account.hidden)
        .bind(account.placeholder)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Creates the singleton root account.
    ///
    /// Guarded: fails with [`DatabaseError::DuplicateEntry`] if a root
    /// already exists, so repeated bootstrap calls cannot fork the tree.
    pub async fn ensure_root(&self) -> Result<AccountId, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT guid FROM accounts WHERE account_type = 'ROOT' FOR UPDATE",
        )
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(guid) = existing {
            return Err(DatabaseError::DuplicateEntry(format!(
                "root account already exists: {guid}"
            )));
        }

        let root = Account::root();
        sqlx::query(
            "INSERT INTO accounts (guid, name, account_type, placeholder)
             VALUES ($1, $2, 'ROOT', TRUE)",
        )
        .bind(root.guid.as_uuid())
        .bind(&root.name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(root.guid)
    }

    /// Fetches an account by guid.
    pub async fn fetch(&self, guid: AccountId) -> Result<Option<Account>, DatabaseError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE guid = $1"
        ))
        .bind(guid.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(AccountRow::into_account).transpose()
    }

    /// Fetches all top-level accounts (no parent), name order.
    pub async fn roots(&self) -> Result<Vec<Account>, DatabaseError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE parent_guid IS NULL ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AccountRow::into_account).collect()
    }

    /// Looks an account up by its exact name.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Account>, DatabaseError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE name = $1 LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AccountRow::into_account).transpose()
    }

    /// Fetches the direct children of an account, name order.
    pub async fn children(&self, parent: AccountId) -> Result<Vec<Account>, DatabaseError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE parent_guid = $1 ORDER BY name"
        ))
        .bind(parent.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AccountRow::into_account).collect()
    }

    /// Fetches all accounts whose type is in `types`.
    pub async fn by_type(&self, types: &[AccountType]) -> Result<Vec<Account>, DatabaseError> {
        let names: Vec<String> = types.iter().map(|t| t.as_str().to_string()).collect();
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_type = ANY($1) ORDER BY name"
        ))
        .bind(&names)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AccountRow::into_account).collect()
    }

    /// Moves an account under a new parent.
    ///
    /// The parent map is read and the cycle check performed inside the same
    /// database transaction as the update, so a reparent that would make the
    /// account its own ancestor never commits.
    pub async fn reparent(
        &self,
        account: AccountId,
        new_parent: AccountId,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let pairs: Vec<(Uuid, Option<Uuid>)> =
            sqlx::query_as("SELECT guid, parent_guid FROM accounts FOR UPDATE")
                .fetch_all(&mut *tx)
                .await?;

        let parents: HashMap<AccountId, Option<AccountId>> = pairs
            .into_iter()
            .map(|(g, p)| (AccountId::from_uuid(g), p.map(AccountId::from_uuid)))
            .collect();

        if !parents.contains_key(&account) {
            return Err(DatabaseError::not_found("account", account));
        }
        if !parents.contains_key(&new_parent) {
            return Err(DatabaseError::not_found("account", new_parent));
        }
        if would_create_cycle(&parents, account, new_parent) {
            return Err(DatabaseError::ConstraintViolation(format!(
                "reparenting {account} under {new_parent} would create a cycle"
            )));
        }

        sqlx::query("UPDATE accounts SET parent_guid = $1 WHERE guid = $2")
            .bind(new_parent.as_uuid())
            .bind(account.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(account = %account, parent = %new_parent, "account reparented");
        Ok(())
    }

    /// Computes an account's natural balance.
    ///
    /// The sum runs in SQL; cutoff and system-closing filters match the
    /// reference balance engine. An account with no splits reports zero.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::NotFound`] when the account does not exist.
    pub async fn balance(
        &self,
        guid: AccountId,
        query: &BalanceQuery,
    ) -> Result<Decimal, DatabaseError> {
        let account = self
            .fetch(guid)
            .await?
            .ok_or_else(|| DatabaseError::not_found("account", guid))?;

        let raw: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT SUM(s.value)
            FROM splits s
            JOIN transactions t ON t.guid = s.txn_guid
            WHERE s.account_guid = $1
              AND ($2::date IS NULL OR t.post_date::date <= $2)
              AND (NOT $3 OR t.kind <> 'system_closing')
            "#,
        )
        .bind(guid.as_uuid())
        .bind(query.as_of)
        .bind(query.exclude_system_closing)
        .fetch_one(&self.pool)
        .await?;

        let raw = raw.unwrap_or(Decimal::ZERO);
        Ok(natural_balance(account.account_type, round_amount(raw)))
    }

    /// Balance for report rendering: a data-access failure logs and reports
    /// zero instead of failing the whole report.
    pub async fn balance_or_zero(&self, guid: AccountId, as_of: Option<NaiveDate>) -> Decimal {
        let query = BalanceQuery { as_of, exclude_system_closing: false };
        match self.balance(guid, &query).await {
            Ok(balance) => balance,
            Err(err) => {
                error!(account = %guid, error = %err, "balance lookup failed, reporting zero");
                Decimal::ZERO
            }
        }
    }
}
