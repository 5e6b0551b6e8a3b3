//! Transaction persistence
//!
//! Writes are all-or-nothing: the transaction row and every split row go
//! through one database transaction. The insert helper is shared with the
//! document-posting and closing repositories so their cross-aggregate
//! commits stay atomic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use core_kernel::{round_amount, AccountId, SplitId, TransactionId};
use domain_ledger::{
    NewTransaction, Quantity, Split, Transaction, TransactionKind,
};

use crate::error::DatabaseError;

/// Inserts a transaction row and all of its splits inside `tx`.
///
/// Split values are rounded to ledger precision on the way in, so the
/// stored rows satisfy the same zero-sum the validator checked. Splits
/// against placeholder accounts are rejected before anything is written.
pub(crate) async fn insert_transaction_with_splits(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    txn: &NewTransaction,
) -> Result<(), DatabaseError> {
    let account_guids: Vec<Uuid> = txn.splits.iter().map(|s| *s.account_guid.as_uuid()).collect();

    let placeholders: Vec<Uuid> = sqlx::query_scalar(
        "SELECT guid FROM accounts WHERE guid = ANY($1) AND placeholder",
    )
    .bind(&account_guids)
    .fetch_all(&mut **tx)
    .await?;

    if let Some(guid) = placeholders.first() {
        return Err(DatabaseError::ConstraintViolation(format!(
            "account {guid} is a placeholder and cannot hold splits"
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO transactions (guid, post_date, enter_date, description, kind)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(txn.guid.as_uuid())
    .bind(txn.post_date)
    .bind(txn.enter_date)
    .bind(&txn.description)
    .bind(txn.kind.as_str())
    .execute(&mut **tx)
    .await?;

    for split in &txn.splits {
        sqlx::query(
            r#"
            INSERT INTO splits
                (guid, txn_guid, account_guid, value, quantity_num, quantity_denom, memo)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(split.guid.as_uuid())
        .bind(txn.guid.as_uuid())
        .bind(split.account_guid.as_uuid())
        .bind(round_amount(split.value))
        .bind(split.quantity.num)
        .bind(split.quantity.denom)
        .bind(&split.memo)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    guid: Uuid,
    post_date: DateTime<Utc>,
    enter_date: DateTime<Utc>,
    description: String,
    kind: String,
}

#[derive(sqlx::FromRow)]
struct SplitRow {
    guid: Uuid,
    txn_guid: Uuid,
    account_guid: Uuid,
    value: Decimal,
    quantity_num: i64,
    quantity_denom: i64,
    memo: Option<String>,
    reconcile_state: String,
    reconcile_date: Option<DateTime<Utc>>,
}

impl TransactionRow {
    fn into_transaction(self, splits: Vec<Split>) -> Result<Transaction, DatabaseError> {
        let kind: TransactionKind = self
            .kind
            .parse()
            .map_err(|e: domain_ledger::ParseTransactionKindError| {
                DatabaseError::Sql(e.to_string())
            })?;
        Ok(Transaction {
            guid: TransactionId::from_uuid(self.guid),
            post_date: self.post_date,
            enter_date: self.enter_date,
            description: self.description,
            kind,
            splits,
        })
    }
}

impl SplitRow {
    fn into_split(self) -> Split {
        Split {
            guid: SplitId::from_uuid(self.guid),
            txn_guid: TransactionId::from_uuid(self.txn_guid),
            account_guid: AccountId::from_uuid(self.account_guid),
            value: self.value,
            quantity: Quantity::new(self.quantity_num, self.quantity_denom),
            memo: self.memo,
            reconcile_state: self.reconcile_state.chars().next().unwrap_or('n'),
            reconcile_date: self.reconcile_date,
        }
    }
}

/// SQL access to transactions and splits.
#[derive(Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persists a transaction batch atomically and returns its guid.
    pub async fn create_transaction(
        &self,
        txn: &NewTransaction,
    ) -> Result<TransactionId, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        insert_transaction_with_splits(&mut tx, txn).await?;
        tx.commit().await?;

        debug!(txn = %txn.guid, splits = txn.splits.len(), "transaction persisted");
        Ok(txn.guid)
    }

    /// Fetches a transaction with all of its splits.
    pub async fn fetch_transaction(
        &self,
        guid: TransactionId,
    ) -> Result<Option<Transaction>, DatabaseError> {
        let row: Option<TransactionRow> = sqlx::query_as(
            "SELECT guid, post_date, enter_date, description, kind
             FROM transactions WHERE guid = $1",
        )
        .bind(guid.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };

        let splits: Vec<SplitRow> = sqlx::query_as(
            "SELECT guid, txn_guid, account_guid, value, quantity_num, quantity_denom,
                    memo, reconcile_state, reconcile_date
             FROM splits WHERE txn_guid = $1 ORDER BY guid",
        )
        .bind(guid.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let splits = splits.into_iter().map(SplitRow::into_split).collect();
        Ok(Some(row.into_transaction(splits)?))
    }

    /// Lists transactions for an account, newest post date first.
    ///
    /// Activity views pass `exclude_system_closing = true` so closing
    /// artifacts never show up in day-to-day listings.
    pub async fn transactions_for_account(
        &self,
        account: AccountId,
        exclude_system_closing: bool,
        limit: i64,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT t.guid, t.post_date
            FROM transactions t
            JOIN splits s ON s.txn_guid = t.guid
            WHERE s.account_guid = $1
              AND (NOT $2 OR t.kind <> 'system_closing')
            ORDER BY t.post_date DESC, t.guid
            LIMIT $3
            "#,
        )
        .bind(account.as_uuid())
        .bind(exclude_system_closing)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            let guid = TransactionId::from_uuid(row.try_get("guid").map_err(DatabaseError::from)?);
            if let Some(txn) = self.fetch_transaction(guid).await? {
                transactions.push(txn);
            }
        }
        Ok(transactions)
    }
}
