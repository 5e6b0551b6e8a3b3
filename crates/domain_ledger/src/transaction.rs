//! Transactions and splits
//!
//! A transaction is an atomic accounting event; each split is one signed leg
//! against a single account. Transactions are immutable once persisted and
//! are only ever written together with all of their splits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use core_kernel::{round_amount, AccountId, SplitId, TransactionId};

use crate::error::LedgerError;

/// Classifies a transaction for reporting and activity queries
///
/// System-generated closing transactions carry an explicit kind instead of a
/// magic description prefix, so activity reports can exclude them without
/// string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// A regular business transaction
    Ordinary,
    /// Generated by the period-closing procedure
    SystemClosing,
}

impl TransactionKind {
    /// Returns the storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Ordinary => "ordinary",
            TransactionKind::SystemClosing => "system_closing",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown transaction kind string
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown transaction kind: {0}")]
pub struct ParseTransactionKindError(pub String);

impl FromStr for TransactionKind {
    type Err = ParseTransactionKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ordinary" => Ok(TransactionKind::Ordinary),
            "system_closing" => Ok(TransactionKind::SystemClosing),
            other => Err(ParseTransactionKindError(other.to_string())),
        }
    }
}

/// A rational unit count carried by a split (e.g., 3 items at a unit price)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    pub num: i64,
    pub denom: i64,
}

impl Quantity {
    /// One whole unit
    pub const ONE: Quantity = Quantity { num: 1, denom: 1 };

    pub fn new(num: i64, denom: i64) -> Self {
        Self { num, denom }
    }

    /// Converts to a decimal factor
    ///
    /// A zero denominator yields zero; [`NewTransaction::validate`] rejects
    /// such quantities before persistence.
    pub fn to_decimal(&self) -> Decimal {
        if self.denom == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.num) / Decimal::from(self.denom)
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::ONE
    }
}

/// A persisted split - one leg of a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Split {
    /// Unique identifier
    pub guid: SplitId,
    /// Owning transaction
    pub txn_guid: TransactionId,
    /// Account this leg moves
    pub account_guid: AccountId,
    /// Signed value: positive = debit, negative = credit
    pub value: Decimal,
    /// Unit count
    pub quantity: Quantity,
    /// Free-text memo
    pub memo: Option<String>,
    /// Reconciliation state ('n' = not reconciled)
    pub reconcile_state: char,
    /// When the split was reconciled
    pub reconcile_date: Option<DateTime<Utc>>,
}

/// A persisted transaction with its splits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub guid: TransactionId,
    /// Accounting effective date
    pub post_date: DateTime<Utc>,
    /// Date the transaction was recorded
    pub enter_date: DateTime<Utc>,
    /// Description
    pub description: String,
    /// Ordinary or system-generated
    pub kind: TransactionKind,
    /// The balanced legs
    pub splits: Vec<Split>,
}

/// One leg of a transaction under construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSplit {
    pub guid: SplitId,
    pub account_guid: AccountId,
    pub value: Decimal,
    pub quantity: Quantity,
    pub memo: Option<String>,
}

impl NewSplit {
    /// Creates a split with an explicit signed value
    pub fn new(account_guid: AccountId, value: Decimal) -> Self {
        Self {
            guid: SplitId::new(),
            account_guid,
            value,
            quantity: Quantity::ONE,
            memo: None,
        }
    }

    /// Creates a debit leg (positive value); `amount` must be positive
    pub fn debit(account_guid: AccountId, amount: Decimal) -> Self {
        Self::new(account_guid, amount)
    }

    /// Creates a credit leg (negative value); `amount` must be positive
    pub fn credit(account_guid: AccountId, amount: Decimal) -> Self {
        Self::new(account_guid, -amount)
    }

    /// Attaches a memo
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Sets the unit count
    pub fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = quantity;
        self
    }
}

/// A transaction batch submitted to the transaction builder
///
/// The batch is persisted all-or-nothing: the transaction row and every
/// split row commit together, or nothing is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub guid: TransactionId,
    pub post_date: DateTime<Utc>,
    pub enter_date: DateTime<Utc>,
    pub description: String,
    pub kind: TransactionKind,
    pub splits: Vec<NewSplit>,
}

impl NewTransaction {
    /// Creates an ordinary transaction dated now
    pub fn new(description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            guid: TransactionId::new_v7(),
            post_date: now,
            enter_date: now,
            description: description.into(),
            kind: TransactionKind::Ordinary,
            splits: Vec::new(),
        }
    }

    /// Sets the accounting effective date
    pub fn posted_at(mut self, post_date: DateTime<Utc>) -> Self {
        self.post_date = post_date;
        self
    }

    /// Sets the recorded date
    pub fn entered_at(mut self, enter_date: DateTime<Utc>) -> Self {
        self.enter_date = enter_date;
        self
    }

    /// Sets the transaction kind
    pub fn with_kind(mut self, kind: TransactionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Adds a leg
    pub fn split(mut self, split: NewSplit) -> Self {
        self.splits.push(split);
        self
    }

    /// Adds a debit leg
    pub fn debit(self, account_guid: AccountId, amount: Decimal) -> Self {
        self.split(NewSplit::debit(account_guid, amount))
    }

    /// Adds a credit leg
    pub fn credit(self, account_guid: AccountId, amount: Decimal) -> Self {
        self.split(NewSplit::credit(account_guid, amount))
    }

    /// Sum of the split values, each rounded to ledger precision
    pub fn balance_sum(&self) -> Decimal {
        self.splits.iter().map(|s| round_amount(s.value)).sum()
    }

    /// Returns true if the split values sum to exactly zero
    pub fn is_balanced(&self) -> bool {
        self.balance_sum().is_zero()
    }

    /// Validates the batch before persistence
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnbalancedTransaction`] if the rounded values do not
    ///   sum to exactly zero
    /// - [`LedgerError::Validation`] for a zero quantity denominator
    pub fn validate(&self) -> Result<(), LedgerError> {
        for split in &self.splits {
            if split.quantity.denom == 0 {
                return Err(LedgerError::Validation(format!(
                    "split {} has a zero quantity denominator",
                    split.guid
                )));
            }
        }

        let sum = self.balance_sum();
        if !sum.is_zero() {
            return Err(LedgerError::UnbalancedTransaction { sum });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balanced_batch_validates() {
        let (a, b) = (AccountId::new(), AccountId::new());
        let txn = NewTransaction::new("test").debit(a, dec!(100.00)).credit(b, dec!(100.00));
        assert!(txn.validate().is_ok());
    }

    #[test]
    fn test_unbalanced_batch_rejected() {
        let (a, b) = (AccountId::new(), AccountId::new());
        let txn = NewTransaction::new("test").debit(a, dec!(100.00)).credit(b, dec!(99.99));
        let err = txn.validate().unwrap_err();
        assert!(matches!(err, LedgerError::UnbalancedTransaction { sum } if sum == dec!(0.01)));
    }

    #[test]
    fn test_empty_batch_is_degenerate_but_valid() {
        assert!(NewTransaction::new("no-op").validate().is_ok());
    }

    #[test]
    fn test_zero_denominator_rejected() {
        let a = AccountId::new();
        let txn = NewTransaction::new("bad quantity")
            .split(NewSplit::new(a, dec!(0)).with_quantity(Quantity::new(1, 0)));
        assert!(matches!(txn.validate(), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_sub_cent_residue_rounds_away() {
        // Values are rounded to 2 dp before the zero-sum check.
        let (a, b) = (AccountId::new(), AccountId::new());
        let txn = NewTransaction::new("rounding")
            .split(NewSplit::new(a, dec!(10.001)))
            .split(NewSplit::new(b, dec!(-10.0012)));
        assert!(txn.validate().is_ok());
    }

    #[test]
    fn test_quantity_decimal_conversion() {
        assert_eq!(Quantity::new(3, 2).to_decimal(), dec!(1.5));
        assert_eq!(Quantity::ONE.to_decimal(), dec!(1));
    }

    #[test]
    fn test_zero_denominator_quantity_converts_without_panic() {
        assert_eq!(Quantity::new(5, 0).to_decimal(), Decimal::ZERO);
    }

    #[test]
    fn test_kind_round_trip() {
        assert_eq!("system_closing".parse::<TransactionKind>().unwrap(), TransactionKind::SystemClosing);
        assert!("closing-task".parse::<TransactionKind>().is_err());
    }
}
