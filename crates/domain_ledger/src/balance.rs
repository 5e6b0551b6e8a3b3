//! The balance engine
//!
//! Balances are signed aggregates over split history. The persistence layer
//! runs this computation in SQL for efficiency; [`compute_balance`] is the
//! reference implementation used by in-memory stores and by tests to pin the
//! semantics: cutoff filter, system-closing exclusion, banker's rounding,
//! then the natural-balance sign adjustment.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::round_amount;

use crate::account::AccountType;
use crate::transaction::TransactionKind;

/// Options for a balance computation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BalanceQuery {
    /// Only count splits whose transaction post_date falls on or before this
    /// date; `None` means all time.
    pub as_of: Option<NaiveDate>,
    /// Skip splits belonging to system-closing transactions. Activity views
    /// (cash-flow style reports) set this; point-in-time balances do not.
    pub exclude_system_closing: bool,
}

impl BalanceQuery {
    /// Point-in-time balance over all history
    pub fn all_time() -> Self {
        Self::default()
    }

    /// Point-in-time balance as of a cutoff date (inclusive)
    pub fn as_of(date: NaiveDate) -> Self {
        Self { as_of: Some(date), exclude_system_closing: false }
    }

    /// Excludes system-closing artifacts (activity reporting)
    pub fn excluding_system_closing(mut self) -> Self {
        self.exclude_system_closing = true;
        self
    }
}

/// The slice of a split the balance engine needs
#[derive(Debug, Clone, Copy)]
pub struct SplitView {
    pub value: Decimal,
    pub post_date: DateTime<Utc>,
    pub kind: TransactionKind,
}

/// Applies the natural-balance sign convention to a raw sum of split values
///
/// Debit-normal accounts report the raw sum; credit-normal accounts report
/// its negation, so accumulated revenue of 1000 reads as 1000, not -1000.
pub fn natural_balance(account_type: AccountType, raw: Decimal) -> Decimal {
    if account_type.is_debit_normal() {
        raw
    } else {
        -raw
    }
}

/// Computes an account balance from its splits
///
/// Returns the natural balance rounded to two decimal places (half-even).
/// An account with no qualifying splits has a balance of zero; that is a
/// valid result, never an error.
pub fn compute_balance<I>(account_type: AccountType, splits: I, query: &BalanceQuery) -> Decimal
where
    I: IntoIterator<Item = SplitView>,
{
    let raw: Decimal = splits
        .into_iter()
        .filter(|s| match query.as_of {
            Some(cutoff) => s.post_date.date_naive() <= cutoff,
            None => true,
        })
        .filter(|s| !(query.exclude_system_closing && s.kind == TransactionKind::SystemClosing))
        .map(|s| s.value)
        .sum();

    natural_balance(account_type, round_amount(raw))
}
