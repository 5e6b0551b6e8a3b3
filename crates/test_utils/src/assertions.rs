//! Assertion helpers for ledger tests

use rust_decimal::Decimal;

use core_kernel::{is_negligible, AccountId};
use domain_ledger::{NewTransaction, Transaction};

/// Panics unless the batch's split values sum to exactly zero.
pub fn assert_balanced(txn: &NewTransaction) {
    let sum = txn.balance_sum();
    assert!(
        sum.is_zero(),
        "transaction '{}' is unbalanced: split values sum to {sum}",
        txn.description
    );
}

/// Panics unless two amounts agree within the balance tolerance.
pub fn assert_amount_eq(actual: Decimal, expected: Decimal) {
    assert!(
        is_negligible(actual - expected),
        "amounts differ: actual {actual}, expected {expected}"
    );
}

/// Returns the value of the split hitting `account`, panicking if there is
/// not exactly one.
pub fn split_value(txn: &Transaction, account: AccountId) -> Decimal {
    let mut values = txn.splits.iter().filter(|s| s.account_guid == account).map(|s| s.value);
    let value = values
        .next()
        .unwrap_or_else(|| panic!("no split against account {account}"));
    assert!(values.next().is_none(), "multiple splits against account {account}");
    value
}
