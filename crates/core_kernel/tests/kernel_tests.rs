//! Integration tests for core_kernel

use core_kernel::{round_amount, is_negligible, AccountId, TransactionId, BALANCE_TOLERANCE};
use rust_decimal_macros::dec;

#[test]
fn test_id_types_do_not_compare_across_kinds() {
    // Compile-time property: the two ids below are distinct types.
    let account = AccountId::new();
    let txn = TransactionId::new();
    assert_ne!(account.as_uuid(), txn.as_uuid());
}

#[test]
fn test_serde_transparency() {
    let id = AccountId::new();
    let json = serde_json::to_string(&id).unwrap();
    // Serialized as a bare UUID string, no struct wrapper.
    assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    let back: AccountId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn test_balance_tolerance_matches_ledger_precision() {
    assert_eq!(BALANCE_TOLERANCE, dec!(0.01));
    assert!(is_negligible(round_amount(dec!(0.0049))));
}
