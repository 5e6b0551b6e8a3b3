//! Tests for the ledger domain: balance invariant, sign convention,
//! and chart-of-accounts tree integrity.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::AccountId;
use domain_ledger::{
    compute_balance, natural_balance, would_create_cycle, AccountType, BalanceQuery, LedgerError,
    NewSplit, NewTransaction, SplitView, TransactionKind,
};

mod balance_invariant {
    use super::*;

    #[test]
    fn test_builder_batches_are_balanced_by_construction() {
        let (receivable, revenue) = (AccountId::new(), AccountId::new());
        let txn = NewTransaction::new("Invoice INV-2024-001 posted")
            .debit(receivable, dec!(1234.56))
            .credit(revenue, dec!(1234.56));

        assert!(txn.is_balanced());
        assert!(txn.validate().is_ok());
    }

    #[test]
    fn test_multi_leg_transaction_balances() {
        let (bank, income_a, income_b) = (AccountId::new(), AccountId::new(), AccountId::new());
        let txn = NewTransaction::new("mixed receipt")
            .debit(bank, dec!(300.00))
            .credit(income_a, dec!(120.00))
            .credit(income_b, dec!(180.00));

        assert!(txn.validate().is_ok());
    }

    #[test]
    fn test_one_cent_drift_is_rejected() {
        let (a, b) = (AccountId::new(), AccountId::new());
        let txn = NewTransaction::new("off by a cent")
            .debit(a, dec!(50.00))
            .credit(b, dec!(50.01));

        match txn.validate() {
            Err(LedgerError::UnbalancedTransaction { sum }) => assert_eq!(sum, dec!(-0.01)),
            other => panic!("expected UnbalancedTransaction, got {:?}", other),
        }
    }

    proptest! {
        /// A debit paired with an equal credit always validates, whatever
        /// the amount.
        #[test]
        fn paired_legs_always_balance(minor in 1i64..1_000_000_000i64) {
            let amount = Decimal::new(minor, 2);
            let txn = NewTransaction::new("prop")
                .debit(AccountId::new(), amount)
                .credit(AccountId::new(), amount);
            prop_assert!(txn.validate().is_ok());
        }

        /// Perturbing one leg by at least a cent always fails validation.
        #[test]
        fn perturbed_legs_never_balance(
            minor in 1i64..1_000_000_000i64,
            drift in 1i64..1_000i64,
        ) {
            let amount = Decimal::new(minor, 2);
            let txn = NewTransaction::new("prop")
                .debit(AccountId::new(), amount)
                .credit(AccountId::new(), amount + Decimal::new(drift, 2));
            prop_assert!(
                matches!(
                    txn.validate(),
                    Err(LedgerError::UnbalancedTransaction { .. })
                ),
                "expected UnbalancedTransaction"
            );
        }
    }
}

mod sign_convention {
    use super::*;

    #[test]
    fn test_natural_balance_per_account_type() {
        // A raw (debit-positive) sum of -250 reads differently by type.
        let raw = dec!(-250.00);
        assert_eq!(natural_balance(AccountType::Asset, raw), dec!(-250.00));
        assert_eq!(natural_balance(AccountType::Expense, raw), dec!(-250.00));
        assert_eq!(natural_balance(AccountType::Liability, raw), dec!(250.00));
        assert_eq!(natural_balance(AccountType::Revenue, raw), dec!(250.00));
        assert_eq!(natural_balance(AccountType::Equity, raw), dec!(250.00));
    }

    #[test]
    fn test_signed_history_aggregates_with_cutoff() {
        let splits = [dec!(100), dec!(-40), dec!(5)]
            .into_iter()
            .enumerate()
            .map(|(i, value)| SplitView {
                value,
                post_date: Utc.with_ymd_and_hms(2024, 1 + i as u32, 15, 0, 0, 0).unwrap(),
                kind: TransactionKind::Ordinary,
            })
            .collect::<Vec<_>>();

        assert_eq!(
            compute_balance(AccountType::Asset, splits.clone(), &BalanceQuery::all_time()),
            dec!(65)
        );

        let cutoff = chrono::NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        assert_eq!(
            compute_balance(AccountType::Asset, splits, &BalanceQuery::as_of(cutoff)),
            dec!(60)
        );
    }
}

mod chart_tree {
    use super::*;

    fn chain(len: usize) -> (Vec<AccountId>, HashMap<AccountId, Option<AccountId>>) {
        let ids: Vec<AccountId> = (0..len).map(|_| AccountId::new()).collect();
        let mut parents = HashMap::new();
        parents.insert(ids[0], None);
        for i in 1..len {
            parents.insert(ids[i], Some(ids[i - 1]));
        }
        (ids, parents)
    }

    #[test]
    fn test_deep_descendant_reparent_rejected() {
        let (ids, parents) = chain(6);
        assert!(would_create_cycle(&parents, ids[0], ids[5]));
        assert!(would_create_cycle(&parents, ids[2], ids[5]));
    }

    #[test]
    fn test_reparent_up_the_chain_allowed() {
        let (ids, parents) = chain(6);
        assert!(!would_create_cycle(&parents, ids[5], ids[1]));
    }

    #[test]
    fn test_unknown_parent_terminates_walk() {
        // A parent outside the map ends the chain rather than looping.
        let known = AccountId::new();
        let unknown = AccountId::new();
        let parents: HashMap<_, _> = [(known, Some(unknown))].into_iter().collect();
        assert!(!would_create_cycle(&parents, AccountId::new(), known));
    }
}

#[test]
fn test_split_memo_and_quantity_survive_building() {
    let account = AccountId::new();
    let split = NewSplit::debit(account, dec!(10.00))
        .with_memo("three units")
        .with_quantity(domain_ledger::Quantity::new(3, 1));

    assert_eq!(split.memo.as_deref(), Some("three units"));
    assert_eq!(split.quantity.num, 3);
    assert_eq!(split.value, dec!(10.00));
}
