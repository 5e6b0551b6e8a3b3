//! Closing plan computation
//!
//! Pure computation from account balances to the balanced split batch that
//! zeroes them. Everything here is safe to recompute; persistence happens in
//! a single atomic unit behind the [`crate::ports::ClosingStore`] seam.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{is_negligible, round_amount, AccountId};
use domain_ledger::{Account, AccountType, NewSplit, NewTransaction, TransactionKind};

use crate::error::ClosingError;

/// One account entering the closing, with its natural balance as of the
/// period end ([`domain_ledger::natural_balance`] convention)
#[derive(Debug, Clone)]
pub struct ClosingEntry {
    pub account: Account,
    pub balance: Decimal,
}

/// The computed closing batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosingPlan {
    /// Splits that zero each non-trivial income/expense account, plus the
    /// final profit-and-loss leg; sums to exactly zero
    pub splits: Vec<NewSplit>,
    /// Natural income total across closed accounts
    pub total_income: Decimal,
    /// Natural expense total across closed accounts
    pub total_expense: Decimal,
    /// total_income - total_expense
    pub net_profit: Decimal,
}

impl ClosingPlan {
    /// Builds the closing batch from account balances
    ///
    /// Accounts whose balance rounds within 0.01 of zero are skipped. Each
    /// remaining account receives one split that exactly cancels its raw
    /// balance; if the period's net profit is non-zero, one additional split
    /// books it against `profit_loss`. The batch is verified to sum to
    /// exactly zero before it is returned.
    ///
    /// # Errors
    ///
    /// [`ClosingError::Business`] if the emitted splits fail the zero-sum
    /// check; nothing is persisted in that case.
    pub fn build(
        entries: &[ClosingEntry],
        profit_loss: AccountId,
        period_end: NaiveDate,
    ) -> Result<ClosingPlan, ClosingError> {
        let mut splits = Vec::new();
        let mut total_income = Decimal::ZERO;
        let mut total_expense = Decimal::ZERO;

        for entry in entries {
            let balance = round_amount(entry.balance);
            if is_negligible(balance) {
                continue;
            }

            // Recover the raw (debit-positive) sum from the natural balance,
            // then emit the leg that cancels it.
            let raw = if entry.account.account_type.is_debit_normal() {
                balance
            } else {
                -balance
            };

            match entry.account.account_type {
                AccountType::Income | AccountType::Revenue => total_income += balance,
                _ => total_expense += balance,
            }

            splits.push(NewSplit::new(entry.account.guid, -raw).with_memo(format!(
                "Close {} through {}",
                entry.account.name, period_end
            )));
        }

        let net_profit = total_income - total_expense;
        if !net_profit.is_zero() {
            splits.push(NewSplit::new(profit_loss, -net_profit).with_memo(format!(
                "Net profit for period ending {}",
                period_end
            )));
        }

        let residual: Decimal = splits.iter().map(|s| s.value).sum();
        if !residual.is_zero() {
            return Err(ClosingError::Business(format!(
                "closing splits do not balance; residual {residual}"
            )));
        }

        Ok(ClosingPlan { splits, total_income, total_expense, net_profit })
    }

    /// Returns true if there is nothing to close
    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Wraps the batch in a system-closing transaction posted at period end
    pub fn into_transaction(self, period_end: NaiveDate) -> NewTransaction {
        let post_date = period_end
            .and_hms_opt(23, 59, 59)
            .expect("valid wall-clock time")
            .and_utc();

        let mut txn = NewTransaction::new(format!(
            "Income/expense closing for period ending {period_end}"
        ))
        .posted_at(post_date)
        .with_kind(TransactionKind::SystemClosing);
        txn.splits = self.splits;
        txn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(name: &str, ty: AccountType, balance: Decimal) -> ClosingEntry {
        ClosingEntry {
            account: Account::new(AccountId::new(), name, ty),
            balance,
        }
    }

    fn period_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    #[test]
    fn test_income_and_expense_close_to_profit_loss() {
        let profit_loss = AccountId::new();
        let entries = vec![
            entry("Sales Revenue", AccountType::Revenue, dec!(1000.00)),
            entry("Office Expense", AccountType::Expense, dec!(600.00)),
        ];

        let plan = ClosingPlan::build(&entries, profit_loss, period_end()).unwrap();

        assert_eq!(plan.total_income, dec!(1000.00));
        assert_eq!(plan.total_expense, dec!(600.00));
        assert_eq!(plan.net_profit, dec!(400.00));
        assert_eq!(plan.splits.len(), 3);

        // Revenue's raw sum is -1000 (credit); the closing leg debits it.
        assert_eq!(plan.splits[0].value, dec!(1000.00));
        // Expense's raw sum is +600; the closing leg credits it.
        assert_eq!(plan.splits[1].value, dec!(-600.00));
        // Profit-and-loss leg carries -net_profit.
        let pl = plan.splits.last().unwrap();
        assert_eq!(pl.account_guid, profit_loss);
        assert_eq!(pl.value, dec!(-400.00));

        let total: Decimal = plan.splits.iter().map(|s| s.value).sum();
        assert_eq!(total, Decimal::ZERO);
    }

    #[test]
    fn test_negligible_balances_skipped() {
        let entries = vec![
            entry("Rounding Income", AccountType::Income, dec!(0.004)),
            entry("Dormant Expense", AccountType::Expense, dec!(0)),
        ];
        let plan = ClosingPlan::build(&entries, AccountId::new(), period_end()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.net_profit, Decimal::ZERO);
    }

    #[test]
    fn test_break_even_period_has_no_profit_leg() {
        let entries = vec![
            entry("Revenue", AccountType::Revenue, dec!(500.00)),
            entry("Expense", AccountType::Expense, dec!(500.00)),
        ];
        let plan = ClosingPlan::build(&entries, AccountId::new(), period_end()).unwrap();
        // Two zeroing legs, no profit-and-loss leg.
        assert_eq!(plan.splits.len(), 2);
        assert_eq!(plan.net_profit, Decimal::ZERO);
    }

    #[test]
    fn test_net_loss_books_against_profit_loss() {
        let profit_loss = AccountId::new();
        let entries = vec![
            entry("Revenue", AccountType::Revenue, dec!(200.00)),
            entry("Expense", AccountType::Expense, dec!(450.00)),
        ];
        let plan = ClosingPlan::build(&entries, profit_loss, period_end()).unwrap();
        assert_eq!(plan.net_profit, dec!(-250.00));
        assert_eq!(plan.splits.last().unwrap().value, dec!(250.00));
    }

    #[test]
    fn test_closing_transaction_is_tagged_and_balanced() {
        let entries = vec![entry("Revenue", AccountType::Revenue, dec!(75.25))];
        let plan = ClosingPlan::build(&entries, AccountId::new(), period_end()).unwrap();
        let txn = plan.into_transaction(period_end());

        assert_eq!(txn.kind, TransactionKind::SystemClosing);
        assert_eq!(txn.post_date.date_naive(), period_end());
        assert!(txn.validate().is_ok());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    proptest! {
        /// Whatever the mix of balances, a built plan always sums to zero.
        #[test]
        fn plan_always_balances(
            incomes in proptest::collection::vec(-1_000_000i64..1_000_000i64, 0..6),
            expenses in proptest::collection::vec(-1_000_000i64..1_000_000i64, 0..6),
        ) {
            let mut entries = Vec::new();
            for minor in incomes {
                entries.push(ClosingEntry {
                    account: Account::new(AccountId::new(), "income", AccountType::Income),
                    balance: Decimal::new(minor, 2),
                });
            }
            for minor in expenses {
                entries.push(ClosingEntry {
                    account: Account::new(AccountId::new(), "expense", AccountType::Expense),
                    balance: Decimal::new(minor, 2),
                });
            }

            let plan = ClosingPlan::build(
                &entries,
                AccountId::new(),
                NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            ).unwrap();

            let total: Decimal = plan.splits.iter().map(|s| s.value).sum();
            prop_assert_eq!(total, Decimal::ZERO);
        }
    }
}
