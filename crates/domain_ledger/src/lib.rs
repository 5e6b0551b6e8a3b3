//! Ledger Domain - Double-Entry Bookkeeping Core
//!
//! This crate implements the invariants of the double-entry ledger:
//! every transaction decomposes into splits whose values sum to exactly
//! zero, and account balances are signed aggregates over split history.
//!
//! # Sign convention
//!
//! Split values are signed: a positive value is a debit, a negative value
//! is a credit. The raw balance of an account is the plain sum of its split
//! values. The *natural* balance reported by the balance engine negates the
//! raw sum for credit-normal account types (liability, payable, equity,
//! income, revenue), so that a revenue account that has earned 1000 reports
//! a balance of 1000 rather than -1000. The same convention is applied by
//! document posting and period closing; no call site deviates from it.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{NewTransaction, NewSplit};
//!
//! let txn = NewTransaction::new("Invoice INV-001 posted")
//!     .split(NewSplit::debit(receivable, total))
//!     .split(NewSplit::credit(revenue, total));
//!
//! txn.validate()?;
//! let txn_id = writer.create_transaction(txn).await?;
//! ```

pub mod account;
pub mod balance;
pub mod error;
pub mod ports;
pub mod transaction;

pub use account::{Account, AccountType, ParseAccountTypeError, would_create_cycle};
pub use balance::{natural_balance, compute_balance, BalanceQuery, SplitView};
pub use error::LedgerError;
pub use ports::{AccountSource, TransactionWriter};
pub use transaction::{
    NewSplit, NewTransaction, ParseTransactionKindError, Quantity, Split, Transaction,
    TransactionKind,
};
