//! Shared test utilities
//!
//! - [`memstore`]: one in-memory store implementing every domain port
//! - [`fixtures`]: the standard chart of accounts and document projections
//! - [`assertions`]: balance and split assertion helpers
//!
//! Service-level tests for the posting and closing workflows live in this
//! crate's `tests/` directory; the domain crates cannot dev-depend on
//! `test_utils` without a cycle.

pub mod assertions;
pub mod fixtures;
pub mod memstore;

pub use assertions::{assert_amount_eq, assert_balanced, split_value};
pub use fixtures::{confirmed_bill, confirmed_invoice, ledger_with_chart, StandardChart};
pub use memstore::InMemoryLedger;
