//! Core Kernel - Foundational types for the ledger system
//!
//! This crate provides the building blocks used across all domain modules:
//! - Strongly-typed entity identifiers
//! - Monetary amount rounding and tolerance helpers

pub mod amount;
pub mod identifiers;

pub use amount::{round_amount, is_negligible, AMOUNT_DP, BALANCE_TOLERANCE};
pub use identifiers::{
    AccountId, TransactionId, SplitId,
    InvoiceId, BillId, CustomerId, VendorId,
    ClosingTaskId,
};
