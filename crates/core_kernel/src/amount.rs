//! Monetary amount helpers
//!
//! Every monetary value in the ledger is a `rust_decimal::Decimal` carried at
//! two decimal places. This module pins the rounding strategy (banker's
//! rounding, half to even) and the tolerance used when deciding whether a
//! residual balance is negligible.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Decimal places for all persisted amounts
pub const AMOUNT_DP: u32 = 2;

/// Residual below this magnitude is treated as a zero balance
pub const BALANCE_TOLERANCE: Decimal = dec!(0.01);

/// Rounds an amount to ledger precision using banker's rounding
///
/// Half-even is used so that long series of half-cent values don't drift
/// in one direction: `0.125` rounds to `0.12`, `0.135` rounds to `0.14`.
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::MidpointNearestEven)
}

/// Returns true if the amount rounds to zero within [`BALANCE_TOLERANCE`]
pub fn is_negligible(value: Decimal) -> bool {
    value.abs() < BALANCE_TOLERANCE
}
