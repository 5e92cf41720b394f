//! Native-asset amount arithmetic.
//!
//! The ledger's native asset has seven fractional digits; the integer unit
//! used on the wire is the stroop (10^-7).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits of the native asset.
pub const NATIVE_SCALE: u32 = 7;

const STROOPS_PER_UNIT: i64 = 10_000_000;

/// The amount that can leave an account holding `balance` while keeping
/// `reserve` behind.
///
/// The result is truncated toward zero to [`NATIVE_SCALE`] digits so the
/// reserve is never undercut by rounding. Returns `None` when nothing
/// positive remains.
pub fn sendable(balance: Decimal, reserve: Decimal) -> Option<Decimal> {
    let amount = balance
        .checked_sub(reserve)?
        .round_dp_with_strategy(NATIVE_SCALE, RoundingStrategy::ToZero);
    (amount > Decimal::ZERO).then_some(amount)
}

/// Format with exactly [`NATIVE_SCALE`] fractional digits, e.g. `3.9900000`.
pub fn format_native(amount: Decimal) -> String {
    let mut amount = amount.round_dp_with_strategy(NATIVE_SCALE, RoundingStrategy::ToZero);
    amount.rescale(NATIVE_SCALE);
    amount.to_string()
}

/// Convert to stroops. `None` if the amount does not fit in an `i64`.
pub fn to_stroops(amount: Decimal) -> Option<i64> {
    amount
        .round_dp_with_strategy(NATIVE_SCALE, RoundingStrategy::ToZero)
        .checked_mul(Decimal::from(STROOPS_PER_UNIT))?
        .to_i64()
}
