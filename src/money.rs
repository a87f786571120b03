//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are stored as `f64` but every rounding and comparison goes
//! through `Decimal`, starting from the shortest decimal representation of
//! the float. That is the value a user sees, so `round2(10.005)` is `10.01`
//! even though the nearest binary double is slightly below the midpoint.

use rust_decimal::prelude::*;
use std::str::FromStr;

const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum unit price accepted from a price list or an order line
pub const MAX_PRICE: f64 = 1_000_000_000.0;
/// Maximum quantity per order line
pub const MAX_QUANTITY: f64 = 1_000_000.0;

/// Convert f64 to Decimal through its shortest round-trip representation.
///
/// `None` for NaN, infinities and magnitudes `Decimal` cannot hold.
pub fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(value))
}

/// `true` for a finite value in `0..=max`
pub fn in_range(value: f64, max: f64) -> bool {
    value.is_finite() && (0.0..=max).contains(&value)
}

fn round_decimal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

fn to_f64(value: Decimal) -> Option<f64> {
    round_decimal(value).to_f64()
}

/// Rounds to 2 decimals, half away from zero.
///
/// Values `Decimal` cannot hold come back unchanged so range checks further
/// down still see them.
pub fn round2(value: f64) -> f64 {
    to_decimal(value).and_then(to_f64).unwrap_or(value)
}

/// `round2(price * quantity)`, multiplied in decimal. `None` on overflow.
pub fn line_subtotal(price: f64, quantity: f64) -> Option<f64> {
    to_decimal(price)?
        .checked_mul(to_decimal(quantity)?)
        .and_then(to_f64)
}

/// Sums amounts as given and rounds the result once.
///
/// Callers pass already rounded line values so the total matches the
/// per-line figures shown to the user. `None` when any amount is not
/// representable or the sum overflows.
pub fn sum_rounded<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |sum, value| sum.checked_add(to_decimal(value)?))
        .and_then(to_f64)
}

/// `pct` percent of `amount`, rounded
pub fn percentage_of(amount: f64, pct: f64) -> Option<f64> {
    to_decimal(amount)?
        .checked_mul(to_decimal(pct)?)?
        .checked_div(Decimal::ONE_HUNDRED)
        .and_then(to_f64)
}

/// `amount` raised by `pct` percent, rounded
pub fn with_markup(amount: f64, pct: f64) -> Option<f64> {
    let factor = Decimal::ONE.checked_add(to_decimal(pct)?.checked_div(Decimal::ONE_HUNDRED)?)?;
    to_decimal(amount)?.checked_mul(factor).and_then(to_f64)
}

/// `true` when `a` and `b` differ by at most one cent.
///
/// Amounts that are not representable never match anything.
pub fn within_tolerance(a: f64, b: f64) -> bool {
    match (to_decimal(a), to_decimal(b)) {
        (Some(a), Some(b)) => a
            .checked_sub(b)
            .is_some_and(|diff| diff.abs() <= MONEY_TOLERANCE),
        _ => false,
    }
}
