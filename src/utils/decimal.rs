//! Decimal arithmetic utilities for sizing and scoring.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Safe division that returns `fallback` if divisor is zero or negative.
///
/// A quotient too large for `Decimal` saturates instead of panicking.
pub fn safe_div_or(numerator: Decimal, denominator: Decimal, fallback: Decimal) -> Decimal {
    if denominator <= Decimal::ZERO {
        return fallback;
    }

    numerator.checked_div(denominator).unwrap_or(if numerator.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    })
}

/// Clamp a score into `[0, cap]`.
pub fn clamp_score(value: Decimal, cap: Decimal) -> Decimal {
    value.min(cap).max(Decimal::ZERO)
}

/// Convert basis points to a decimal fraction (2500 bp = 0.25).
pub fn from_basis_points(bps: u64) -> Decimal {
    Decimal::from(bps) / dec!(10000)
}

/// Split `total` by a list of weights.
///
/// When the weights sum to one the parts sum exactly to `total`.
pub fn split_by_weights(total: Decimal, weights: &[Decimal]) -> Vec<Decimal> {
    weights.iter().map(|w| total * w).collect()
}

/// Scale a duration in whole seconds, rounding to the nearest second.
pub fn scale_secs(secs: u64, factor: Decimal) -> u64 {
    (Decimal::from(secs) * factor)
        .round()
        .to_u64()
        .unwrap_or(secs)
}
