//! Fixed-point money helpers.
//!
//! Every monetary value in the engine is an `i64` amount of **integer cents**
//! (fields carry a `_cents` suffix) to avoid floating-point drift. The
//! platform fee is expressed in basis points (1 bps = 0.01%).

use crate::{EngineError, ResultEngine};

/// Computes the platform fee in cents, rounding half up.
///
/// `fee_bps` is the fee rate in basis points: 250 bps = 2.5%.
pub fn platform_fee_cents(subtotal_cents: i64, fee_bps: i64) -> ResultEngine<i64> {
    if subtotal_cents < 0 || fee_bps < 0 {
        return Err(EngineError::Validation(
            "fee inputs must not be negative".to_string(),
        ));
    }
    let scaled = subtotal_cents
        .checked_mul(fee_bps)
        .and_then(|v| v.checked_add(5_000))
        .ok_or_else(|| EngineError::Validation("amount too large".to_string()))?;
    Ok(scaled / 10_000)
}

/// Multiplies a unit price by a quantity with overflow checking.
pub fn subtotal_cents(unit_price_cents: i64, quantity: i64) -> ResultEngine<i64> {
    unit_price_cents
        .checked_mul(quantity)
        .ok_or_else(|| EngineError::Validation("amount too large".to_string()))
}

/// Formats an amount of cents as a plain decimal string with two digits.
///
/// Used for human-readable notification messages, never for arithmetic.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_matches_default_rate() {
        // 200.00 at 2.5% is exactly 5.00.
        assert_eq!(platform_fee_cents(20_000, 250).unwrap(), 500);
    }

    #[test]
    fn fee_rounds_half_up() {
        // 0.99 at 2.5% = 2.475 cents, rounds to 2.
        assert_eq!(platform_fee_cents(99, 250).unwrap(), 2);
        // 1.00 at 2.5% = 2.5 cents, rounds to 3.
        assert_eq!(platform_fee_cents(100, 250).unwrap(), 3);
    }

    #[test]
    fn fee_rejects_negative_inputs() {
        assert!(platform_fee_cents(-1, 250).is_err());
        assert!(platform_fee_cents(100, -1).is_err());
    }

    #[test]
    fn subtotal_checks_overflow() {
        assert_eq!(subtotal_cents(10_000, 2).unwrap(), 20_000);
        assert!(subtotal_cents(i64::MAX, 2).is_err());
    }

    #[test]
    fn format_two_decimals() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(21_500), "215.00");
        assert_eq!(format_cents(-1_050), "-10.50");
    }
}
