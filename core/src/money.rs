//! Fixed-point money handling.
//!
//! RULE: every amount is passed through `validate_money` (or one of its
//! wrappers) before it is compared against a threshold or persisted.
//! Values are rounded half away from zero to 2 places; anything that
//! cannot be represented is rejected, never truncated.

use crate::{
    error::{SimError, SimResult},
    types::Money,
};
use rust_decimal::{
    prelude::{FromPrimitive, ToPrimitive},
    Decimal, RoundingStrategy,
};

pub const MONEY_SCALE: u32 = 2;

/// Largest magnitude accepted: 999,999,999,999,999.99.
pub fn max_money() -> Money {
    Decimal::new(99_999_999_999_999_999, MONEY_SCALE)
}

pub fn round_money(value: Decimal) -> Money {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to 2 places and check the bound.
pub fn validate_money(field: &'static str, value: Decimal) -> SimResult<Money> {
    let rounded = round_money(value);
    if rounded.abs() > max_money() {
        return Err(SimError::validation(
            field,
            format!("{rounded} exceeds the maximum of {}", max_money()),
        ));
    }
    Ok(rounded)
}

/// As `validate_money`, additionally rejecting negative amounts.
pub fn validate_amount(field: &'static str, value: Decimal) -> SimResult<Money> {
    let money = validate_money(field, value)?;
    if money.is_sign_negative() && !money.is_zero() {
        return Err(SimError::validation(field, format!("{money} is negative")));
    }
    Ok(money)
}

/// Convert a sampled float into a non-negative amount.
pub fn money_from_f64(field: &'static str, value: f64) -> SimResult<Money> {
    let money = signed_money_from_f64(field, value)?;
    validate_amount(field, money)
}

/// Convert a sampled float that may legitimately be negative (a balance).
pub fn signed_money_from_f64(field: &'static str, value: f64) -> SimResult<Money> {
    if !value.is_finite() {
        return Err(SimError::validation(field, format!("{value} is not finite")));
    }
    let decimal = Decimal::from_f64(value)
        .ok_or_else(|| SimError::validation(field, format!("{value} is out of range")))?;
    validate_money(field, decimal)
}

/// Lossy view for probability arithmetic only. Never persisted.
pub fn to_f64(value: Money) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Round down to a whole multiple of 100 currency units.
pub fn floor_to_hundred(value: Money) -> Money {
    let hundred = Decimal::ONE_HUNDRED;
    round_money((value / hundred).floor() * hundred)
}

/// `a − b`, never below zero.
pub fn saturating_sub(a: Money, b: Money) -> Money {
    (a - b).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(validate_money("amount", dec!(10.005)).unwrap(), dec!(10.01));
        assert_eq!(validate_money("amount", dec!(-10.005)).unwrap(), dec!(-10.01));
        assert_eq!(validate_money("amount", dec!(10.004)).unwrap(), dec!(10.00));
    }

    #[test]
    fn rejects_values_beyond_the_bound() {
        let too_big = max_money() + dec!(1);
        assert!(matches!(
            validate_money("amount", too_big),
            Err(SimError::Validation { field: "amount", .. })
        ));
    }

    #[test]
    fn rejects_negative_and_non_finite_amounts() {
        assert!(validate_amount("principal", dec!(-0.01)).is_err());
        assert!(money_from_f64("principal", f64::NAN).is_err());
        assert!(money_from_f64("principal", f64::INFINITY).is_err());
        assert_eq!(validate_amount("principal", dec!(0)).unwrap(), dec!(0));
    }

    #[test]
    fn floors_to_whole_hundreds() {
        assert_eq!(floor_to_hundred(dec!(1299.99)), dec!(1200));
        assert_eq!(floor_to_hundred(dec!(100)), dec!(100));
        assert_eq!(floor_to_hundred(dec!(99.99)), dec!(0));
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        assert_eq!(saturating_sub(dec!(50), dec!(80)), dec!(0));
        assert_eq!(saturating_sub(dec!(80), dec!(50)), dec!(30));
    }
}
