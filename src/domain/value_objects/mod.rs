//! Value Objects for the trading portal

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use thiserror::Error;

/// Coupon code value object. Codes are matched case-insensitively, so they are
/// stored trimmed and upper-cased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouponCode(String);

impl CouponCode {
    pub fn new(value: impl Into<String>) -> Result<Self, CouponCodeError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(CouponCodeError::Empty); }
        if value.len() > 32 { return Err(CouponCodeError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') { return Err(CouponCodeError::InvalidCharacter); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponCodeError {
    #[error("Coupon code empty")]
    Empty,
    #[error("Coupon code too long")]
    TooLong,
    #[error("Coupon code may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// Rupee amount, always held at paise precision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Rounds half away from zero to two decimal places.
    pub fn new(amount: Decimal) -> Self { Self(amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)) }
    pub fn amount(&self) -> Decimal { self.0 }
    /// Subtraction floored at zero.
    pub fn saturating_sub(self, other: Money) -> Money { Money((self.0 - other.0).max(Decimal::ZERO)) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, Add::add) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "₹{:.2}", self.0) }
}

/// Weight in grams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grams(Decimal);

impl Grams {
    pub fn new(value: Decimal) -> Result<Self, NegativeValue> {
        if value.is_sign_negative() && !value.is_zero() { return Err(NegativeValue("weight")); }
        Ok(Self(value))
    }
    pub fn value(&self) -> Decimal { self.0 }
    pub fn times(&self, qty: Quantity) -> Grams { Grams(self.0 * Decimal::from(qty.value())) }
}

impl Add for Grams {
    type Output = Grams;
    fn add(self, rhs: Grams) -> Grams { Grams(self.0 + rhs.0) }
}

impl Sum for Grams {
    fn sum<I: Iterator<Item = Grams>>(iter: I) -> Grams { iter.fold(Grams::default(), Add::add) }
}

/// Non-negative percentage such as a premium over MCX or a coupon rate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(Decimal);

impl Percentage {
    pub fn new(value: Decimal) -> Result<Self, NegativeValue> {
        if value.is_sign_negative() && !value.is_zero() { return Err(NegativeValue("percentage")); }
        Ok(Self(value))
    }
    pub fn value(&self) -> Decimal { self.0 }
    /// `amount * pct / 100`
    pub fn of(&self, amount: Decimal) -> Decimal { amount * self.0 / Decimal::ONE_HUNDRED }
    /// `1 + pct / 100`
    pub fn as_multiplier(&self) -> Decimal { Decimal::ONE + self.0 / Decimal::ONE_HUNDRED }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} must not be negative")]
pub struct NegativeValue(pub &'static str);

/// Quantity of pieces on a cart or order line; between 1 and [`Quantity::MAX`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Largest quantity a stored `INTEGER` column can hold.
    pub const MAX: u32 = i32::MAX as u32;

    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 { return Err(QuantityError::Zero); }
        if value > Self::MAX { return Err(QuantityError::TooLarge); }
        Ok(Self(value))
    }

    /// Reads a stored quantity column.
    pub fn from_db(value: i32) -> Result<Self, QuantityError> {
        let value = u32::try_from(value).map_err(|_| QuantityError::Zero)?;
        Self::new(value)
    }

    pub fn value(&self) -> u32 { self.0 }
    /// Column form; always in range because of the bound enforced by `new`.
    pub fn db_value(&self) -> i32 { i32::try_from(self.0).unwrap_or(i32::MAX) }

    pub fn add(&self, other: Quantity) -> Result<Self, QuantityError> {
        Self::new(self.0.checked_add(other.0).ok_or(QuantityError::TooLarge)?)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> u32 { q.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("Quantity must be at least 1")]
    Zero,
    #[error("Quantity is too large")]
    TooLarge,
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_coupon_code() { let code = CouponCode::new(" save10 ").unwrap(); assert_eq!(code.as_str(), "SAVE10"); }
    #[test]
    fn test_coupon_code_rejects_blank_and_symbols() {
        assert_eq!(CouponCode::new("   "), Err(CouponCodeError::Empty));
        assert_eq!(CouponCode::new("SAVE 10"), Err(CouponCodeError::InvalidCharacter));
    }
    #[test]
    fn test_money_rounds_half_away_from_zero() {
        assert_eq!(Money::new(Decimal::new(342299, 3)).amount(), Decimal::new(34230, 2));
        assert_eq!(Money::new(Decimal::new(1005, 3)).amount(), Decimal::new(101, 2));
    }
    #[test]
    fn test_money_saturating_sub() {
        let a = Money::new(Decimal::new(100, 0));
        let b = Money::new(Decimal::new(150, 0));
        assert_eq!(a.saturating_sub(b), Money::ZERO);
        assert_eq!(b.saturating_sub(a).amount(), Decimal::new(50, 0));
    }
    #[test]
    fn test_negative_weight_rejected() {
        assert!(Grams::new(Decimal::new(-1, 0)).is_err());
        assert!(Grams::new(Decimal::ZERO).is_ok());
    }
    #[test]
    fn test_quantity() {
        assert_eq!(Quantity::new(0), Err(QuantityError::Zero));
        assert_eq!(Quantity::new(2).unwrap().add(Quantity::new(3).unwrap()).unwrap().value(), 5);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }
    #[test]
    fn test_quantity_fits_integer_column() {
        assert!(serde_json::from_str::<Quantity>("3000000000").is_err());
        let max = Quantity::new(Quantity::MAX).unwrap();
        assert_eq!(max.db_value(), i32::MAX);
        assert_eq!(max.add(Quantity::new(1).unwrap()), Err(QuantityError::TooLarge));
        assert_eq!(Quantity::from_db(-3), Err(QuantityError::Zero));
        assert_eq!(Quantity::from_db(4).unwrap().value(), 4);
    }
}
