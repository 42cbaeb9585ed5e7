//! Coupon Aggregate
//!
//! A coupon is applied read-only when an order total is computed. At most one
//! coupon applies per order.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use crate::domain::aggregates::order::PaymentMode;
use crate::domain::services::Discount;
use crate::domain::value_objects::{CouponCode, Money, Percentage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType { Percentage, Fixed }

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Percentage => "percentage", Self::Fixed => "fixed" }
    }
}

impl FromStr for DiscountType {
    type Err = CouponError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(CouponError::UnknownDiscountType(other.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Coupon {
    id: Uuid,
    code: CouponCode,
    discount: Discount,
    min_quantity: u32,
    payment_modes: Vec<PaymentMode>,
    expiry_date: NaiveDate,
    active: bool,
}

impl Coupon {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid, code: CouponCode, discount_type: DiscountType, discount_value: Decimal, min_quantity: i32,
        payment_modes: Vec<PaymentMode>, expiry_date: NaiveDate, active: bool,
    ) -> Result<Self, CouponError> {
        if discount_value <= Decimal::ZERO { return Err(CouponError::NonPositiveValue); }
        let discount = match discount_type {
            DiscountType::Percentage => {
                if discount_value > Decimal::ONE_HUNDRED { return Err(CouponError::PercentageOver100); }
                Discount::Percentage(Percentage::new(discount_value).map_err(|_| CouponError::NonPositiveValue)?)
            }
            DiscountType::Fixed => Discount::Fixed(Money::new(discount_value)),
        };
        let min_quantity = u32::try_from(min_quantity).map_err(|_| CouponError::NegativeMinimum)?;
        Ok(Self { id, code, discount, min_quantity, payment_modes, expiry_date, active })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn code(&self) -> &CouponCode { &self.code }
    pub fn discount(&self) -> &Discount { &self.discount }
    pub fn is_active(&self) -> bool { self.active }
    pub fn is_expired(&self, today: NaiveDate) -> bool { today > self.expiry_date }

    pub fn allows(&self, mode: PaymentMode) -> bool { self.payment_modes.is_empty() || self.payment_modes.contains(&mode) }

    /// Validates the coupon against an order and returns the discount to apply.
    pub fn apply(&self, today: NaiveDate, total_quantity: u32, mode: PaymentMode) -> Result<Discount, CouponError> {
        if !self.active { return Err(CouponError::Inactive); }
        if self.is_expired(today) { return Err(CouponError::Expired(self.expiry_date)); }
        if total_quantity < self.min_quantity { return Err(CouponError::BelowMinimumQuantity(self.min_quantity)); }
        if !self.allows(mode) { return Err(CouponError::PaymentModeNotAllowed(mode)); }
        Ok(self.discount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("Invalid coupon code")]
    NotFound,
    #[error("Coupon is not active")]
    Inactive,
    #[error("Coupon expired on {0}")]
    Expired(NaiveDate),
    #[error("Coupon requires at least {0} items")]
    BelowMinimumQuantity(u32),
    #[error("Coupon is not valid for {0} payments")]
    PaymentModeNotAllowed(PaymentMode),
    #[error("Discount value must be greater than zero")]
    NonPositiveValue,
    #[error("Percentage discount cannot exceed 100")]
    PercentageOver100,
    #[error("Minimum quantity cannot be negative")]
    NegativeMinimum,
    #[error("Unknown discount type: {0}")]
    UnknownDiscountType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

    fn save10() -> Coupon {
        Coupon::new(Uuid::nil(), CouponCode::new("save10").unwrap(), DiscountType::Percentage, Decimal::TEN, 2,
            vec![PaymentMode::Online, PaymentMode::Credit], date(2026, 12, 31), true).unwrap()
    }

    #[test]
    fn test_apply_valid_coupon() {
        let d = save10().apply(date(2026, 12, 31), 2, PaymentMode::Online).unwrap();
        assert_eq!(d, Discount::Percentage(Percentage::new(Decimal::TEN).unwrap()));
    }

    #[test]
    fn test_apply_rejections() {
        let c = save10();
        assert_eq!(c.apply(date(2027, 1, 1), 2, PaymentMode::Online), Err(CouponError::Expired(date(2026, 12, 31))));
        assert_eq!(c.apply(date(2026, 6, 1), 1, PaymentMode::Online), Err(CouponError::BelowMinimumQuantity(2)));
        assert_eq!(c.apply(date(2026, 6, 1), 5, PaymentMode::Rtgs), Err(CouponError::PaymentModeNotAllowed(PaymentMode::Rtgs)));
        let inactive = Coupon::new(Uuid::nil(), CouponCode::new("OFF").unwrap(), DiscountType::Fixed, Decimal::new(500, 0), 0, vec![], date(2026, 12, 31), false).unwrap();
        assert_eq!(inactive.apply(date(2026, 6, 1), 5, PaymentMode::Rtgs), Err(CouponError::Inactive));
    }

    #[test]
    fn test_empty_payment_modes_allow_all() {
        let c = Coupon::new(Uuid::nil(), CouponCode::new("FLAT500").unwrap(), DiscountType::Fixed, Decimal::new(500, 0), 0, vec![], date(2026, 12, 31), true).unwrap();
        assert!(c.allows(PaymentMode::SilverSettlement));
        assert_eq!(c.apply(date(2026, 6, 1), 1, PaymentMode::SilverSettlement).unwrap(), Discount::Fixed(Money::new(Decimal::new(500, 0))));
    }

    #[test]
    fn test_invalid_definitions() {
        let make = |t, v| Coupon::new(Uuid::nil(), CouponCode::new("X").unwrap(), t, v, 0, vec![], date(2026, 1, 1), true);
        assert_eq!(make(DiscountType::Percentage, Decimal::new(101, 0)).unwrap_err(), CouponError::PercentageOver100);
        assert_eq!(make(DiscountType::Fixed, Decimal::ZERO).unwrap_err(), CouponError::NonPositiveValue);
        assert_eq!("bogus".parse::<DiscountType>().unwrap_err(), CouponError::UnknownDiscountType("bogus".into()));
    }
}
