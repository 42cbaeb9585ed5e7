//! Rate Engine
//!
//! Derives the dealer-facing per-gram rates from the admin-entered MCX silver
//! rate and premium:
//!
//! - net (wholesale) rate = `mcx_rate * (1 + premium / 100)`
//! - retail rate = `net_rate * 1.01`
//!
//! Rates keep full decimal precision. Only money amounts are rounded.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::Percentage;

/// Largest MCX rate the pricing log stores (`NUMERIC(14, 4)`), exclusive.
pub const MAX_MCX_RATE: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);
/// Largest premium percentage the pricing log stores (`NUMERIC(8, 4)`), exclusive.
pub const MAX_PREMIUM: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);
/// Decimal places kept for published pricing inputs.
pub const PRICING_SCALE: u32 = 4;

/// Fixed 1% markup from net to retail rate.
pub const RETAIL_MARKUP: Decimal = Decimal::from_parts(101, 0, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("MCX rate must not be negative")]
    NegativeRate,
    #[error("Premium percentage must not be negative")]
    NegativePremium,
    #[error("MCX rate is required")]
    MissingRate,
    #[error("{0} is out of range")]
    OutOfRange(&'static str),
}

pub fn compute_net_rate(mcx_rate: Decimal, premium: Percentage) -> Decimal {
    mcx_rate * premium.as_multiplier()
}

pub fn compute_retail_rate(net_rate: Decimal) -> Decimal {
    net_rate * RETAIL_MARKUP
}

/// A validated pricing configuration: the inputs of the rate formulas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PricingSnapshot {
    mcx_rate: Decimal,
    premium: Percentage,
}

impl PricingSnapshot {
    pub fn new(mcx_rate: Decimal, premium_percentage: Decimal) -> Result<Self, PricingError> {
        if mcx_rate.is_sign_negative() && !mcx_rate.is_zero() { return Err(PricingError::NegativeRate); }
        let premium = Percentage::new(premium_percentage).map_err(|_| PricingError::NegativePremium)?;
        Ok(Self { mcx_rate, premium })
    }

    /// Validates admin input for the pricing log: a positive MCX rate and a
    /// premium, both rounded to four decimal places and within the stored range.
    pub fn publishable(mcx_rate: Decimal, premium_percentage: Decimal) -> Result<Self, PricingError> {
        let mcx_rate = mcx_rate.round_dp(PRICING_SCALE);
        let premium_percentage = premium_percentage.round_dp(PRICING_SCALE);
        if mcx_rate.is_zero() { return Err(PricingError::MissingRate); }
        if mcx_rate >= MAX_MCX_RATE { return Err(PricingError::OutOfRange("MCX rate")); }
        if premium_percentage >= MAX_PREMIUM { return Err(PricingError::OutOfRange("Premium percentage")); }
        Self::new(mcx_rate, premium_percentage)
    }

    /// Used when no pricing has been published yet.
    pub fn zero() -> Self { Self::default() }

    pub fn mcx_rate(&self) -> Decimal { self.mcx_rate }
    pub fn premium_percentage(&self) -> Decimal { self.premium.value() }
    pub fn net_rate(&self) -> Decimal { compute_net_rate(self.mcx_rate, self.premium) }
    pub fn retail_rate(&self) -> Decimal { compute_retail_rate(self.net_rate()) }

    pub fn rates(&self) -> Rates {
        Rates { mcx_rate: self.mcx_rate, premium_percentage: self.premium.value(), net_rate: self.net_rate(), retail_rate: self.retail_rate() }
    }
}

/// Wire form of a pricing snapshot and its derived rates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rates {
    pub mcx_rate: Decimal,
    pub premium_percentage: Decimal,
    pub net_rate: Decimal,
    pub retail_rate: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(mcx: Decimal, premium: Decimal) -> PricingSnapshot { PricingSnapshot::new(mcx, premium).unwrap() }

    #[test]
    fn test_reference_rates() {
        let p = snapshot(Decimal::new(7550, 2), Decimal::new(25, 1));
        assert_eq!(p.net_rate(), Decimal::new(773875, 4));
        assert_eq!(p.retail_rate(), Decimal::new(78161375, 6));
        assert_eq!(p.retail_rate().round_dp(3), Decimal::new(78161, 3));
    }

    #[test]
    fn test_zero_pricing() {
        let r = PricingSnapshot::zero().rates();
        assert_eq!(r.net_rate, Decimal::ZERO);
        assert_eq!(r.retail_rate, Decimal::ZERO);
    }

    #[test]
    fn test_rejects_negative_inputs() {
        assert_eq!(PricingSnapshot::new(Decimal::new(-1, 0), Decimal::ZERO), Err(PricingError::NegativeRate));
        assert_eq!(PricingSnapshot::new(Decimal::ONE, Decimal::new(-5, 1)), Err(PricingError::NegativePremium));
    }

    #[test]
    fn test_publishable_bounds() {
        let p = PricingSnapshot::publishable(Decimal::new(755_012_345, 7), Decimal::new(25, 1)).unwrap();
        assert_eq!(p.mcx_rate(), Decimal::new(755_012, 4));
        assert_eq!(PricingSnapshot::publishable(Decimal::ZERO, Decimal::ONE), Err(PricingError::MissingRate));
        assert_eq!(PricingSnapshot::publishable(Decimal::new(1, 5), Decimal::ONE), Err(PricingError::MissingRate));
        assert_eq!(MAX_MCX_RATE, Decimal::new(10_000_000_000, 0));
        assert_eq!(PricingSnapshot::publishable(MAX_MCX_RATE, Decimal::ONE), Err(PricingError::OutOfRange("MCX rate")));
        assert!(PricingSnapshot::publishable(MAX_MCX_RATE - Decimal::new(1, 4), Decimal::new(99_999_999, 4)).is_ok());
        assert_eq!(PricingSnapshot::publishable(Decimal::ONE, MAX_PREMIUM), Err(PricingError::OutOfRange("Premium percentage")));
        assert_eq!(PricingSnapshot::publishable(Decimal::new(-5, 0), Decimal::ONE), Err(PricingError::NegativeRate));
    }

    #[test]
    fn test_retail_rate_monotonic() {
        let premium = Decimal::new(25, 1);
        let mut last = Decimal::ZERO;
        for mcx in [0i64, 1, 50, 7550, 9000, 120_000] {
            let r = snapshot(Decimal::new(mcx, 2), premium).retail_rate();
            assert!(r >= last);
            last = r;
        }
        let mcx = Decimal::new(7550, 2);
        let mut last = Decimal::ZERO;
        for prem in [0i64, 1, 25, 100, 1000] {
            let r = snapshot(mcx, Decimal::new(prem, 1)).retail_rate();
            assert!(r >= last);
            last = r;
        }
    }
}
