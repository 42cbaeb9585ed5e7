//! Order Total Calculator
//!
//! A quote is computed in one pass from a cart snapshot, a pricing snapshot
//! and at most one discount:
//!
//! ```text
//! line_total   = base_weight * quantity * retail_rate + making_charges * quantity
//! subtotal     = Σ line_total
//! discount     = subtotal * pct / 100 | fixed value, capped at subtotal
//! final_amount = max(0, subtotal - discount)
//! ```
//!
//! Line totals and the discount are rounded to paise; the subtotal is the sum
//! of rounded lines so the numbers a dealer sees always add up.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::services::pricing::PricingSnapshot;
use crate::domain::value_objects::{Grams, Money, Percentage, Quantity};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discount {
    Percentage(Percentage),
    Fixed(Money),
}

impl Discount {
    /// Discount amount for a subtotal. Never exceeds the subtotal.
    pub fn amount_for(&self, subtotal: Money) -> Money {
        let raw = match self {
            Self::Percentage(pct) => Money::new(pct.of(subtotal.amount())),
            Self::Fixed(value) => *value,
        };
        raw.min(subtotal)
    }
}

/// One cart line as seen by the calculator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineInput {
    pub product_id: Uuid,
    pub size: String,
    pub base_weight: Grams,
    pub making_charges: Decimal,
    pub quantity: Quantity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteLine {
    pub product_id: Uuid,
    pub size: String,
    pub quantity: Quantity,
    pub unit_weight: Grams,
    pub total_weight: Grams,
    pub rate: Decimal,
    pub making_charges: Money,
    pub line_total: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderQuote {
    pub lines: Vec<QuoteLine>,
    pub retail_rate: Decimal,
    pub total_quantity: u32,
    pub gross_weight: Grams,
    pub making_charges: Money,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub final_amount: Money,
}

impl OrderQuote {
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
}

pub fn line_total(base_weight: Grams, quantity: Quantity, making_charges: Decimal, retail_rate: Decimal) -> Money {
    let qty = Decimal::from(quantity.value());
    Money::new(base_weight.value() * qty * retail_rate + making_charges * qty)
}

pub fn final_amount(subtotal: Money, discount: Money) -> Money { subtotal.saturating_sub(discount) }

pub fn quote(lines: &[LineInput], pricing: &PricingSnapshot, discount: Option<&Discount>) -> OrderQuote {
    let rate = pricing.retail_rate();
    let priced: Vec<QuoteLine> = lines.iter().map(|l| QuoteLine {
        product_id: l.product_id,
        size: l.size.clone(),
        quantity: l.quantity,
        unit_weight: l.base_weight,
        total_weight: l.base_weight.times(l.quantity),
        rate,
        making_charges: Money::new(l.making_charges * Decimal::from(l.quantity.value())),
        line_total: line_total(l.base_weight, l.quantity, l.making_charges, rate),
    }).collect();

    let subtotal: Money = priced.iter().map(|l| l.line_total).sum();
    let discount_amount = discount.map(|d| d.amount_for(subtotal)).unwrap_or(Money::ZERO);
    OrderQuote {
        retail_rate: rate,
        total_quantity: priced.iter().map(|l| l.quantity.value()).sum(),
        gross_weight: priced.iter().map(|l| l.total_weight).sum(),
        making_charges: priced.iter().map(|l| l.making_charges).sum(),
        subtotal,
        discount_amount,
        final_amount: final_amount(subtotal, discount_amount),
        lines: priced,
    }
}
