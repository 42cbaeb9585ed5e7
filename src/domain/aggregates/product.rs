//! Product Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;
use crate::domain::services::PricingSnapshot;
use crate::domain::value_objects::{Grams, Money, Percentage, Quantity};

/// Editable attributes of a catalogue product, as submitted by the admin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ProductAttrs {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: String,
    pub description: Option<String>,
    pub base_weight: Decimal,
    #[serde(default = "full_purity")]
    pub purity_percent: Decimal,
    pub making_charges: Decimal,
    #[serde(default)]
    pub wastage_percent: Decimal,
    #[serde(default)]
    pub available_sizes: Vec<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock_quantity: i32,
}

fn full_purity() -> Decimal { Decimal::ONE_HUNDRED }

#[derive(Clone, Debug)]
pub struct Product {
    id: Uuid,
    name: String,
    base_weight: Grams,
    making_charges: Decimal,
    purity: Percentage,
    wastage: Percentage,
    sizes: Vec<String>,
    stock: u32,
    active: bool,
}

impl Product {
    pub fn new(id: Uuid, attrs: &ProductAttrs, active: bool) -> Result<Self, ProductError> {
        if attrs.name.trim().is_empty() { return Err(ProductError::MissingName); }
        let base_weight = Grams::new(attrs.base_weight).map_err(|_| ProductError::NegativeAmount("base_weight"))?;
        if attrs.making_charges.is_sign_negative() && !attrs.making_charges.is_zero() { return Err(ProductError::NegativeAmount("making_charges")); }
        let purity = Percentage::new(attrs.purity_percent).map_err(|_| ProductError::InvalidPurity)?;
        if purity.value() > Decimal::ONE_HUNDRED { return Err(ProductError::InvalidPurity); }
        let wastage = Percentage::new(attrs.wastage_percent).map_err(|_| ProductError::NegativeAmount("wastage_percent"))?;
        let stock = u32::try_from(attrs.stock_quantity).map_err(|_| ProductError::NegativeAmount("stock_quantity"))?;
        Ok(Self {
            id, name: attrs.name.trim().to_string(), base_weight, making_charges: attrs.making_charges,
            purity, wastage, sizes: attrs.available_sizes.clone(), stock, active,
        })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn base_weight(&self) -> Grams { self.base_weight }
    pub fn making_charges(&self) -> Decimal { self.making_charges }
    pub fn stock(&self) -> u32 { self.stock }
    pub fn is_in_stock(&self) -> bool { self.stock > 0 }

    /// Fine silver content of one piece.
    pub fn pure_weight(&self) -> Decimal { self.purity.of(self.base_weight.value()) }
    pub fn wastage_weight(&self) -> Decimal { self.wastage.of(self.base_weight.value()) }

    /// Catalogue price of a single piece at the current retail rate.
    pub fn unit_price(&self, pricing: &PricingSnapshot) -> Money {
        Money::new(self.base_weight.value() * pricing.retail_rate() + self.making_charges)
    }

    /// Checks that `qty` pieces of `size` can be ordered.
    pub fn check_orderable(&self, size: &str, qty: Quantity) -> Result<(), ProductError> {
        if !self.active { return Err(ProductError::Unavailable(self.name.clone())); }
        if !self.sizes.is_empty() && !self.sizes.iter().any(|s| s == size) {
            return Err(ProductError::UnknownSize { product: self.name.clone(), size: size.to_string() });
        }
        if qty.value() > self.stock { return Err(ProductError::InsufficientStock { product: self.name.clone(), available: self.stock }); }
        Ok(())
    }

    pub fn remove_stock(&mut self, qty: Quantity) -> Result<(), ProductError> {
        self.stock = self.stock.checked_sub(qty.value()).ok_or(ProductError::InsufficientStock { product: self.name.clone(), available: self.stock })?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("Missing name")]
    MissingName,
    #[error("{0} must not be negative")]
    NegativeAmount(&'static str),
    #[error("Purity must be between 0 and 100")]
    InvalidPurity,
    #[error("{0} is no longer available")]
    Unavailable(String),
    #[error("{product} is not available in size {size}")]
    UnknownSize { product: String, size: String },
    #[error("Only {available} of {product} in stock")]
    InsufficientStock { product: String, available: u32 },
}
