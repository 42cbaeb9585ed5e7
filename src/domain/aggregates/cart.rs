//! Cart Aggregate

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;
use crate::domain::services::totals::{self, Discount, LineInput, OrderQuote};
use crate::domain::services::PricingSnapshot;
use crate::domain::value_objects::{Grams, Quantity, QuantityError};

/// A dealer's cart, assembled from stored cart rows joined with the catalogue.
#[derive(Clone, Debug, Default)]
pub struct Cart {
    dealer_id: Uuid,
    items: Vec<CartItem>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartItem {
    /// Stored line id.
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub size: String,
    pub quantity: Quantity,
    pub base_weight: Grams,
    pub making_charges: Decimal,
}

impl CartItem {
    fn same_line(&self, other: &CartItem) -> bool { self.product_id == other.product_id && self.size == other.size }

    fn to_line_input(&self) -> LineInput {
        LineInput { product_id: self.product_id, size: self.size.clone(), base_weight: self.base_weight, making_charges: self.making_charges, quantity: self.quantity }
    }
}

impl Cart {
    pub fn for_dealer(dealer_id: Uuid) -> Self { Self { dealer_id, items: vec![] } }

    pub fn dealer_id(&self) -> Uuid { self.dealer_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn total_quantity(&self) -> u32 { self.items.iter().map(|i| i.quantity.value()).sum() }

    /// Adds a line, merging it into an existing line for the same product and
    /// size. Returns the resulting line.
    pub fn add_item(&mut self, item: CartItem) -> Result<&CartItem, CartError> {
        let idx = match self.items.iter().position(|i| i.same_line(&item)) {
            Some(idx) => {
                let merged = self.items[idx].quantity.add(item.quantity)?;
                self.items[idx].quantity = merged;
                idx
            }
            None => { self.items.push(item); self.items.len() - 1 }
        };
        Ok(&self.items[idx])
    }

    pub fn update_quantity(&mut self, id: Uuid, quantity: Quantity) -> Result<&CartItem, CartError> {
        let item = self.items.iter_mut().find(|i| i.id == id).ok_or(CartError::ItemNotFound)?;
        item.quantity = quantity;
        Ok(item)
    }

    pub fn remove_item(&mut self, id: Uuid) -> Result<CartItem, CartError> {
        let idx = self.items.iter().position(|i| i.id == id).ok_or(CartError::ItemNotFound)?;
        Ok(self.items.remove(idx))
    }

    /// Empties the cart, returning the ids of the lines that were in it.
    pub fn clear(&mut self) -> Vec<Uuid> { self.items.drain(..).map(|i| i.id).collect() }

    pub fn quote(&self, pricing: &PricingSnapshot, discount: Option<&Discount>) -> OrderQuote {
        let lines: Vec<LineInput> = self.items.iter().map(CartItem::to_line_input).collect();
        totals::quote(&lines, pricing, discount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Cart item not found")]
    ItemNotFound,
    #[error("Cart is empty")]
    Empty,
    #[error(transparent)]
    Quantity(#[from] QuantityError),
}
