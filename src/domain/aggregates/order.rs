//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::services::OrderQuote;
use crate::domain::value_objects::{CouponCode, Money};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Placed, Approved, Rejected, Completed }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode { #[default] Online, Credit, Rtgs, SilverSettlement }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod { #[default] InPerson, DealerDelivery }

text_enum!(OrderStatus { Placed => "placed", Approved => "approved", Rejected => "rejected", Completed => "completed" });
text_enum!(PaymentMode { Online => "online", Credit => "credit", Rtgs => "rtgs", SilverSettlement => "silver_settlement" });
text_enum!(DeliveryMethod { InPerson => "in_person", DealerDelivery => "dealer_delivery" });

#[derive(Clone, Debug)]
pub struct Order {
    id: Uuid,
    order_number: String,
    dealer_id: Uuid,
    status: OrderStatus,
    payment_mode: PaymentMode,
    delivery_method: DeliveryMethod,
    coupon_code: Option<CouponCode>,
    quote: Option<OrderQuote>,
    final_amount: Money,
    rejected_reason: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    events: Vec<DomainEvent>,
}

impl Order {
    /// Places a new order from a computed quote.
    pub fn place(
        dealer_id: Uuid, quote: OrderQuote, payment_mode: PaymentMode, delivery_method: DeliveryMethod, coupon_code: Option<CouponCode>,
    ) -> Result<Self, OrderError> {
        if quote.is_empty() { return Err(OrderError::NoItems); }
        let id = Uuid::now_v7();
        let final_amount = quote.final_amount;
        let mut order = Self {
            id, order_number: next_order_number(Utc::now()), dealer_id, status: OrderStatus::Placed, payment_mode, delivery_method,
            coupon_code, quote: Some(quote), final_amount, rejected_reason: None, approved_at: None, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: id, dealer_id, final_amount: final_amount.amount(), payment_mode: payment_mode.to_string() }));
        Ok(order)
    }

    /// Rehydrates a stored order for a status transition.
    pub fn restore(id: Uuid, dealer_id: Uuid, status: OrderStatus, payment_mode: PaymentMode, final_amount: Money) -> Self {
        Self {
            id, order_number: String::new(), dealer_id, status, payment_mode, delivery_method: DeliveryMethod::default(),
            coupon_code: None, quote: None, final_amount, rejected_reason: None, approved_at: None, events: vec![],
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn dealer_id(&self) -> Uuid { self.dealer_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_mode(&self) -> PaymentMode { self.payment_mode }
    pub fn delivery_method(&self) -> DeliveryMethod { self.delivery_method }
    pub fn coupon_code(&self) -> Option<&CouponCode> { self.coupon_code.as_ref() }
    pub fn quote(&self) -> Option<&OrderQuote> { self.quote.as_ref() }
    pub fn final_amount(&self) -> Money { self.final_amount }
    pub fn rejected_reason(&self) -> Option<&str> { self.rejected_reason.as_deref() }
    pub fn approved_at(&self) -> Option<DateTime<Utc>> { self.approved_at }

    pub fn approve(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Placed, OrderStatus::Approved)?;
        self.approved_at = Some(Utc::now());
        self.raise_event(DomainEvent::Order(OrderEvent::Approved { order_id: self.id }));
        Ok(())
    }

    pub fn reject(&mut self, reason: Option<String>) -> Result<(), OrderError> {
        self.transition(OrderStatus::Placed, OrderStatus::Rejected)?;
        self.rejected_reason = reason.clone();
        self.raise_event(DomainEvent::Order(OrderEvent::Rejected { order_id: self.id, reason }));
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Approved, OrderStatus::Completed)?;
        self.raise_event(DomainEvent::Order(OrderEvent::Completed { order_id: self.id }));
        Ok(())
    }

    /// Credit held by this order that should go back to the dealer, if any.
    pub fn releasable_credit(&self) -> Option<Money> {
        (self.status == OrderStatus::Rejected && self.payment_mode == PaymentMode::Credit).then_some(self.final_amount)
    }

    /// Whether the pieces taken from stock at checkout go back on the shelf.
    pub fn returns_stock(&self) -> bool { self.status == OrderStatus::Rejected }

    fn transition(&mut self, from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if self.status != from { return Err(OrderError::InvalidTransition { from: self.status, to }); }
        self.status = to;
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

/// `ORD-YYYYMMDD-XXXXXX`
pub fn next_order_number(now: DateTime<Utc>) -> String {
    format!("ORD-{}-{:06}", now.format("%Y%m%d"), rand::random::<u32>() % 1_000_000)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Cart is empty")]
    NoItems,
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
