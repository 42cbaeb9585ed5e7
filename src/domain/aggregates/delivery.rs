//! Delivery tracking for approved orders

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::aggregates::order::{DeliveryMethod, Order, OrderError, OrderStatus};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus { #[default] OrderConfirmed, PreparingForDispatch, OutForDelivery, InTransit, Delivered, Returned }

text_enum!(DeliveryStatus {
    OrderConfirmed => "order_confirmed", PreparingForDispatch => "preparing_for_dispatch", OutForDelivery => "out_for_delivery",
    InTransit => "in_transit", Delivered => "delivered", Returned => "returned",
});

impl DeliveryStatus {
    /// No further updates are accepted once a delivery reaches a final status.
    pub fn is_final(&self) -> bool { matches!(self, Self::Delivered | Self::Returned) }
}

#[derive(Clone, Debug)]
pub struct Delivery {
    id: Uuid,
    order_id: Uuid,
    status: DeliveryStatus,
    method: DeliveryMethod,
}

impl Delivery {
    /// Opens tracking for an order; only approved orders ship.
    pub fn start(order: &Order, method: DeliveryMethod) -> Result<Self, DeliveryError> {
        if order.status() != OrderStatus::Approved { return Err(DeliveryError::OrderNotApproved(order.status())); }
        Ok(Self { id: Uuid::now_v7(), order_id: order.id(), status: DeliveryStatus::OrderConfirmed, method })
    }

    pub fn restore(id: Uuid, order_id: Uuid, status: DeliveryStatus, method: DeliveryMethod) -> Self { Self { id, order_id, status, method } }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_id(&self) -> Uuid { self.order_id }
    pub fn status(&self) -> DeliveryStatus { self.status }
    pub fn method(&self) -> DeliveryMethod { self.method }

    pub fn update(&mut self, status: DeliveryStatus) -> Result<(), DeliveryError> {
        if self.status.is_final() { return Err(DeliveryError::Closed(self.status)); }
        self.status = status;
        Ok(())
    }

    /// Completes `order` once its delivery has arrived. Returns whether the
    /// order changed.
    pub fn settle(&self, order: &mut Order) -> Result<bool, OrderError> {
        if self.status != DeliveryStatus::Delivered || order.status() != OrderStatus::Approved { return Ok(false); }
        order.complete()?;
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Only approved orders can be dispatched, this order is {0}")]
    OrderNotApproved(OrderStatus),
    #[error("Delivery is already {0}")]
    Closed(DeliveryStatus),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::PaymentMode;
    use crate::domain::value_objects::Money;

    fn order(status: OrderStatus) -> Order { Order::restore(Uuid::from_u128(3), Uuid::nil(), status, PaymentMode::Online, Money::ZERO) }

    #[test]
    fn test_start_requires_approved_order() {
        let d = Delivery::start(&order(OrderStatus::Approved), DeliveryMethod::DealerDelivery).unwrap();
        assert_eq!((d.order_id(), d.status(), d.method()), (Uuid::from_u128(3), DeliveryStatus::OrderConfirmed, DeliveryMethod::DealerDelivery));
        assert_eq!(Delivery::start(&order(OrderStatus::Placed), DeliveryMethod::InPerson).unwrap_err(), DeliveryError::OrderNotApproved(OrderStatus::Placed));
        assert!(Delivery::start(&order(OrderStatus::Rejected), DeliveryMethod::InPerson).is_err());
    }

    #[test]
    fn test_final_statuses_close_delivery() {
        let mut approved = order(OrderStatus::Approved);
        let mut d = Delivery::start(&approved, DeliveryMethod::InPerson).unwrap();
        d.update(DeliveryStatus::InTransit).unwrap();
        assert_eq!(d.settle(&mut approved), Ok(false));
        d.update(DeliveryStatus::Delivered).unwrap();
        assert_eq!(d.settle(&mut approved), Ok(true));
        assert_eq!(approved.status(), OrderStatus::Completed);
        // Already completed by hand: nothing more to do.
        assert_eq!(d.settle(&mut approved), Ok(false));
        assert_eq!(d.update(DeliveryStatus::Returned), Err(DeliveryError::Closed(DeliveryStatus::Delivered)));
    }

    #[test]
    fn test_returned_delivery_leaves_order_open() {
        let mut approved = order(OrderStatus::Approved);
        let mut d = Delivery::restore(Uuid::nil(), approved.id(), DeliveryStatus::OutForDelivery, DeliveryMethod::DealerDelivery);
        d.update(DeliveryStatus::Returned).unwrap();
        assert_eq!(d.settle(&mut approved), Ok(false));
        assert_eq!(approved.status(), OrderStatus::Approved);
    }

    #[test]
    fn test_status_text() {
        assert_eq!("out_for_delivery".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::OutForDelivery);
        assert_eq!(DeliveryStatus::PreparingForDispatch.to_string(), "preparing_for_dispatch");
        assert!("lost".parse::<DeliveryStatus>().is_err());
    }
}
