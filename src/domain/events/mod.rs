//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Order(OrderEvent),
    Dealer(DealerEvent),
    Pricing(PricingEvent),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, dealer_id: Uuid, final_amount: Decimal, payment_mode: String },
    Approved { order_id: Uuid },
    Rejected { order_id: Uuid, reason: Option<String> },
    Completed { order_id: Uuid },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DealerEvent {
    Approved { dealer_id: Uuid, credit_limit: Decimal },
    Rejected { dealer_id: Uuid, reason: Option<String> },
    CreditLimitChanged { dealer_id: Uuid, credit_limit: Decimal },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PricingEvent {
    Updated { mcx_rate: Decimal, premium_percentage: Decimal, retail_rate: Decimal },
}

impl DomainEvent {
    /// NATS subject suffix, e.g. `order.placed`.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "order.placed",
            Self::Order(OrderEvent::Approved { .. }) => "order.approved",
            Self::Order(OrderEvent::Rejected { .. }) => "order.rejected",
            Self::Order(OrderEvent::Completed { .. }) => "order.completed",
            Self::Dealer(DealerEvent::Approved { .. }) => "dealer.approved",
            Self::Dealer(DealerEvent::Rejected { .. }) => "dealer.rejected",
            Self::Dealer(DealerEvent::CreditLimitChanged { .. }) => "dealer.credit_limit_changed",
            Self::Pricing(PricingEvent::Updated { .. }) => "pricing.updated",
        }
    }
}
