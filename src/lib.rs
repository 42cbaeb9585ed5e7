//! SP Chains dealer trading portal
//!
//! Backend for a B2B portal where approved dealers order silver jewellery
//! from an admin-managed catalogue.
//!
//! ## Features
//! - Live per-gram pricing from the MCX silver rate plus premium
//! - Server-side cart with quotes recomputed on every read
//! - Coupons, dealer credit lines and checkout in one transaction
//! - Admin review of dealers and orders, delivery tracking
//! - Product reviews, notifications and dashboard banners

pub mod config;
pub mod domain;
pub mod error;
pub mod routes;
pub mod state;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{ApprovalStatus, Coupon, Dealer, Delivery, Order, PaymentMode, Product, ProductAttrs};
use crate::domain::services::PricingSnapshot;
use crate::domain::value_objects::{CouponCode, Money};

pub use crate::error::{PortalError, Result};
pub use crate::state::AppState;

// =============================================================================
// Database rows
// =============================================================================

/// A stored row that no longer satisfies the domain rules is a server fault,
/// not a bad request.
fn corrupt(what: &str, id: Uuid, e: impl std::fmt::Display) -> PortalError {
    PortalError::Internal(format!("stored {what} {id} is invalid: {e}"))
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid, pub name: String, pub category: String, pub description: Option<String>,
    pub base_weight: Decimal, pub purity_percent: Decimal, pub making_charges: Decimal, pub wastage_percent: Decimal,
    pub available_sizes: Vec<String>, pub stock_quantity: i32, pub is_active: bool,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    pub fn attrs(&self) -> ProductAttrs {
        ProductAttrs {
            name: self.name.clone(), category: self.category.clone(), description: self.description.clone(),
            base_weight: self.base_weight, purity_percent: self.purity_percent, making_charges: self.making_charges,
            wastage_percent: self.wastage_percent, available_sizes: self.available_sizes.clone(), stock_quantity: self.stock_quantity,
        }
    }

    pub fn to_product(&self) -> Result<Product> {
        Product::new(self.id, &self.attrs(), self.is_active).map_err(|e| corrupt("product", self.id, e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PricingRow { pub id: Uuid, pub mcx_rate: Decimal, pub premium_percentage: Decimal, pub updated_by: Option<Uuid>, pub created_at: DateTime<Utc> }

impl PricingRow {
    pub fn snapshot(&self) -> Result<PricingSnapshot> {
        PricingSnapshot::new(self.mcx_rate, self.premium_percentage).map_err(|e| corrupt("pricing", self.id, e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CouponRow {
    pub id: Uuid, pub code: String, pub discount_type: String, pub discount_value: Decimal, pub min_quantity: i32,
    pub applicable_payment_modes: Vec<String>, pub expiry_date: NaiveDate, pub is_active: bool, pub created_at: DateTime<Utc>,
}

impl CouponRow {
    pub fn to_coupon(&self) -> Result<Coupon> {
        let parse = || -> Result<Coupon> {
            let modes = self.applicable_payment_modes.iter().map(|m| m.parse::<PaymentMode>()).collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(Coupon::new(self.id, CouponCode::new(&self.code)?, self.discount_type.parse()?, self.discount_value, self.min_quantity, modes, self.expiry_date, self.is_active)?)
        };
        parse().map_err(|e| corrupt("coupon", self.id, e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DealerProfileRow {
    pub id: Uuid, pub user_id: Uuid, pub mobile_number: Option<String>, pub business_name: String,
    pub gst_number: Option<String>, pub pan_number: Option<String>, pub approval_status: String,
    pub credit_limit: Decimal, pub credit_used: Decimal, pub approved_at: Option<DateTime<Utc>>,
    pub rejected_reason: Option<String>, pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

impl DealerProfileRow {
    pub fn to_dealer(&self) -> Result<Dealer> {
        let status = ApprovalStatus::parse(&self.approval_status)
            .ok_or_else(|| PortalError::Internal(format!("unknown approval status {:?} for dealer {}", self.approval_status, self.id)))?;
        Ok(Dealer::restore(self.id, status, self.credit_limit, self.credit_used))
    }
}

/// Cart row joined with its catalogue product.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartRow {
    pub id: Uuid, pub product_id: Uuid, pub name: String, pub size: String, pub quantity: i32,
    pub base_weight: Decimal, pub making_charges: Decimal, pub stock_quantity: i32, pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid, pub order_number: String, pub dealer_id: Uuid, pub status: String,
    pub gross_weight: Decimal, pub making_charges: Decimal, pub rate: Decimal, pub subtotal: Decimal,
    pub discount_amount: Decimal, pub final_amount: Decimal, pub payment_mode: String, pub delivery_method: String,
    pub coupon_code: Option<String>, pub approved_at: Option<DateTime<Utc>>, pub rejected_reason: Option<String>,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    /// Rehydrates the order for a lifecycle step.
    pub fn to_order(&self) -> Result<Order> {
        let parse = || -> Result<Order> {
            Ok(Order::restore(self.id, self.dealer_id, self.status.parse()?, self.payment_mode.parse()?, Money::new(self.final_amount)))
        };
        parse().map_err(|e| corrupt("order", self.id, e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid, pub order_id: Uuid, pub product_id: Uuid, pub product_name: Option<String>, pub size: String, pub quantity: i32,
    pub unit_weight: Decimal, pub total_weight: Decimal, pub rate: Decimal, pub making_charges: Decimal, pub line_total: Decimal,
}

/// Delivery tracking row joined with its order number.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryRow {
    pub id: Uuid, pub order_id: Uuid, pub order_number: Option<String>, pub status: String, pub delivery_method: String,
    pub notes: Option<String>, pub updated_by: Option<Uuid>, pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

impl DeliveryRow {
    pub fn to_delivery(&self) -> Result<Delivery> {
        let parse = || -> Result<Delivery> { Ok(Delivery::restore(self.id, self.order_id, self.status.parse()?, self.delivery_method.parse()?)) };
        parse().map_err(|e| corrupt("delivery", self.id, e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: Uuid, pub product_id: Uuid, pub dealer_id: Uuid, pub product_name: Option<String>, pub dealer_name: Option<String>,
    pub rating: i32, pub review_text: Option<String>, pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderRow,
    pub business_name: Option<String>,
    pub items: Vec<OrderItemRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: Uuid, pub title: String, pub message: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub target_audience: String, pub created_by: Option<Uuid>, pub published_at: Option<DateTime<Utc>>,
    pub is_active: bool, pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BannerRow {
    pub id: Uuid, pub title: String, pub description: Option<String>, pub image_url: String, pub link_url: Option<String>,
    pub display_order: i32, pub start_date: Option<NaiveDate>, pub end_date: Option<NaiveDate>, pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// `{ "message": ... }` body used for acknowledgements and errors alike.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message { pub message: String }

impl Message {
    pub fn new(message: impl Into<String>) -> Self { Self { message: message.into() } }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon_row() -> CouponRow {
        CouponRow {
            id: Uuid::nil(), code: "save10".into(), discount_type: "percentage".into(), discount_value: Decimal::TEN, min_quantity: 1,
            applicable_payment_modes: vec!["online".into(), "credit".into()], expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            is_active: true, created_at: Utc::now(),
        }
    }

    #[test]
    fn test_coupon_row_conversion() {
        let coupon = coupon_row().to_coupon().unwrap();
        assert_eq!(coupon.code().as_str(), "SAVE10");
        assert!(coupon.allows(PaymentMode::Credit));
        assert!(!coupon.allows(PaymentMode::Rtgs));
    }

    #[test]
    fn test_corrupt_coupon_row() {
        let mut row = coupon_row();
        row.applicable_payment_modes.push("barter".into());
        assert!(matches!(row.to_coupon(), Err(PortalError::Internal(_))));
        let mut row = coupon_row();
        row.discount_value = Decimal::NEGATIVE_ONE;
        assert!(matches!(row.to_coupon(), Err(PortalError::Internal(_))));
    }

    #[test]
    fn test_corrupt_product_and_pricing_rows() {
        let product = ProductRow {
            id: Uuid::nil(), name: "Chain".into(), category: "chains".into(), description: None, base_weight: Decimal::NEGATIVE_ONE,
            purity_percent: Decimal::ONE_HUNDRED, making_charges: Decimal::ZERO, wastage_percent: Decimal::ZERO, available_sizes: vec![],
            stock_quantity: 1, is_active: true, created_at: Utc::now(), updated_at: Utc::now(),
        };
        assert_eq!(product.to_product().unwrap_err().status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let pricing = PricingRow { id: Uuid::nil(), mcx_rate: Decimal::NEGATIVE_ONE, premium_percentage: Decimal::ZERO, updated_by: None, created_at: Utc::now() };
        assert!(matches!(pricing.snapshot(), Err(PortalError::Internal(_))));
    }

    #[test]
    fn test_delivery_row_conversion() {
        let mut row = DeliveryRow {
            id: Uuid::nil(), order_id: Uuid::from_u128(4), order_number: Some("ORD-20260101-000001".into()), status: "in_transit".into(),
            delivery_method: "dealer_delivery".into(), notes: None, updated_by: None, created_at: Utc::now(), updated_at: Utc::now(),
        };
        assert_eq!(row.to_delivery().unwrap().status(), crate::domain::aggregates::DeliveryStatus::InTransit);
        row.status = "lost".into();
        assert!(matches!(row.to_delivery(), Err(PortalError::Internal(_))));
    }

    #[test]
    fn test_notification_row_serializes_type() {
        let row = NotificationRow {
            id: Uuid::nil(), title: "GST".into(), message: "Rates revised".into(), kind: "gst_update".into(), target_audience: "all".into(),
            created_by: None, published_at: None, is_active: true, created_at: Utc::now(),
        };
        assert_eq!(serde_json::to_value(&row).unwrap()["type"], "gst_update");
    }
}
