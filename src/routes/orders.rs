//! Checkout, order history and admin order review.

use std::collections::HashMap;

use axum::{extract::{Path, State}, http::StatusCode, Json};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartError, Coupon, Dealer, DeliveryMethod, Order, OrderError, PaymentMode, Product, ProductError};
use crate::domain::services::PricingSnapshot;
use crate::domain::value_objects::Money;
use crate::routes::auth::{AdminUser, DealerUser};
use crate::routes::cart::{cart_coupon, load_cart, price};
use crate::routes::dealers::{dealer_for_update, save_credit_used};
use crate::routes::pricing::current_pricing;
use crate::{AppState, OrderItemRow, OrderRow, OrderWithItems, PortalError, ProductRow, Result};

/// Largest difference between the client's displayed total and the server
/// quote that is still treated as the same price.
const PRICE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub delivery_method: DeliveryMethod,
    pub coupon_code: Option<String>,
    /// Total the dealer was shown. Only compared against the server quote.
    pub final_amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse { pub message: String, pub order: OrderWithItems }

fn ensure_price_unchanged(shown: Option<Decimal>, quoted: Money) -> Result<()> {
    match shown {
        Some(shown) if (shown - quoted.amount()).abs() > PRICE_TOLERANCE => {
            Err(PortalError::Conflict(format!("Prices have changed, the order total is now {quoted}")))
        }
        _ => Ok(()),
    }
}

/// Runs the checkout rules over a locked snapshot of the dealer, cart and
/// ordered products.
///
/// On success the dealer's credit and the products' stock already reflect the
/// new order; the caller persists them.
pub(crate) fn place_order(
    dealer: &mut Dealer, cart: &Cart, pricing: &PricingSnapshot, coupon: Option<&Coupon>, products: &mut HashMap<Uuid, Product>,
    request: &CheckoutRequest, today: NaiveDate,
) -> Result<Order> {
    dealer.ensure_can_order()?;
    if cart.is_empty() { return Err(CartError::Empty.into()); }
    let (quote, coupon_code) = price(cart, pricing, coupon, today, request.payment_mode)?;
    ensure_price_unchanged(request.final_amount, quote.final_amount)?;

    for item in cart.items() {
        let product = products.get_mut(&item.product_id).ok_or_else(|| ProductError::Unavailable(item.name.clone()))?;
        product.check_orderable(&item.size, item.quantity)?;
        product.remove_stock(item.quantity)?;
    }
    if request.payment_mode == PaymentMode::Credit {
        dealer.reserve_credit(quote.final_amount)?;
    }
    Ok(Order::place(cart.dealer_id(), quote, request.payment_mode, request.delivery_method, coupon_code)?)
}

/// `POST /api/orders/checkout`
///
/// Re-prices the stored cart, validates coupon, stock and credit, then writes
/// the order, decrements stock, charges credit and clears the cart in one
/// transaction. The dealer row, the cart lines and the ordered product rows
/// are locked for the duration.
pub async fn checkout(State(s): State<AppState>, DealerUser(dealer_id): DealerUser, Json(r): Json<CheckoutRequest>) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    let mut tx = s.db.begin().await?;

    let mut dealer = dealer_for_update(&mut tx, dealer_id).await?.to_dealer()?;
    dealer.ensure_can_order()?;
    let (_, mut cart) = load_cart(&mut tx, dealer_id, true).await?;
    let pricing = current_pricing(&mut *tx).await?;
    let coupon = cart_coupon(&mut tx, &cart, r.coupon_code.as_deref()).await?;

    let ids: Vec<Uuid> = cart.items().iter().map(|i| i.product_id).collect();
    let locked = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE").bind(&ids).fetch_all(&mut *tx).await?;
    let mut products = locked.iter().map(|row| row.to_product().map(|p| (row.id, p))).collect::<Result<HashMap<Uuid, Product>>>()?;

    let mut order = place_order(&mut dealer, &cart, &pricing, coupon.as_ref(), &mut products, &r, Utc::now().date_naive())?;

    if order.payment_mode() == PaymentMode::Credit { save_credit_used(&mut tx, &dealer).await?; }
    let row = insert_order(&mut tx, &order).await?;
    let mut items = insert_items(&mut tx, &order).await?;
    for item in &mut items { item.product_name = products.get(&item.product_id).map(|p| p.name().to_string()); }
    for product in products.values() {
        let stock = i32::try_from(product.stock()).map_err(|_| PortalError::Internal(format!("stock of product {} out of range", product.id())))?;
        sqlx::query("UPDATE products SET stock_quantity = $2, updated_at = NOW() WHERE id = $1").bind(product.id()).bind(stock).execute(&mut *tx).await?;
    }
    // Only the lines that were priced; anything added meanwhile stays in the cart.
    let line_ids = cart.clear();
    sqlx::query("DELETE FROM cart_items WHERE id = ANY($1)").bind(&line_ids).execute(&mut *tx).await?;
    tx.commit().await?;

    tracing::info!(order_id = %order.id(), order_number = %order.order_number(), %dealer_id, final_amount = %order.final_amount(), payment_mode = %order.payment_mode(), "Order placed");
    s.publish(order.take_events()).await;
    Ok((StatusCode::CREATED, Json(CheckoutResponse { message: "Order placed successfully".into(), order: OrderWithItems { order: row, business_name: None, items } })))
}

async fn insert_order(conn: &mut PgConnection, order: &Order) -> Result<OrderRow> {
    let quote = order.quote().ok_or(OrderError::NoItems)?;
    Ok(sqlx::query_as::<_, OrderRow>("INSERT INTO orders (id, order_number, dealer_id, status, gross_weight, making_charges, rate, subtotal, discount_amount, final_amount, payment_mode, delivery_method, coupon_code, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW(), NOW()) RETURNING *")
        .bind(order.id()).bind(order.order_number()).bind(order.dealer_id()).bind(order.status().as_str())
        .bind(quote.gross_weight.value()).bind(quote.making_charges.amount()).bind(quote.retail_rate)
        .bind(quote.subtotal.amount()).bind(quote.discount_amount.amount()).bind(quote.final_amount.amount())
        .bind(order.payment_mode().as_str()).bind(order.delivery_method().as_str()).bind(order.coupon_code().map(|c| c.as_str()))
        .fetch_one(&mut *conn).await?)
}

async fn insert_items(conn: &mut PgConnection, order: &Order) -> Result<Vec<OrderItemRow>> {
    let quote = order.quote().ok_or(OrderError::NoItems)?;
    let mut rows = Vec::with_capacity(quote.lines.len());
    for line in &quote.lines {
        let row = sqlx::query_as::<_, OrderItemRow>("INSERT INTO order_items (id, order_id, product_id, size, quantity, unit_weight, total_weight, rate, making_charges, line_total, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()) RETURNING *, NULL::text AS product_name")
            .bind(Uuid::now_v7()).bind(order.id()).bind(line.product_id).bind(&line.size).bind(line.quantity.db_value())
            .bind(line.unit_weight.value()).bind(line.total_weight.value()).bind(line.rate).bind(line.making_charges.amount()).bind(line.line_total.amount())
            .fetch_one(&mut *conn).await?;
        rows.push(row);
    }
    Ok(rows)
}

#[derive(Debug, sqlx::FromRow)]
struct OrderListRow {
    #[sqlx(flatten)]
    order: OrderRow,
    business_name: Option<String>,
}

async fn load_orders(s: &AppState, dealer_id: Option<Uuid>) -> Result<Vec<OrderWithItems>> {
    let orders = sqlx::query_as::<_, OrderListRow>("SELECT o.*, dp.business_name FROM orders o LEFT JOIN dealer_profiles dp ON dp.user_id = o.dealer_id WHERE ($1::uuid IS NULL OR o.dealer_id = $1) ORDER BY o.created_at DESC")
        .bind(dealer_id).fetch_all(&s.db).await?;
    if orders.is_empty() { return Ok(vec![]); }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.order.id).collect();
    let items = sqlx::query_as::<_, OrderItemRow>("SELECT oi.*, p.name AS product_name FROM order_items oi LEFT JOIN products p ON p.id = oi.product_id WHERE oi.order_id = ANY($1) ORDER BY oi.created_at")
        .bind(&ids).fetch_all(&s.db).await?;
    let mut by_order: HashMap<Uuid, Vec<OrderItemRow>> = HashMap::new();
    for item in items { by_order.entry(item.order_id).or_default().push(item); }
    Ok(orders.into_iter().map(|o| {
        let items = by_order.remove(&o.order.id).unwrap_or_default();
        OrderWithItems { order: o.order, business_name: o.business_name, items }
    }).collect())
}

/// `GET /api/orders/my`
pub async fn my_orders(State(s): State<AppState>, DealerUser(dealer_id): DealerUser) -> Result<Json<Vec<OrderWithItems>>> {
    Ok(Json(load_orders(&s, Some(dealer_id)).await?))
}

/// `GET /api/admin/orders`
pub async fn list_orders(State(s): State<AppState>, AdminUser(_): AdminUser) -> Result<Json<Vec<OrderWithItems>>> {
    Ok(Json(load_orders(&s, None).await?))
}

/// Loads an order under lock, applies a lifecycle step and persists it. A
/// rejected order puts its pieces back in stock, and a rejected credit order
/// hands its amount back to the dealer's credit line.
async fn review(s: &AppState, id: Uuid, admin_id: Uuid, step: impl FnOnce(&mut Order) -> std::result::Result<(), OrderError>) -> Result<OrderRow> {
    let mut tx = s.db.begin().await?;
    let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 FOR UPDATE").bind(id)
        .fetch_optional(&mut *tx).await?.ok_or_else(|| PortalError::not_found("Order"))?;
    let mut order = row.to_order()?;
    step(&mut order)?;

    let updated = sqlx::query_as::<_, OrderRow>("UPDATE orders SET status = $2, approved_by = COALESCE($3, approved_by), approved_at = COALESCE($4, approved_at), rejected_reason = COALESCE($5, rejected_reason), updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(order.status().as_str()).bind(order.approved_at().map(|_| admin_id)).bind(order.approved_at()).bind(order.rejected_reason())
        .fetch_one(&mut *tx).await?;

    if order.returns_stock() {
        sqlx::query("UPDATE products p SET stock_quantity = p.stock_quantity + r.quantity, updated_at = NOW() FROM (SELECT product_id, SUM(quantity)::int AS quantity FROM order_items WHERE order_id = $1 GROUP BY product_id) r WHERE p.id = r.product_id")
            .bind(id).execute(&mut *tx).await?;
    }
    if let Some(amount) = order.releasable_credit() {
        let mut dealer = dealer_for_update(&mut tx, order.dealer_id()).await?.to_dealer()?;
        dealer.release_credit(amount);
        save_credit_used(&mut tx, &dealer).await?;
    }
    tx.commit().await?;

    tracing::info!(order_id = %id, status = %order.status(), %admin_id, "Order reviewed");
    s.publish(order.take_events()).await;
    Ok(updated)
}

/// `PATCH /api/admin/orders/:id/approve`
pub async fn approve_order(State(s): State<AppState>, AdminUser(admin_id): AdminUser, Path(id): Path<Uuid>) -> Result<Json<OrderRow>> {
    Ok(Json(review(&s, id, admin_id, Order::approve).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest { pub reason: Option<String> }

/// `PATCH /api/admin/orders/:id/reject`
pub async fn reject_order(State(s): State<AppState>, AdminUser(admin_id): AdminUser, Path(id): Path<Uuid>, body: Option<Json<RejectRequest>>) -> Result<Json<OrderRow>> {
    let reason = body.and_then(|Json(r)| r.reason).map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    Ok(Json(review(&s, id, admin_id, |o| o.reject(reason)).await?))
}

/// `PATCH /api/admin/orders/:id/complete`
pub async fn complete_order(State(s): State<AppState>, AdminUser(admin_id): AdminUser, Path(id): Path<Uuid>) -> Result<Json<OrderRow>> {
    Ok(Json(review(&s, id, admin_id, Order::complete).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{ApprovalStatus, CartItem, DiscountType, ProductAttrs};
    use crate::domain::value_objects::{CouponCode, Grams, Quantity};

    const PRODUCT: Uuid = Uuid::from_u128(7);

    fn pricing() -> PricingSnapshot { PricingSnapshot::new(Decimal::new(7550, 2), Decimal::new(25, 1)).unwrap() }
    fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2026, 6, 1).unwrap() }

    fn dealer(status: ApprovalStatus, credit_limit: i64) -> Dealer { Dealer::restore(Uuid::nil(), status, Decimal::new(credit_limit, 0), Decimal::ZERO) }

    /// One line: 15.5 g x 2 at making 250, which totals 2922.99 at the test rate.
    fn cart() -> Cart {
        let mut cart = Cart::for_dealer(Uuid::from_u128(1));
        cart.add_item(CartItem {
            id: Uuid::from_u128(100), product_id: PRODUCT, name: "Payal".into(), size: "10".into(), quantity: Quantity::new(2).unwrap(),
            base_weight: Grams::new(Decimal::new(155, 1)).unwrap(), making_charges: Decimal::new(250, 0),
        }).unwrap();
        cart
    }

    fn products(stock: i32) -> HashMap<Uuid, Product> {
        let attrs = ProductAttrs {
            name: "Payal".into(), category: "anklets".into(), description: None, base_weight: Decimal::new(155, 1), purity_percent: Decimal::ONE_HUNDRED,
            making_charges: Decimal::new(250, 0), wastage_percent: Decimal::ZERO, available_sizes: vec!["10".into()], stock_quantity: stock,
        };
        HashMap::from([(PRODUCT, Product::new(PRODUCT, &attrs, true).unwrap())])
    }

    fn request(payment_mode: PaymentMode, final_amount: Option<Decimal>) -> CheckoutRequest {
        CheckoutRequest { payment_mode, delivery_method: DeliveryMethod::DealerDelivery, coupon_code: None, final_amount }
    }

    fn status_of(result: Result<Order>) -> StatusCode { result.map(|_| ()).unwrap_err().status() }

    #[test]
    fn test_place_order_on_credit() {
        let mut dealer = dealer(ApprovalStatus::Approved, 5000);
        let mut stock = products(3);
        let order = place_order(&mut dealer, &cart(), &pricing(), None, &mut stock, &request(PaymentMode::Credit, Some(Decimal::new(292299, 2))), today()).unwrap();
        assert_eq!(order.final_amount().amount(), Decimal::new(292299, 2));
        assert_eq!(order.dealer_id(), Uuid::from_u128(1));
        assert_eq!(order.delivery_method(), DeliveryMethod::DealerDelivery);
        assert_eq!(dealer.credit_used().amount(), Decimal::new(292299, 2));
        assert_eq!(stock[&PRODUCT].stock(), 1);
    }

    #[test]
    fn test_unapproved_dealer_cannot_order() {
        let mut dealer = dealer(ApprovalStatus::Pending, 5000);
        let result = place_order(&mut dealer, &cart(), &pricing(), None, &mut products(3), &request(PaymentMode::Online, None), today());
        assert_eq!(status_of(result), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_credit_limit_exceeded() {
        let mut dealer = dealer(ApprovalStatus::Approved, 1000);
        let result = place_order(&mut dealer, &cart(), &pricing(), None, &mut products(3), &request(PaymentMode::Credit, None), today());
        assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
        assert_eq!(dealer.credit_used(), Money::ZERO);
        // The same order paid online does not touch credit.
        assert!(place_order(&mut dealer, &cart(), &pricing(), None, &mut products(3), &request(PaymentMode::Online, None), today()).is_ok());
    }

    #[test]
    fn test_coupon_below_minimum_quantity() {
        let coupon = Coupon::new(Uuid::nil(), CouponCode::new("BULK10").unwrap(), DiscountType::Fixed, Decimal::new(100, 0), 10, vec![], today(), true).unwrap();
        let mut dealer = dealer(ApprovalStatus::Approved, 0);
        let result = place_order(&mut dealer, &cart(), &pricing(), Some(&coupon), &mut products(3), &request(PaymentMode::Online, None), today());
        assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_stock_shortfall() {
        let mut dealer = dealer(ApprovalStatus::Approved, 0);
        let result = place_order(&mut dealer, &cart(), &pricing(), None, &mut products(1), &request(PaymentMode::Online, None), today());
        assert_eq!(status_of(result), StatusCode::CONFLICT);
        let result = place_order(&mut dealer, &cart(), &pricing(), None, &mut HashMap::new(), &request(PaymentMode::Online, None), today());
        assert_eq!(status_of(result), StatusCode::CONFLICT);
    }

    #[test]
    fn test_changed_total_is_rejected() {
        let mut dealer = dealer(ApprovalStatus::Approved, 0);
        let mut stock = products(3);
        let result = place_order(&mut dealer, &cart(), &pricing(), None, &mut stock, &request(PaymentMode::Online, Some(Decimal::new(2900, 0))), today());
        assert_eq!(status_of(result), StatusCode::CONFLICT);
        assert_eq!(stock[&PRODUCT].stock(), 3);
    }

    #[test]
    fn test_empty_cart() {
        let mut dealer = dealer(ApprovalStatus::Approved, 0);
        let result = place_order(&mut dealer, &Cart::for_dealer(Uuid::nil()), &pricing(), None, &mut products(3), &request(PaymentMode::Online, None), today());
        assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_price_check_tolerates_rounding() {
        let quoted = Money::new(Decimal::new(308069, 2));
        assert!(ensure_price_unchanged(None, quoted).is_ok());
        assert!(ensure_price_unchanged(Some(Decimal::new(308070, 2)), quoted).is_ok());
        assert!(matches!(ensure_price_unchanged(Some(Decimal::new(300000, 2)), quoted), Err(PortalError::Conflict(_))));
    }

    #[test]
    fn test_checkout_request_defaults() {
        let r: CheckoutRequest = serde_json::from_value(serde_json::json!({ "payment_mode": "credit" })).unwrap();
        assert_eq!(r.payment_mode, PaymentMode::Credit);
        assert_eq!(r.delivery_method, DeliveryMethod::InPerson);
        assert!(r.final_amount.is_none());
        assert!(serde_json::from_value::<CheckoutRequest>(serde_json::json!({ "payment_mode": "barter" })).is_err());
    }
}
