//! Dealer cart. Lines live server-side so every quote, and checkout, is
//! priced from catalogue data rather than from what the browser remembers.

use axum::{extract::{Path, State}, http::StatusCode, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Cart, CartItem, Coupon, PaymentMode};
use crate::domain::services::{OrderQuote, PricingSnapshot};
use crate::domain::value_objects::{CouponCode, Grams, Quantity};
use crate::routes::auth::DealerUser;
use crate::routes::coupons::find_coupon;
use crate::routes::pricing::current_pricing;
use crate::{AppState, CartRow, Message, PortalError, ProductRow, Result};

const CART_QUERY: &str = "SELECT c.id, c.product_id, p.name, c.size, c.quantity, p.base_weight, p.making_charges, p.stock_quantity, p.is_active FROM cart_items c JOIN products p ON p.id = c.product_id WHERE c.dealer_id = $1 ORDER BY c.created_at";
const CART_QUERY_FOR_UPDATE: &str = "SELECT c.id, c.product_id, p.name, c.size, c.quantity, p.base_weight, p.making_charges, p.stock_quantity, p.is_active FROM cart_items c JOIN products p ON p.id = c.product_id WHERE c.dealer_id = $1 ORDER BY c.created_at FOR UPDATE OF c";

fn corrupt_line(id: Uuid, e: impl std::fmt::Display) -> PortalError { PortalError::Internal(format!("cart item {id}: {e}")) }

pub(crate) fn cart_from_rows(dealer_id: Uuid, rows: &[CartRow]) -> Result<Cart> {
    let mut cart = Cart::for_dealer(dealer_id);
    for r in rows {
        let quantity = Quantity::from_db(r.quantity).map_err(|e| corrupt_line(r.id, e))?;
        let base_weight = Grams::new(r.base_weight).map_err(|e| corrupt_line(r.id, e))?;
        cart.add_item(CartItem { id: r.id, product_id: r.product_id, name: r.name.clone(), size: r.size.clone(), quantity, base_weight, making_charges: r.making_charges })
            .map_err(|e| corrupt_line(r.id, e))?;
    }
    Ok(cart)
}

/// Loads the dealer's cart. With `lock` the cart rows stay locked until the
/// surrounding transaction ends.
pub(crate) async fn load_cart(conn: &mut PgConnection, dealer_id: Uuid, lock: bool) -> Result<(Vec<CartRow>, Cart)> {
    let sql = if lock { CART_QUERY_FOR_UPDATE } else { CART_QUERY };
    let rows = sqlx::query_as::<_, CartRow>(sql).bind(dealer_id).fetch_all(&mut *conn).await?;
    let cart = cart_from_rows(dealer_id, &rows)?;
    Ok((rows, cart))
}

/// Looks up the coupon the dealer entered. Blank codes and empty carts carry no coupon.
pub(crate) async fn cart_coupon(conn: &mut PgConnection, cart: &Cart, code: Option<&str>) -> Result<Option<Coupon>> {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) if !cart.is_empty() => Ok(Some(find_coupon(&mut *conn, code).await?)),
        _ => Ok(None),
    }
}

/// Prices `cart` at `pricing`, validating the coupon against the cart's total
/// quantity and the payment mode.
pub(crate) fn price(cart: &Cart, pricing: &PricingSnapshot, coupon: Option<&Coupon>, today: NaiveDate, mode: PaymentMode) -> Result<(OrderQuote, Option<CouponCode>)> {
    match coupon.filter(|_| !cart.is_empty()) {
        Some(coupon) => {
            let discount = coupon.apply(today, cart.total_quantity(), mode)?;
            Ok((cart.quote(pricing, Some(&discount)), Some(coupon.code().clone())))
        }
        None => Ok((cart.quote(pricing, None), None)),
    }
}

/// A priced cart snapshot.
pub(crate) struct PricedCart { pub rows: Vec<CartRow>, pub quote: OrderQuote, pub coupon: Option<CouponCode> }

/// Loads the dealer's cart and prices it at the current rate, applying the
/// coupon if one is given.
pub(crate) async fn price_cart(conn: &mut PgConnection, dealer_id: Uuid, coupon_code: Option<&str>, mode: PaymentMode) -> Result<PricedCart> {
    let (rows, cart) = load_cart(&mut *conn, dealer_id, false).await?;
    let pricing = current_pricing(&mut *conn).await?;
    let coupon = cart_coupon(&mut *conn, &cart, coupon_code).await?;
    let (quote, coupon) = price(&cart, &pricing, coupon.as_ref(), Utc::now().date_naive(), mode)?;
    Ok(PricedCart { rows, quote, coupon })
}

#[derive(Debug, Serialize)]
pub struct CartResponse { pub items: Vec<CartRow>, pub quote: OrderQuote, pub coupon_code: Option<CouponCode> }

impl From<PricedCart> for CartResponse {
    fn from(p: PricedCart) -> Self { Self { items: p.rows, quote: p.quote, coupon_code: p.coupon } }
}

/// `GET /api/cart`
pub async fn get_cart(State(s): State<AppState>, DealerUser(dealer_id): DealerUser) -> Result<Json<CartResponse>> {
    let mut conn = s.db.acquire().await?;
    Ok(Json(price_cart(&mut conn, dealer_id, None, PaymentMode::default()).await?.into()))
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest { pub coupon_code: Option<String>, #[serde(default)] pub payment_mode: PaymentMode }

/// `POST /api/cart/quote`
pub async fn quote_cart(State(s): State<AppState>, DealerUser(dealer_id): DealerUser, Json(r): Json<QuoteRequest>) -> Result<Json<CartResponse>> {
    let mut conn = s.db.acquire().await?;
    Ok(Json(price_cart(&mut conn, dealer_id, r.coupon_code.as_deref(), r.payment_mode).await?.into()))
}

async fn product_row(conn: &mut PgConnection, id: Uuid) -> Result<ProductRow> {
    sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1").bind(id)
        .fetch_optional(&mut *conn).await?.ok_or_else(|| PortalError::not_found("Product"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(length(max = 20))]
    #[serde(default)]
    pub size: String,
    pub quantity: Quantity,
}

/// `POST /api/cart`: adding the same product and size again merges quantities.
/// Stock is checked against the merged quantity.
pub async fn add_to_cart(State(s): State<AppState>, DealerUser(dealer_id): DealerUser, Json(r): Json<AddToCartRequest>) -> Result<(StatusCode, Json<Message>)> {
    r.validate()?;
    let mut tx = s.db.begin().await?;
    let product = product_row(&mut tx, r.product_id).await?.to_product()?;
    let (_, mut cart) = load_cart(&mut tx, dealer_id, true).await?;
    let new_id = Uuid::now_v7();
    let line = cart.add_item(CartItem {
        id: new_id, product_id: product.id(), name: product.name().to_string(), size: r.size.trim().to_string(), quantity: r.quantity,
        base_weight: product.base_weight(), making_charges: product.making_charges(),
    })?;
    product.check_orderable(&line.size, line.quantity)?;
    if line.id == new_id {
        sqlx::query("INSERT INTO cart_items (id, dealer_id, product_id, size, quantity, created_at) VALUES ($1, $2, $3, $4, $5, NOW()) ON CONFLICT (dealer_id, product_id, size) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity")
            .bind(line.id).bind(dealer_id).bind(line.product_id).bind(&line.size).bind(line.quantity.db_value())
            .execute(&mut *tx).await?;
    } else {
        sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1").bind(line.id).bind(line.quantity.db_value()).execute(&mut *tx).await?;
    }
    let quantity = line.quantity.value();
    tx.commit().await?;
    tracing::debug!(%dealer_id, product_id = %r.product_id, quantity, "Added to cart");
    Ok((StatusCode::CREATED, Json(Message::new("Added to cart"))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest { pub quantity: Quantity }

/// `PATCH /api/cart/:id`: the new quantity must still be in stock.
pub async fn update_cart_item(State(s): State<AppState>, DealerUser(dealer_id): DealerUser, Path(id): Path<Uuid>, Json(r): Json<UpdateCartItemRequest>) -> Result<Json<Message>> {
    let mut tx = s.db.begin().await?;
    let (_, mut cart) = load_cart(&mut tx, dealer_id, true).await?;
    let line = cart.update_quantity(id, r.quantity)?;
    let product = product_row(&mut tx, line.product_id).await?.to_product()?;
    product.check_orderable(&line.size, line.quantity)?;
    sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1").bind(line.id).bind(line.quantity.db_value()).execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(Json(Message::new("Cart updated")))
}

/// `DELETE /api/cart/:id`
pub async fn remove_from_cart(State(s): State<AppState>, DealerUser(dealer_id): DealerUser, Path(id): Path<Uuid>) -> Result<Json<Message>> {
    let mut conn = s.db.acquire().await?;
    let (_, mut cart) = load_cart(&mut conn, dealer_id, false).await?;
    let line = cart.remove_item(id)?;
    sqlx::query("DELETE FROM cart_items WHERE id = $1 AND dealer_id = $2").bind(line.id).bind(dealer_id).execute(&mut *conn).await?;
    Ok(Json(Message::new("Removed from cart")))
}
