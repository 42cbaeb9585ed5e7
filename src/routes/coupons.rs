//! Coupon management and lookup.

use axum::{extract::{Path, State}, http::StatusCode, Json};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Coupon, CouponError, DiscountType, PaymentMode};
use crate::domain::value_objects::CouponCode;
use crate::routes::auth::AdminUser;
use crate::{AppState, CouponRow, Message, PortalError, Result};

/// Looks a coupon up by code (case-insensitive). Unknown codes are an invalid coupon.
pub(crate) async fn find_coupon<'e, E: sqlx::PgExecutor<'e>>(db: E, code: &str) -> Result<Coupon> {
    let code = CouponCode::new(code).map_err(|_| CouponError::NotFound)?;
    sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE code = $1").bind(code.as_str())
        .fetch_optional(db).await?
        .ok_or(CouponError::NotFound)?
        .to_coupon()
}

/// `GET /api/coupons`: coupons a dealer can currently use.
pub async fn list_active_coupons(State(s): State<AppState>) -> Result<Json<Vec<CouponRow>>> {
    let rows = sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE is_active AND expiry_date >= CURRENT_DATE ORDER BY created_at DESC")
        .fetch_all(&s.db).await?;
    Ok(Json(rows))
}

/// `GET /api/admin/coupons`
pub async fn list_coupons(State(s): State<AppState>, AdminUser(_): AdminUser) -> Result<Json<Vec<CouponRow>>> {
    Ok(Json(sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons ORDER BY created_at DESC").fetch_all(&s.db).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 32, message = "Coupon code is required"))]
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub min_quantity: i32,
    #[serde(default)]
    pub applicable_payment_modes: Vec<PaymentMode>,
    pub expiry_date: NaiveDate,
}

/// `POST /api/admin/coupons`
pub async fn create_coupon(State(s): State<AppState>, AdminUser(admin_id): AdminUser, Json(r): Json<CreateCouponRequest>) -> Result<(StatusCode, Json<CouponRow>)> {
    r.validate()?;
    let coupon = Coupon::new(Uuid::now_v7(), CouponCode::new(&r.code)?, r.discount_type, r.discount_value, r.min_quantity, r.applicable_payment_modes.clone(), r.expiry_date, true)?;
    let modes: Vec<&str> = r.applicable_payment_modes.iter().map(PaymentMode::as_str).collect();
    let row = sqlx::query_as::<_, CouponRow>("INSERT INTO coupons (id, code, discount_type, discount_value, min_quantity, applicable_payment_modes, expiry_date, is_active, created_by, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, NOW()) RETURNING *")
        .bind(coupon.id()).bind(coupon.code().as_str()).bind(r.discount_type.as_str()).bind(r.discount_value).bind(r.min_quantity)
        .bind(&modes).bind(r.expiry_date).bind(admin_id)
        .fetch_one(&s.db).await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() { return PortalError::Conflict(format!("Coupon {} already exists", coupon.code())); }
            }
            PortalError::from(e)
        })?;
    tracing::info!(coupon = %coupon.code(), "Coupon created");
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PATCH /api/admin/coupons/:id/toggle`
pub async fn toggle_coupon(State(s): State<AppState>, AdminUser(_): AdminUser, Path(id): Path<Uuid>) -> Result<Json<CouponRow>> {
    let row = sqlx::query_as::<_, CouponRow>("UPDATE coupons SET is_active = NOT is_active WHERE id = $1 RETURNING *").bind(id)
        .fetch_optional(&s.db).await?.ok_or_else(|| PortalError::not_found("Coupon"))?;
    Ok(Json(row))
}

/// `DELETE /api/admin/coupons/:id`
pub async fn delete_coupon(State(s): State<AppState>, AdminUser(_): AdminUser, Path(id): Path<Uuid>) -> Result<Json<Message>> {
    let done = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id).execute(&s.db).await?;
    if done.rows_affected() == 0 { return Err(PortalError::not_found("Coupon")); }
    Ok(Json(Message::new("Deleted")))
}
