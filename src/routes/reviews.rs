//! Product reviews by dealers, moderated by admins.

use axum::{extract::{Path, State}, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::routes::auth::{AdminUser, DealerUser};
use crate::{AppState, Message, PortalError, Result, ReviewRow};

const REVIEW_SELECT: &str = "SELECT r.*, p.name AS product_name, dp.business_name AS dealer_name FROM reviews r LEFT JOIN products p ON p.id = r.product_id LEFT JOIN dealer_profiles dp ON dp.user_id = r.dealer_id";

#[derive(Debug, Serialize)]
pub struct ProductReviews { pub average_rating: Option<Decimal>, pub count: usize, pub reviews: Vec<ReviewRow> }

impl ProductReviews {
    fn new(reviews: Vec<ReviewRow>) -> Self {
        let count = reviews.len();
        let average_rating = (count > 0).then(|| {
            let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
            (Decimal::from(sum) / Decimal::from(count)).round_dp(1)
        });
        Self { average_rating, count, reviews }
    }
}

/// `GET /api/products/:id/reviews`
pub async fn product_reviews(State(s): State<AppState>, Path(product_id): Path<Uuid>) -> Result<Json<ProductReviews>> {
    let rows = sqlx::query_as::<_, ReviewRow>(&format!("{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC"))
        .bind(product_id).fetch_all(&s.db).await?;
    Ok(Json(ProductReviews::new(rows)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub review_text: Option<String>,
}

/// `POST /api/products/:id/reviews`: one review per dealer and product.
pub async fn create_review(State(s): State<AppState>, DealerUser(dealer_id): DealerUser, Path(product_id): Path<Uuid>, Json(r): Json<ReviewRequest>) -> Result<(StatusCode, Json<ReviewRow>)> {
    r.validate()?;
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active").bind(product_id).fetch_optional(&s.db).await?;
    if exists.is_none() { return Err(PortalError::not_found("Product")); }
    let text = r.review_text.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let row = sqlx::query_as::<_, ReviewRow>("INSERT INTO reviews (id, product_id, dealer_id, rating, review_text, created_at) VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING *, NULL::text AS product_name, NULL::text AS dealer_name")
        .bind(Uuid::now_v7()).bind(product_id).bind(dealer_id).bind(r.rating).bind(text)
        .fetch_one(&s.db).await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() { return PortalError::Conflict("You have already reviewed this product".into()); }
            }
            PortalError::from(e)
        })?;
    tracing::info!(review_id = %row.id, %product_id, %dealer_id, rating = row.rating, "Review created");
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/admin/reviews`
pub async fn list_reviews(State(s): State<AppState>, AdminUser(_): AdminUser) -> Result<Json<Vec<ReviewRow>>> {
    Ok(Json(sqlx::query_as::<_, ReviewRow>(&format!("{REVIEW_SELECT} ORDER BY r.created_at DESC")).fetch_all(&s.db).await?))
}

/// `DELETE /api/admin/reviews/:id`
pub async fn delete_review(State(s): State<AppState>, AdminUser(_): AdminUser, Path(id): Path<Uuid>) -> Result<Json<Message>> {
    let done = sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(&s.db).await?;
    if done.rows_affected() == 0 { return Err(PortalError::not_found("Review")); }
    Ok(Json(Message::new("Review deleted")))
}
