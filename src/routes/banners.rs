//! Dashboard banners.

use axum::{extract::{Path, State}, http::StatusCode, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::routes::auth::AdminUser;
use crate::{AppState, BannerRow, Message, PortalError, Result};

/// `GET /api/banners`: active banners whose date window covers today.
pub async fn list_active_banners(State(s): State<AppState>) -> Result<Json<Vec<BannerRow>>> {
    let rows = sqlx::query_as::<_, BannerRow>("SELECT * FROM banners WHERE is_active AND (start_date IS NULL OR start_date <= CURRENT_DATE) AND (end_date IS NULL OR end_date >= CURRENT_DATE) ORDER BY display_order, created_at DESC")
        .fetch_all(&s.db).await?;
    Ok(Json(rows))
}

/// `GET /api/admin/banners`
pub async fn list_banners(State(s): State<AppState>, AdminUser(_): AdminUser) -> Result<Json<Vec<BannerRow>>> {
    Ok(Json(sqlx::query_as::<_, BannerRow>("SELECT * FROM banners ORDER BY display_order, created_at DESC").fetch_all(&s.db).await?))
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct BannerRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Image URL is required"))]
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn validate_window(r: &BannerRequest) -> std::result::Result<(), ValidationError> {
    match (r.start_date, r.end_date) {
        (Some(start), Some(end)) if end < start => Err(ValidationError::new("end_date_before_start_date")),
        _ => Ok(()),
    }
}

/// `POST /api/admin/banners`
pub async fn create_banner(State(s): State<AppState>, AdminUser(_): AdminUser, Json(r): Json<BannerRequest>) -> Result<(StatusCode, Json<BannerRow>)> {
    r.validate()?;
    let row = sqlx::query_as::<_, BannerRow>("INSERT INTO banners (id, title, description, image_url, link_url, display_order, start_date, end_date, is_active, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(r.title.trim()).bind(&r.description).bind(&r.image_url).bind(&r.link_url).bind(r.display_order).bind(r.start_date).bind(r.end_date)
        .fetch_one(&s.db).await?;
    tracing::info!(banner_id = %row.id, "Banner created");
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PUT /api/admin/banners/:id`
pub async fn update_banner(State(s): State<AppState>, AdminUser(_): AdminUser, Path(id): Path<Uuid>, Json(r): Json<BannerRequest>) -> Result<Json<BannerRow>> {
    r.validate()?;
    let row = sqlx::query_as::<_, BannerRow>("UPDATE banners SET title = $2, description = $3, image_url = $4, link_url = $5, display_order = $6, start_date = $7, end_date = $8 WHERE id = $1 RETURNING *")
        .bind(id).bind(r.title.trim()).bind(&r.description).bind(&r.image_url).bind(&r.link_url).bind(r.display_order).bind(r.start_date).bind(r.end_date)
        .fetch_optional(&s.db).await?.ok_or_else(|| PortalError::not_found("Banner"))?;
    Ok(Json(row))
}

/// `PATCH /api/admin/banners/:id/toggle`
pub async fn toggle_banner(State(s): State<AppState>, AdminUser(_): AdminUser, Path(id): Path<Uuid>) -> Result<Json<BannerRow>> {
    let row = sqlx::query_as::<_, BannerRow>("UPDATE banners SET is_active = NOT is_active WHERE id = $1 RETURNING *").bind(id)
        .fetch_optional(&s.db).await?.ok_or_else(|| PortalError::not_found("Banner"))?;
    Ok(Json(row))
}

/// `DELETE /api/admin/banners/:id`
pub async fn delete_banner(State(s): State<AppState>, AdminUser(_): AdminUser, Path(id): Path<Uuid>) -> Result<Json<Message>> {
    let done = sqlx::query("DELETE FROM banners WHERE id = $1").bind(id).execute(&s.db).await?;
    if done.rows_affected() == 0 { return Err(PortalError::not_found("Banner")); }
    Ok(Json(Message::new("Deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: &str, end: &str) -> BannerRequest {
        serde_json::from_value(serde_json::json!({
            "title": "Diwali collection", "image_url": "/uploads/diwali.jpg", "start_date": start, "end_date": end
        })).unwrap()
    }

    #[test]
    fn test_date_window_validation() {
        assert!(request("2026-10-01", "2026-11-15").validate().is_ok());
        assert!(request("2026-11-15", "2026-10-01").validate().is_err());
    }

    #[test]
    fn test_display_order_defaults_to_zero() {
        let r = request("2026-10-01", "2026-10-01");
        assert_eq!(r.display_order, 0);
        assert!(r.link_url.is_none());
    }
}
