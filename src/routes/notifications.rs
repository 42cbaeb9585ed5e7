//! Announcements pushed to dealers.

use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::routes::auth::{AdminUser, DealerUser};
use crate::{AppState, Message, NotificationRow, PortalError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind { #[default] Offer, Alert, GstUpdate }

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Offer => "offer", Self::Alert => "alert", Self::GstUpdate => "gst_update" }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience { #[default] All, Dealers, Specific }

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self { Self::All => "all", Self::Dealers => "dealers", Self::Specific => "specific" }
    }
}

/// `GET /api/notifications`
pub async fn list_for_dealer(State(s): State<AppState>, DealerUser(_): DealerUser) -> Result<Json<Vec<NotificationRow>>> {
    let rows = sqlx::query_as::<_, NotificationRow>("SELECT * FROM notifications WHERE is_active AND target_audience IN ('all', 'dealers') AND (published_at IS NULL OR published_at <= NOW()) ORDER BY COALESCE(published_at, created_at) DESC")
        .fetch_all(&s.db).await?;
    Ok(Json(rows))
}

/// `GET /api/admin/notifications`
pub async fn list_notifications(State(s): State<AppState>, AdminUser(_): AdminUser) -> Result<Json<Vec<NotificationRow>>> {
    Ok(Json(sqlx::query_as::<_, NotificationRow>("SELECT * FROM notifications ORDER BY created_at DESC").fetch_all(&s.db).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNotificationRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub target_audience: Audience,
}

/// `POST /api/admin/notifications`
pub async fn create_notification(State(s): State<AppState>, AdminUser(admin_id): AdminUser, Json(r): Json<CreateNotificationRequest>) -> Result<(StatusCode, Json<NotificationRow>)> {
    r.validate()?;
    let row = sqlx::query_as::<_, NotificationRow>("INSERT INTO notifications (id, title, message, type, target_audience, created_by, published_at, is_active, created_at) VALUES ($1, $2, $3, $4, $5, $6, NOW(), TRUE, NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(r.title.trim()).bind(r.message.trim()).bind(r.kind.as_str()).bind(r.target_audience.as_str()).bind(admin_id)
        .fetch_one(&s.db).await?;
    tracing::info!(notification_id = %row.id, kind = r.kind.as_str(), "Notification published");
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PATCH /api/admin/notifications/:id/toggle`
pub async fn toggle_notification(State(s): State<AppState>, AdminUser(_): AdminUser, Path(id): Path<Uuid>) -> Result<Json<NotificationRow>> {
    let row = sqlx::query_as::<_, NotificationRow>("UPDATE notifications SET is_active = NOT is_active WHERE id = $1 RETURNING *").bind(id)
        .fetch_optional(&s.db).await?.ok_or_else(|| PortalError::not_found("Notification"))?;
    Ok(Json(row))
}

/// `DELETE /api/admin/notifications/:id`
pub async fn delete_notification(State(s): State<AppState>, AdminUser(_): AdminUser, Path(id): Path<Uuid>) -> Result<Json<Message>> {
    let done = sqlx::query("DELETE FROM notifications WHERE id = $1").bind(id).execute(&s.db).await?;
    if done.rows_affected() == 0 { return Err(PortalError::not_found("Notification")); }
    Ok(Json(Message::new("Deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request() {
        let r: CreateNotificationRequest = serde_json::from_value(serde_json::json!({
            "title": "GST revision", "message": "New GST rates apply from Monday", "type": "gst_update", "target_audience": "dealers"
        })).unwrap();
        assert_eq!(r.kind, NotificationKind::GstUpdate);
        assert_eq!(r.target_audience.as_str(), "dealers");
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_defaults_and_rejections() {
        let r: CreateNotificationRequest = serde_json::from_value(serde_json::json!({ "title": "", "message": "x" })).unwrap();
        assert_eq!((r.kind, r.target_audience), (NotificationKind::Offer, Audience::All));
        assert!(r.validate().is_err());
        assert!(serde_json::from_value::<CreateNotificationRequest>(serde_json::json!({ "title": "a", "message": "b", "type": "spam" })).is_err());
    }
}
