//! Delivery tracking for approved orders.

use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Delivery, DeliveryMethod, DeliveryStatus};
use crate::routes::auth::{AdminUser, DealerUser};
use crate::{AppState, DeliveryRow, OrderRow, PortalError, Result};

const DELIVERY_SELECT: &str = "SELECT d.*, o.order_number FROM delivery_tracking d LEFT JOIN orders o ON o.id = d.order_id";

/// `GET /api/admin/deliveries`
pub async fn list_deliveries(State(s): State<AppState>, AdminUser(_): AdminUser) -> Result<Json<Vec<DeliveryRow>>> {
    let rows = sqlx::query_as::<_, DeliveryRow>(&format!("{DELIVERY_SELECT} ORDER BY d.updated_at DESC")).fetch_all(&s.db).await?;
    Ok(Json(rows))
}

/// `GET /api/deliveries/my`: tracking for the calling dealer's orders.
pub async fn my_deliveries(State(s): State<AppState>, DealerUser(dealer_id): DealerUser) -> Result<Json<Vec<DeliveryRow>>> {
    let rows = sqlx::query_as::<_, DeliveryRow>(&format!("{DELIVERY_SELECT} WHERE o.dealer_id = $1 ORDER BY d.updated_at DESC"))
        .bind(dealer_id).fetch_all(&s.db).await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDeliveryRequest {
    pub order_id: Uuid,
    /// Defaults to the method chosen at checkout.
    pub delivery_method: Option<DeliveryMethod>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// `POST /api/admin/deliveries`: starts tracking an approved order.
pub async fn create_delivery(State(s): State<AppState>, AdminUser(admin_id): AdminUser, Json(r): Json<CreateDeliveryRequest>) -> Result<(StatusCode, Json<DeliveryRow>)> {
    r.validate()?;
    let mut tx = s.db.begin().await?;
    let order_row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 FOR UPDATE").bind(r.order_id)
        .fetch_optional(&mut *tx).await?.ok_or_else(|| PortalError::not_found("Order"))?;
    let method = match r.delivery_method {
        Some(method) => method,
        None => order_row.delivery_method.parse().map_err(|e| PortalError::Internal(format!("order {}: {e}", order_row.id)))?,
    };
    let delivery = Delivery::start(&order_row.to_order()?, method)?;
    let row = sqlx::query_as::<_, DeliveryRow>("INSERT INTO delivery_tracking (id, order_id, status, delivery_method, notes, updated_by, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) RETURNING *, $7::text AS order_number")
        .bind(delivery.id()).bind(delivery.order_id()).bind(delivery.status().as_str()).bind(delivery.method().as_str())
        .bind(notes(r.notes.as_deref())).bind(admin_id).bind(&order_row.order_number)
        .fetch_one(&mut *tx).await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() { return PortalError::Conflict(format!("Order {} is already being tracked", order_row.order_number)); }
            }
            PortalError::from(e)
        })?;
    tx.commit().await?;
    tracing::info!(delivery_id = %row.id, order_id = %row.order_id, %admin_id, "Delivery created");
    Ok((StatusCode::CREATED, Json(row)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDeliveryRequest {
    pub status: DeliveryStatus,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

fn notes(notes: Option<&str>) -> Option<&str> { notes.map(str::trim).filter(|n| !n.is_empty()) }

/// `PUT /api/admin/deliveries/:id`: moves the delivery along. Marking it
/// delivered completes the order.
pub async fn update_delivery(State(s): State<AppState>, AdminUser(admin_id): AdminUser, Path(id): Path<Uuid>, Json(r): Json<UpdateDeliveryRequest>) -> Result<Json<DeliveryRow>> {
    r.validate()?;
    let mut tx = s.db.begin().await?;
    let current = sqlx::query_as::<_, DeliveryRow>(&format!("{DELIVERY_SELECT} WHERE d.id = $1 FOR UPDATE OF d")).bind(id)
        .fetch_optional(&mut *tx).await?.ok_or_else(|| PortalError::not_found("Delivery"))?;
    let mut delivery = current.to_delivery()?;
    delivery.update(r.status)?;

    let row = sqlx::query_as::<_, DeliveryRow>("UPDATE delivery_tracking SET status = $2, notes = COALESCE($3, notes), updated_by = $4, updated_at = NOW() WHERE id = $1 RETURNING *, $5::text AS order_number")
        .bind(id).bind(delivery.status().as_str()).bind(notes(r.notes.as_deref())).bind(admin_id).bind(&current.order_number)
        .fetch_one(&mut *tx).await?;

    let order_row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 FOR UPDATE").bind(delivery.order_id())
        .fetch_optional(&mut *tx).await?.ok_or_else(|| PortalError::not_found("Order"))?;
    let mut order = order_row.to_order()?;
    if delivery.settle(&mut order)? {
        sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1").bind(order.id()).bind(order.status().as_str()).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(delivery_id = %id, status = %delivery.status(), %admin_id, "Delivery updated");
    s.publish(order.take_events()).await;
    Ok(Json(row))
}
