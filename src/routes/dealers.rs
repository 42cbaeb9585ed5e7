//! Dealer profiles and admin review of dealer accounts.

use axum::{extract::{Path, Query, State}, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::aggregates::{ApprovalStatus, Dealer, DealerError};
use crate::routes::auth::{AdminUser, DealerUser};
use crate::{AppState, DealerProfileRow, PortalError, Result};

const DEALER_SELECT: &str = "SELECT dp.*, u.mobile_number FROM dealer_profiles dp LEFT JOIN users u ON u.id = dp.user_id";

/// Locks the profile of the dealer behind `user_id` for the rest of the transaction.
pub(crate) async fn dealer_for_update(conn: &mut PgConnection, user_id: Uuid) -> Result<DealerProfileRow> {
    sqlx::query_as::<_, DealerProfileRow>(&format!("{DEALER_SELECT} WHERE dp.user_id = $1 FOR UPDATE OF dp")).bind(user_id)
        .fetch_optional(&mut *conn).await?.ok_or_else(|| PortalError::not_found("Dealer profile"))
}

pub(crate) async fn save_credit_used(conn: &mut PgConnection, dealer: &Dealer) -> Result<()> {
    sqlx::query("UPDATE dealer_profiles SET credit_used = $2, updated_at = NOW() WHERE id = $1")
        .bind(dealer.id()).bind(dealer.credit_used().amount()).execute(&mut *conn).await?;
    Ok(())
}

async fn profile_by_id(conn: &mut PgConnection, id: Uuid) -> Result<DealerProfileRow> {
    sqlx::query_as::<_, DealerProfileRow>(&format!("{DEALER_SELECT} WHERE dp.id = $1")).bind(id)
        .fetch_optional(&mut *conn).await?.ok_or_else(|| PortalError::not_found("Dealer"))
}

/// `GET /api/dealers/me`
pub async fn my_profile(State(s): State<AppState>, DealerUser(user_id): DealerUser) -> Result<Json<DealerProfileRow>> {
    let row = sqlx::query_as::<_, DealerProfileRow>(&format!("{DEALER_SELECT} WHERE dp.user_id = $1")).bind(user_id)
        .fetch_optional(&s.db).await?.ok_or_else(|| PortalError::not_found("Dealer profile"))?;
    Ok(Json(row))
}

#[derive(Debug, Default, Deserialize)]
pub struct DealerFilter { pub status: Option<String> }

impl DealerFilter {
    fn status(&self) -> Result<Option<ApprovalStatus>> {
        match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty() && *s != "all") {
            None => Ok(None),
            Some(s) => ApprovalStatus::parse(s).map(Some).ok_or_else(|| PortalError::BadRequest(format!("Unknown dealer status: {s}"))),
        }
    }
}

/// `GET /api/admin/dealers?status=pending`
pub async fn list_dealers(State(s): State<AppState>, AdminUser(_): AdminUser, Query(f): Query<DealerFilter>) -> Result<Json<Vec<DealerProfileRow>>> {
    let status = f.status()?.map(|s| s.as_str());
    let rows = sqlx::query_as::<_, DealerProfileRow>(&format!("{DEALER_SELECT} WHERE ($1::text IS NULL OR dp.approval_status = $1) ORDER BY dp.created_at DESC"))
        .bind(status).fetch_all(&s.db).await?;
    Ok(Json(rows))
}

/// Locks a dealer profile, applies an admin decision and writes it back.
async fn review(s: &AppState, id: Uuid, admin_id: Uuid, step: impl FnOnce(&mut Dealer) -> std::result::Result<(), DealerError>) -> Result<DealerProfileRow> {
    let mut tx = s.db.begin().await?;
    let current = sqlx::query_as::<_, DealerProfileRow>(&format!("{DEALER_SELECT} WHERE dp.id = $1 FOR UPDATE OF dp")).bind(id)
        .fetch_optional(&mut *tx).await?.ok_or_else(|| PortalError::not_found("Dealer"))?;
    let mut dealer = current.to_dealer()?;
    step(&mut dealer)?;

    sqlx::query("UPDATE dealer_profiles SET approval_status = $2, credit_limit = $3, rejected_reason = COALESCE($4, rejected_reason), approved_by = CASE WHEN $2 = 'approved' AND approved_at IS NULL THEN $5 ELSE approved_by END, approved_at = CASE WHEN $2 = 'approved' AND approved_at IS NULL THEN NOW() ELSE approved_at END, updated_at = NOW() WHERE id = $1")
        .bind(id).bind(dealer.status().as_str()).bind(dealer.credit_limit().amount()).bind(dealer.rejected_reason()).bind(admin_id)
        .execute(&mut *tx).await?;
    let row = profile_by_id(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!(dealer_id = %id, status = dealer.status().as_str(), credit_limit = %dealer.credit_limit(), %admin_id, "Dealer updated");
    s.publish(dealer.take_events()).await;
    Ok(row)
}

#[derive(Debug, Deserialize)]
pub struct CreditLimitRequest { #[serde(default)] pub credit_limit: Decimal }

/// `PATCH /api/admin/dealers/:id/approve`
pub async fn approve_dealer(State(s): State<AppState>, AdminUser(admin_id): AdminUser, Path(id): Path<Uuid>, Json(r): Json<CreditLimitRequest>) -> Result<Json<DealerProfileRow>> {
    Ok(Json(review(&s, id, admin_id, |d| d.approve(r.credit_limit)).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectDealerRequest { pub reason: Option<String> }

/// `PATCH /api/admin/dealers/:id/reject`
pub async fn reject_dealer(State(s): State<AppState>, AdminUser(admin_id): AdminUser, Path(id): Path<Uuid>, body: Option<Json<RejectDealerRequest>>) -> Result<Json<DealerProfileRow>> {
    let reason = body.and_then(|Json(r)| r.reason).map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    Ok(Json(review(&s, id, admin_id, |d| d.reject(reason)).await?))
}

/// `PATCH /api/admin/dealers/:id/credit-limit`
pub async fn update_credit_limit(State(s): State<AppState>, AdminUser(admin_id): AdminUser, Path(id): Path<Uuid>, Json(r): Json<CreditLimitRequest>) -> Result<Json<DealerProfileRow>> {
    Ok(Json(review(&s, id, admin_id, |d| d.set_credit_limit(r.credit_limit)).await?))
}
