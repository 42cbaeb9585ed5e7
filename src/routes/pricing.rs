//! Pricing log: the admin publishes MCX rate and premium, everyone reads the
//! latest derived rates.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::events::{DomainEvent, PricingEvent};
use crate::domain::services::{PricingSnapshot, Rates};
use crate::routes::auth::AdminUser;
use crate::{AppState, PricingRow, Result};

/// Latest pricing row, if any has been published.
pub(crate) async fn latest_pricing<'e, E: sqlx::PgExecutor<'e>>(db: E) -> Result<Option<PricingRow>> {
    Ok(sqlx::query_as::<_, PricingRow>("SELECT * FROM pricing_config ORDER BY created_at DESC LIMIT 1").fetch_optional(db).await?)
}

/// Current pricing snapshot; all zeros when nothing has been published.
pub(crate) async fn current_pricing<'e, E: sqlx::PgExecutor<'e>>(db: E) -> Result<PricingSnapshot> {
    match latest_pricing(db).await? {
        Some(row) => row.snapshot(),
        None => Ok(PricingSnapshot::zero()),
    }
}

#[derive(Debug, Serialize)]
pub struct PricingResponse {
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub rates: Rates,
    pub updated_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

impl PricingResponse {
    fn from_row(row: Option<PricingRow>) -> Result<Self> {
        Ok(match row {
            Some(r) => Self { id: Some(r.id), rates: r.snapshot()?.rates(), updated_by: r.updated_by, created_at: Some(r.created_at) },
            None => Self { id: None, rates: PricingSnapshot::zero().rates(), updated_by: None, created_at: None },
        })
    }
}

/// `GET /api/pricing`
pub async fn get_rates(State(s): State<AppState>) -> Result<Json<Rates>> {
    Ok(Json(current_pricing(&s.db).await?.rates()))
}

/// `GET /api/admin/pricing`
pub async fn get_pricing(State(s): State<AppState>, AdminUser(_): AdminUser) -> Result<Json<PricingResponse>> {
    Ok(Json(PricingResponse::from_row(latest_pricing(&s.db).await?)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePricingRequest { pub mcx_rate: Decimal, #[serde(default)] pub premium_percentage: Decimal }

/// `POST /api/admin/pricing`
pub async fn update_pricing(State(s): State<AppState>, AdminUser(admin_id): AdminUser, Json(r): Json<UpdatePricingRequest>) -> Result<(StatusCode, Json<PricingResponse>)> {
    let input = PricingSnapshot::publishable(r.mcx_rate, r.premium_percentage)?;
    let row = sqlx::query_as::<_, PricingRow>("INSERT INTO pricing_config (id, mcx_rate, premium_percentage, updated_by, created_at) VALUES ($1, $2, $3, $4, NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(input.mcx_rate()).bind(input.premium_percentage()).bind(admin_id)
        .fetch_one(&s.db).await?;
    let stored = row.snapshot()?;
    tracing::info!(mcx_rate = %stored.mcx_rate(), premium = %stored.premium_percentage(), retail_rate = %stored.retail_rate(), %admin_id, "Pricing updated");
    s.publish(vec![updated_event(&stored)]).await;
    Ok((StatusCode::CREATED, Json(PricingResponse::from_row(Some(row))?)))
}

fn updated_event(stored: &PricingSnapshot) -> DomainEvent {
    DomainEvent::Pricing(PricingEvent::Updated { mcx_rate: stored.mcx_rate(), premium_percentage: stored.premium_percentage(), retail_rate: stored.retail_rate() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PortalError;

    #[test]
    fn test_empty_log_reads_as_zero() {
        let resp = PricingResponse::from_row(None).unwrap();
        assert_eq!(resp.rates.mcx_rate, Decimal::ZERO);
        assert_eq!(resp.rates.retail_rate, Decimal::ZERO);
        assert!(serde_json::to_value(&resp).unwrap()["id"].is_null());
    }

    #[test]
    fn test_response_includes_derived_rates() {
        let row = PricingRow { id: Uuid::nil(), mcx_rate: Decimal::new(7550, 2), premium_percentage: Decimal::new(25, 1), updated_by: None, created_at: Utc::now() };
        let resp = PricingResponse::from_row(Some(row)).unwrap();
        assert_eq!(resp.rates.net_rate, Decimal::new(773875, 4));
        assert_eq!(resp.rates.retail_rate, Decimal::new(78161375, 6));
    }

    #[test]
    fn test_event_carries_stored_values() {
        let row = PricingRow { id: Uuid::nil(), mcx_rate: Decimal::new(755_012, 4), premium_percentage: Decimal::new(25, 1), updated_by: None, created_at: Utc::now() };
        let DomainEvent::Pricing(PricingEvent::Updated { mcx_rate, retail_rate, .. }) = updated_event(&row.snapshot().unwrap()) else { panic!("pricing event expected") };
        assert_eq!(mcx_rate, Decimal::new(755_012, 4));
        assert_eq!(retail_rate, row.snapshot().unwrap().retail_rate());
    }

    #[test]
    fn test_out_of_range_input_is_bad_request() {
        let err = PortalError::from(PricingSnapshot::publishable(Decimal::new(10_000_000_000, 0), Decimal::ZERO).unwrap_err());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err = PortalError::from(PricingSnapshot::publishable(Decimal::ZERO, Decimal::ZERO).unwrap_err());
        assert_eq!(err.to_string(), "MCX rate is required");
    }

    #[test]
    fn test_request_accepts_numbers_and_strings() {
        let r: UpdatePricingRequest = serde_json::from_str(r#"{"mcx_rate": 75.5, "premium_percentage": "2.5"}"#).unwrap();
        assert_eq!(r.mcx_rate, Decimal::new(755, 1));
        assert_eq!(r.premium_percentage, Decimal::new(25, 1));
        let r: UpdatePricingRequest = serde_json::from_str(r#"{"mcx_rate": 80}"#).unwrap();
        assert_eq!(r.premium_percentage, Decimal::ZERO);
    }
}
