//! Shared application state.

use sqlx::PgPool;

use crate::domain::events::DomainEvent;

const SUBJECT_PREFIX: &str = "spchains";

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub nats: Option<async_nats::Client>,
}

impl AppState {
    pub fn new(db: PgPool, nats: Option<async_nats::Client>) -> Self { Self { db, nats } }

    /// Publishes events to NATS. Delivery is best effort: failures are logged
    /// and never fail the request that raised the events.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        let Some(client) = &self.nats else { return };
        for event in events {
            let subject = format!("{SUBJECT_PREFIX}.{}", event.subject());
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => { tracing::warn!(%subject, error = %e, "Failed to encode event"); continue; }
            };
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                tracing::warn!(%subject, error = %e, "Failed to publish event");
            } else {
                tracing::debug!(%subject, "Published event");
            }
        }
    }
}
