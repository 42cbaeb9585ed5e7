//! Unified handler error.
//!
//! Every route returns `Result<T, PortalError>`. Domain errors convert into the
//! HTTP status their meaning calls for; server-side failures are logged and
//! answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use validator::ValidationErrors;

use crate::domain::aggregates::{CartError, CouponError, DealerError, DeliveryError, OrderError, ProductError, UnknownValue};
use crate::domain::services::PricingError;
use crate::domain::value_objects::{CouponCodeError, QuantityError};
use crate::Message;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortalError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    pub fn not_found(what: &str) -> Self { Self::NotFound(format!("{what} not found")) }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "Request error");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(Message { message })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;

impl From<ValidationErrors> for PortalError {
    fn from(e: ValidationErrors) -> Self { Self::BadRequest(e.to_string()) }
}

impl From<CouponError> for PortalError {
    fn from(e: CouponError) -> Self { Self::BadRequest(e.to_string()) }
}

impl From<PricingError> for PortalError {
    fn from(e: PricingError) -> Self { Self::BadRequest(e.to_string()) }
}

impl From<ProductError> for PortalError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::InsufficientStock { .. } | ProductError::Unavailable(_) => Self::Conflict(e.to_string()),
            _ => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<CartError> for PortalError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => Self::NotFound("Cart item not found".to_string()),
            CartError::Empty | CartError::Quantity(_) => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<OrderError> for PortalError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NoItems => Self::BadRequest(e.to_string()),
            OrderError::InvalidTransition { .. } => Self::Conflict(e.to_string()),
        }
    }
}

impl From<DeliveryError> for PortalError {
    fn from(e: DeliveryError) -> Self { Self::Conflict(e.to_string()) }
}

impl From<DealerError> for PortalError {
    fn from(e: DealerError) -> Self {
        match e {
            DealerError::NotApproved(_) => Self::Forbidden(e.to_string()),
            DealerError::AlreadyReviewed(_) => Self::Conflict(e.to_string()),
            DealerError::NegativeCreditLimit | DealerError::InsufficientCredit { .. } => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<CouponCodeError> for PortalError {
    fn from(e: CouponCodeError) -> Self { Self::BadRequest(e.to_string()) }
}

impl From<QuantityError> for PortalError {
    fn from(e: QuantityError) -> Self { Self::BadRequest(e.to_string()) }
}

impl From<UnknownValue> for PortalError {
    fn from(e: UnknownValue) -> Self { Self::BadRequest(e.to_string()) }
}
