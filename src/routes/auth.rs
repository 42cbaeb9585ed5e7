//! Caller identity extractors.
//!
//! Login (OTP, tokens) happens in the gateway in front of this service. The
//! gateway forwards the authenticated user as `x-user-id` and `x-user-role`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::PortalError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role { Dealer, Admin }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentUser { pub id: Uuid, pub role: Role }

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim);
        let id = header(USER_ID_HEADER)
            .ok_or_else(|| PortalError::Unauthorized("No user identity provided".into()))?
            .parse::<Uuid>()
            .map_err(|_| PortalError::Unauthorized("Invalid user identity".into()))?;
        let role = match header(USER_ROLE_HEADER) {
            Some("dealer") => Role::Dealer,
            Some("admin") => Role::Admin,
            _ => return Err(PortalError::Unauthorized("Invalid user role".into())),
        };
        Ok(Self { id, role })
    }
}

/// A caller with the dealer role. Holds the dealer's user id.
pub struct DealerUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for DealerUser
where
    S: Send + Sync,
{
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await? {
            CurrentUser { id, role: Role::Dealer } => Ok(Self(id)),
            _ => Err(PortalError::Forbidden("Access denied".into())),
        }
    }
}

/// A caller with the admin role. Holds the admin's user id.
pub struct AdminUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await? {
            CurrentUser { id, role: Role::Admin } => Ok(Self(id)),
            _ => Err(PortalError::Forbidden("Access denied".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(headers: &[(&str, &str)]) -> Result<CurrentUser, PortalError> {
        let mut req = Request::builder();
        for (k, v) in headers { req = req.header(*k, *v); }
        let (mut parts, _) = req.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_dealer() {
        let id = Uuid::new_v4();
        let user = extract(&[(USER_ID_HEADER, &id.to_string()), (USER_ROLE_HEADER, "dealer")]).await.unwrap();
        assert_eq!(user, CurrentUser { id, role: Role::Dealer });
    }

    #[tokio::test]
    async fn test_rejects_missing_or_bad_identity() {
        assert!(matches!(extract(&[]).await, Err(PortalError::Unauthorized(_))));
        assert!(matches!(extract(&[(USER_ID_HEADER, "42"), (USER_ROLE_HEADER, "dealer")]).await, Err(PortalError::Unauthorized(_))));
        let id = Uuid::new_v4().to_string();
        assert!(matches!(extract(&[(USER_ID_HEADER, &id), (USER_ROLE_HEADER, "root")]).await, Err(PortalError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_admin_guard() {
        let (mut parts, _) = Request::builder()
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .header(USER_ROLE_HEADER, "dealer")
            .body(()).unwrap().into_parts();
        assert!(matches!(AdminUser::from_request_parts(&mut parts, &()).await, Err(PortalError::Forbidden(_))));
    }
}
