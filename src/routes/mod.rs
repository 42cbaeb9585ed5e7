//! HTTP surface.

pub mod auth;
pub mod banners;
pub mod cart;
pub mod coupons;
pub mod dealers;
pub mod deliveries;
pub mod notifications;
pub mod orders;
pub mod pricing;
pub mod products;
pub mod reviews;

use axum::{routing::{delete, get, patch, post, put}, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/products", get(products::list_products))
        .route("/api/products/:id", get(products::get_product))
        .route("/api/products/:id/reviews", get(reviews::product_reviews).post(reviews::create_review))
        .route("/api/pricing", get(pricing::get_rates))
        .route("/api/coupons", get(coupons::list_active_coupons))
        .route("/api/banners", get(banners::list_active_banners));

    let dealer = Router::new()
        .route("/api/dealers/me", get(dealers::my_profile))
        .route("/api/cart", get(cart::get_cart).post(cart::add_to_cart))
        .route("/api/cart/quote", post(cart::quote_cart))
        .route("/api/cart/:id", patch(cart::update_cart_item).delete(cart::remove_from_cart))
        .route("/api/orders/checkout", post(orders::checkout))
        .route("/api/orders/my", get(orders::my_orders))
        .route("/api/deliveries/my", get(deliveries::my_deliveries))
        .route("/api/notifications", get(notifications::list_for_dealer));

    let admin = Router::new()
        .route("/api/admin/pricing", get(pricing::get_pricing).post(pricing::update_pricing))
        .route("/api/admin/dealers", get(dealers::list_dealers))
        .route("/api/admin/dealers/:id/approve", patch(dealers::approve_dealer))
        .route("/api/admin/dealers/:id/reject", patch(dealers::reject_dealer))
        .route("/api/admin/dealers/:id/credit-limit", patch(dealers::update_credit_limit))
        .route("/api/admin/orders", get(orders::list_orders))
        .route("/api/admin/orders/:id/approve", patch(orders::approve_order))
        .route("/api/admin/orders/:id/reject", patch(orders::reject_order))
        .route("/api/admin/orders/:id/complete", patch(orders::complete_order))
        .route("/api/admin/deliveries", get(deliveries::list_deliveries).post(deliveries::create_delivery))
        .route("/api/admin/deliveries/:id", put(deliveries::update_delivery))
        .route("/api/admin/reviews", get(reviews::list_reviews))
        .route("/api/admin/reviews/:id", delete(reviews::delete_review))
        .route("/api/admin/products", post(products::create_product))
        .route("/api/admin/products/:id", put(products::update_product).delete(products::delete_product))
        .route("/api/admin/coupons", get(coupons::list_coupons).post(coupons::create_coupon))
        .route("/api/admin/coupons/:id", delete(coupons::delete_coupon))
        .route("/api/admin/coupons/:id/toggle", patch(coupons::toggle_coupon))
        .route("/api/admin/notifications", get(notifications::list_notifications).post(notifications::create_notification))
        .route("/api/admin/notifications/:id", delete(notifications::delete_notification))
        .route("/api/admin/notifications/:id/toggle", patch(notifications::toggle_notification))
        .route("/api/admin/banners", get(banners::list_banners).post(banners::create_banner))
        .route("/api/admin/banners/:id", put(banners::update_banner).delete(banners::delete_banner))
        .route("/api/admin/banners/:id/toggle", patch(banners::toggle_banner));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "spchains-portal"})) }))
        .merge(public)
        .merge(dealer)
        .merge(admin)
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn app() -> Router {
        let db = PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap();
        router(AppState::new(db, None))
    }

    #[tokio::test]
    async fn test_health() {
        let resp = app().oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dealer_routes_require_identity() {
        let resp = app().oneshot(Request::builder().uri("/api/cart").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_routes_reject_dealers() {
        let req = Request::builder().uri("/api/admin/pricing")
            .header(auth::USER_ID_HEADER, uuid::Uuid::new_v4().to_string()).header(auth::USER_ROLE_HEADER, "dealer")
            .body(Body::empty()).unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_review_moderation_is_admin_only() {
        let req = Request::builder().method("DELETE").uri(format!("/api/admin/reviews/{}", uuid::Uuid::nil()))
            .header(auth::USER_ID_HEADER, uuid::Uuid::new_v4().to_string()).header(auth::USER_ROLE_HEADER, "dealer")
            .body(Body::empty()).unwrap();
        assert_eq!(app().oneshot(req).await.unwrap().status(), StatusCode::FORBIDDEN);
        let req = Request::builder().uri("/api/admin/deliveries").body(Body::empty()).unwrap();
        assert_eq!(app().oneshot(req).await.unwrap().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_reviews_require_dealer_to_post() {
        let req = Request::builder().method("POST").uri(format!("/api/products/{}/reviews", uuid::Uuid::nil()))
            .header("content-type", "application/json").body(Body::from(r#"{"rating":5}"#)).unwrap();
        assert_eq!(app().oneshot(req).await.unwrap().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let resp = app().oneshot(Request::builder().uri("/api/v1/products").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
