//! Catalogue: dealers browse active products priced at the live retail rate;
//! admins maintain the catalogue.

use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Product, ProductAttrs};
use crate::domain::services::PricingSnapshot;
use crate::domain::value_objects::Money;
use crate::routes::auth::AdminUser;
use crate::routes::pricing::current_pricing;
use crate::{AppState, Message, PortalError, ProductRow, Result};

#[derive(Debug, Deserialize)]
pub struct ListParams { pub page: Option<u32>, pub per_page: Option<u32>, pub category: Option<String>, pub search: Option<String> }

impl ListParams {
    fn limits(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(50).clamp(1, 100);
        (page, per_page)
    }

    /// Rows skipped before the requested page. Computed in `i64` so that any
    /// page number a client sends stays representable.
    fn offset(&self) -> i64 {
        let (page, per_page) = self.limits();
        (i64::from(page) - 1) * i64::from(per_page)
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogueItem {
    #[serde(flatten)]
    pub product: ProductRow,
    pub unit_price: Money,
    /// Fine silver per piece, in grams.
    pub pure_weight: Decimal,
    pub wastage_weight: Decimal,
    pub in_stock: bool,
}

#[derive(Debug, Serialize)]
pub struct CatalogueResponse { pub retail_rate: Decimal, pub products: Vec<CatalogueItem>, pub total: i64, pub page: u32 }

fn price(row: ProductRow, pricing: &PricingSnapshot) -> Result<CatalogueItem> {
    let product = row.to_product()?;
    Ok(CatalogueItem {
        unit_price: product.unit_price(pricing), pure_weight: product.pure_weight(), wastage_weight: product.wastage_weight(),
        in_stock: product.is_in_stock(), product: row,
    })
}

/// `GET /api/products`
pub async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<CatalogueResponse>> {
    let (page, per_page) = p.limits();
    let search = p.search.as_deref().map(|q| format!("%{}%", q.trim()));
    let filter = "is_active AND ($1::text IS NULL OR category = $1) AND ($2::text IS NULL OR name ILIKE $2)";
    let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT * FROM products WHERE {filter} ORDER BY created_at DESC LIMIT $3 OFFSET $4"))
        .bind(&p.category).bind(&search).bind(i64::from(per_page)).bind(p.offset())
        .fetch_all(&s.db).await?;
    let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products WHERE {filter}"))
        .bind(&p.category).bind(&search).fetch_one(&s.db).await?;
    let pricing = current_pricing(&s.db).await?;
    let products = rows.into_iter().map(|r| price(r, &pricing)).collect::<Result<Vec<_>>>()?;
    Ok(Json(CatalogueResponse { retail_rate: pricing.retail_rate(), products, total: total.0, page }))
}

/// `GET /api/products/:id`
pub async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<CatalogueItem>> {
    let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1 AND is_active").bind(id)
        .fetch_optional(&s.db).await?.ok_or_else(|| PortalError::not_found("Product"))?;
    let pricing = current_pricing(&s.db).await?;
    Ok(Json(price(row, &pricing)?))
}

fn validated(attrs: &ProductAttrs) -> Result<()> {
    attrs.validate()?;
    Product::new(Uuid::nil(), attrs, true)?;
    Ok(())
}

/// `POST /api/admin/products`
pub async fn create_product(State(s): State<AppState>, AdminUser(_): AdminUser, Json(r): Json<ProductAttrs>) -> Result<(StatusCode, Json<ProductRow>)> {
    validated(&r)?;
    let p = sqlx::query_as::<_, ProductRow>("INSERT INTO products (id, name, category, description, base_weight, purity_percent, making_charges, wastage_percent, available_sizes, stock_quantity, is_active, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE, NOW(), NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(r.name.trim()).bind(&r.category).bind(&r.description).bind(r.base_weight).bind(r.purity_percent)
        .bind(r.making_charges).bind(r.wastage_percent).bind(&r.available_sizes).bind(r.stock_quantity)
        .fetch_one(&s.db).await?;
    tracing::info!(product_id = %p.id, name = %p.name, "Product created");
    Ok((StatusCode::CREATED, Json(p)))
}

/// `PUT /api/admin/products/:id`
pub async fn update_product(State(s): State<AppState>, AdminUser(_): AdminUser, Path(id): Path<Uuid>, Json(r): Json<ProductAttrs>) -> Result<Json<ProductRow>> {
    validated(&r)?;
    let p = sqlx::query_as::<_, ProductRow>("UPDATE products SET name = $2, category = $3, description = $4, base_weight = $5, purity_percent = $6, making_charges = $7, wastage_percent = $8, available_sizes = $9, stock_quantity = $10, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(r.name.trim()).bind(&r.category).bind(&r.description).bind(r.base_weight).bind(r.purity_percent)
        .bind(r.making_charges).bind(r.wastage_percent).bind(&r.available_sizes).bind(r.stock_quantity)
        .fetch_optional(&s.db).await?.ok_or_else(|| PortalError::not_found("Product"))?;
    Ok(Json(p))
}

/// `DELETE /api/admin/products/:id`: soft delete, past orders keep their product.
pub async fn delete_product(State(s): State<AppState>, AdminUser(_): AdminUser, Path(id): Path<Uuid>) -> Result<Json<Message>> {
    let done = sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1").bind(id).execute(&s.db).await?;
    if done.rows_affected() == 0 { return Err(PortalError::not_found("Product")); }
    Ok(Json(Message::new("Product deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_limits() {
        let p = ListParams { page: Some(0), per_page: Some(1000), category: None, search: None };
        assert_eq!(p.limits(), (1, 100));
        let p = ListParams { page: None, per_page: None, category: None, search: None };
        assert_eq!(p.limits(), (1, 50));
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_offset_for_far_pages() {
        let p = ListParams { page: Some(3), per_page: Some(20), category: None, search: None };
        assert_eq!(p.offset(), 40);
        let p = ListParams { page: Some(u32::MAX), per_page: Some(100), category: None, search: None };
        assert_eq!(p.offset(), (i64::from(u32::MAX) - 1) * 100);
    }

    #[test]
    fn test_catalogue_item_weights() {
        let row = ProductRow {
            id: Uuid::nil(), name: "Rope Chain".into(), category: "chains".into(), description: None, base_weight: Decimal::new(155, 1),
            purity_percent: Decimal::new(925, 1), making_charges: Decimal::new(250, 0), wastage_percent: Decimal::new(5, 0),
            available_sizes: vec![], stock_quantity: 0, is_active: true, created_at: chrono::Utc::now(), updated_at: chrono::Utc::now(),
        };
        let pricing = PricingSnapshot::new(Decimal::new(7550, 2), Decimal::new(25, 1)).unwrap();
        let item = price(row, &pricing).unwrap();
        assert_eq!(item.unit_price.amount(), Decimal::new(146150, 2));
        assert_eq!(item.pure_weight, Decimal::new(143375, 4));
        assert_eq!(item.wastage_weight, Decimal::new(775, 3));
        assert!(!item.in_stock);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["name"], "Rope Chain");
        assert_eq!(json["in_stock"], false);
    }

    #[test]
    fn test_validation_rejects_blank_name() {
        let attrs: ProductAttrs = serde_json::from_value(serde_json::json!({
            "name": "", "category": "anklets", "base_weight": "8.5", "making_charges": 180
        })).unwrap();
        assert!(matches!(validated(&attrs), Err(PortalError::BadRequest(_))));
    }

    #[test]
    fn test_attrs_defaults() {
        let attrs: ProductAttrs = serde_json::from_value(serde_json::json!({
            "name": "Payal", "category": "anklets", "base_weight": "8.5", "making_charges": 180
        })).unwrap();
        assert_eq!(attrs.purity_percent, Decimal::ONE_HUNDRED);
        assert_eq!(attrs.stock_quantity, 0);
        assert!(validated(&attrs).is_ok());
    }
}
