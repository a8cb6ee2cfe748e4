use std::collections::HashMap;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    dto::analytics::{DashboardStats, PopularProduct, PopularProductList},
    entity::{Products, products},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin, ensure_seller_or_admin},
    response::{ApiResponse, Meta},
    services::product_service::DEFAULT_LOW_STOCK_THRESHOLD,
    state::AppState,
    status::OrderStatus,
};

pub const DEFAULT_POPULAR_LIMIT: u64 = 10;

#[derive(FromRow)]
struct CatalogCounts {
    total_products: i64,
    active_products: i64,
    low_stock_products: i64,
}

#[derive(FromRow)]
struct OrderCounts {
    processing_orders: i64,
    shipped_orders: i64,
    delivered_orders: i64,
}

#[derive(FromRow)]
struct SoldRow {
    product_id: Uuid,
    total_sold: i64,
}

pub async fn dashboard(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;

    let catalog = sqlx::query_as::<_, CatalogCounts>(
        r#"
        SELECT COUNT(*) AS total_products,
               COUNT(*) FILTER (WHERE LOWER(status) = 'active') AS active_products,
               COUNT(*) FILTER (WHERE LOWER(status) = 'active' AND stock_quantity <= $1)
                   AS low_stock_products
        FROM products
        "#,
    )
    .bind(DEFAULT_LOW_STOCK_THRESHOLD)
    .fetch_one(&state.pool)
    .await?;

    let orders = sqlx::query_as::<_, OrderCounts>(
        r#"
        SELECT COUNT(*) FILTER (WHERE status = $1) AS processing_orders,
               COUNT(*) FILTER (WHERE status = $2) AS shipped_orders,
               COUNT(*) FILTER (WHERE status = $3) AS delivered_orders
        FROM orders
        "#,
    )
    .bind(OrderStatus::Processing.as_str())
    .bind(OrderStatus::Shipped.as_str())
    .bind(OrderStatus::Delivered.as_str())
    .fetch_one(&state.pool)
    .await?;

    let stats = DashboardStats {
        total_products: catalog.total_products,
        active_products: catalog.active_products,
        processing_orders: orders.processing_orders,
        shipped_orders: orders.shipped_orders,
        delivered_orders: orders.delivered_orders,
        low_stock_products: catalog.low_stock_products,
    };
    Ok(ApiResponse::success("Dashboard", stats, None))
}

/// SQL `LIMIT` for the ranking, kept within 1..=100 whatever the caller passes.
fn popular_limit(limit: u64) -> i64 {
    limit.clamp(1, 100) as i64
}

pub async fn popular_products(
    state: &AppState,
    user: &AuthUser,
    limit: u64,
) -> AppResult<ApiResponse<PopularProductList>> {
    ensure_seller_or_admin(user)?;

    let rows = sqlx::query_as::<_, SoldRow>(
        r#"
        SELECT product_id, SUM(quantity)::BIGINT AS total_sold
        FROM order_items
        GROUP BY product_id
        ORDER BY total_sold DESC, product_id
        LIMIT $1
        "#,
    )
    .bind(popular_limit(limit))
    .fetch_all(&state.pool)
    .await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
    let mut by_id: HashMap<Uuid, products::Model> = Products::find()
        .filter(products::Column::Id.is_in(ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let items: Vec<PopularProduct> = rows
        .into_iter()
        .filter_map(|row| {
            by_id.remove(&row.product_id).map(|product| PopularProduct {
                product: product.into(),
                total_sold: row.total_sold,
            })
        })
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Popular products", PopularProductList { items }, Some(meta)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popular_limit_stays_positive_and_bounded() {
        assert_eq!(popular_limit(DEFAULT_POPULAR_LIMIT), 10);
        assert_eq!(popular_limit(0), 1);
        assert_eq!(popular_limit(u64::MAX), 100);
    }
}
