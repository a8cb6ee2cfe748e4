use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_products: i64,
    pub active_products: i64,
    pub processing_orders: i64,
    pub shipped_orders: i64,
    pub delivered_orders: i64,
    pub low_stock_products: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PopularProduct {
    pub product: Product,
    pub total_sold: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PopularProductList {
    pub items: Vec<PopularProduct>,
}
