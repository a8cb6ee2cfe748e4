use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Order, OrderItem};

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(max = 500, message = "Shipping address is too long"))]
    pub shipping_address: Option<String>,
    #[validate(length(max = 500, message = "Billing address is too long"))]
    pub billing_address: Option<String>,
    #[validate(length(max = 1000, message = "Notes are too long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BuyNowQuery {
    pub quantity: Option<i32>,
}

/// Raw status string; parsed into `OrderStatus` before reaching a service.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecentOrdersQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct UserOrderStats {
    pub total_orders: i64,
    pub total_spent: Decimal,
    pub average_eco_score: Decimal,
    pub total_items_purchased: i64,
}
