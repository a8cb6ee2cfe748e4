use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    order_items::Model as OrderItemModel, orders::Model as OrderModel,
    products::Model as ProductModel, users::Model as UserModel,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub product_type: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub eco_score: Option<Decimal>,
    pub footprint: Option<Decimal>,
    pub material_co2: Option<Decimal>,
    pub shipping_co2: Option<Decimal>,
    pub image: Option<String>,
    pub stock_quantity: i32,
    pub status: String,
    pub seller_id: Uuid,
    pub rating: Decimal,
    pub sales: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: Option<String>,
    pub price: Decimal,
    pub eco_score: Option<Decimal>,
    pub stock_quantity: i32,
    pub quantity: i32,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItem>,
    pub total_amount: Decimal,
    pub total_items: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: Decimal,
    pub status: String,
    pub tracking_number: String,
    pub order_date: DateTime<Utc>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub shipped_date: Option<DateTime<Utc>>,
    pub delivered_date: Option<DateTime<Utc>>,
    pub total_eco_score: Option<Decimal>,
    pub total_co2_footprint: Option<Decimal>,
    pub shipping_address: Option<String>,
    pub billing_address: Option<String>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub product_name: String,
    pub product_type: String,
    pub eco_score: Option<Decimal>,
    pub material_co2: Option<Decimal>,
    pub shipping_co2: Option<Decimal>,
    pub product_image: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        User {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            role: model.role,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<ProductModel> for Product {
    fn from(model: ProductModel) -> Self {
        Product {
            id: model.id,
            name: model.name,
            product_type: model.product_type,
            description: model.description,
            price: model.price,
            eco_score: model.eco_score,
            footprint: model.footprint,
            material_co2: model.material_co2,
            shipping_co2: model.shipping_co2,
            image: model.image,
            stock_quantity: model.stock_quantity,
            status: model.status,
            seller_id: model.seller_id,
            rating: model.rating,
            sales: model.sales,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<OrderModel> for Order {
    fn from(model: OrderModel) -> Self {
        Order {
            id: model.id,
            user_id: model.user_id,
            total_amount: model.total_amount,
            status: model.status,
            tracking_number: model.tracking_number,
            order_date: model.order_date.with_timezone(&Utc),
            estimated_delivery: model.estimated_delivery.map(|dt| dt.with_timezone(&Utc)),
            shipped_date: model.shipped_date.map(|dt| dt.with_timezone(&Utc)),
            delivered_date: model.delivered_date.map(|dt| dt.with_timezone(&Utc)),
            total_eco_score: model.total_eco_score,
            total_co2_footprint: model.total_co2_footprint,
            shipping_address: model.shipping_address,
            billing_address: model.billing_address,
            notes: model.notes,
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<OrderItemModel> for OrderItem {
    fn from(model: OrderItemModel) -> Self {
        OrderItem {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price: model.price,
            product_name: model.product_name,
            product_type: model.product_type,
            eco_score: model.eco_score,
            material_co2: model.material_co2,
            shipping_co2: model.shipping_co2,
            product_image: model.product_image,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
