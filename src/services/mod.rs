use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use crate::{
    entity::Users,
    error::{AppError, AppResult},
};

pub mod admin_service;
pub mod analytics_service;
pub mod auth_service;
pub mod cart_service;
pub mod order_lifecycle;
pub mod order_service;
pub mod product_service;
pub mod seller_service;

/// Every core operation starts by confirming the caller still exists.
pub(crate) async fn ensure_user_exists<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<()> {
    match Users::find_by_id(user_id).one(conn).await? {
        Some(_) => Ok(()),
        None => Err(AppError::not_found(format!("User not found with id: {user_id}"))),
    }
}
