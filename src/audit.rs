use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Mutations that leave an audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserRegister,
    UserLogin,
    UserStatusChange,
    UserRoleChange,
    ProductCreate,
    ProductUpdate,
    ProductStock,
    ProductStatus,
    ProductRating,
    ProductDelete,
    InventoryAdjust,
    CartAdd,
    CartUpdate,
    CartRemove,
    CartClear,
    OrderCreate,
    OrderStatus,
    OrderItemStatus,
    OrderCancel,
}

impl AuditAction {
    pub fn name(&self) -> &'static str {
        match self {
            AuditAction::UserRegister => "user_register",
            AuditAction::UserLogin => "user_login",
            AuditAction::UserStatusChange => "user_status_update",
            AuditAction::UserRoleChange => "user_role_update",
            AuditAction::ProductCreate => "product_create",
            AuditAction::ProductUpdate => "product_update",
            AuditAction::ProductStock => "product_stock",
            AuditAction::ProductStatus => "product_status",
            AuditAction::ProductRating => "product_rating",
            AuditAction::ProductDelete => "product_delete",
            AuditAction::InventoryAdjust => "inventory_adjust",
            AuditAction::CartAdd => "cart_add",
            AuditAction::CartUpdate => "cart_update",
            AuditAction::CartRemove => "cart_remove",
            AuditAction::CartClear => "cart_clear",
            AuditAction::OrderCreate => "order_create",
            AuditAction::OrderStatus => "order_status_update",
            AuditAction::OrderItemStatus => "order_item_status_update",
            AuditAction::OrderCancel => "order_cancel",
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            AuditAction::UserRegister
            | AuditAction::UserLogin
            | AuditAction::UserStatusChange
            | AuditAction::UserRoleChange => "users",
            AuditAction::ProductCreate
            | AuditAction::ProductUpdate
            | AuditAction::ProductStock
            | AuditAction::ProductStatus
            | AuditAction::ProductRating
            | AuditAction::ProductDelete
            | AuditAction::InventoryAdjust => "products",
            AuditAction::CartAdd
            | AuditAction::CartUpdate
            | AuditAction::CartRemove
            | AuditAction::CartClear => "carts",
            AuditAction::OrderCreate
            | AuditAction::OrderStatus
            | AuditAction::OrderCancel => "orders",
            AuditAction::OrderItemStatus => "order_items",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    metadata: Option<Value>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(action.name())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Audit writes run after the business transaction committed; a failure is
/// logged and never surfaces to the caller.
pub async fn record(pool: &DbPool, user_id: Uuid, action: AuditAction, metadata: Value) {
    if let Err(err) = log_audit(pool, Some(user_id), action, Some(metadata)).await {
        tracing::warn!(error = %err, action = action.name(), "audit log failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_map_to_resources() {
        assert_eq!(AuditAction::OrderCancel.name(), "order_cancel");
        assert_eq!(AuditAction::OrderCancel.resource(), "orders");
        assert_eq!(AuditAction::CartClear.resource(), "carts");
        assert_eq!(AuditAction::OrderItemStatus.resource(), "order_items");
        assert_eq!(AuditAction::InventoryAdjust.resource(), "products");
        assert_eq!(AuditAction::UserStatusChange.resource(), "users");
    }
}
