use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::orders::{OrderList, OrderWithItems},
    entity::{OrderItems, Orders, Products, order_items, orders::Column as OrderCol, products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_seller_or_admin},
    response::{ApiResponse, Meta},
    services::{
        order_lifecycle::{self, lock_order, parse_stored_status, rollup_after_seller_update},
        order_service::{order_view, with_items},
    },
    state::AppState,
    status::OrderStatus,
};

/// Orders that contain at least one of the seller's products, newest first.
pub async fn list_seller_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_seller_or_admin(user)?;

    let product_ids: Vec<Uuid> = Products::find()
        .select_only()
        .column(products::Column::Id)
        .filter(products::Column::SellerId.eq(user.user_id))
        .into_tuple()
        .all(&state.orm)
        .await?;
    if product_ids.is_empty() {
        return Ok(ApiResponse::success(
            "Seller orders",
            OrderList { items: Vec::new() },
            Some(Meta::total(0)),
        ));
    }

    let order_ids: Vec<Uuid> = OrderItems::find()
        .select_only()
        .column(order_items::Column::OrderId)
        .distinct()
        .filter(order_items::Column::ProductId.is_in(product_ids))
        .into_tuple()
        .all(&state.orm)
        .await?;

    let orders = Orders::find()
        .filter(OrderCol::Id.is_in(order_ids))
        .order_by_desc(OrderCol::OrderDate)
        .all(&state.orm)
        .await?;
    let items = with_items(&state.orm, orders).await?;

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Seller orders", OrderList { items }, Some(meta)))
}

/// Sets the status of the seller's own items in an order. The order itself
/// only follows when every item ends up SHIPPED.
pub async fn update_order_status_by_seller(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    status: OrderStatus,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_seller_or_admin(user)?;
    let txn = state.orm.begin().await?;

    let order = lock_order(&txn, order_id).await?;
    let lines = OrderItems::find()
        .filter(order_items::Column::OrderId.eq(order.id))
        .find_also_related(Products)
        .all(&txn)
        .await?;

    let owned: Vec<Uuid> = lines
        .iter()
        .filter(|(_, product)| product.as_ref().is_some_and(|p| p.seller_id == user.user_id))
        .map(|(item, _)| item.id)
        .collect();
    if owned.is_empty() {
        return Err(AppError::access_denied("No items in this order belong to you"));
    }

    OrderItems::update_many()
        .col_expr(order_items::Column::Status, Expr::value(status.as_str()))
        .filter(order_items::Column::Id.is_in(owned.clone()))
        .exec(&txn)
        .await?;

    let item_statuses = lines
        .iter()
        .map(|(item, _)| {
            if owned.contains(&item.id) {
                Ok(status)
            } else {
                parse_stored_status(&item.status)
            }
        })
        .collect::<AppResult<Vec<_>>>()?;

    let order = match rollup_after_seller_update(parse_stored_status(&order.status)?, &item_statuses)
    {
        Some(change) => order_lifecycle::apply_status_change(&txn, order, change).await?,
        None => order,
    };
    let items = order_lifecycle::load_items(&txn, order.id).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order_id,
        seller_id = %user.user_id,
        items = owned.len(),
        status = %status,
        "seller updated order items"
    );
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderItemStatus,
        serde_json::json!({
            "order_id": order_id,
            "items": owned,
            "status": status.as_str(),
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order items updated",
        order_view(order, items),
        Some(Meta::empty()),
    ))
}
