use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::orders::{OrderList, OrderWithItems},
    entity::{Orders, orders::Column as OrderCol},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        order_lifecycle::{self, admin_transition, lock_order, order_not_found, parse_stored_status},
        order_service::{order_view, with_items},
    },
    state::AppState,
    status::OrderStatus,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse()?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::OrderDate),
        SortOrder::Desc => finder.order_by_desc(OrderCol::OrderDate),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = with_items(&state.orm, orders).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn list_orders_by_status(
    state: &AppState,
    user: &AuthUser,
    status: OrderStatus,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;

    let orders = Orders::find()
        .filter(OrderCol::Status.eq(status.as_str()))
        .order_by_desc(OrderCol::OrderDate)
        .all(&state.orm)
        .await?;
    let items = with_items(&state.orm, orders).await?;

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| order_not_found(id))?;

    let items = order_lifecycle::load_items(&state.orm, order.id).await?;
    Ok(ApiResponse::success("Order", order_view(order, items), Some(Meta::empty())))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    status: OrderStatus,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    let order = lock_order(&txn, id).await?;
    let change = admin_transition(parse_stored_status(&order.status)?, status);
    let order = order_lifecycle::apply_status_change(&txn, order, change).await?;
    let items = order_lifecycle::load_items(&txn, order.id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderStatus,
        serde_json::json!({
            "order_id": id,
            "from": change.from.as_str(),
            "to": change.to.as_str(),
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order status updated",
        order_view(order, items),
        Some(Meta::empty()),
    ))
}
