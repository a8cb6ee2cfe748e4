use std::collections::HashMap;

use chrono::{Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::orders::{CreateOrderRequest, OrderList, OrderWithItems, UserOrderStats},
    entity::{
        OrderItems, Orders, Products, order_items,
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel},
        products::Model as ProductModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_consumer_or_admin},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        cart_service::{self, compute_totals},
        ensure_user_exists,
        order_lifecycle::{
            self, PLACED_DELIVERY_DAYS, consumer_cancel, consumer_transition,
            generate_tracking_number, lock_order, order_not_found, parse_stored_status,
        },
        product_service::{product_not_found, take_stock},
    },
    state::AppState,
    status::{OrderStatus, ProductStatus},
};

pub const DEFAULT_RECENT_DAYS: i64 = 30;
const MAX_RECENT_DAYS: i64 = 36_500;

/// One order reduced to what the per-user statistics need.
#[derive(Debug, Clone, Copy)]
pub struct OrderSummary {
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub total_eco_score: Option<Decimal>,
    pub units: i64,
}

/// Spend, eco score and units only count orders that were not cancelled or
/// returned; the order count includes every order.
pub fn summarize_orders(orders: &[OrderSummary]) -> UserOrderStats {
    let kept: Vec<&OrderSummary> = orders.iter().filter(|o| !o.status.is_voided()).collect();

    let total_spent = kept.iter().map(|o| o.total_amount).sum::<Decimal>();
    let eco_sum = kept
        .iter()
        .map(|o| o.total_eco_score.unwrap_or_default())
        .sum::<Decimal>();
    let average_eco_score = if kept.is_empty() {
        Decimal::ZERO
    } else {
        (eco_sum / Decimal::from(kept.len() as i64))
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    };

    UserOrderStats {
        total_orders: orders.len() as i64,
        total_spent,
        average_eco_score,
        total_items_purchased: kept.iter().map(|o| o.units).sum(),
    }
}

pub(crate) fn order_view(order: OrderModel, items: Vec<order_items::Model>) -> OrderWithItems {
    OrderWithItems {
        order: order.into(),
        items: items.into_iter().map(Into::into).collect(),
    }
}

/// Attaches items to a page of orders with one extra query.
pub(crate) async fn with_items<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<OrderWithItems>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut grouped: HashMap<Uuid, Vec<order_items::Model>> = HashMap::new();
    for item in OrderItems::find()
        .filter(order_items::Column::OrderId.is_in(ids))
        .order_by_asc(order_items::Column::CreatedAt)
        .order_by_asc(order_items::Column::Id)
        .all(conn)
        .await?
    {
        grouped.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = grouped.remove(&order.id).unwrap_or_default();
            order_view(order, items)
        })
        .collect())
}

pub(crate) fn ensure_order_owner(user: &AuthUser, order: &OrderModel) -> AppResult<()> {
    if order.user_id != user.user_id {
        return Err(AppError::access_denied("Order does not belong to user"));
    }
    Ok(())
}

/// Inserts the order and its item snapshots, takes the stock and stores the
/// aggregates. Runs inside the caller's transaction.
async fn place_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    lines: &[(ProductModel, i32)],
    request: CreateOrderRequest,
) -> AppResult<(OrderModel, Vec<order_items::Model>)> {
    let now = Utc::now();
    let total = compute_totals(lines.iter().map(|(p, qty)| (p.price, *qty))).total_amount;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        total_amount: Set(total),
        status: Set(OrderStatus::Processing.as_str().to_string()),
        tracking_number: Set(generate_tracking_number(now)),
        order_date: Set(now.fixed_offset()),
        estimated_delivery: Set(Some(
            (now + Duration::days(PLACED_DELIVERY_DAYS)).fixed_offset(),
        )),
        shipped_date: Set(None),
        delivered_date: Set(None),
        total_eco_score: Set(None),
        total_co2_footprint: Set(None),
        shipping_address: Set(request.shipping_address),
        billing_address: Set(request.billing_address),
        notes: Set(request.notes),
        updated_at: Set(now.fixed_offset()),
    }
    .insert(conn)
    .await?;

    for (position, (product, quantity)) in lines.iter().enumerate() {
        // One microsecond apart so items read back in the order they were placed.
        let created_at = now + Duration::microseconds(position as i64);
        order_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(*quantity),
            price: Set(product.price),
            product_name: Set(product.name.clone()),
            product_type: Set(product.product_type.clone()),
            eco_score: Set(product.eco_score),
            material_co2: Set(product.material_co2),
            shipping_co2: Set(product.shipping_co2),
            product_image: Set(product.image.clone()),
            status: Set(OrderStatus::Processing.as_str().to_string()),
            created_at: Set(created_at.fixed_offset()),
        }
        .insert(conn)
        .await?;

        take_stock(conn, product.id, *quantity).await?;
    }

    order_lifecycle::recompute_aggregates(conn, order).await
}

pub async fn create_from_cart(
    state: &AppState,
    user: &AuthUser,
    request: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_consumer_or_admin(user)?;
    let txn = state.orm.begin().await?;
    ensure_user_exists(&txn, user.user_id).await?;

    let cart = cart_service::find_cart(&txn, user.user_id)
        .await?
        .ok_or_else(|| AppError::invalid_state("Cart is empty"))?;
    // Held until commit: a concurrent checkout waits here and then sees an empty cart.
    let cart = cart_service::lock_cart(&txn, cart.id).await?;
    let cart_lines = cart_service::load_lines(&txn, cart.id).await?;
    if cart_lines.is_empty() {
        return Err(AppError::invalid_state("Cart is empty"));
    }
    if !cart_service::validate_cart(&txn, user.user_id).await? {
        return Err(AppError::invalid_state(
            "Cart validation failed. Some items may be out of stock or unavailable.",
        ));
    }

    let lines: Vec<(ProductModel, i32)> = cart_lines
        .into_iter()
        .map(|(item, product)| (product, item.quantity))
        .collect();
    let (order, items) = place_order(&txn, user.user_id, &lines, request).await?;

    cart_service::clear_cart(&txn, cart.id).await?;
    cart_service::refresh_cart(&txn, cart).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        total = %order.total_amount,
        "order placed from cart"
    );
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderCreate,
        serde_json::json!({ "order_id": order.id, "source": "cart" }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        order_view(order, items),
        Some(Meta::empty()),
    ))
}

pub async fn create_for_single_product(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
    request: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_consumer_or_admin(user)?;
    if quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }

    let txn = state.orm.begin().await?;
    ensure_user_exists(&txn, user.user_id).await?;

    let product = Products::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| product_not_found(product_id))?;
    if !ProductStatus::is_active_str(&product.status) {
        return Err(AppError::invalid_state("Product is not available"));
    }
    if product.stock_quantity < quantity {
        return Err(AppError::invalid_state(format!(
            "Insufficient stock. Available: {}",
            product.stock_quantity
        )));
    }

    let (order, items) = place_order(&txn, user.user_id, &[(product, quantity)], request).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, product_id = %product_id, quantity, "buy-now order placed");
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderCreate,
        serde_json::json!({ "order_id": order.id, "source": "buy_now", "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        order_view(order, items),
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| order_not_found(id))?;
    if !user.is_admin() {
        ensure_order_owner(user, &order)?;
    }

    let items = order_lifecycle::load_items(&state.orm, order.id).await?;
    Ok(ApiResponse::success("Order", order_view(order, items), None))
}

pub async fn get_by_tracking(
    state: &AppState,
    user: &AuthUser,
    tracking_number: &str,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(OrderCol::TrackingNumber.eq(tracking_number))
        .one(&state.orm)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!(
                "Order not found with tracking number: {tracking_number}"
            ))
        })?;
    if !user.is_admin() {
        ensure_order_owner(user, &order)?;
    }

    let items = order_lifecycle::load_items(&state.orm, order.id).await?;
    Ok(ApiResponse::success("Order", order_view(order, items), None))
}

pub async fn list_user_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_user_exists(&state.orm, user.user_id).await?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse()?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
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

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_recent(
    state: &AppState,
    user: &AuthUser,
    days: Option<i64>,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_user_exists(&state.orm, user.user_id).await?;
    let days = days.unwrap_or(DEFAULT_RECENT_DAYS);
    if days < 1 {
        return Err(AppError::BadRequest("days must be at least 1".into()));
    }
    let since = (Utc::now() - Duration::days(days.min(MAX_RECENT_DAYS))).fixed_offset();

    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .filter(OrderCol::OrderDate.gte(since))
        .order_by_desc(OrderCol::OrderDate)
        .all(&state.orm)
        .await?;
    let items = with_items(&state.orm, orders).await?;

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Recent orders", OrderList { items }, Some(meta)))
}

pub async fn user_stats(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<UserOrderStats>> {
    ensure_user_exists(&state.orm, user.user_id).await?;

    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut units: HashMap<Uuid, i64> = HashMap::new();
    if !ids.is_empty() {
        let rows: Vec<(Uuid, i32)> = OrderItems::find()
            .select_only()
            .column(order_items::Column::OrderId)
            .column(order_items::Column::Quantity)
            .filter(order_items::Column::OrderId.is_in(ids))
            .into_tuple()
            .all(&state.orm)
            .await?;
        for (order_id, quantity) in rows {
            *units.entry(order_id).or_default() += i64::from(quantity);
        }
    }

    let summaries = orders
        .iter()
        .map(|o| {
            Ok(OrderSummary {
                status: parse_stored_status(&o.status)?,
                total_amount: o.total_amount,
                total_eco_score: o.total_eco_score,
                units: units.get(&o.id).copied().unwrap_or_default(),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Order statistics",
        summarize_orders(&summaries),
        None,
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;
    ensure_user_exists(&txn, user.user_id).await?;

    let order = lock_order(&txn, id).await?;
    ensure_order_owner(user, &order)?;
    let change = consumer_cancel(parse_stored_status(&order.status)?)?;
    let order = order_lifecycle::apply_status_change(&txn, order, change).await?;
    let items = order_lifecycle::load_items(&txn, order.id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderCancel,
        serde_json::json!({ "order_id": id, "from": change.from.as_str() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled",
        order_view(order, items),
        Some(Meta::empty()),
    ))
}

pub async fn update_consumer_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    status: OrderStatus,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;
    ensure_user_exists(&txn, user.user_id).await?;

    let order = lock_order(&txn, id).await?;
    ensure_order_owner(user, &order)?;
    let change = consumer_transition(parse_stored_status(&order.status)?, status)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn summary(status: OrderStatus, total: Decimal, eco: Option<Decimal>, units: i64) -> OrderSummary {
        OrderSummary {
            status,
            total_amount: total,
            total_eco_score: eco,
            units,
        }
    }

    #[test]
    fn stats_exclude_cancelled_and_returned_orders() {
        let stats = summarize_orders(&[
            summary(OrderStatus::Delivered, dec!(20.00), Some(dec!(4.0)), 2),
            summary(OrderStatus::Processing, dec!(10.00), Some(dec!(3.0)), 1),
            summary(OrderStatus::Cancelled, dec!(99.00), Some(dec!(1.0)), 9),
            summary(OrderStatus::Returned, dec!(50.00), Some(dec!(1.0)), 5),
        ]);
        assert_eq!(
            stats,
            UserOrderStats {
                total_orders: 4,
                total_spent: dec!(30.00),
                average_eco_score: dec!(3.5),
                total_items_purchased: 3,
            }
        );
    }

    #[test]
    fn stats_for_user_without_orders() {
        let stats = summarize_orders(&[]);
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.total_spent, Decimal::ZERO);
        assert_eq!(stats.average_eco_score, Decimal::ZERO);
        assert_eq!(stats.total_items_purchased, 0);
    }

    #[test]
    fn only_owner_passes_order_check() {
        let owner = Uuid::new_v4();
        let now = Utc::now().fixed_offset();
        let order = OrderModel {
            id: Uuid::new_v4(),
            user_id: owner,
            total_amount: dec!(1.00),
            status: "PROCESSING".into(),
            tracking_number: "TRK1".into(),
            order_date: now,
            estimated_delivery: None,
            shipped_date: None,
            delivered_date: None,
            total_eco_score: None,
            total_co2_footprint: None,
            shipping_address: None,
            billing_address: None,
            notes: None,
            updated_at: now,
        };
        let me = AuthUser {
            user_id: owner,
            role: crate::status::UserRole::Consumer,
        };
        let other = AuthUser {
            user_id: Uuid::new_v4(),
            role: crate::status::UserRole::Consumer,
        };
        assert!(ensure_order_owner(&me, &order).is_ok());
        assert!(matches!(
            ensure_order_owner(&other, &order),
            Err(AppError::AccessDenied(_))
        ));
    }
}
