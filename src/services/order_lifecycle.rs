//! Rules shared by every order entry point: aggregates over the item
//! snapshots, which status moves each role may make, and the side effects a
//! move has on dates and stock.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    entity::{
        OrderItems, Orders, order_items,
        orders::{ActiveModel as OrderActiveModel, Model as OrderModel},
    },
    error::{AppError, AppResult},
    services::product_service::restore_stock,
    status::OrderStatus,
};

/// Estimated delivery set when an order is placed.
pub const PLACED_DELIVERY_DAYS: i64 = 5;
/// Estimated delivery filled in on shipping when none was set.
pub const SHIPPED_DELIVERY_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemFigures {
    pub quantity: i32,
    pub price: Decimal,
    pub eco_score: Option<Decimal>,
    pub material_co2: Option<Decimal>,
    pub shipping_co2: Option<Decimal>,
}

impl From<&order_items::Model> for ItemFigures {
    fn from(item: &order_items::Model) -> Self {
        ItemFigures {
            quantity: item.quantity,
            price: item.price,
            eco_score: item.eco_score,
            material_co2: item.material_co2,
            shipping_co2: item.shipping_co2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAggregates {
    pub total_amount: Decimal,
    pub total_eco_score: Decimal,
    pub total_co2_footprint: Decimal,
}

impl OrderAggregates {
    /// The eco score is the unit-weighted mean, rounded half-up to one
    /// decimal. Missing metrics count as zero.
    pub fn compute(items: &[ItemFigures]) -> Self {
        let mut total_amount = Decimal::ZERO;
        let mut eco_sum = Decimal::ZERO;
        let mut co2 = Decimal::ZERO;
        let mut units: i64 = 0;

        for item in items {
            let qty = Decimal::from(item.quantity);
            total_amount += item.price * qty;
            eco_sum += item.eco_score.unwrap_or_default() * qty;
            co2 += (item.material_co2.unwrap_or_default() + item.shipping_co2.unwrap_or_default())
                * qty;
            units += i64::from(item.quantity);
        }

        let divisor = Decimal::from(units.max(1));
        let total_eco_score = (eco_sum / divisor)
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);

        OrderAggregates {
            total_amount,
            total_eco_score,
            total_co2_footprint: co2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl StatusChange {
    fn entering(&self, status: OrderStatus) -> bool {
        self.to == status && self.from != status
    }

    pub fn sets_shipped_date(&self) -> bool {
        self.entering(OrderStatus::Shipped)
    }

    pub fn sets_delivered_date(&self) -> bool {
        self.entering(OrderStatus::Delivered)
    }

    pub fn restores_stock(&self) -> bool {
        self.entering(OrderStatus::Cancelled)
    }
}

/// Admins may move an order between any two statuses.
pub fn admin_transition(from: OrderStatus, to: OrderStatus) -> StatusChange {
    StatusChange { from, to }
}

pub fn consumer_transition(from: OrderStatus, to: OrderStatus) -> AppResult<StatusChange> {
    if !matches!(from, OrderStatus::Processing | OrderStatus::Shipped) {
        return Err(AppError::invalid_state(format!(
            "Order status cannot be changed from {from}. Orders can only be marked as delivered or cancelled if they are in processing or shipped status."
        )));
    }

    match to {
        OrderStatus::Cancelled => Ok(StatusChange { from, to }),
        OrderStatus::Delivered if from == OrderStatus::Shipped => Ok(StatusChange { from, to }),
        OrderStatus::Delivered => Err(AppError::invalid_state(
            "Order can only be marked as delivered if it's already shipped",
        )),
        _ => Err(AppError::invalid_state(
            "Invalid status transition. Consumers can only mark orders as delivered or cancelled.",
        )),
    }
}

pub fn consumer_cancel(from: OrderStatus) -> AppResult<StatusChange> {
    if matches!(from, OrderStatus::Delivered | OrderStatus::Cancelled) {
        return Err(AppError::invalid_state(format!(
            "Order cannot be cancelled in current status: {from}"
        )));
    }
    Ok(StatusChange {
        from,
        to: OrderStatus::Cancelled,
    })
}

/// After a seller updated item statuses, the order follows only when every
/// item is SHIPPED.
pub fn rollup_after_seller_update(
    order_status: OrderStatus,
    item_statuses: &[OrderStatus],
) -> Option<StatusChange> {
    let all_shipped =
        !item_statuses.is_empty() && item_statuses.iter().all(|s| *s == OrderStatus::Shipped);
    if all_shipped && order_status != OrderStatus::Shipped {
        Some(StatusChange {
            from: order_status,
            to: OrderStatus::Shipped,
        })
    } else {
        None
    }
}

pub fn generate_tracking_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("TRK{}{}", now.timestamp_millis(), suffix[..8].to_uppercase())
}

pub fn parse_stored_status(raw: &str) -> AppResult<OrderStatus> {
    raw.parse::<OrderStatus>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt order row: {e}")))
}

pub(crate) fn order_not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("Order not found with id: {id}"))
}

/// Loads an order with `FOR UPDATE` so concurrent transitions serialize.
pub(crate) async fn lock_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(order_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| order_not_found(order_id))
}

pub(crate) async fn load_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<order_items::Model>> {
    Ok(OrderItems::find()
        .filter(order_items::Column::OrderId.eq(order_id))
        .order_by_asc(order_items::Column::CreatedAt)
        .order_by_asc(order_items::Column::Id)
        .all(conn)
        .await?)
}

pub(crate) async fn restore_order_stock<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<()> {
    for item in load_items(conn, order_id).await? {
        restore_stock(conn, item.product_id, item.quantity).await?;
    }
    tracing::info!(order_id = %order_id, "order stock restored");
    Ok(())
}

/// Writes the status with its date and stock side effects.
pub(crate) async fn apply_status_change<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    change: StatusChange,
) -> AppResult<OrderModel> {
    let now = Utc::now();
    let order_id = order.id;
    let has_estimate = order.estimated_delivery.is_some();

    let mut active: OrderActiveModel = order.into();
    active.status = Set(change.to.as_str().to_string());
    if change.sets_shipped_date() {
        active.shipped_date = Set(Some(now.fixed_offset()));
        if !has_estimate {
            active.estimated_delivery =
                Set(Some((now + Duration::days(SHIPPED_DELIVERY_DAYS)).fixed_offset()));
        }
    }
    if change.sets_delivered_date() {
        active.delivered_date = Set(Some(now.fixed_offset()));
    }
    active.updated_at = Set(now.fixed_offset());
    let updated = active.update(conn).await?;

    if change.restores_stock() {
        restore_order_stock(conn, order_id).await?;
    }

    tracing::info!(
        order_id = %order_id,
        from = %change.from,
        to = %change.to,
        "order status changed"
    );
    Ok(updated)
}

/// Recomputes and stores the aggregates from the order's current items.
pub(crate) async fn recompute_aggregates<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
) -> AppResult<(OrderModel, Vec<order_items::Model>)> {
    let items = load_items(conn, order.id).await?;
    let figures: Vec<ItemFigures> = items.iter().map(ItemFigures::from).collect();
    let aggregates = OrderAggregates::compute(&figures);

    let mut active: OrderActiveModel = order.into();
    active.total_amount = Set(aggregates.total_amount);
    active.total_eco_score = Set(Some(aggregates.total_eco_score));
    active.total_co2_footprint = Set(Some(aggregates.total_co2_footprint));
    active.updated_at = Set(Utc::now().fixed_offset());
    let order = active.update(conn).await?;

    Ok((order, items))
}
