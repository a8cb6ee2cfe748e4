use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        BuyNowQuery, CreateOrderRequest, OrderList, OrderWithItems, RecentOrdersQuery,
        UpdateOrderStatusRequest, UserOrderStats,
    },
    error::AppResult,
    extract::ValidatedJson,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
    status::OrderStatus,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/buy-now/{product_id}", post(buy_now))
        .route("/recent", get(recent_orders))
        .route("/stats", get(order_stats))
        .route("/tracking/{tracking_number}", get(get_by_tracking))
        .route("/{id}", get(get_order))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/status", patch(update_status))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "asc or desc"),
    ),
    responses(
        (status = 200, description = "Caller's orders", body = ApiResponse<OrderList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_user_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order placed from the cart", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Cart empty or not purchasable"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::create_from_cart(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/buy-now/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("quantity" = Option<i32>, Query, description = "Units, default 1"),
    ),
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order placed for one product", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Product unavailable or insufficient stock"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn buy_now(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Query(query): Query<BuyNowQuery>,
    ValidatedJson(payload): ValidatedJson<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let quantity = query.quantity.unwrap_or(1);
    let resp =
        order_service::create_for_single_product(&state, &user, product_id, quantity, payload)
            .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/recent",
    params(
        ("days" = Option<i64>, Query, description = "Look-back window in days, default 30"),
    ),
    responses(
        (status = 200, description = "Caller's recent orders", body = ApiResponse<OrderList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn recent_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RecentOrdersQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_recent(&state, &user, query.days).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/stats",
    responses(
        (status = 200, description = "Caller's order statistics", body = ApiResponse<UserOrderStats>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn order_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserOrderStats>>> {
    let resp = order_service::user_stats(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/tracking/{tracking_number}",
    params(
        ("tracking_number" = String, Path, description = "Tracking number")
    ),
    responses(
        (status = 200, description = "Order by tracking number", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_by_tracking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tracking_number): Path<String>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_by_tracking(&state, &user, &tracking_number).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order cancelled and stock restored", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Order already delivered or cancelled"),
        (status = 403, description = "Order belongs to another user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::cancel_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order marked delivered or cancelled", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Order belongs to another user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let status: OrderStatus = payload.status.parse()?;
    let resp = order_service::update_consumer_order_status(&state, &user, id, status).await?;
    Ok(Json(resp))
}
