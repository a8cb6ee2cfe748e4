use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::seller_service,
    state::AppState,
    status::OrderStatus,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_seller_orders))
        .route("/orders/{id}/status", patch(update_item_status))
}

#[utoipa::path(
    get,
    path = "/api/seller/orders",
    responses(
        (status = 200, description = "Orders containing the seller's products", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn list_seller_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = seller_service::list_seller_orders(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/seller/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Seller's items updated", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "No items in the order belong to the seller"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn update_item_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let status: OrderStatus = payload.status.parse()?;
    let resp = seller_service::update_order_status_by_seller(&state, &user, id, status).await?;
    Ok(Json(resp))
}
