use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::products::{
        ProductList, ProductRequest, ProductTypeList, RatingUpdateRequest, StatusUpdateRequest,
        StockUpdateRequest,
    },
    error::AppResult,
    extract::ValidatedJson,
    middleware::auth::AuthUser,
    models::Product,
    response::ApiResponse,
    routes::params::{LimitQuery, LowStockQuery, ProductQuery},
    services::product_service::{self, DEFAULT_TOP_ECO_LIMIT},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/types", get(list_types))
        .route("/top-eco", get(top_eco))
        .route("/low-stock", get(list_low_stock))
        .route("/mine", get(list_my_products))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{id}/stock", patch(update_stock))
        .route("/{id}/status", patch(update_status))
        .route("/{id}/rating", patch(update_rating))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search name, description or type"),
        ("product_type" = Option<String>, Query, description = "Filter by product type"),
        ("min_price" = Option<String>, Query, description = "Minimum price"),
        ("max_price" = Option<String>, Query, description = "Maximum price"),
        ("min_eco_score" = Option<String>, Query, description = "Minimum eco score"),
        ("max_eco_score" = Option<String>, Query, description = "Maximum eco score"),
        ("sort_by" = Option<String>, Query, description = "created_at, price, name, eco_score"),
        ("sort_order" = Option<String>, Query, description = "asc or desc"),
    ),
    responses(
        (status = 200, description = "List active products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/types",
    responses(
        (status = 200, description = "Distinct product types", body = ApiResponse<ProductTypeList>)
    ),
    tag = "Products"
)]
pub async fn list_types(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ProductTypeList>>> {
    let resp = product_service::list_types(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/top-eco",
    params(
        ("limit" = Option<u64>, Query, description = "Number of products, default 10"),
    ),
    responses(
        (status = 200, description = "Products with eco score of at least 4.0", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn top_eco(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::top_eco(&state, query.normalize(DEFAULT_TOP_ECO_LIMIT)).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/low-stock",
    params(
        ("threshold" = Option<i32>, Query, description = "Stock threshold, default 10"),
    ),
    responses(
        (status = 200, description = "Active products at or below the threshold", body = ApiResponse<ProductList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_low_stock(&state, &user, query.threshold).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/mine",
    responses(
        (status = 200, description = "Products owned by the caller", body = ApiResponse<ProductList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn list_my_products(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_seller_products(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<ProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/products/{id}/stock",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = StockUpdateRequest,
    responses(
        (status = 200, description = "Stock set", body = ApiResponse<Product>),
        (status = 400, description = "Negative stock"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<StockUpdateRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_stock(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/products/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status set", body = ApiResponse<Product>),
        (status = 400, description = "Unknown status"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdateRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/products/{id}/rating",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = RatingUpdateRequest,
    responses(
        (status = 200, description = "Rating set", body = ApiResponse<Product>),
        (status = 400, description = "Rating outside 0 to 5"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_rating(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RatingUpdateRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_rating(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deactivated"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}
