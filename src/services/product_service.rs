use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::products::{
        InventoryAdjustRequest, ProductList, ProductRequest, ProductTypeList, RatingUpdateRequest,
        StatusUpdateRequest, StockUpdateRequest,
    },
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_seller_or_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
    status::ProductStatus,
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;
pub const DEFAULT_TOP_ECO_LIMIT: u64 = 10;

fn eco_friendly_floor() -> Decimal {
    Decimal::new(40, 1)
}

/// Case-insensitive match on the free-text status column.
fn active_only() -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(Column::Status))).eq(ProductStatus::Active.as_str())
}

pub(crate) fn product_not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("Product not found with id: {id}"))
}

pub fn validate_rating(rating: Decimal) -> AppResult<()> {
    if rating < Decimal::ZERO || rating > Decimal::from(5) {
        return Err(AppError::invalid_state("Rating must be between 0 and 5"));
    }
    Ok(())
}

/// Stock after applying a signed adjustment, refusing to go below zero.
pub fn adjusted_stock(current: i32, delta: i32) -> AppResult<i32> {
    match current.checked_add(delta) {
        Some(next) if next >= 0 => Ok(next),
        _ => Err(AppError::invalid_state(format!(
            "Inventory adjustment would make stock negative (current {current}, delta {delta})"
        ))),
    }
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(active_only());

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern.clone()))
                .add(Expr::col(Column::ProductType).ilike(pattern)),
        );
    }

    if let Some(product_type) = query.product_type.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::ProductType).ilike(product_type.clone()));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    if let Some(min_eco) = query.min_eco_score {
        condition = condition.add(Column::EcoScore.gte(min_eco));
    }

    if let Some(max_eco) = query.max_eco_score {
        condition = condition.add(Column::EcoScore.lte(max_eco));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
        ProductSortBy::EcoScore => Column::EcoScore,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|p| ProductStatus::is_active_str(&p.status))
        .ok_or_else(|| product_not_found(id))?;
    Ok(ApiResponse::success("Product", product.into(), None))
}

pub async fn list_types(state: &AppState) -> AppResult<ApiResponse<ProductTypeList>> {
    let items: Vec<String> = Products::find()
        .select_only()
        .column(Column::ProductType)
        .distinct()
        .filter(active_only())
        .order_by_asc(Column::ProductType)
        .into_tuple()
        .all(&state.orm)
        .await?;

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Product types", ProductTypeList { items }, Some(meta)))
}

pub async fn top_eco(state: &AppState, limit: u64) -> AppResult<ApiResponse<ProductList>> {
    let items: Vec<Product> = Products::find()
        .filter(active_only())
        .filter(Column::EcoScore.gte(eco_friendly_floor()))
        .order_by_desc(Column::EcoScore)
        .order_by_desc(Column::Rating)
        .limit(limit)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Top eco-friendly products", ProductList { items }, Some(meta)))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    threshold: Option<i32>,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_seller_or_admin(user)?;
    let threshold = threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);

    let items: Vec<Product> = Products::find()
        .filter(active_only())
        .filter(Column::StockQuantity.lte(threshold))
        .order_by_asc(Column::StockQuantity)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Low stock products", ProductList { items }, Some(meta)))
}

pub async fn list_seller_products(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_seller_or_admin(user)?;

    let items: Vec<Product> = Products::find()
        .filter(Column::SellerId.eq(user.user_id))
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Seller products", ProductList { items }, Some(meta)))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: ProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_seller_or_admin(user)?;

    let now = Utc::now().fixed_offset();
    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        product_type: Set(payload.product_type),
        description: Set(payload.description),
        price: Set(payload.price),
        eco_score: Set(payload.eco_score),
        footprint: Set(payload.footprint),
        material_co2: Set(payload.material_co2),
        shipping_co2: Set(payload.shipping_co2),
        image: Set(payload.image),
        stock_quantity: Set(payload.stock_quantity),
        status: Set(ProductStatus::Active.as_str().to_string()),
        seller_id: Set(user.user_id),
        rating: Set(Decimal::ZERO),
        sales: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let product = active.insert(&state.orm).await?;

    tracing::info!(product_id = %product.id, seller_id = %user.user_id, "product created");
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductCreate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product.into(),
        Some(Meta::empty()),
    ))
}

/// Loads a product the caller may modify: admins any, sellers only their own.
async fn find_owned_product<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ProductModel> {
    ensure_seller_or_admin(user)?;
    let product = Products::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| product_not_found(id))?;

    if !user.is_admin() && product.seller_id != user.user_id {
        return Err(AppError::access_denied("Product does not belong to seller"));
    }
    Ok(product)
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing = find_owned_product(&state.orm, user, id).await?;
    let status = payload
        .status
        .as_deref()
        .map(str::parse::<ProductStatus>)
        .transpose()?;

    let mut active: ActiveModel = existing.into();
    active.name = Set(payload.name);
    active.product_type = Set(payload.product_type);
    active.description = Set(payload.description);
    active.price = Set(payload.price);
    active.eco_score = Set(payload.eco_score);
    active.footprint = Set(payload.footprint);
    active.material_co2 = Set(payload.material_co2);
    active.shipping_co2 = Set(payload.shipping_co2);
    active.image = Set(payload.image);
    active.stock_quantity = Set(payload.stock_quantity);
    if let Some(status) = status {
        active.status = Set(status.as_str().to_string());
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductUpdate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        product.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_stock(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: StockUpdateRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing = find_owned_product(&state.orm, user, id).await?;

    let mut active: ActiveModel = existing.into();
    active.stock_quantity = Set(payload.stock_quantity);
    active.updated_at = Set(Utc::now().fixed_offset());
    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductStock,
        serde_json::json!({ "product_id": product.id, "stock_quantity": product.stock_quantity }),
    )
    .await;

    Ok(ApiResponse::success("Stock updated", product.into(), Some(Meta::empty())))
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: StatusUpdateRequest,
) -> AppResult<ApiResponse<Product>> {
    let status: ProductStatus = payload.status.parse()?;
    let existing = find_owned_product(&state.orm, user, id).await?;

    let mut active: ActiveModel = existing.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().fixed_offset());
    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductStatus,
        serde_json::json!({ "product_id": product.id, "status": status.as_str() }),
    )
    .await;

    Ok(ApiResponse::success("Status updated", product.into(), Some(Meta::empty())))
}

pub async fn update_rating(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: RatingUpdateRequest,
) -> AppResult<ApiResponse<Product>> {
    validate_rating(payload.rating)?;
    let existing = find_owned_product(&state.orm, user, id).await?;

    let mut active: ActiveModel = existing.into();
    active.rating = Set(payload.rating);
    active.updated_at = Set(Utc::now().fixed_offset());
    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductRating,
        serde_json::json!({ "product_id": product.id, "rating": payload.rating }),
    )
    .await;

    Ok(ApiResponse::success("Rating updated", product.into(), Some(Meta::empty())))
}

/// Products are never removed: order items keep referencing them.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = find_owned_product(&state.orm, user, id).await?;

    let mut active: ActiveModel = existing.into();
    active.status = Set(ProductStatus::Inactive.as_str().to_string());
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(&state.orm).await?;

    tracing::info!(product_id = %id, "product deactivated");
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductDelete,
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| product_not_found(id))?;
    let next = adjusted_stock(product.stock_quantity, payload.delta)?;

    // A conditional update keeps concurrent checkouts from being overwritten.
    let result = Products::update_many()
        .col_expr(
            Column::StockQuantity,
            Expr::col(Column::StockQuantity).add(payload.delta),
        )
        .col_expr(Column::UpdatedAt, Expr::current_timestamp().into())
        .filter(Column::Id.eq(id))
        .filter(Expr::expr(Expr::col(Column::StockQuantity).add(payload.delta)).gte(0))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::invalid_state(format!(
            "Inventory adjustment would make stock negative (current {}, delta {})",
            product.stock_quantity, payload.delta
        )));
    }

    let updated = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| product_not_found(id))?;

    tracing::info!(product_id = %id, delta = payload.delta, expected = next, "inventory adjusted");
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::InventoryAdjust,
        serde_json::json!({ "product_id": id, "delta": payload.delta }),
    )
    .await;

    Ok(ApiResponse::success("Inventory adjusted", updated.into(), Some(Meta::empty())))
}

/// Decrements stock and bumps sales in one conditional statement. Fails with
/// InvalidState when fewer than `quantity` units remain.
pub(crate) async fn take_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<()> {
    let result = Products::update_many()
        .col_expr(
            Column::StockQuantity,
            Expr::col(Column::StockQuantity).sub(quantity),
        )
        .col_expr(Column::Sales, Expr::col(Column::Sales).add(quantity))
        .col_expr(Column::UpdatedAt, Expr::current_timestamp().into())
        .filter(Column::Id.eq(product_id))
        .filter(Column::StockQuantity.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        let product = Products::find_by_id(product_id)
            .one(conn)
            .await?
            .ok_or_else(|| product_not_found(product_id))?;
        return Err(AppError::invalid_state(format!(
            "Insufficient stock for product: {}",
            product.name
        )));
    }
    Ok(())
}

/// Puts units back on the shelf. Sales stay as recorded.
pub(crate) async fn restore_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<()> {
    let result = Products::update_many()
        .col_expr(
            Column::StockQuantity,
            Expr::col(Column::StockQuantity).add(quantity),
        )
        .col_expr(Column::UpdatedAt, Expr::current_timestamp().into())
        .filter(Column::Id.eq(product_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        tracing::warn!(product_id = %product_id, quantity, "stock restore skipped, product missing");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(validate_rating(dec!(0)).is_ok());
        assert!(validate_rating(dec!(3.2)).is_ok());
        assert!(validate_rating(dec!(5.0)).is_ok());
    }

    #[test]
    fn rating_outside_range_is_rejected() {
        let err = validate_rating(dec!(5.5)).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(err.to_string(), "Rating must be between 0 and 5");
        assert!(validate_rating(dec!(-0.1)).is_err());
    }

    #[test]
    fn inventory_adjustment_never_goes_negative() {
        assert_eq!(adjusted_stock(5, 3).unwrap(), 8);
        assert_eq!(adjusted_stock(5, -5).unwrap(), 0);
        assert!(matches!(adjusted_stock(5, -6), Err(AppError::InvalidState(_))));
        assert!(adjusted_stock(i32::MAX, 1).is_err());
    }

    #[test]
    fn eco_friendly_floor_is_four() {
        assert_eq!(eco_friendly_floor(), dec!(4.0));
    }
}
