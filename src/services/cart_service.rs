use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::cart::{AddToCartRequest, CartCount, CartValidation, UpdateCartItemRequest},
    entity::{
        CartItems, Carts, Products, cart_items,
        carts::{self, Model as CartModel},
        products::Model as ProductModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_consumer_or_admin},
    models::{Cart, CartItem},
    response::{ApiResponse, Meta},
    services::{ensure_user_exists, product_service::product_not_found},
    state::AppState,
    status::ProductStatus,
};

pub(crate) type CartLine = (cart_items::Model, ProductModel);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub total_amount: Decimal,
    pub total_items: i32,
}

/// Totals are always derived from the lines, never accumulated.
pub fn compute_totals<I>(lines: I) -> CartTotals
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines.into_iter().fold(
        CartTotals {
            total_amount: Decimal::ZERO,
            total_items: 0,
        },
        |acc, (price, quantity)| CartTotals {
            total_amount: acc.total_amount + price * Decimal::from(quantity),
            total_items: acc.total_items.saturating_add(quantity),
        },
    )
}

/// Whether `requested` more units of a product can sit in a cart that
/// already holds `in_cart` of them.
pub fn check_addable(product: &ProductModel, in_cart: i32, requested: i32) -> AppResult<()> {
    if !ProductStatus::is_active_str(&product.status) {
        return Err(AppError::invalid_state(format!(
            "Product is not available: {}",
            product.name
        )));
    }
    let wanted = in_cart.checked_add(requested);
    if wanted.is_none_or(|total| product.stock_quantity < total) {
        return Err(AppError::invalid_state(format!(
            "Insufficient stock. Available: {}",
            product.stock_quantity
        )));
    }
    Ok(())
}

pub fn line_is_purchasable(product: &ProductModel, quantity: i32) -> bool {
    ProductStatus::is_active_str(&product.status) && product.stock_quantity >= quantity
}

fn line_view((item, product): CartLine) -> CartItem {
    let subtotal = product.price * Decimal::from(item.quantity);
    CartItem {
        id: item.id,
        product_id: product.id,
        product_name: product.name,
        product_image: product.image,
        price: product.price,
        eco_score: product.eco_score,
        stock_quantity: product.stock_quantity,
        quantity: item.quantity,
        subtotal,
        created_at: item.created_at.with_timezone(&Utc),
    }
}

pub(crate) async fn find_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<Option<CartModel>> {
    Ok(Carts::find()
        .filter(carts::Column::UserId.eq(user_id))
        .one(conn)
        .await?)
}

/// Finds the user's cart, creating an empty one on first use. Concurrent
/// first calls race on the unique user_id and both end up with the same row.
pub(crate) async fn get_or_create<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<CartModel> {
    if let Some(cart) = find_cart(conn, user_id).await? {
        return Ok(cart);
    }

    let now = Utc::now().fixed_offset();
    let active = carts::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        total_amount: Set(Decimal::ZERO),
        total_items: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Carts::insert(active)
        .on_conflict(
            OnConflict::column(carts::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    tracing::debug!(user_id = %user_id, "cart created");
    find_cart(conn, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Cart not found for user: {user_id}")))
}

/// Re-reads the cart row under a row lock so mutations of one cart serialize.
pub(crate) async fn lock_cart<C: ConnectionTrait>(conn: &C, cart_id: Uuid) -> AppResult<CartModel> {
    Carts::find_by_id(cart_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Cart not found with id: {cart_id}")))
}

pub(crate) async fn load_lines<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> AppResult<Vec<CartLine>> {
    let rows = CartItems::find()
        .filter(cart_items::Column::CartId.eq(cart_id))
        .order_by_asc(cart_items::Column::CreatedAt)
        .find_also_related(Products)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(item, product)| product.map(|p| (item, p)))
        .collect())
}

/// Recomputes totals from the current lines and stores them on the cart row.
pub(crate) async fn refresh_cart<C: ConnectionTrait>(conn: &C, cart: CartModel) -> AppResult<Cart> {
    let lines = load_lines(conn, cart.id).await?;
    let totals = compute_totals(
        lines
            .iter()
            .map(|(item, product)| (product.price, item.quantity)),
    );

    let mut active: carts::ActiveModel = cart.into();
    active.total_amount = Set(totals.total_amount);
    active.total_items = Set(totals.total_items);
    active.updated_at = Set(Utc::now().fixed_offset());
    let cart = active.update(conn).await?;

    Ok(Cart {
        id: cart.id,
        user_id: cart.user_id,
        items: lines.into_iter().map(line_view).collect(),
        total_amount: cart.total_amount,
        total_items: cart.total_items,
        created_at: cart.created_at.with_timezone(&Utc),
        updated_at: cart.updated_at.with_timezone(&Utc),
    })
}

pub(crate) async fn clear_cart<C: ConnectionTrait>(conn: &C, cart_id: Uuid) -> AppResult<u64> {
    let result = CartItems::delete_many()
        .filter(cart_items::Column::CartId.eq(cart_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub(crate) async fn validate_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<bool> {
    let Some(cart) = find_cart(conn, user_id).await? else {
        return Ok(false);
    };
    let lines = load_lines(conn, cart.id).await?;
    if lines.is_empty() {
        return Ok(false);
    }
    Ok(lines
        .iter()
        .all(|(item, product)| line_is_purchasable(product, item.quantity)))
}

/// Loads a cart item and checks that it sits in the caller's cart.
async fn find_owned_item<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    item_id: Uuid,
) -> AppResult<(cart_items::Model, CartModel)> {
    let item = CartItems::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Cart item not found with id: {item_id}")))?;
    let cart = item
        .find_related(Carts)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Cart not found with id: {}", item.cart_id)))?;

    if cart.user_id != user_id {
        return Err(AppError::access_denied("Cart item does not belong to user"));
    }
    Ok((item, cart))
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    ensure_consumer_or_admin(user)?;
    let txn = state.orm.begin().await?;
    ensure_user_exists(&txn, user.user_id).await?;

    let cart = get_or_create(&txn, user.user_id).await?;
    let cart = refresh_cart(&txn, cart).await?;
    txn.commit().await?;

    let meta = Meta::total(cart.items.len());
    Ok(ApiResponse::success("Cart", cart, Some(meta)))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<Cart>> {
    ensure_consumer_or_admin(user)?;
    if payload.quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }

    let txn = state.orm.begin().await?;
    ensure_user_exists(&txn, user.user_id).await?;

    let product = Products::find_by_id(payload.product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| product_not_found(payload.product_id))?;

    let cart = get_or_create(&txn, user.user_id).await?;
    let cart = lock_cart(&txn, cart.id).await?;

    let existing = CartItems::find()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .filter(cart_items::Column::ProductId.eq(product.id))
        .one(&txn)
        .await?;
    let in_cart = existing.as_ref().map_or(0, |item| item.quantity);
    check_addable(&product, in_cart, payload.quantity)?;

    match existing {
        Some(item) => {
            let quantity = item.quantity + payload.quantity;
            let mut active: cart_items::ActiveModel = item.into();
            active.quantity = Set(quantity);
            active.update(&txn).await?;
        }
        None => {
            cart_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                quantity: Set(payload.quantity),
                created_at: Set(Utc::now().fixed_offset()),
            }
            .insert(&txn)
            .await?;
        }
    }

    let cart = refresh_cart(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::CartAdd,
        serde_json::json!({ "product_id": product.id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("Item added to cart", cart, Some(Meta::empty())))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<Cart>> {
    ensure_consumer_or_admin(user)?;
    if payload.quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }

    let txn = state.orm.begin().await?;
    ensure_user_exists(&txn, user.user_id).await?;

    let (item, cart) = find_owned_item(&txn, user.user_id, item_id).await?;
    let cart = lock_cart(&txn, cart.id).await?;
    let product = Products::find_by_id(item.product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| product_not_found(item.product_id))?;

    if payload.quantity > product.stock_quantity {
        return Err(AppError::invalid_state(format!(
            "Insufficient stock. Available: {}",
            product.stock_quantity
        )));
    }

    let mut active: cart_items::ActiveModel = item.into();
    active.quantity = Set(payload.quantity);
    active.update(&txn).await?;

    let cart = refresh_cart(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::CartUpdate,
        serde_json::json!({ "cart_item_id": item_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("Cart item updated", cart, Some(Meta::empty())))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<Cart>> {
    ensure_consumer_or_admin(user)?;
    let txn = state.orm.begin().await?;
    ensure_user_exists(&txn, user.user_id).await?;

    let (item, cart) = find_owned_item(&txn, user.user_id, item_id).await?;
    let cart = lock_cart(&txn, cart.id).await?;
    item.delete(&txn).await?;

    let cart = refresh_cart(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::CartRemove,
        serde_json::json!({ "cart_item_id": item_id }),
    )
    .await;

    Ok(ApiResponse::success("Item removed from cart", cart, Some(Meta::empty())))
}

pub async fn clear(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    ensure_consumer_or_admin(user)?;
    let txn = state.orm.begin().await?;
    ensure_user_exists(&txn, user.user_id).await?;

    let cart = get_or_create(&txn, user.user_id).await?;
    let cart = lock_cart(&txn, cart.id).await?;
    let removed = clear_cart(&txn, cart.id).await?;
    let cart = refresh_cart(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::CartClear,
        serde_json::json!({ "cart_id": cart.id, "removed_lines": removed }),
    )
    .await;

    Ok(ApiResponse::success("Cart cleared", cart, Some(Meta::empty())))
}

pub async fn item_count(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartCount>> {
    ensure_consumer_or_admin(user)?;
    ensure_user_exists(&state.orm, user.user_id).await?;

    let count = match find_cart(&state.orm, user.user_id).await? {
        Some(cart) => {
            let quantities: Vec<i32> = CartItems::find()
                .select_only()
                .column(cart_items::Column::Quantity)
                .filter(cart_items::Column::CartId.eq(cart.id))
                .into_tuple()
                .all(&state.orm)
                .await?;
            quantities.into_iter().sum()
        }
        None => 0,
    };

    Ok(ApiResponse::success("Cart item count", CartCount { count }, None))
}

pub async fn validate_for_checkout(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CartValidation>> {
    ensure_consumer_or_admin(user)?;
    ensure_user_exists(&state.orm, user.user_id).await?;

    let valid = validate_cart(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("Cart validation", CartValidation { valid }, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(stock: i32, status: &str) -> ProductModel {
        let now = Utc::now().fixed_offset();
        ProductModel {
            id: Uuid::new_v4(),
            name: "Reusable Bottle".into(),
            product_type: "Kitchen".into(),
            description: None,
            price: dec!(10.00),
            eco_score: Some(dec!(4.0)),
            footprint: None,
            material_co2: None,
            shipping_co2: None,
            image: None,
            stock_quantity: stock,
            status: status.into(),
            seller_id: Uuid::new_v4(),
            rating: Decimal::ZERO,
            sales: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn totals_sum_lines() {
        let totals = compute_totals([(dec!(10.00), 2), (dec!(2.50), 3)]);
        assert_eq!(totals.total_amount, dec!(27.50));
        assert_eq!(totals.total_items, 5);
    }

    #[test]
    fn empty_cart_has_zero_totals() {
        let totals = compute_totals(Vec::new());
        assert_eq!(totals.total_amount, Decimal::ZERO);
        assert_eq!(totals.total_items, 0);
    }

    #[test]
    fn totals_stay_exact_for_cents() {
        let totals = compute_totals([(dec!(0.10), 1), (dec!(0.20), 1)]);
        assert_eq!(totals.total_amount, dec!(0.30));
    }

    #[test]
    fn re_adding_counts_existing_quantity() {
        let p = product(5, "active");
        assert!(check_addable(&p, 0, 5).is_ok());
        assert!(check_addable(&p, 3, 2).is_ok());
        let err = check_addable(&p, 3, 3).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(err.to_string(), "Insufficient stock. Available: 5");
    }

    #[test]
    fn oversized_quantity_is_refused_without_overflow() {
        let p = product(i32::MAX, "active");
        let err = check_addable(&p, 3, i32::MAX).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert!(err.to_string().starts_with("Insufficient stock"));
    }

    #[test]
    fn inactive_products_cannot_be_added() {
        let p = product(5, "inactive");
        assert!(matches!(check_addable(&p, 0, 1), Err(AppError::InvalidState(_))));
        assert!(check_addable(&product(5, "ACTIVE"), 0, 1).is_ok());
    }

    #[test]
    fn purchasable_lines_need_active_product_and_stock() {
        assert!(line_is_purchasable(&product(2, "active"), 2));
        assert!(!line_is_purchasable(&product(1, "active"), 2));
        assert!(!line_is_purchasable(&product(9, "archived"), 1));
    }
}
