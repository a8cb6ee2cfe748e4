mod common;

use common::{create_product, create_user, setup_state};
use ecobazaarx_api::{
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    error::AppError,
    services::cart_service,
    status::UserRole,
};
use rust_decimal_macros::dec;

#[tokio::test]
async fn re_adding_a_product_combines_quantities() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let consumer = create_user(&state, UserRole::Consumer).await?;
    let product = create_product(&state, &seller, dec!(2.50), 5).await?;

    cart_service::add_item(&state, &consumer, AddToCartRequest { product_id: product.id, quantity: 2 })
        .await?;
    let cart = cart_service::add_item(
        &state,
        &consumer,
        AddToCartRequest { product_id: product.id, quantity: 1 },
    )
    .await?
    .data
    .expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.total_items, 3);
    assert_eq!(cart.total_amount, dec!(7.50));

    // 3 already in the cart, 3 more would exceed the 5 in stock.
    let refused = cart_service::add_item(
        &state,
        &consumer,
        AddToCartRequest { product_id: product.id, quantity: 3 },
    )
    .await;
    assert!(matches!(refused, Err(AppError::InvalidState(_))));

    let cart = cart_service::get_cart(&state, &consumer).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);

    Ok(())
}

#[tokio::test]
async fn another_users_cart_item_is_off_limits() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let owner = create_user(&state, UserRole::Consumer).await?;
    let intruder = create_user(&state, UserRole::Consumer).await?;
    let product = create_product(&state, &seller, dec!(4.00), 10).await?;

    let cart = cart_service::add_item(&state, &owner, AddToCartRequest { product_id: product.id, quantity: 2 })
        .await?
        .data
        .expect("cart");
    let item_id = cart.items[0].id;

    let updated =
        cart_service::update_item(&state, &intruder, item_id, UpdateCartItemRequest { quantity: 1 })
            .await;
    assert!(matches!(updated, Err(AppError::AccessDenied(_))));

    let removed = cart_service::remove_item(&state, &intruder, item_id).await;
    assert!(matches!(removed, Err(AppError::AccessDenied(_))));

    let cart = cart_service::get_cart(&state, &owner).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);

    Ok(())
}

#[tokio::test]
async fn item_count_is_zero_without_a_cart() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let consumer = create_user(&state, UserRole::Consumer).await?;

    let count = cart_service::item_count(&state, &consumer).await?.data.expect("count");
    assert_eq!(count.count, 0);

    Ok(())
}
