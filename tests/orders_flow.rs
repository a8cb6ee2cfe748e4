mod common;

use common::{create_product, create_user, reload, setup_state};
use ecobazaarx_api::{
    dto::{cart::AddToCartRequest, orders::CreateOrderRequest},
    error::AppError,
    middleware::auth::AuthUser,
    services::{admin_service, cart_service, order_service, seller_service},
    state::AppState,
    status::{OrderStatus, UserRole},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<()> {
    cart_service::add_item(state, user, AddToCartRequest { product_id, quantity }).await?;
    Ok(())
}

#[tokio::test]
async fn cart_checkout_ship_and_deliver_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let consumer = create_user(&state, UserRole::Consumer).await?;
    let admin = create_user(&state, UserRole::Admin).await?;
    let product = create_product(&state, &seller, dec!(10.00), 5).await?;

    let cart = cart_service::add_item(
        &state,
        &consumer,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?
    .data
    .expect("cart");
    assert_eq!(cart.total_amount, dec!(20.00));
    assert_eq!(cart.total_items, 2);

    let placed = order_service::create_from_cart(&state, &consumer, CreateOrderRequest::default())
        .await?
        .data
        .expect("order");
    assert_eq!(placed.order.total_amount, dec!(20.00));
    assert_eq!(placed.order.status, "PROCESSING");
    assert!(placed.order.tracking_number.starts_with("TRK"));
    assert_eq!(placed.items.len(), 1);

    let stocked = reload(&state, product.id).await?;
    assert_eq!(stocked.stock_quantity, 3);
    assert_eq!(stocked.sales, 2);

    let emptied = cart_service::get_cart(&state, &consumer).await?.data.expect("cart");
    assert!(emptied.items.is_empty());
    assert_eq!(emptied.total_amount, Decimal::ZERO);

    let shipped =
        admin_service::update_order_status(&state, &admin, placed.order.id, OrderStatus::Shipped)
            .await?
            .data
            .expect("order");
    assert_eq!(shipped.order.status, "SHIPPED");
    assert!(shipped.order.shipped_date.is_some());

    let delivered = order_service::update_consumer_order_status(
        &state,
        &consumer,
        placed.order.id,
        OrderStatus::Delivered,
    )
    .await?
    .data
    .expect("order");
    assert_eq!(delivered.order.status, "DELIVERED");
    assert!(delivered.order.delivered_date.is_some());

    let refused = order_service::cancel_order(&state, &consumer, placed.order.id).await;
    assert!(matches!(refused, Err(AppError::InvalidState(_))));

    Ok(())
}

#[tokio::test]
async fn cancelling_restores_stock_exactly_once() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let consumer = create_user(&state, UserRole::Consumer).await?;
    let product = create_product(&state, &seller, dec!(7.50), 5).await?;

    let placed = order_service::create_for_single_product(
        &state,
        &consumer,
        product.id,
        2,
        CreateOrderRequest::default(),
    )
    .await?
    .data
    .expect("order");
    assert_eq!(placed.order.total_amount, dec!(15.00));
    assert_eq!(reload(&state, product.id).await?.stock_quantity, 3);

    let cancelled = order_service::cancel_order(&state, &consumer, placed.order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(cancelled.order.status, "CANCELLED");
    assert_eq!(reload(&state, product.id).await?.stock_quantity, 5);

    let again = order_service::cancel_order(&state, &consumer, placed.order.id).await;
    assert!(matches!(again, Err(AppError::InvalidState(_))));
    assert_eq!(reload(&state, product.id).await?.stock_quantity, 5);

    let stranger = create_user(&state, UserRole::Consumer).await?;
    let foreign = order_service::get_order(&state, &stranger, placed.order.id).await;
    assert!(matches!(foreign, Err(AppError::AccessDenied(_))));

    Ok(())
}

#[tokio::test]
async fn buying_more_than_stock_is_refused() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let consumer = create_user(&state, UserRole::Consumer).await?;
    let product = create_product(&state, &seller, dec!(3.00), 1).await?;

    let result = order_service::create_for_single_product(
        &state,
        &consumer,
        product.id,
        2,
        CreateOrderRequest::default(),
    )
    .await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));
    assert_eq!(reload(&state, product.id).await?.stock_quantity, 1);

    Ok(())
}

#[tokio::test]
async fn checkout_with_empty_cart_fails() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let consumer = create_user(&state, UserRole::Consumer).await?;

    let result =
        order_service::create_from_cart(&state, &consumer, CreateOrderRequest::default()).await;
    match result {
        Err(AppError::InvalidState(message)) => assert_eq!(message, "Cart is empty"),
        other => panic!("expected empty cart error, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn seller_updates_only_their_own_items() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let other_seller = create_user(&state, UserRole::Seller).await?;
    let consumer = create_user(&state, UserRole::Consumer).await?;
    let product = create_product(&state, &seller, dec!(12.00), 4).await?;

    let placed = order_service::create_for_single_product(
        &state,
        &consumer,
        product.id,
        1,
        CreateOrderRequest::default(),
    )
    .await?
    .data
    .expect("order");

    let denied = seller_service::update_order_status_by_seller(
        &state,
        &other_seller,
        placed.order.id,
        OrderStatus::Shipped,
    )
    .await;
    assert!(matches!(denied, Err(AppError::AccessDenied(_))));

    let untouched = order_service::get_order(&state, &consumer, placed.order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(untouched.order.status, "PROCESSING");
    assert!(untouched.order.shipped_date.is_none());
    assert!(untouched.items.iter().all(|item| item.status == "PROCESSING"));

    let listed = seller_service::list_seller_orders(&state, &seller)
        .await?
        .data
        .expect("orders");
    assert!(listed.items.iter().any(|o| o.order.id == placed.order.id));

    let shipped = seller_service::update_order_status_by_seller(
        &state,
        &seller,
        placed.order.id,
        OrderStatus::Shipped,
    )
    .await?
    .data
    .expect("order");
    assert!(shipped.items.iter().all(|item| item.status == "SHIPPED"));
    assert_eq!(shipped.order.status, "SHIPPED");
    assert!(shipped.order.shipped_date.is_some());

    Ok(())
}

#[tokio::test]
async fn consumer_cannot_deliver_unshipped_order() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let consumer = create_user(&state, UserRole::Consumer).await?;
    let product = create_product(&state, &seller, dec!(5.00), 3).await?;

    let placed = order_service::create_for_single_product(
        &state,
        &consumer,
        product.id,
        1,
        CreateOrderRequest::default(),
    )
    .await?
    .data
    .expect("order");

    let result = order_service::update_consumer_order_status(
        &state,
        &consumer,
        placed.order.id,
        OrderStatus::Delivered,
    )
    .await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));

    Ok(())
}

#[tokio::test]
async fn concurrent_checkouts_of_one_cart_place_a_single_order() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let consumer = create_user(&state, UserRole::Consumer).await?;
    let product = create_product(&state, &seller, dec!(4.00), 10).await?;
    add_to_cart(&state, &consumer, product.id, 2).await?;

    let (first, second) = tokio::join!(
        order_service::create_from_cart(&state, &consumer, CreateOrderRequest::default()),
        order_service::create_from_cart(&state, &consumer, CreateOrderRequest::default()),
    );
    let placed = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 1, "first: {first:?}, second: {second:?}");
    let failed = if first.is_err() { first } else { second };
    assert!(matches!(failed, Err(AppError::InvalidState(_))));

    let stocked = reload(&state, product.id).await?;
    assert_eq!(stocked.stock_quantity, 8);
    assert_eq!(stocked.sales, 2);

    Ok(())
}

#[tokio::test]
async fn multi_line_checkout_takes_each_quantity() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let consumer = create_user(&state, UserRole::Consumer).await?;
    let notebook = create_product(&state, &seller, dec!(3.00), 5).await?;
    let pencil = create_product(&state, &seller, dec!(1.25), 7).await?;
    add_to_cart(&state, &consumer, notebook.id, 2).await?;
    add_to_cart(&state, &consumer, pencil.id, 3).await?;

    let placed = order_service::create_from_cart(&state, &consumer, CreateOrderRequest::default())
        .await?
        .data
        .expect("order");
    assert_eq!(placed.order.total_amount, dec!(9.75));
    assert_eq!(placed.items.len(), 2);
    assert_eq!(placed.items[0].product_id, notebook.id);
    assert_eq!(placed.items[1].product_id, pencil.id);

    assert_eq!(reload(&state, notebook.id).await?.stock_quantity, 3);
    assert_eq!(reload(&state, pencil.id).await?.stock_quantity, 4);

    let count = cart_service::item_count(&state, &consumer).await?.data.expect("count");
    assert_eq!(count.count, 0);

    Ok(())
}

#[tokio::test]
async fn admin_cancellation_restores_stock() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let consumer = create_user(&state, UserRole::Consumer).await?;
    let admin = create_user(&state, UserRole::Admin).await?;
    let product = create_product(&state, &seller, dec!(6.00), 4).await?;

    let placed = order_service::create_for_single_product(
        &state,
        &consumer,
        product.id,
        3,
        CreateOrderRequest::default(),
    )
    .await?
    .data
    .expect("order");
    assert_eq!(reload(&state, product.id).await?.stock_quantity, 1);

    let cancelled =
        admin_service::update_order_status(&state, &admin, placed.order.id, OrderStatus::Cancelled)
            .await?
            .data
            .expect("order");
    assert_eq!(cancelled.order.status, "CANCELLED");
    assert_eq!(reload(&state, product.id).await?.stock_quantity, 4);

    // Already cancelled: setting it again is not an entry into CANCELLED.
    admin_service::update_order_status(&state, &admin, placed.order.id, OrderStatus::Cancelled)
        .await?;
    assert_eq!(reload(&state, product.id).await?.stock_quantity, 4);

    Ok(())
}

#[tokio::test]
async fn partial_seller_shipment_keeps_order_processing() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let other_seller = create_user(&state, UserRole::Seller).await?;
    let consumer = create_user(&state, UserRole::Consumer).await?;
    let mine = create_product(&state, &seller, dec!(2.00), 5).await?;
    let theirs = create_product(&state, &other_seller, dec!(8.00), 5).await?;
    add_to_cart(&state, &consumer, mine.id, 1).await?;
    add_to_cart(&state, &consumer, theirs.id, 1).await?;

    let placed = order_service::create_from_cart(&state, &consumer, CreateOrderRequest::default())
        .await?
        .data
        .expect("order");

    let updated = seller_service::update_order_status_by_seller(
        &state,
        &seller,
        placed.order.id,
        OrderStatus::Shipped,
    )
    .await?
    .data
    .expect("order");
    assert_eq!(updated.order.status, "PROCESSING");
    assert!(updated.order.shipped_date.is_none());
    for item in &updated.items {
        let expected = if item.product_id == mine.id { "SHIPPED" } else { "PROCESSING" };
        assert_eq!(item.status, expected);
    }

    let completed = seller_service::update_order_status_by_seller(
        &state,
        &other_seller,
        placed.order.id,
        OrderStatus::Shipped,
    )
    .await?
    .data
    .expect("order");
    assert_eq!(completed.order.status, "SHIPPED");

    Ok(())
}
