mod common;

use common::{create_product, create_user, setup_state};
use ecobazaarx_api::{
    dto::products::{ProductRequest, RatingUpdateRequest},
    error::AppError,
    services::product_service,
    status::UserRole,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn listing(name: &str) -> ProductRequest {
    ProductRequest {
        name: name.to_string(),
        product_type: "Kitchen".into(),
        description: Some("Compostable sponge".into()),
        price: dec!(3.20),
        eco_score: Some(dec!(4.5)),
        footprint: Some(dec!(0.40)),
        material_co2: Some(dec!(0.30)),
        shipping_co2: Some(dec!(0.10)),
        image: None,
        stock_quantity: 12,
        status: None,
    }
}

#[tokio::test]
async fn rating_must_stay_within_bounds() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let product = create_product(&state, &seller, dec!(9.99), 2).await?;

    let rejected = product_service::update_rating(
        &state,
        &seller,
        product.id,
        RatingUpdateRequest { rating: dec!(5.5) },
    )
    .await;
    assert!(matches!(rejected, Err(AppError::InvalidState(_))));

    let updated = product_service::update_rating(
        &state,
        &seller,
        product.id,
        RatingUpdateRequest { rating: dec!(3.2) },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(updated.rating, dec!(3.2));

    Ok(())
}

#[tokio::test]
async fn sellers_may_list_products_under_the_same_name() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let first_seller = create_user(&state, UserRole::Seller).await?;
    let second_seller = create_user(&state, UserRole::Seller).await?;
    let name = format!("Loofah Sponge {}", Uuid::new_v4());

    let first = product_service::create_product(&state, &first_seller, listing(&name))
        .await?
        .data
        .expect("product");
    let second = product_service::create_product(&state, &second_seller, listing(&name))
        .await?
        .data
        .expect("product");

    assert_ne!(first.id, second.id);
    assert_eq!(first.name, second.name);
    assert_eq!(first.seller_id, first_seller.user_id);
    assert_eq!(second.seller_id, second_seller.user_id);

    Ok(())
}
