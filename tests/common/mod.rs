#![allow(dead_code)]

use ecobazaarx_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Entity as Products, Model as ProductModel},
        users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    state::AppState,
    status::{ProductStatus, UserRole},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

// Each test creates its own users and products, so tests can share one database.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url, 5).await?;
    run_migrations(&pool).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        jwt_ttl_hours: 1,
        db_max_connections: 5,
    };
    Ok(Some(AppState::new(pool, config)))
}

pub async fn create_user(state: &AppState, role: UserRole) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{}-{}@example.com", role.as_str().to_lowercase(), Uuid::new_v4())),
        password_hash: Set("dummy".into()),
        full_name: Set("Test User".into()),
        role: Set(role.as_str().into()),
        status: Set("ACTIVE".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

pub async fn create_product(
    state: &AppState,
    seller: &AuthUser,
    price: Decimal,
    stock: i32,
) -> anyhow::Result<ProductModel> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Recycled Notebook {}", Uuid::new_v4())),
        product_type: Set("Stationery".into()),
        description: Set(Some("Made from post-consumer paper".into())),
        price: Set(price),
        eco_score: Set(Some(dec!(4.0))),
        footprint: Set(Some(dec!(1.50))),
        material_co2: Set(Some(dec!(1.00))),
        shipping_co2: Set(Some(dec!(0.50))),
        image: Set(None),
        stock_quantity: Set(stock),
        status: Set(ProductStatus::Active.as_str().into()),
        seller_id: Set(seller.user_id),
        rating: Set(Decimal::ZERO),
        sales: Set(0),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

pub async fn reload(state: &AppState, id: Uuid) -> anyhow::Result<ProductModel> {
    Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {id} vanished"))
}
