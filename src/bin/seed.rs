use ecobazaarx_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    services::auth_service::hash_password,
    status::{ProductStatus, UserRole},
};
use rust_decimal::Decimal;
use uuid::Uuid;

struct SeedProduct {
    name: &'static str,
    product_type: &'static str,
    description: &'static str,
    // cents
    price: i64,
    // tenths
    eco_score: i64,
    material_co2: i64,
    shipping_co2: i64,
    stock: i32,
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Bamboo Toothbrush",
        product_type: "Personal Care",
        description: "Biodegradable handle, plant-based bristles",
        price: 499,
        eco_score: 46,
        material_co2: 10,
        shipping_co2: 5,
        stock: 120,
    },
    SeedProduct {
        name: "Organic Cotton Tote",
        product_type: "Bags",
        description: "Reusable shopping bag made from organic cotton",
        price: 1250,
        eco_score: 42,
        material_co2: 80,
        shipping_co2: 20,
        stock: 60,
    },
    SeedProduct {
        name: "Stainless Steel Bottle",
        product_type: "Kitchen",
        description: "Insulated bottle, replaces single-use plastic",
        price: 2400,
        eco_score: 38,
        material_co2: 240,
        shipping_co2: 40,
        stock: 35,
    },
    SeedProduct {
        name: "Beeswax Food Wraps",
        product_type: "Kitchen",
        description: "Set of three washable food wraps",
        price: 1599,
        eco_score: 44,
        material_co2: 30,
        shipping_co2: 10,
        stock: 8,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url, 2).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@ecobazaarx.com", "admin123", "Admin", UserRole::Admin).await?;
    let seller_id =
        ensure_user(&pool, "seller@ecobazaarx.com", "seller123", "Green Goods", UserRole::Seller)
            .await?;
    let consumer_id = ensure_user(
        &pool,
        "consumer@ecobazaarx.com",
        "consumer123",
        "Casey Consumer",
        UserRole::Consumer,
    )
    .await?;
    seed_products(&pool, seller_id).await?;

    tracing::info!(%admin_id, %seller_id, %consumer_id, "seed completed");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    full_name: &str,
    role: UserRole,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, full_name, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    tracing::info!(email, role = role.as_str(), "ensured user");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool, seller_id: Uuid) -> anyhow::Result<()> {
    for p in PRODUCTS {
        let material_co2 = Decimal::new(p.material_co2, 2);
        let shipping_co2 = Decimal::new(p.shipping_co2, 2);
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, product_type, description, price, eco_score,
                footprint, material_co2, shipping_co2, stock_quantity, status, seller_id
            )
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
            WHERE NOT EXISTS (
                SELECT 1 FROM products WHERE name = $2 AND seller_id = $12
            )
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(p.name)
        .bind(p.product_type)
        .bind(p.description)
        .bind(Decimal::new(p.price, 2))
        .bind(Decimal::new(p.eco_score, 1))
        .bind(material_co2 + shipping_co2)
        .bind(material_co2)
        .bind(shipping_co2)
        .bind(p.stock)
        .bind(ProductStatus::Active.as_str())
        .bind(seller_id)
        .execute(pool)
        .await?;
    }

    tracing::info!(count = PRODUCTS.len(), "seeded products");
    Ok(())
}
