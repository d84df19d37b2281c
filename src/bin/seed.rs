use rust_decimal::Decimal;
use shop_orders_api::{
    config::AppConfig,
    db::{DbPool, create_pool, run_migrations},
    models::Role,
    services::auth_service::hash_password,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, 2).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin", "admin@example.com", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&pool, "customer", "user@example.com", "user123", Role::User).await?;
    seed_products(&pool).await?;

    pool.close().await;
    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &DbPool,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<i64> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // Existing accounts keep their password; only the role is enforced.
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO users (username, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={})", role.as_str());
    Ok(id)
}

async fn seed_products(pool: &DbPool) -> anyhow::Result<()> {
    let products = [
        ("Axum Hoodie", "Warm hoodie for Rustaceans", Decimal::new(5500, 2), 50, "apparel"),
        ("Ferris Mug", "Coffee tastes better with Ferris", Decimal::new(1200, 2), 100, "kitchen"),
        ("Rust Sticker Pack", "Decorate your laptop", Decimal::new(500, 2), 200, "accessories"),
        ("E-book: Async Rust", "Learn async Rust patterns", Decimal::new(2500, 2), 75, "books"),
    ];

    for (name, desc, price, stock, category) in products {
        sqlx::query(
            r#"
            INSERT INTO products (name, description, price, stock, category)
            SELECT $1, $2, $3, $4, $5
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = $1)
            "#,
        )
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .bind(category)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
