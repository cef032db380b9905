use order_portal::{config::AppConfig, db::create_pool, services::auth_service::hash_password};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let user_id = ensure_user(&pool, "shopper@example.com", "shopper123").await?;
    seed_products(&pool).await?;

    println!("Seed completed. Demo user ID: {user_id}");
    Ok(())
}

async fn ensure_user(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?;

    // Already registered: keep the existing password.
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email}");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (title, description, price in cents, discount %, category, stock)
    let products = vec![
        ("Canvas Backpack", "Water-resistant 20L daypack", 4_999_i64, 20, "Bags", 40),
        ("Ceramic Mug", "Stoneware mug, 350 ml", 1_250, 10, "Kitchen", 100),
        ("Desk Lamp", "Dimmable LED lamp with USB port", 3_400, 15, "Home", 25),
        ("Running Socks", "Pack of three, breathable", 1_500, 30, "Apparel", 200),
    ];

    for (title, description, price, discount, category, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, title, description, price, discount, image, category, stock_quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(description)
        .bind(price)
        .bind(discount)
        .bind(format!("seed/{}.jpg", title.to_lowercase().replace(' ', "-")))
        .bind(category)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
