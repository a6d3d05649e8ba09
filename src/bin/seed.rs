use rust_decimal::Decimal;
use storefront_api::{
    db::{create_pool, run_migrations},
    models::Role,
    services::user_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")?;

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&pool, "user@example.com", "user123", Role::User).await?;
    let category_id = ensure_category(&pool, "Apparel", "Shirts, hoodies and hats").await?;
    seed_products(&pool, category_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_category(pool: &sqlx::PgPool, name: &str, description: &str) -> anyhow::Result<Uuid> {
    let (category_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(category_id)
}

async fn seed_products(pool: &sqlx::PgPool, category_id: Uuid) -> anyhow::Result<()> {
    let products = [
        ("Storefront Hoodie", "Heavyweight cotton hoodie", Decimal::new(5500, 2), 50),
        ("Logo Tee", "Soft tee with the store logo", Decimal::new(2000, 2), 120),
        ("Canvas Cap", "Adjustable six-panel cap", Decimal::new(1850, 2), 75),
    ];

    for (name, desc, price, inventory) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, category_id, inventory)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(category_id)
        .bind(inventory)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
