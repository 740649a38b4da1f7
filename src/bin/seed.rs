use catalog_admin_api::{config::AppConfig, db::create_pool, services::user_service};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_super_admin(&pool, "admin@example.com", "admin123").await?;
    let electronics = ensure_category(&pool, "Electronics", "electronics", None).await?;
    ensure_category(&pool, "Smartphones", "smartphones", Some(electronics)).await?;
    ensure_category(&pool, "Furniture", "furniture", None).await?;
    ensure_page(&pool, "About Us", "about-us").await?;

    println!("Seed completed. Super admin ID: {admin_id}");
    Ok(())
}

async fn ensure_super_admin(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = user_service::hash_password(password)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, name, role)
        VALUES ($1, $2, $3, $4, 'super_admin')
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind("Administrator")
    .fetch_optional(pool)
    .await?;

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

    println!("Ensured super admin {email}");
    Ok(user_id)
}

async fn ensure_category(
    pool: &sqlx::PgPool,
    name: &str,
    slug: &str,
    parent_id: Option<Uuid>,
) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, slug, parent_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (slug) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(slug)
    .bind(parent_id)
    .fetch_optional(pool)
    .await?;

    let category_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) =
                sqlx::query_as("SELECT id FROM categories WHERE slug = $1")
                    .bind(slug)
                    .fetch_one(pool)
                    .await?;
            existing.0
        }
    };

    println!("Ensured category {slug}");
    Ok(category_id)
}

async fn ensure_page(pool: &sqlx::PgPool, title: &str, slug: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pages (id, title, slug, content)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (slug) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(title)
    .bind(slug)
    .bind("<p>Placeholder content</p>")
    .execute(pool)
    .await?;

    println!("Ensured page {slug}");
    Ok(())
}
