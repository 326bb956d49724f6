use sqlx::{postgres::PgPoolOptions, PgPool};

/// Creates the PostgreSQL pool and brings the schema up to date
///
/// Migrations under `migrations/` are embedded at build time.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Catalog schema migrated");

    Ok(pool)
}
