use crate::error::DbError;
use crate::memory::MemoryStore;
use crate::repository::DbRepository;
use crate::store::StateStore;
use configuration::{StoreBackend, StoreSettings};
use dotenvy::dotenv;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Establishes a connection pool to the PostgreSQL database.
///
/// `DATABASE_URL` is read from the environment, after loading a `.env`
/// file if one is present.
pub async fn connect(settings: &StoreSettings) -> Result<PgPool, DbError> {
    // A missing .env file is fine; the variable may come from the real environment.
    dotenv().ok();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_e| DbError::ConnectionConfigError("DATABASE_URL must be set.".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .connect(&database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded migrations so the `ledger_state` table exists.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Opens the state store selected by `settings.backend`.
pub async fn open_store(settings: &StoreSettings) -> Result<Arc<dyn StateStore>, DbError> {
    match settings.backend {
        StoreBackend::Memory => {
            tracing::info!("Using the in-memory state store.");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = connect(settings).await?;
            run_migrations(&pool).await?;
            tracing::info!(max_connections = settings.max_connections, "Connected to the PostgreSQL state store.");
            Ok(Arc::new(DbRepository::new(pool)))
        }
    }
}
