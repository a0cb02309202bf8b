use crate::store::{StateStore, WriteBatch};
use crate::DbError;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{Row, Transaction};

const UPSERT_STATE: &str = r#"
    INSERT INTO ledger_state (key, value, updated_at)
    VALUES ($1, $2, now())
    ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
"#;

/// The `DbRepository` backs the ledger's key/value state with the
/// `ledger_state` table. Each logical key is a single row holding a JSON
/// snapshot of the whole object.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for DbRepository {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DbError> {
        let row = sqlx::query("SELECT value FROM ledger_state WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get::<Vec<u8>, _>("value")?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), DbError> {
        sqlx::query(UPSERT_STATE)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Writes the whole batch inside one database transaction. If any
    /// statement fails the transaction is dropped and rolled back.
    async fn commit(&self, batch: WriteBatch) -> Result<(), DbError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx: Transaction<Postgres> = self.pool.begin().await?;

        for (key, value) in batch.into_entries() {
            sqlx::query(UPSERT_STATE)
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
