use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("An error occurred during JSON serialization/deserialization of '{key}': {source}")]
    JsonError {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("The state store is unavailable: {0}")]
    Unavailable(String),

    #[error("The state store rejected the write: {0}")]
    WriteRejected(String),
}
