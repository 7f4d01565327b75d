use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database operation failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back into a domain type.
    #[error("Invalid stored value: {0}")]
    DecodeError(#[from] core_types::CoreError),

    /// The caller handed the store a batch it refuses to write.
    #[error("Rejected write for '{ticker}': {reason}")]
    WriteRejected { ticker: String, reason: String },
}
