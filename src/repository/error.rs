#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DatabaseError {
    #[error("Internal database error: {0}")]
    BackendError(#[from] sqlx::Error),

    #[error("Failed to run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to prepare database file: {0}")]
    IoError(#[from] std::io::Error),
}

impl DatabaseError {
    /// Whether this error comes from a UNIQUE constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        if let DatabaseError::BackendError(sqlx_err) = self
            && let Some(db_err) = sqlx_err.as_database_error()
        {
            return matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation);
        }
        false
    }
}
