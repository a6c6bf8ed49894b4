//! Error type for the storage layer.

use rusqlite::ErrorCode;

/// Result alias used throughout the storage layer.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the store and its access objects.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A registered migration failed against the on-disk schema.
    #[error("Migration {from}->{to} failed: {source}")]
    Migration {
        from: i64,
        to: i64,
        #[source]
        source: rusqlite::Error,
    },

    /// No chain of registered migrations bridges the stored version.
    #[error("No migration path from schema version {from} to {to}")]
    MissingMigration { from: i64, to: i64 },

    /// The file was written by a newer build than this one.
    #[error("Database schema version {found} is newer than the supported version {supported}")]
    VersionTooNew { found: i64, supported: i64 },

    /// A uniqueness, foreign-key or NOT NULL constraint rejected a write.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A row the operation depends on does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored value could not be decoded into its model type.
    #[error("Invalid stored value: {0}")]
    InvalidData(String),

    /// Any other SQLite failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    /// JSON encoding of a list column failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking store task panicked or was cancelled.
    #[error("Background store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::FromSqlConversionFailure(column, _, source) = &err {
            return StoreError::InvalidData(format!("column {column}: {source}"));
        }
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => StoreError::Constraint(err.to_string()),
            _ => StoreError::Sqlite(err),
        }
    }
}

impl StoreError {
    /// Returns true if this error is a rejected write caused by a constraint.
    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint(_))
    }
}
