use thiserror::Error;

/// Core error type for strata operations.
#[derive(Error, Debug)]
pub enum StrataError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Migration not found: {0}")]
    NotFound(String),

    #[error("Failed to load migration: {0}")]
    Load(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Duplicate version in history: {0}")]
    DuplicateVersion(String),

    #[error("Invalid target version: {0}")]
    InvalidTarget(String),

    #[error("Unable to find version '{0}'")]
    VersionNotFound(String),

    #[error("Migration {version} failed (time: {elapsed_ms}ms): {reason}")]
    MigrationFailed {
        version: String,
        elapsed_ms: u128,
        reason: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// Result type alias using StrataError.
pub type Result<T> = std::result::Result<T, StrataError>;
