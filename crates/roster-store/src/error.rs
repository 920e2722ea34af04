use thiserror::Error;

/// Errors that can occur within the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No row with the given ID exists.
    #[error("Not found: {id}")]
    NotFound { id: String },

    /// A field failed validation before it reached the database.
    #[error("Invalid field: {0}")]
    InvalidField(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
