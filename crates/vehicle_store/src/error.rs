//! Vehicle store error types.

use thiserror::Error;

/// Errors that can occur during vehicle store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found (raised by writes to rows the user does not own).
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema creation or migration failed.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored value could not be mapped back into an entity.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Foreign key constraint violation.
    #[error("Foreign key constraint violation: {0}")]
    ForeignKeyViolation(String),
}

impl StoreError {
    /// Creates a not found error.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Creates an unknown-user foreign key error.
    pub fn unknown_user(uid: &str) -> Self {
        Self::ForeignKeyViolation(format!("user {uid} does not exist"))
    }
}

/// Result type for vehicle store operations.
pub type StoreResult<T> = Result<T, StoreError>;
