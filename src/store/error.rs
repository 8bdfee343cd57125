//! Store Errors
//!
//! Error types for repository and session operations (the persistence
//! failure kind seen by the services).

use crate::domain::DomainError;

/// Errors that can occur in a store
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A stored row no longer satisfies the entity invariants
    #[error("Stored row failed hydration: {0}")]
    Hydration(#[from] DomainError),

    /// A stored column holds a value the domain cannot represent
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    /// A uniqueness rule of the store was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// commit/rollback called without an open unit
    #[error("No atomic unit is open")]
    NoOpenUnit,

    /// begin called while a unit is already open on this session
    #[error("An atomic unit is already open")]
    UnitAlreadyOpen,
}

/// Repository-level Result type
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<sqlx::Error> for RepositoryError {
    /// Unique-constraint violations surface as `Conflict`
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            _ => RepositoryError::Database(err),
        }
    }
}
