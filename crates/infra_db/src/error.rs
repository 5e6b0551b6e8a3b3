//! Database error types with SQLSTATE-aware classification.
//!
//! Raw [`sqlx::Error`] values are folded into [`DatabaseError`] variants so
//! that repositories can report *what went wrong* (duplicate key, broken
//! reference, violated check) instead of leaking driver details upward.

use thiserror::Error;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// No row matched the lookup.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique-constraint violation (SQLSTATE 23505).
    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign-key violation (SQLSTATE 23503).
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check-constraint or domain-rule violation (SQLSTATE 23514).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A required lock could not be acquired (SQLSTATE 55P03, or an
    /// advisory lock held by a concurrent session).
    #[error("lock unavailable: {0}")]
    LockUnavailable(String),

    /// Connection pool exhausted or connection dropped.
    #[error("connection error: {0}")]
    Connection(String),

    /// Schema migration failure.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Any other driver error.
    #[error("sql error: {0}")]
    Sql(String),
}

impl DatabaseError {
    pub fn not_found(entity: &str, key: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} {key}"))
    }

    /// Whether the error is a uniqueness conflict.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateEntry(_))
    }

    /// Whether the error indicates a missing row.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".into()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Connection(err.to_string())
            }
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("23505") => Self::DuplicateEntry(db.message().to_string()),
                Some("23503") => Self::ForeignKeyViolation(db.message().to_string()),
                Some("23514") => Self::ConstraintViolation(db.message().to_string()),
                Some("55P03") => Self::LockUnavailable(db.message().to_string()),
                _ => Self::Sql(db.message().to_string()),
            },
            _ => Self::Sql(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers() {
        assert!(DatabaseError::DuplicateEntry("x".into()).is_duplicate());
        assert!(DatabaseError::not_found("account", "abc").is_not_found());
        assert!(!DatabaseError::Sql("boom".into()).is_duplicate());
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: DatabaseError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }
}
