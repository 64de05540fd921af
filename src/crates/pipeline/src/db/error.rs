//! Errors raised by the posts and settings tables

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The database could not be reached or opened
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// Unique or CHECK constraint rejected the write (duplicate post id,
    /// unknown status value)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored column could not be turned into the expected Rust value
    #[error("Stored value could not be decoded: {0}")]
    Decode(String),

    #[error("Query failed: {0}")]
    Query(String),
}

impl DatabaseError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, DatabaseError::ConstraintViolation(_))
    }

    /// Only connectivity problems are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, DatabaseError::Unavailable(_))
    }
}

pub type DbResult<T> = std::result::Result<T, DatabaseError>;

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                if db_err.is_unique_violation()
                    || db_err.is_check_violation()
                    || message.contains("constraint failed")
                {
                    DatabaseError::ConstraintViolation(message)
                } else {
                    DatabaseError::Query(message)
                }
            }
            sqlx::Error::ColumnNotFound(col) => DatabaseError::Decode(format!("missing column {}", col)),
            sqlx::Error::ColumnDecode { index, source } => {
                DatabaseError::Decode(format!("column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DatabaseError::Decode(source.to_string()),
            sqlx::Error::Configuration(source) => DatabaseError::Unavailable(source.to_string()),
            sqlx::Error::Io(source) => DatabaseError::Unavailable(source.to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::Unavailable("pool timed out".to_string()),
            sqlx::Error::PoolClosed => DatabaseError::Unavailable("pool closed".to_string()),
            other => DatabaseError::Query(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_retryable() {
        let err: DatabaseError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_retryable());
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn test_decode_errors_are_terminal() {
        let err: DatabaseError = sqlx::Error::ColumnNotFound("status".to_string()).into();
        assert!(matches!(err, DatabaseError::Decode(_)));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("status"));
    }
}
