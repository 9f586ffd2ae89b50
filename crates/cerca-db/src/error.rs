//! Database-specific error types and conversions.

use cerca_core::error::CercaError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Stored record is malformed: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    pub(crate) fn decode(what: &str, err: impl std::fmt::Display) -> Self {
        DbError::Decode(format!("{what}: {err}"))
    }
}

impl From<DbError> for CercaError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CercaError::NotFound { entity, id },
            DbError::Decode(msg) => CercaError::Internal(msg),
            other => CercaError::UpstreamUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_are_internal() {
        let err: CercaError = DbError::decode("status", "bogus").into();
        assert!(matches!(err, CercaError::Internal(_)));
    }

    #[test]
    fn query_errors_are_upstream() {
        let err: CercaError = DbError::Query("timeout".into()).into();
        assert!(matches!(err, CercaError::UpstreamUnavailable(_)));
    }
}
