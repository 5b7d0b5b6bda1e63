//! Error types
//!
//! Each layer has its own structured error: [`StoreError`] for the document
//! store, [`QueryError`] for request compilation and [`ServiceError`] for
//! record operations. [`Error`] unifies them with configuration and setup
//! failures for callers that want one type.

use thiserror::Error;

use crate::query::QueryError;
use crate::service::{ServiceError, ServiceErrorKind};
use crate::store::StoreError;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// No entity is configured under this key
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Record operation failed
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// Document store failed
    #[error("{0}")]
    Store(#[from] StoreError),

    /// List request could not be compiled
    #[error("{0}")]
    Query(#[from] QueryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status an outer transport layer should answer with
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Service(e) => e.kind.status_code(),
            Self::Query(_) => ServiceErrorKind::BadRequest.status_code(),
            Self::UnknownEntity(_) => ServiceErrorKind::NotFound.status_code(),
            Self::Store(e) if e.is_duplicate_key() => ServiceErrorKind::Conflict.status_code(),
            Self::Config(_) | Self::Store(_) | Self::Io(_) | Self::Internal(_) => {
                ServiceErrorKind::Internal.status_code()
            }
        }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceOperation;
    use crate::store::StoreOperation;

    #[test]
    fn test_service_error_passes_through() {
        let err: Error = ServiceError::conflict(ServiceOperation::Create).into();
        assert_eq!(err.status_code(), 409);
        assert_eq!(
            err.to_string(),
            "Service conflict error during create: Slug Must be Unique."
        );
    }

    #[test]
    fn test_status_codes() {
        let store: Error = StoreError::timeout(StoreOperation::Find, "slow").into();
        assert_eq!(store.status_code(), 500);

        let query: Error = QueryError::ProjectionMismatch.into();
        assert_eq!(query.status_code(), 400);

        assert_eq!(Error::UnknownEntity("brand".into()).status_code(), 404);
    }

    #[test]
    fn test_figment_error_is_boxed() {
        let err: Error = figment::Error::from("bad key".to_string()).into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
