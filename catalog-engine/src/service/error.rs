//! Service error types
//!
//! Structured errors for record operations, translated from store and query
//! errors. Internal failures carry a generic message; the original store
//! message is logged.
//!
//! # Example
//!
//! ```rust
//! use catalog_engine::service::{ServiceError, ServiceErrorKind, ServiceOperation};
//!
//! let error = ServiceError::not_found(ServiceOperation::Delete, "Orientation", "65f1c0ffee");
//! assert!(matches!(error.kind, ServiceErrorKind::NotFound));
//! assert_eq!(error.message, "Orientation not found");
//! assert_eq!(error.kind.status_code(), 404);
//! ```

use std::fmt;

use crate::query::QueryError;
use crate::store::{StoreError, StoreErrorKind, StoreOperation};

/// Message returned for every duplicate-key failure
pub const CONFLICT_MESSAGE: &str = "Slug Must be Unique.";

/// Message returned for structurally invalid projections
pub const PROJECTION_MISMATCH_MESSAGE: &str = "Projection Mismatch";

/// Message returned for unclassified failures
pub const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Operation being performed when the service error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceOperation {
    /// Creating one record
    Create,
    /// Creating a batch of records
    CreateMany,
    /// Listing records
    List,
    /// Fetching one record by id
    Get,
    /// Updating one record
    Update,
    /// Updating many records
    UpdateMany,
    /// Deleting one record
    Delete,
    /// Deleting many records
    DeleteMany,
    /// Cleaning up dependent references
    Cascade,
}

impl fmt::Display for ServiceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::CreateMany => write!(f, "create_many"),
            Self::List => write!(f, "list"),
            Self::Get => write!(f, "get"),
            Self::Update => write!(f, "update"),
            Self::UpdateMany => write!(f, "update_many"),
            Self::Delete => write!(f, "delete"),
            Self::DeleteMany => write!(f, "delete_many"),
            Self::Cascade => write!(f, "cascade"),
        }
    }
}

impl From<StoreOperation> for ServiceOperation {
    fn from(op: StoreOperation) -> Self {
        match op {
            StoreOperation::FindOne => Self::Get,
            StoreOperation::Find | StoreOperation::Aggregate => Self::List,
            StoreOperation::InsertOne => Self::Create,
            StoreOperation::InsertMany => Self::CreateMany,
            StoreOperation::UpdateOne => Self::Update,
            StoreOperation::UpdateMany => Self::UpdateMany,
            StoreOperation::DeleteOne => Self::Delete,
            StoreOperation::DeleteMany => Self::DeleteMany,
        }
    }
}

/// Category of service error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    /// A uniqueness constraint was violated
    Conflict,
    /// The record to act on does not exist
    NotFound,
    /// The request is malformed
    BadRequest,
    /// Any other failure
    Internal,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict"),
            Self::NotFound => write!(f, "not_found"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl ServiceErrorKind {
    /// HTTP status an outer transport layer should answer with
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Conflict => 409,
            Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::Internal => 500,
        }
    }

    /// Upper-case error code, e.g. `NOT_FOUND`
    #[must_use]
    pub fn error_code(&self) -> String {
        self.to_string().to_uppercase()
    }
}

/// Structured service error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// The operation being performed when the error occurred
    pub operation: ServiceOperation,
    /// The category of error
    pub kind: ServiceErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Orientation")
    pub entity_type: Option<String>,
    /// The id of the entity involved
    pub entity_id: Option<String>,
}

impl ServiceError {
    /// Create a new service error
    pub fn new(operation: ServiceOperation, kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// `<Entity> not found`
    pub fn not_found(
        operation: ServiceOperation,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        let entity_type = entity_type.into();
        let message = format!("{} not found", entity_type);
        Self::new(operation, ServiceErrorKind::NotFound, message).with_entity(entity_type, entity_id)
    }

    /// Duplicate slug
    pub fn conflict(operation: ServiceOperation) -> Self {
        Self::new(operation, ServiceErrorKind::Conflict, CONFLICT_MESSAGE)
    }

    /// Malformed request
    pub fn bad_request(operation: ServiceOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ServiceErrorKind::BadRequest, message)
    }

    /// Unclassified failure
    pub fn internal(operation: ServiceOperation) -> Self {
        Self::new(operation, ServiceErrorKind::Internal, INTERNAL_MESSAGE)
    }

    /// Add entity context
    #[must_use]
    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Add only the entity type
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ServiceOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether this is a uniqueness conflict
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self.kind, ServiceErrorKind::Conflict)
    }

    /// Whether this is a not-found failure
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ServiceErrorKind::NotFound)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Service {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{}: {}]", entity_type, entity_id)?,
            (Some(entity_type), None) => write!(f, " [{}]", entity_type)?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        let operation = ServiceOperation::from(err.operation);
        match err.kind {
            StoreErrorKind::DuplicateKey => {
                tracing::warn!(
                    operation = %operation,
                    collection = ?err.collection,
                    key = ?err.key,
                    "Duplicate key"
                );
                Self::conflict(operation)
            }
            StoreErrorKind::InvalidPipeline => {
                tracing::warn!(operation = %operation, "Invalid pipeline: {}", err.message);
                Self::bad_request(operation, PROJECTION_MISMATCH_MESSAGE)
            }
            StoreErrorKind::ConnectionFailed
            | StoreErrorKind::Timeout
            | StoreErrorKind::Database
            | StoreErrorKind::Serialization
            | StoreErrorKind::Other => {
                tracing::error!(
                    operation = %operation,
                    kind = %err.kind,
                    collection = ?err.collection,
                    transient = err.is_transient(),
                    "Store error: {}", err.message
                );
                Self::internal(operation)
            }
        }
    }
}

impl From<QueryError> for ServiceError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::ProjectionMismatch => {
                Self::bad_request(ServiceOperation::List, PROJECTION_MISMATCH_MESSAGE)
            }
            QueryError::InvalidQuery { .. } => {
                Self::bad_request(ServiceOperation::List, err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_operation_display() {
        assert_eq!(format!("{}", ServiceOperation::CreateMany), "create_many");
        assert_eq!(format!("{}", ServiceOperation::Cascade), "cascade");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ServiceErrorKind::NotFound.error_code(), "NOT_FOUND");
        assert_eq!(ServiceErrorKind::BadRequest.status_code(), 400);
        assert_eq!(ServiceErrorKind::Conflict.status_code(), 409);
    }

    #[test]
    fn test_from_duplicate_key() {
        let store = StoreError::duplicate_key(StoreOperation::InsertMany, "orientations", "slug");
        let err = ServiceError::from(store);
        assert_eq!(err.kind, ServiceErrorKind::Conflict);
        assert_eq!(err.operation, ServiceOperation::CreateMany);
        assert_eq!(err.message, CONFLICT_MESSAGE);
    }

    #[test]
    fn test_from_invalid_pipeline() {
        let err = ServiceError::from(StoreError::invalid_pipeline("bad project"));
        assert_eq!(err.kind, ServiceErrorKind::BadRequest);
        assert_eq!(err.message, PROJECTION_MISMATCH_MESSAGE);
    }

    #[test]
    fn test_internal_hides_store_message() {
        let store = StoreError::database(StoreOperation::DeleteOne, "socket closed at 10.0.0.3");
        let err = ServiceError::from(store);
        assert_eq!(err.kind, ServiceErrorKind::Internal);
        assert_eq!(err.operation, ServiceOperation::Delete);
        assert!(!err.message.contains("10.0.0.3"));
    }

    #[test]
    fn test_from_query_error() {
        let err = ServiceError::from(QueryError::invalid("filter.$where", "operator not allowed"));
        assert_eq!(err.kind, ServiceErrorKind::BadRequest);
        assert!(err.message.contains("filter.$where"));
    }

    #[test]
    fn test_display() {
        let err = ServiceError::not_found(ServiceOperation::Get, "Orientation", "abc");
        assert_eq!(
            err.to_string(),
            "Service not_found error during get: Orientation not found [Orientation: abc]"
        );
    }
}
