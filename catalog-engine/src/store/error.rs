//! Document store error types
//!
//! Structured errors for store operations, carrying the operation, a category
//! and the collection involved.
//!
//! # Example
//!
//! ```rust
//! use catalog_engine::store::{StoreError, StoreErrorKind, StoreOperation};
//!
//! let error = StoreError::duplicate_key(StoreOperation::InsertOne, "orientations", "slug");
//! assert!(matches!(error.kind, StoreErrorKind::DuplicateKey));
//! assert!(error.is_duplicate_key());
//! ```

use std::fmt;

/// Operation being performed when the store error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Fetching a single document
    FindOne,
    /// Fetching many documents
    Find,
    /// Inserting one document
    InsertOne,
    /// Inserting a batch of documents
    InsertMany,
    /// Updating one document
    UpdateOne,
    /// Updating every matching document
    UpdateMany,
    /// Deleting one document
    DeleteOne,
    /// Deleting every matching document
    DeleteMany,
    /// Running an aggregation pipeline
    Aggregate,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindOne => write!(f, "find_one"),
            Self::Find => write!(f, "find"),
            Self::InsertOne => write!(f, "insert_one"),
            Self::InsertMany => write!(f, "insert_many"),
            Self::UpdateOne => write!(f, "update_one"),
            Self::UpdateMany => write!(f, "update_many"),
            Self::DeleteOne => write!(f, "delete_one"),
            Self::DeleteMany => write!(f, "delete_many"),
            Self::Aggregate => write!(f, "aggregate"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// A unique index rejected the write
    DuplicateKey,
    /// The pipeline is structurally invalid for this store
    InvalidPipeline,
    /// Failed to reach the store
    ConnectionFailed,
    /// Operation timed out
    Timeout,
    /// Underlying database error
    Database,
    /// Serialization or deserialization error
    Serialization,
    /// Other unclassified error
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey => write!(f, "duplicate_key"),
            Self::InvalidPipeline => write!(f, "invalid_pipeline"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Database => write!(f, "database"),
            Self::Serialization => write!(f, "serialization"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The collection involved
    pub collection: Option<String>,
    /// The key or index involved (e.g. the duplicated field)
    pub key: Option<String>,
}

impl StoreError {
    /// Create a new store error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            collection: None,
            key: None,
        }
    }

    /// A unique index violation on `field`
    pub fn duplicate_key(
        operation: StoreOperation,
        collection: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        let collection = collection.into();
        let field = field.into();
        Self {
            operation,
            kind: StoreErrorKind::DuplicateKey,
            message: format!(
                "E11000 duplicate key error collection: {} index: {}_1",
                collection, field
            ),
            collection: Some(collection),
            key: Some(field),
        }
    }

    /// A structurally invalid pipeline
    pub fn invalid_pipeline(message: impl Into<String>) -> Self {
        Self::new(
            StoreOperation::Aggregate,
            StoreErrorKind::InvalidPipeline,
            message,
        )
    }

    /// A connection failure
    pub fn connection_failed(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::ConnectionFailed, message)
    }

    /// A timeout
    pub fn timeout(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::Timeout, message)
    }

    /// A generic database failure
    pub fn database(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::Database, message)
    }

    /// A serialization failure
    pub fn serialization(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::Serialization, message)
    }

    /// Add the collection involved
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: StoreOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether this is the duplicate-key signal
    #[must_use]
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self.kind, StoreErrorKind::DuplicateKey)
    }

    /// Whether the failure is transient
    ///
    /// The engine never retries; this only informs callers that might.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::ConnectionFailed | StoreErrorKind::Timeout
        )
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref collection) = self.collection {
            write!(f, " [collection: {}]", collection)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(
            StoreOperation::Find,
            StoreErrorKind::Serialization,
            err.to_string(),
        )
    }
}
