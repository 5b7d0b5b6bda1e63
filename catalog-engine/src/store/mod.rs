//! Document store abstraction
//!
//! The engine reaches persistence only through the [`DocumentStore`] trait.
//! [`InMemoryStore`] is the bundled implementation, evaluating every stage the
//! query compiler emits.

pub mod document;
pub mod error;
pub mod eval;
pub mod memory;
pub mod traits;

pub use document::{
    compare_values, document, document_id, get_path, values_equal, Document, ObjectId,
    ObjectIdParseError, ID_FIELD,
};
pub use error::{StoreError, StoreErrorKind, StoreOperation};
pub use memory::InMemoryStore;
pub use traits::{DocumentStore, FindOptions, StoreResult, UpdateOutcome, UpdateSpec};
