//! Entity services
//!
//! One [`RecordService`] per entity, built from an
//! [`EntityConfig`](crate::entity::EntityConfig) and a
//! [`DocumentStore`](crate::store::DocumentStore).

mod error;
mod input;
mod records;

pub use error::{
    ServiceError, ServiceErrorKind, ServiceOperation, CONFLICT_MESSAGE, INTERNAL_MESSAGE,
    PROJECTION_MISMATCH_MESSAGE,
};
pub use input::{RecordInput, RecordPatch};
pub use records::{timestamp, RecordService, ServiceResult};
