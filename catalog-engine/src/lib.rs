//! # catalog-engine
//!
//! Listing and lifecycle engine for catalog entities held in a document store.
//!
//! ## Features
//!
//! - **List queries**: filter, free-text search, sort, projection and
//!   pagination compiled into one aggregation pipeline
//! - **Uniform results**: paginated and unpaginated lists share one
//!   `{ data, count }` envelope
//! - **Slugs**: derived from names, disambiguated against the store
//! - **Cascading deletes**: removed ids are pulled from dependent collections
//! - **Pluggable storage**: everything runs over the [`DocumentStore`](store::DocumentStore)
//!   trait; [`InMemoryStore`](store::InMemoryStore) is included
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_engine::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!
//!     // Initialize tracing
//!     init_tracing(&config)?;
//!
//!     let entity = config.entity("orientation")?.clone();
//!     let store = InMemoryStore::new().with_unique_index(entity.collection.clone(), "slug");
//!     let orientations = RecordService::new(store, entity);
//!
//!     orientations.create(RecordInput::new("Landscape")).await?;
//!
//!     let page = orientations
//!         .list_json(&json!({
//!             "search": "land",
//!             "sort": { "name": 1 },
//!             "pagination": { "pageSize": 10, "currentPage": 0 }
//!         }))
//!         .await?;
//!     println!("{} matching, first page: {:?}", page.count.unwrap_or(0), page.data);
//!
//!     Ok(())
//! }
//! ```

pub mod cascade;
pub mod config;
pub mod entity;
pub mod error;
pub mod observability;
pub mod query;
pub mod response;
pub mod service;
pub mod slug;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, LogFormat, ServiceConfig};
    pub use crate::entity::{BulkSlugPolicy, EntityConfig, MissingPolicy, ReferenceEdge};
    pub use crate::error::{Error, Result};
    pub use crate::observability::init_tracing;
    pub use crate::query::{
        Filter, FilterCondition, FilterOperator, FilterValue, ListRequest, OrderDirection,
        PageRequest, QueryCompiler, QueryError, SelectSpec, SortSpec,
    };
    pub use crate::response::Envelope;
    pub use crate::service::{
        RecordInput, RecordPatch, RecordService, ServiceError, ServiceErrorKind, ServiceOperation,
        ServiceResult,
    };
    pub use crate::slug::{slugify, SlugResolver};
    pub use crate::store::{
        Document, DocumentStore, InMemoryStore, ObjectId, StoreError, StoreErrorKind, StoreResult,
    };
}
