//! Entity descriptions
//!
//! The engine is generic over entities. Everything that differs between one
//! catalog entity and another lives in an [`EntityConfig`]: its collection,
//! search field, list defaults, dependent collections and policies.
//!
//! ```rust
//! use catalog_engine::entity::{EntityConfig, ReferenceEdge};
//!
//! let orientation = EntityConfig::orientation();
//! assert_eq!(orientation.collection, "orientations");
//! assert_eq!(
//!     orientation.references,
//!     vec![ReferenceEdge::new("products", "orientations")]
//! );
//! ```

use serde::{Deserialize, Serialize};

use crate::query::{SelectSpec, SortSpec};

/// Field holding the slug
pub const SLUG_FIELD: &str = "slug";

/// Field holding the display name
pub const NAME_FIELD: &str = "name";

/// Server-assigned creation timestamp
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Server-assigned modification timestamp
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// A dependent collection holding an array of entity ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceEdge {
    /// Dependent collection
    pub collection: String,
    /// Array field in the dependent collection
    pub field: String,
}

impl ReferenceEdge {
    /// Create an edge
    pub fn new(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            field: field.into(),
        }
    }
}

/// How slugs are chosen during bulk creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkSlugPolicy {
    /// Slugify each candidate without probing the store; collisions fail the
    /// whole batch at insert time
    #[default]
    None,
    /// Resolve each candidate against the store, forcing a unique suffix on
    /// repeats inside the batch
    PerItem,
}

/// Response to a `get_by_id` on an absent id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Fail with a not-found error
    #[default]
    NotFound,
    /// Succeed with an envelope carrying no data
    Null,
}

/// Everything the engine needs to know about one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// Display name used in messages, e.g. `Orientation`
    pub entity_name: String,
    /// Backing collection
    pub collection: String,
    /// Field matched by free-text search
    pub search_field: String,
    /// Ordering when a list request gives none
    pub default_sort: SortSpec,
    /// Projection for unpaginated lists without a select
    pub default_select: SelectSpec,
    /// Dependent collections cleaned up by cascading deletes
    pub references: Vec<ReferenceEdge>,
    /// Slug handling in bulk creation
    pub bulk_slug_policy: BulkSlugPolicy,
    /// Behaviour of `get_by_id` on an absent id
    pub missing_by_id: MissingPolicy,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            entity_name: "Record".to_string(),
            collection: "records".to_string(),
            search_field: NAME_FIELD.to_string(),
            default_sort: SortSpec::descending(CREATED_AT_FIELD),
            default_select: SelectSpec::new().include(NAME_FIELD),
            references: Vec::new(),
            bulk_slug_policy: BulkSlugPolicy::default(),
            missing_by_id: MissingPolicy::default(),
        }
    }
}

impl EntityConfig {
    /// An entity with default list behaviour
    pub fn new(entity_name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// The Orientation entity, referenced by `products.orientations`
    #[must_use]
    pub fn orientation() -> Self {
        Self::new("Orientation", "orientations")
            .with_reference(ReferenceEdge::new("products", "orientations"))
    }

    /// Add a dependent collection
    #[must_use]
    pub fn with_reference(mut self, edge: ReferenceEdge) -> Self {
        self.references.push(edge);
        self
    }

    /// Set the search field
    #[must_use]
    pub fn with_search_field(mut self, field: impl Into<String>) -> Self {
        self.search_field = field.into();
        self
    }

    /// Set the bulk slug policy
    #[must_use]
    pub fn with_bulk_slug_policy(mut self, policy: BulkSlugPolicy) -> Self {
        self.bulk_slug_policy = policy;
        self
    }

    /// Set the missing-id policy
    #[must_use]
    pub fn with_missing_policy(mut self, policy: MissingPolicy) -> Self {
        self.missing_by_id = policy;
        self
    }
}
