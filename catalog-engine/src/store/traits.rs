//! Document store capability
//!
//! The engine talks to persistence only through [`DocumentStore`], using RPITIT
//! (Return Position Impl Trait In Traits) for async methods without
//! `async_trait`.
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_engine::query::Filter;
//! use catalog_engine::store::{DocumentStore, StoreResult, UpdateSpec};
//!
//! async fn hide_all<S: DocumentStore>(store: &S) -> StoreResult<u64> {
//!     let update = UpdateSpec::new().set("visibility", false);
//!     let outcome = store.update_many("orientations", &Filter::new(), &update).await?;
//!     Ok(outcome.modified)
//! }
//! ```

use std::future::Future;

use serde_json::Value;

use super::document::{Document, ObjectId};
use super::error::StoreError;
use crate::query::{Filter, Pipeline, SelectSpec, SortSpec};

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Options for [`DocumentStore::find`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Ordering applied before skip/limit
    pub sort: Option<SortSpec>,
    /// Documents to skip
    pub skip: Option<u64>,
    /// Maximum documents to return
    pub limit: Option<u64>,
    /// Projection applied to each result
    pub projection: Option<SelectSpec>,
}

impl FindOptions {
    /// Set the sort
    #[must_use]
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the skip
    #[must_use]
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the limit
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the projection
    #[must_use]
    pub fn projection(mut self, projection: SelectSpec) -> Self {
        self.projection = Some(projection);
        self
    }
}

/// A field-level update: `$set` plus `$pull`
///
/// Never replaces whole documents; fields not mentioned are untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    /// Top-level fields to overwrite; dotted keys are rejected
    pub set: Document,
    /// Array fields and the values to remove from them
    pub pull: Vec<(String, Vec<Value>)>,
}

impl UpdateSpec {
    /// An empty update
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    /// Set every field of a document
    #[must_use]
    pub fn set_all(mut self, fields: Document) -> Self {
        self.set.extend(fields);
        self
    }

    /// Remove every listed value from an array field
    #[must_use]
    pub fn pull(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.pull.push((field.into(), values));
        self
    }

    /// Whether the update changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.pull.iter().all(|(_, values)| values.is_empty())
    }

    /// Render as `{ "$set": {...}, "$pull": { field: { "$in": [...] } } }`
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut update = serde_json::Map::new();
        if !self.set.is_empty() {
            update.insert("$set".into(), Value::Object(self.set.clone()));
        }
        if !self.pull.is_empty() {
            let mut pull = serde_json::Map::new();
            for (field, values) in &self.pull {
                pull.insert(field.clone(), serde_json::json!({ "$in": values }));
            }
            update.insert("$pull".into(), Value::Object(pull));
        }
        Value::Object(update)
    }
}

/// Counts reported by update operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents matched by the filter
    pub matched: u64,
    /// Documents actually changed
    pub modified: u64,
}

/// Generic document store
///
/// Each method is a single atomic store operation. Nothing here spans more
/// than one call; callers sequencing several calls get no rollback.
pub trait DocumentStore: Send + Sync {
    /// Fetch the first document matching the filter
    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&SelectSpec>,
    ) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Fetch every document matching the filter
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Insert a document, assigning `_id` if absent
    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> impl Future<Output = StoreResult<ObjectId>> + Send;

    /// Insert a batch; either every document is stored or none is
    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> impl Future<Output = StoreResult<Vec<ObjectId>>> + Send;

    /// Apply an update to the first matching document
    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> impl Future<Output = StoreResult<UpdateOutcome>> + Send;

    /// Apply an update to every matching document
    fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> impl Future<Output = StoreResult<UpdateOutcome>> + Send;

    /// Delete the first matching document, returning how many were removed
    fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Delete every matching document, returning how many were removed
    fn delete_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Run an aggregation pipeline
    fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_spec_to_json() {
        let update = UpdateSpec::new()
            .set("name", "X")
            .pull("orientations", vec![json!("a"), json!("b")]);
        assert_eq!(
            update.to_json(),
            json!({
                "$set": { "name": "X" },
                "$pull": { "orientations": { "$in": ["a", "b"] } }
            })
        );
    }

    #[test]
    fn test_update_spec_is_empty() {
        assert!(UpdateSpec::new().is_empty());
        assert!(UpdateSpec::new().pull("tags", vec![]).is_empty());
        assert!(!UpdateSpec::new().set("a", 1).is_empty());
    }

    #[test]
    fn test_find_options_builder() {
        let options = FindOptions::default().skip(5).limit(10);
        assert_eq!(options.skip, Some(5));
        assert_eq!(options.limit, Some(10));
        assert!(options.sort.is_none());
    }
}
