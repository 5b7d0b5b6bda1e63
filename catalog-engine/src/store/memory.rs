//! In-memory document store
//!
//! Collections live behind one tokio `RwLock`; each store operation takes the
//! lock once, so every operation is atomic with respect to the others.
//! Clones share the same storage.
//!
//! ```rust
//! use catalog_engine::query::Filter;
//! use catalog_engine::store::{document, DocumentStore, InMemoryStore};
//! use serde_json::json;
//!
//! # tokio_test_block(async {
//! let store = InMemoryStore::new().with_unique_index("orientations", "slug");
//! store
//!     .insert_one("orientations", document(json!({ "name": "A", "slug": "a" })))
//!     .await
//!     .unwrap();
//!
//! let dup = store
//!     .insert_one("orientations", document(json!({ "name": "B", "slug": "a" })))
//!     .await;
//! assert!(dup.unwrap_err().is_duplicate_key());
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::document::{document_id, values_equal, Document, ObjectId, ID_FIELD};
use super::error::{StoreError, StoreErrorKind, StoreOperation};
use super::eval;
use super::traits::{DocumentStore, FindOptions, StoreResult, UpdateOutcome, UpdateSpec};
use crate::query::{Filter, Pipeline, SelectSpec};

type Collections = HashMap<String, Vec<Document>>;

/// Reference [`DocumentStore`] keeping every collection in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<Collections>>,
    unique: Arc<HashMap<String, BTreeSet<String>>>,
}

impl InMemoryStore {
    /// An empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a unique index on `collection.field`
    ///
    /// Indexes are part of the store's configuration: declare them before
    /// cloning the store. Documents where the field is missing or null are not
    /// indexed. `_id` is always unique.
    #[must_use]
    pub fn with_unique_index(mut self, collection: impl Into<String>, field: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.unique)
            .entry(collection.into())
            .or_default()
            .insert(field.into());
        self
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Snapshot of a collection, in insertion order
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn unique_fields(&self, collection: &str) -> impl Iterator<Item = &str> {
        std::iter::once(ID_FIELD).chain(
            self.unique
                .get(collection)
                .into_iter()
                .flat_map(|fields| fields.iter().map(String::as_str))
                .filter(|field| *field != ID_FIELD),
        )
    }

    /// First unique field on which `candidate` collides with one of `others`
    fn collision<'a>(
        &self,
        collection: &str,
        candidate: &Document,
        others: impl Iterator<Item = &'a Document> + Clone,
    ) -> Option<String> {
        self.unique_fields(collection).find_map(|field| {
            let value = candidate.get(field).filter(|v| !v.is_null())?;
            others
                .clone()
                .any(|other| other.get(field).is_some_and(|o| values_equal(o, value)))
                .then(|| field.to_string())
        })
    }

    fn assign_id(document: &mut Document, operation: StoreOperation) -> StoreResult<ObjectId> {
        match document.get(ID_FIELD) {
            None | Some(Value::Null) => {
                let id = ObjectId::new();
                document.insert(ID_FIELD.to_string(), id.to_value());
                Ok(id)
            }
            Some(_) => document_id(document).ok_or_else(|| {
                StoreError::serialization(operation, "document _id is not a valid object id")
            }),
        }
    }
}

fn apply_update(document: &mut Document, update: &UpdateSpec) -> bool {
    let mut changed = false;

    for (field, value) in &update.set {
        if document.get(field) != Some(value) {
            document.insert(field.clone(), value.clone());
            changed = true;
        }
    }

    for (field, values) in &update.pull {
        if let Some(Value::Array(items)) = document.get_mut(field) {
            let before = items.len();
            items.retain(|item| !values.iter().any(|v| values_equal(item, v)));
            changed |= items.len() != before;
        }
    }

    changed
}

impl InMemoryStore {
    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateSpec,
        operation: StoreOperation,
        first_only: bool,
    ) -> StoreResult<UpdateOutcome> {
        if update.set.contains_key(ID_FIELD) {
            return Err(StoreError::new(
                operation,
                StoreErrorKind::Database,
                "the _id field is immutable",
            )
            .with_collection(collection));
        }
        if let Some(field) = update.set.keys().find(|k| k.contains('.')) {
            return Err(StoreError::new(
                operation,
                StoreErrorKind::Database,
                format!("$set addresses top-level fields only, got '{}'", field),
            )
            .with_collection(collection));
        }

        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };

        let mut working = docs.clone();
        let mut outcome = UpdateOutcome::default();
        let mut touched = Vec::new();

        for (index, doc) in working.iter_mut().enumerate() {
            if !eval::matches(doc, filter) {
                continue;
            }
            outcome.matched += 1;
            if apply_update(doc, update) {
                outcome.modified += 1;
                touched.push(index);
            }
            if first_only {
                break;
            }
        }

        for &index in &touched {
            let others = working
                .iter()
                .enumerate()
                .filter(move |(i, _)| *i != index)
                .map(|(_, doc)| doc);
            if let Some(field) = self.collision(collection, &working[index], others) {
                return Err(StoreError::duplicate_key(operation, collection, field));
            }
        }

        *docs = working;
        debug!(
            collection,
            operation = %operation,
            matched = outcome.matched,
            modified = outcome.modified,
            "Updated documents"
        );
        Ok(outcome)
    }

    async fn delete(&self, collection: &str, filter: &Filter, first_only: bool) -> u64 {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return 0;
        };

        let before = docs.len();
        if first_only {
            if let Some(index) = docs.iter().position(|doc| eval::matches(doc, filter)) {
                docs.remove(index);
            }
        } else {
            docs.retain(|doc| !eval::matches(doc, filter));
        }
        let deleted = (before - docs.len()) as u64;
        debug!(collection, deleted, "Deleted documents");
        deleted
    }
}

impl DocumentStore for InMemoryStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&SelectSpec>,
    ) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        let found = collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| eval::matches(doc, filter)));

        match (found, projection) {
            (None, _) => Ok(None),
            (Some(doc), None) => Ok(Some(doc.clone())),
            (Some(doc), Some(select)) => eval::project(doc, select)
                .map(Some)
                .map_err(|e| e.with_operation(StoreOperation::FindOne).with_collection(collection)),
        }
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut docs: Vec<Document> = {
            let collections = self.collections.read().await;
            collections
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|doc| eval::matches(doc, filter))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        if let Some(ref sort) = options.sort {
            eval::sort_documents(&mut docs, sort);
        }
        let skip = options.skip.map_or(0, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let limit = options.limit.map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let docs = docs.into_iter().skip(skip).take(limit);

        match options.projection {
            Some(ref select) => docs
                .map(|doc| eval::project(&doc, select))
                .collect::<StoreResult<Vec<_>>>()
                .map_err(|e| e.with_operation(StoreOperation::Find).with_collection(collection)),
            None => Ok(docs.collect()),
        }
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> StoreResult<ObjectId> {
        let id = Self::assign_id(&mut document, StoreOperation::InsertOne)?;

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if let Some(field) = self.collision(collection, &document, docs.iter()) {
            debug!(collection, field = %field, "Rejected duplicate key");
            return Err(StoreError::duplicate_key(StoreOperation::InsertOne, collection, field));
        }

        docs.push(document);
        debug!(collection, id = %id, "Inserted document");
        Ok(id)
    }

    async fn insert_many(
        &self,
        collection: &str,
        mut documents: Vec<Document>,
    ) -> StoreResult<Vec<ObjectId>> {
        let ids = documents
            .iter_mut()
            .map(|doc| Self::assign_id(doc, StoreOperation::InsertMany))
            .collect::<StoreResult<Vec<_>>>()?;

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        for (index, candidate) in documents.iter().enumerate() {
            let others = docs.iter().chain(documents[..index].iter());
            if let Some(field) = self.collision(collection, candidate, others) {
                debug!(collection, field = %field, "Rejected batch with duplicate key");
                return Err(StoreError::duplicate_key(StoreOperation::InsertMany, collection, field));
            }
        }

        docs.extend(documents);
        debug!(collection, inserted = ids.len(), "Inserted documents");
        Ok(ids)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> StoreResult<UpdateOutcome> {
        self.update(collection, filter, update, StoreOperation::UpdateOne, true)
            .await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> StoreResult<UpdateOutcome> {
        self.update(collection, filter, update, StoreOperation::UpdateMany, false)
            .await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        Ok(self.delete(collection, filter, true).await)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        Ok(self.delete(collection, filter, false).await)
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        let docs = self.documents(collection).await;
        debug!(collection, stages = pipeline.len(), input = docs.len(), "Running pipeline");
        eval::run_pipeline(docs, pipeline).map_err(|e| e.with_collection(collection))
    }
}
