//! Record service
//!
//! [`RecordService`] implements the create/list/get/update/delete operations
//! for one entity over any [`DocumentStore`]. Operations are independent and
//! hold no state beyond the store; each maps store failures to
//! [`ServiceError`]s.
//!
//! # Example
//!
//! ```rust
//! use catalog_engine::entity::EntityConfig;
//! use catalog_engine::service::{RecordInput, RecordService};
//! use catalog_engine::store::InMemoryStore;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = InMemoryStore::new().with_unique_index("orientations", "slug");
//! let service = RecordService::new(store, EntityConfig::orientation());
//!
//! let created = service.create(RecordInput::new("Landscape")).await.unwrap();
//! let id = created.data.unwrap();
//!
//! let fetched = service.get_by_id(id, None).await.unwrap();
//! assert_eq!(fetched.data.unwrap()["slug"], "landscape");
//! # });
//! ```

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::{ServiceError, ServiceOperation};
use super::input::{RecordInput, RecordPatch};
use crate::cascade;
use crate::entity::{BulkSlugPolicy, EntityConfig, MissingPolicy, SLUG_FIELD, UPDATED_AT_FIELD};
use crate::query::{Filter, ListRequest, QueryCompiler, SelectSpec};
use crate::response::{shape, Envelope};
use crate::slug::{slugify, SlugResolver};
use crate::store::{Document, DocumentStore, ObjectId, UpdateSpec, ID_FIELD};

/// Result type for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Current time as RFC 3339 UTC with microsecond precision
///
/// Fixed precision keeps lexical order equal to time order.
#[must_use]
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// CRUD operations for one entity
#[derive(Debug, Clone)]
pub struct RecordService<S> {
    store: S,
    entity: EntityConfig,
    compiler: QueryCompiler,
    slugs: SlugResolver,
}

impl<S: DocumentStore> RecordService<S> {
    /// Build a service for `entity` over `store`
    pub fn new(store: S, entity: EntityConfig) -> Self {
        let compiler = QueryCompiler::new(&entity);
        let slugs = SlugResolver::new(entity.collection.as_str());
        Self {
            store,
            entity,
            compiler,
            slugs,
        }
    }

    /// The entity this service manages
    pub fn entity(&self) -> &EntityConfig {
        &self.entity
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    fn collection(&self) -> &str {
        &self.entity.collection
    }

    fn name(&self) -> &str {
        &self.entity.entity_name
    }

    fn not_found(&self, operation: ServiceOperation, id: ObjectId) -> ServiceError {
        ServiceError::not_found(operation, self.name(), id.to_hex())
    }

    fn blank_name(&self, operation: ServiceOperation) -> ServiceError {
        ServiceError::bad_request(operation, "Name must not be empty").with_entity_type(self.name())
    }

    fn dotted_field(&self, operation: ServiceOperation, field: &str) -> ServiceError {
        ServiceError::bad_request(
            operation,
            format!("Field '{}' must be a top-level name without '.'", field),
        )
        .with_entity_type(self.name())
    }

    /// Create one record
    ///
    /// The slug is the requested one, or derived from the name, and is
    /// disambiguated when already taken.
    pub async fn create(&self, input: RecordInput) -> ServiceResult<Envelope<ObjectId>> {
        let op = ServiceOperation::Create;
        debug!(entity = %self.name(), operation = %op, "Creating record");

        if input.has_blank_name() {
            return Err(self.blank_name(op));
        }
        if let Some(field) = input.dotted_field() {
            return Err(self.dotted_field(op, field));
        }

        let candidate = match input.slug.as_deref() {
            Some(slug) => slug.to_string(),
            None => slugify(&input.name, false),
        };
        let slug = self
            .slugs
            .resolve(&self.store, &candidate)
            .await
            .map_err(|e| ServiceError::from(e).with_operation(op))?;

        let document = input.into_document(slug.clone(), &timestamp());
        let id = self
            .store
            .insert_one(self.collection(), document)
            .await
            .map_err(|e| ServiceError::from(e).with_operation(op))?;

        info!(entity = %self.name(), id = %id, slug = %slug, "Record created");
        Ok(Envelope::ok(format!("{} created successfully", self.name())).with_data(id))
    }

    /// Create a batch of records, optionally wiping the collection first
    ///
    /// Slugs follow the entity's [`BulkSlugPolicy`]. Every slug is settled
    /// before the collection is wiped, and a slug repeated inside the batch
    /// fails it without touching the store. The batch is inserted in one store
    /// call; a duplicate key there fails the whole batch.
    pub async fn create_many(
        &self,
        inputs: Vec<RecordInput>,
        delete_existing: bool,
    ) -> ServiceResult<Envelope<Vec<ObjectId>>> {
        let op = ServiceOperation::CreateMany;
        debug!(
            entity = %self.name(),
            operation = %op,
            items = inputs.len(),
            delete_existing,
            "Creating records"
        );

        let message = format!("{} records created successfully", self.name());
        if inputs.is_empty() {
            return Ok(Envelope::ok(message).with_data(Vec::new()).with_count(0));
        }
        if inputs.iter().any(RecordInput::has_blank_name) {
            return Err(self.blank_name(op));
        }
        if let Some(field) = inputs.iter().find_map(RecordInput::dotted_field) {
            return Err(self.dotted_field(op, field));
        }

        let now = timestamp();
        let mut seen = HashSet::new();
        let mut documents = Vec::with_capacity(inputs.len());
        for input in inputs {
            let slug = match self.entity.bulk_slug_policy {
                BulkSlugPolicy::None => {
                    let slug = slugify(input.slug.as_deref().unwrap_or(&input.name), false);
                    if seen.contains(&slug) {
                        warn!(entity = %self.name(), slug = %slug, "Repeated slug in batch");
                        return Err(ServiceError::conflict(op).with_entity_type(self.name()));
                    }
                    slug
                }
                BulkSlugPolicy::PerItem => {
                    let candidate = match input.slug.as_deref() {
                        Some(slug) => slug.to_string(),
                        None => slugify(&input.name, false),
                    };
                    // a wiped collection holds nothing to probe against
                    let resolved = if delete_existing {
                        candidate.clone()
                    } else {
                        self.slugs
                            .resolve(&self.store, &candidate)
                            .await
                            .map_err(|e| ServiceError::from(e).with_operation(op))?
                    };
                    if seen.contains(&resolved) {
                        slugify(&candidate, true)
                    } else {
                        resolved
                    }
                }
            };
            seen.insert(slug.clone());
            documents.push(input.into_document(slug, &now));
        }

        if delete_existing {
            let wiped = self
                .store
                .delete_many(self.collection(), &Filter::new())
                .await
                .map_err(|e| ServiceError::from(e).with_operation(op))?;
            info!(entity = %self.name(), wiped, "Cleared collection before bulk insert");
        }

        let ids = self
            .store
            .insert_many(self.collection(), documents)
            .await
            .map_err(|e| ServiceError::from(e).with_operation(op))?;

        let count = ids.len() as u64;
        info!(entity = %self.name(), count, "Records created");
        Ok(Envelope::ok(message).with_data(ids).with_count(count))
    }

    /// List records
    ///
    /// Unpaginated requests yield all matches and their number; paginated
    /// requests yield one page and the total match count.
    pub async fn list(&self, request: &ListRequest) -> ServiceResult<Envelope<Vec<Document>>> {
        let op = ServiceOperation::List;
        let pipeline = self
            .compiler
            .compile_request(request)
            .map_err(|e| ServiceError::from(e).with_entity_type(self.name()))?;
        debug!(
            entity = %self.name(),
            operation = %op,
            paginated = request.is_paginated(),
            pipeline = %pipeline.to_json(),
            "Listing records"
        );

        let raw = self
            .store
            .aggregate(self.collection(), &pipeline)
            .await
            .map_err(|e| ServiceError::from(e).with_operation(op))?;

        Ok(shape(
            raw,
            request.is_paginated(),
            format!("{} list fetched successfully", self.name()),
        ))
    }

    /// List records from a loosely-typed JSON request body
    pub async fn list_json(&self, body: &Value) -> ServiceResult<Envelope<Vec<Document>>> {
        let request = ListRequest::from_json(body)
            .map_err(|e| ServiceError::from(e).with_entity_type(self.name()))?;
        self.list(&request).await
    }

    /// Fetch one record, optionally projected
    ///
    /// An absent id follows the entity's [`MissingPolicy`].
    pub async fn get_by_id(
        &self,
        id: ObjectId,
        select: Option<&SelectSpec>,
    ) -> ServiceResult<Envelope<Document>> {
        let op = ServiceOperation::Get;
        debug!(entity = %self.name(), operation = %op, id = %id, "Fetching record");

        let select = select.filter(|s| !s.is_empty());
        let found = self
            .store
            .find_one(self.collection(), &Filter::by_id(id), select)
            .await
            .map_err(|e| ServiceError::from(e).with_operation(op))?;

        let message = format!("{} fetched successfully", self.name());
        match (found, self.entity.missing_by_id) {
            (Some(doc), _) => Ok(Envelope::ok(message).with_data(doc)),
            (None, MissingPolicy::Null) => Ok(Envelope::ok(message)),
            (None, MissingPolicy::NotFound) => Err(self.not_found(op, id)),
        }
    }

    /// Update one record with only the patched fields
    ///
    /// The slug is re-resolved only when the patch names a different one.
    pub async fn update(&self, id: ObjectId, patch: RecordPatch) -> ServiceResult<Envelope<Document>> {
        let op = ServiceOperation::Update;
        debug!(entity = %self.name(), operation = %op, id = %id, "Updating record");

        if patch.has_blank_name() {
            return Err(self.blank_name(op));
        }
        if let Some(field) = patch.dotted_field() {
            return Err(self.dotted_field(op, field));
        }

        let filter = Filter::by_id(id);
        let mut existing = self
            .store
            .find_one(self.collection(), &filter, None)
            .await
            .map_err(|e| ServiceError::from(e).with_operation(op))?
            .ok_or_else(|| self.not_found(op, id))?;

        let stored_slug = existing.get(SLUG_FIELD).and_then(Value::as_str).map(str::to_string);
        let requested_slug = patch.slug.clone();
        let mut set = patch.into_set();

        if let Some(requested) = requested_slug {
            if stored_slug.as_deref() != Some(requested.as_str()) {
                let resolved = self
                    .slugs
                    .resolve(&self.store, &requested)
                    .await
                    .map_err(|e| ServiceError::from(e).with_operation(op))?;
                set.insert(SLUG_FIELD.to_string(), Value::String(resolved));
            }
        }
        set.insert(UPDATED_AT_FIELD.to_string(), Value::String(timestamp()));

        let outcome = self
            .store
            .update_one(self.collection(), &filter, &UpdateSpec::new().set_all(set.clone()))
            .await
            .map_err(|e| ServiceError::from(e).with_operation(op))?;
        if outcome.matched == 0 {
            return Err(self.not_found(op, id));
        }

        existing.extend(set);
        info!(entity = %self.name(), id = %id, "Record updated");
        Ok(Envelope::ok(format!("{} updated successfully", self.name())).with_data(existing))
    }

    /// Apply a patch to many records
    ///
    /// Slugs are never changed in bulk; a requested slug is dropped.
    pub async fn update_many(&self, ids: &[ObjectId], patch: RecordPatch) -> ServiceResult<Envelope<()>> {
        let op = ServiceOperation::UpdateMany;
        debug!(entity = %self.name(), operation = %op, ids = ids.len(), "Updating records");

        if patch.has_blank_name() {
            return Err(self.blank_name(op));
        }
        if let Some(field) = patch.dotted_field() {
            return Err(self.dotted_field(op, field));
        }

        let message = format!("{} records updated successfully", self.name());
        if ids.is_empty() {
            return Ok(Envelope::ok(message).with_count(0));
        }

        let mut set = patch.into_set();
        set.insert(UPDATED_AT_FIELD.to_string(), Value::String(timestamp()));

        let outcome = self
            .store
            .update_many(self.collection(), &Filter::by_ids(ids), &UpdateSpec::new().set_all(set))
            .await
            .map_err(|e| ServiceError::from(e).with_operation(op))?;

        info!(
            entity = %self.name(),
            matched = outcome.matched,
            modified = outcome.modified,
            "Records updated"
        );
        Ok(Envelope::ok(message).with_count(outcome.modified))
    }

    /// Delete one record, then optionally clean up references to it
    pub async fn delete(&self, id: ObjectId, check_usage: bool) -> ServiceResult<Envelope<()>> {
        let op = ServiceOperation::Delete;
        debug!(entity = %self.name(), operation = %op, id = %id, check_usage, "Deleting record");

        let filter = Filter::by_id(id);
        self.store
            .find_one(self.collection(), &filter, Some(&SelectSpec::new().include(ID_FIELD)))
            .await
            .map_err(|e| ServiceError::from(e).with_operation(op))?
            .ok_or_else(|| self.not_found(op, id))?;

        let deleted = self
            .store
            .delete_one(self.collection(), &filter)
            .await
            .map_err(|e| ServiceError::from(e).with_operation(op))?;
        info!(entity = %self.name(), id = %id, "Record deleted");

        if check_usage {
            self.cascade(&[id]).await?;
        }
        Ok(Envelope::ok(format!("{} deleted successfully", self.name())).with_count(deleted))
    }

    /// Delete many records, then optionally clean up references to all of them
    ///
    /// Absent ids are skipped silently; an empty id set is a successful no-op.
    pub async fn delete_many(&self, ids: &[ObjectId], check_usage: bool) -> ServiceResult<Envelope<()>> {
        let op = ServiceOperation::DeleteMany;
        debug!(entity = %self.name(), operation = %op, ids = ids.len(), check_usage, "Deleting records");

        let message = format!("{} records deleted successfully", self.name());
        if ids.is_empty() {
            return Ok(Envelope::ok(message).with_count(0));
        }

        let deleted = self
            .store
            .delete_many(self.collection(), &Filter::by_ids(ids))
            .await
            .map_err(|e| ServiceError::from(e).with_operation(op))?;
        info!(entity = %self.name(), requested = ids.len(), deleted, "Records deleted");

        if check_usage {
            self.cascade(ids).await?;
        }
        Ok(Envelope::ok(message).with_count(deleted))
    }

    async fn cascade(&self, ids: &[ObjectId]) -> ServiceResult<u64> {
        cascade::cascade(&self.store, &self.entity.references, ids)
            .await
            .map_err(|e| {
                let err = ServiceError::from(e).with_operation(ServiceOperation::Cascade);
                warn!(
                    entity = %self.name(),
                    ids = ids.len(),
                    "Cascade failed after delete; dependent references may dangle"
                );
                err
            })
    }
}
