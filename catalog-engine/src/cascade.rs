//! Reference cleanup after deletes
//!
//! The store enforces no referential integrity. When entities are deleted,
//! every dependent collection named by a [`ReferenceEdge`] has the removed ids
//! pulled out of its reference array.
//!
//! The delete and the cleanup are separate store operations. A failure in
//! between leaves dangling references; nothing rolls the delete back.

use serde_json::Value;
use tracing::{debug, info};

use crate::entity::ReferenceEdge;
use crate::query::Filter;
use crate::store::{DocumentStore, ObjectId, StoreResult, UpdateSpec};

/// Remove `removed` ids from `edge.field` in every document of `edge.collection`
///
/// Returns the number of dependent documents modified. An empty id set issues
/// no store call.
pub async fn pull_references<S: DocumentStore>(
    store: &S,
    edge: &ReferenceEdge,
    removed: &[ObjectId],
) -> StoreResult<u64> {
    if removed.is_empty() {
        return Ok(0);
    }

    let values: Vec<Value> = removed.iter().map(ObjectId::to_value).collect();
    let update = UpdateSpec::new().pull(edge.field.as_str(), values);
    let outcome = store
        .update_many(&edge.collection, &Filter::new(), &update)
        .await?;

    debug!(
        collection = %edge.collection,
        field = %edge.field,
        removed = removed.len(),
        modified = outcome.modified,
        "Pulled references"
    );
    Ok(outcome.modified)
}

/// Run [`pull_references`] over every edge in order, stopping at the first error
///
/// Returns the total number of dependent documents modified.
pub async fn cascade<S: DocumentStore>(
    store: &S,
    edges: &[ReferenceEdge],
    removed: &[ObjectId],
) -> StoreResult<u64> {
    let mut modified = 0;
    for edge in edges {
        modified += pull_references(store, edge, removed).await?;
    }
    if !edges.is_empty() && !removed.is_empty() {
        info!(edges = edges.len(), removed = removed.len(), modified, "Cascade complete");
    }
    Ok(modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{document, InMemoryStore};
    use serde_json::json;

    async fn seed(store: &InMemoryStore, a: ObjectId, b: ObjectId) {
        store
            .insert_many(
                "products",
                vec![
                    document(json!({ "name": "p1", "orientations": [a.to_hex(), b.to_hex()] })),
                    document(json!({ "name": "p2", "orientations": [b.to_hex()] })),
                    document(json!({ "name": "p3", "orientations": [] })),
                ],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_pull_references() {
        let store = InMemoryStore::new();
        let (a, b) = (ObjectId::new(), ObjectId::new());
        seed(&store, a, b).await;

        let edge = ReferenceEdge::new("products", "orientations");
        let modified = pull_references(&store, &edge, &[a]).await.unwrap();
        assert_eq!(modified, 1);

        let products = store.documents("products").await;
        assert_eq!(products[0]["orientations"], json!([b.to_hex()]));
        assert_eq!(products[1]["orientations"], json!([b.to_hex()]));
    }

    #[tokio::test]
    async fn test_absent_ids_are_noops() {
        let store = InMemoryStore::new();
        let (a, b) = (ObjectId::new(), ObjectId::new());
        seed(&store, a, b).await;

        let edge = ReferenceEdge::new("products", "orientations");
        assert_eq!(pull_references(&store, &edge, &[ObjectId::new()]).await.unwrap(), 0);
        assert_eq!(pull_references(&store, &edge, &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cascade_over_edges() {
        let store = InMemoryStore::new();
        let (a, b) = (ObjectId::new(), ObjectId::new());
        seed(&store, a, b).await;
        store
            .insert_one("banners", document(json!({ "featured": [a.to_hex()] })))
            .await
            .unwrap();

        let edges = vec![
            ReferenceEdge::new("products", "orientations"),
            ReferenceEdge::new("banners", "featured"),
        ];
        let modified = cascade(&store, &edges, &[a, b]).await.unwrap();
        assert_eq!(modified, 3);

        for product in store.documents("products").await {
            assert_eq!(product["orientations"], json!([]));
        }
    }
}
