//! Idempotent provisioning of the global and workspace collections.

use tracing::{debug, info};

use crate::embedding::EMBEDDING_DIM;
use crate::memory::types::{CollectionKind, INDEXED_FIELDS};
use crate::store::{Distance, StoreError, VectorStore};

/// Make sure both collections exist with the right vector size, cosine
/// distance, and keyword indexes on `scope`, `agent` and `type`.
///
/// Safe to call before every operation and from concurrent callers: a create
/// that loses the race to another caller reports `AlreadyExists`, which counts
/// as success.
pub async fn ensure_collections(store: &dyn VectorStore) -> Result<(), StoreError> {
    let existing = store.list_collections().await?;

    for kind in CollectionKind::ALL {
        let name = kind.collection_name();
        if existing.iter().any(|c| c == name) {
            debug!(collection = name, "collection already present");
            continue;
        }

        match store
            .create_collection(name, EMBEDDING_DIM, Distance::Cosine)
            .await
        {
            Ok(()) => info!(collection = name, dim = EMBEDDING_DIM, "collection created"),
            Err(StoreError::AlreadyExists(_)) => {
                debug!(collection = name, "collection created concurrently");
            }
            Err(e) => return Err(e),
        }

        // Index creation is idempotent, so the race loser re-issues it harmlessly.
        for field in INDEXED_FIELDS {
            store.create_keyword_index(name, field).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{GLOBAL_COLLECTION, WORKSPACE_COLLECTION};
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn creates_both_collections_with_indexes() {
        let store = InMemoryStore::new();
        ensure_collections(&store).await.unwrap();

        let names = store.list_collections().await.unwrap();
        assert_eq!(names, vec![GLOBAL_COLLECTION.to_string(), WORKSPACE_COLLECTION.to_string()]);
        for name in [GLOBAL_COLLECTION, WORKSPACE_COLLECTION] {
            assert_eq!(store.indexed_fields(name), vec!["agent", "scope", "type"]);
        }
    }

    #[tokio::test]
    async fn second_call_is_a_noop() {
        let store = InMemoryStore::new();
        ensure_collections(&store).await.unwrap();
        ensure_collections(&store).await.unwrap();
        assert_eq!(store.list_collections().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn creates_only_the_missing_collection() {
        let store = InMemoryStore::new();
        store
            .create_collection(GLOBAL_COLLECTION, EMBEDDING_DIM, Distance::Cosine)
            .await
            .unwrap();
        ensure_collections(&store).await.unwrap();
        // pre-existing collection is left untouched
        assert!(store.indexed_fields(GLOBAL_COLLECTION).is_empty());
        assert_eq!(store.indexed_fields(WORKSPACE_COLLECTION).len(), 3);
    }

    /// Reports no collections, as a caller would see it when racing another
    /// provisioner that has not finished creating them yet.
    struct StaleListing(InMemoryStore);

    #[async_trait::async_trait]
    impl VectorStore for StaleListing {
        async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }
        async fn create_collection(
            &self,
            name: &str,
            vector_size: usize,
            distance: Distance,
        ) -> Result<(), StoreError> {
            self.0.create_collection(name, vector_size, distance).await
        }
        async fn create_keyword_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
            self.0.create_keyword_index(collection, field).await
        }
        async fn upsert(&self, collection: &str, points: Vec<crate::store::Point>) -> Result<(), StoreError> {
            self.0.upsert(collection, points).await
        }
        async fn search(
            &self,
            collection: &str,
            request: crate::store::SearchRequest,
        ) -> Result<Vec<crate::store::ScoredPoint>, StoreError> {
            self.0.search(collection, request).await
        }
        async fn set_payload(
            &self,
            collection: &str,
            id: &str,
            payload: serde_json::Map<String, serde_json::Value>,
        ) -> Result<(), StoreError> {
            self.0.set_payload(collection, id, payload).await
        }
        async fn update_vector(&self, collection: &str, id: &str, vector: Vec<f32>) -> Result<(), StoreError> {
            self.0.update_vector(collection, id, vector).await
        }
        async fn delete(&self, collection: &str, ids: &[String]) -> Result<(), StoreError> {
            self.0.delete(collection, ids).await
        }
    }

    #[tokio::test]
    async fn losing_the_creation_race_is_not_an_error() {
        let store = StaleListing(InMemoryStore::new());
        ensure_collections(&store).await.unwrap();
        // both collections exist now, but the listing still claims otherwise
        ensure_collections(&store).await.unwrap();
        assert_eq!(store.0.list_collections().await.unwrap().len(), 2);
    }
}
