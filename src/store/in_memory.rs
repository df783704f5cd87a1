//! In-process [`VectorStore`] with exact cosine search.
//!
//! Mirrors the Qdrant semantics the memory service depends on: collections must
//! exist before point operations, vector sizes are enforced, payload/vector
//! updates of missing ids fail with `NotFound`, and deletes of missing ids are
//! silent. Used by the test suites.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{Distance, Point, ScoredPoint, SearchRequest, StoreError, VectorStore};

struct Collection {
    vector_size: usize,
    indexes: BTreeSet<String>,
    /// Insertion order is kept so equal scores rank deterministically.
    points: Vec<Point>,
}

impl Collection {
    fn point_mut(&mut self, id: &str) -> Option<&mut Point> {
        self.points.iter_mut().find(|p| p.id == id)
    }

    fn check_size(&self, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.vector_size {
            return Err(StoreError::Backend(format!(
                "wrong vector dimension: expected {}, got {}",
                self.vector_size,
                vector.len()
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in `collection`, or `None` if it does not exist.
    pub fn point_count(&self, collection: &str) -> Option<usize> {
        self.lock().ok()?.get(collection).map(|c| c.points.len())
    }

    /// Names of keyword indexes on `collection`.
    pub fn indexed_fields(&self, collection: &str) -> Vec<String> {
        self.lock()
            .ok()
            .and_then(|map| map.get(collection).map(|c| c.indexes.iter().cloned().collect()))
            .unwrap_or_default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, Collection>>, StoreError> {
        self.collections
            .lock()
            .map_err(|e| StoreError::Backend(format!("store lock poisoned: {e}")))
    }

    fn with_collection<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Collection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut map = self.lock()?;
        let collection = map
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(format!("collection `{name}` doesn't exist")))?;
        f(collection)
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.lock()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        _distance: Distance,
    ) -> Result<(), StoreError> {
        let mut map = self.lock()?;
        if map.contains_key(name) {
            return Err(StoreError::AlreadyExists(format!(
                "collection `{name}` already exists"
            )));
        }
        map.insert(
            name.to_string(),
            Collection {
                vector_size,
                indexes: BTreeSet::new(),
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn create_keyword_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        self.with_collection(collection, |c| {
            c.indexes.insert(field.to_string());
            Ok(())
        })
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), StoreError> {
        self.with_collection(collection, |c| {
            for point in &points {
                c.check_size(&point.vector)?;
            }
            for point in points {
                match c.point_mut(&point.id) {
                    Some(existing) => *existing = point,
                    None => c.points.push(point),
                }
            }
            Ok(())
        })
    }

    async fn search(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        self.with_collection(collection, |c| {
            c.check_size(&request.vector)?;
            let mut hits: Vec<ScoredPoint> = c
                .points
                .iter()
                .filter(|p| request.filter.as_ref().map_or(true, |f| f.matches(&p.payload)))
                .map(|p| ScoredPoint {
                    id: p.id.clone(),
                    score: cosine_similarity(&request.vector, &p.vector),
                    payload: p.payload.clone(),
                })
                .filter(|hit| hit.score >= request.score_threshold)
                .collect();
            hits.sort_by(|a, b| b.score.total_cmp(&a.score));
            hits.truncate(request.limit);
            Ok(hits)
        })
    }

    async fn set_payload(
        &self,
        collection: &str,
        id: &str,
        payload: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.with_collection(collection, |c| {
            let point = c
                .point_mut(id)
                .ok_or_else(|| StoreError::NotFound(format!("no point with id {id}")))?;
            point.payload.extend(payload);
            Ok(())
        })
    }

    async fn update_vector(
        &self,
        collection: &str,
        id: &str,
        vector: Vec<f32>,
    ) -> Result<(), StoreError> {
        self.with_collection(collection, |c| {
            c.check_size(&vector)?;
            let point = c
                .point_mut(id)
                .ok_or_else(|| StoreError::NotFound(format!("no point with id {id}")))?;
            point.vector = vector;
            Ok(())
        })
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<(), StoreError> {
        self.with_collection(collection, |c| {
            c.points.retain(|p| !ids.contains(&p.id));
            Ok(())
        })
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FieldFilter;
    use serde_json::json;

    fn point(id: &str, vector: Vec<f32>, scope: &str) -> Point {
        Point {
            id: id.to_string(),
            vector,
            payload: json!({ "scope": scope, "text": id }).as_object().cloned().unwrap(),
        }
    }

    async fn store_with(points: Vec<Point>) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.create_collection("c", 2, Distance::Cosine).await.unwrap();
        store.upsert("c", points).await.unwrap();
        store
    }

    fn request(vector: Vec<f32>, threshold: f32) -> SearchRequest {
        SearchRequest {
            vector,
            limit: 10,
            score_threshold: threshold,
            filter: None,
        }
    }

    #[tokio::test]
    async fn create_twice_reports_already_exists() {
        let store = InMemoryStore::new();
        store.create_collection("c", 2, Distance::Cosine).await.unwrap();
        let err = store.create_collection("c", 2, Distance::Cosine).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.list_collections().await.unwrap(), vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn search_applies_threshold_and_orders_by_score() {
        let store = store_with(vec![
            point("far", vec![0.0, 1.0], "a"),
            point("near", vec![1.0, 0.1], "a"),
            point("exact", vec![1.0, 0.0], "a"),
        ])
        .await;

        let hits = store.search("c", request(vec![1.0, 0.0], 0.5)).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn search_honours_filter_and_limit() {
        let store = store_with(vec![
            point("a1", vec![1.0, 0.0], "a"),
            point("b1", vec![1.0, 0.0], "b"),
            point("a2", vec![1.0, 0.0], "a"),
        ])
        .await;

        let mut req = request(vec![1.0, 0.0], 0.0);
        req.filter = Some(FieldFilter::new().eq("scope", "a"));
        req.limit = 1;
        let hits = store.search("c", req).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a1");
    }

    #[tokio::test]
    async fn upsert_replaces_existing_id() {
        let store = store_with(vec![point("x", vec![1.0, 0.0], "a")]).await;
        store.upsert("c", vec![point("x", vec![0.0, 1.0], "b")]).await.unwrap();
        assert_eq!(store.point_count("c"), Some(1));
        let hits = store.search("c", request(vec![0.0, 1.0], 0.9)).await.unwrap();
        assert_eq!(hits[0].payload["scope"], "b");
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let store = store_with(vec![]).await;
        let err = store
            .upsert("c", vec![point("x", vec![1.0, 0.0, 0.0], "a")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn updates_of_missing_points_are_not_found() {
        let store = store_with(vec![]).await;
        let err = store.set_payload("c", "ghost", Map::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store.update_vector("c", "ghost", vec![1.0, 0.0]).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn set_payload_merges_fields() {
        let store = store_with(vec![point("x", vec![1.0, 0.0], "a")]).await;
        let patch = json!({ "text": "changed", "updated_at": "now" });
        store
            .set_payload("c", "x", patch.as_object().cloned().unwrap())
            .await
            .unwrap();
        let hits = store.search("c", request(vec![1.0, 0.0], 0.0)).await.unwrap();
        assert_eq!(hits[0].payload["text"], "changed");
        assert_eq!(hits[0].payload["scope"], "a");
        assert_eq!(hits[0].payload["updated_at"], "now");
    }

    #[tokio::test]
    async fn delete_missing_id_is_noop() {
        let store = store_with(vec![point("x", vec![1.0, 0.0], "a")]).await;
        store.delete("c", &["ghost".to_string()]).await.unwrap();
        assert_eq!(store.point_count("c"), Some(1));
        store.delete("c", &["x".to_string()]).await.unwrap();
        assert_eq!(store.point_count("c"), Some(0));
    }

    #[tokio::test]
    async fn operations_on_missing_collection_fail() {
        let store = InMemoryStore::new();
        let err = store.upsert("nope", vec![]).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
