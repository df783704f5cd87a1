//! Vector store boundary.
//!
//! [`VectorStore`] is the thin contract the memory service needs from a remote
//! vector database. [`qdrant::QdrantStore`] talks to Qdrant over gRPC;
//! [`in_memory::InMemoryStore`] implements the same semantics in-process.
//!
//! Every mutating call waits for the write to be durable before returning, so a
//! subsequent search observes it.

pub mod in_memory;
pub mod qdrant;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use in_memory::InMemoryStore;
pub use qdrant::QdrantStore;

/// Failure reported by a vector store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed point or collection does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A collection with the requested name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Transport or server failure.
    #[error("{0}")]
    Backend(String),
}

/// Similarity metric a collection is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Cosine,
}

/// A point to upsert: id, vector, and JSON object payload.
#[derive(Debug, Clone)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

/// One search result as returned by the store, already ordered by descending score.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Map<String, Value>,
}

/// Conjunction of keyword equality predicates (`field == value` for every entry).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFilter {
    pub must: Vec<(String, String)>,
}

impl FieldFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `field == value` predicate.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.must.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// True when every predicate matches a string field of `payload`.
    pub fn matches(&self, payload: &Map<String, Value>) -> bool {
        self.must
            .iter()
            .all(|(field, value)| payload.get(field).and_then(Value::as_str) == Some(value.as_str()))
    }
}

/// Parameters for a single-collection similarity search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    pub limit: usize,
    /// Hits scoring below this value are excluded.
    pub score_threshold: f32,
    pub filter: Option<FieldFilter>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Create a collection. Fails with [`StoreError::AlreadyExists`] if the name is taken.
    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<(), StoreError>;

    /// Create a keyword payload index on `field`. Re-creating an existing index is a no-op.
    async fn create_keyword_index(&self, collection: &str, field: &str) -> Result<(), StoreError>;

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), StoreError>;

    async fn search(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> Result<Vec<ScoredPoint>, StoreError>;

    /// Merge `payload` fields into an existing point. [`StoreError::NotFound`] if absent.
    async fn set_payload(
        &self,
        collection: &str,
        id: &str,
        payload: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Replace the vector of an existing point. [`StoreError::NotFound`] if absent.
    async fn update_vector(
        &self,
        collection: &str,
        id: &str,
        vector: Vec<f32>,
    ) -> Result<(), StoreError>;

    /// Delete points by id. Missing ids are ignored.
    async fn delete(&self, collection: &str, ids: &[String]) -> Result<(), StoreError>;
}
