//! The memory service: store, search, update and delete over two collections.
//!
//! Every public operation provisions the collections first, then embeds (for
//! writes and searches) and calls the vector store. The embedding provider and
//! the store client are built lazily on first use, exactly once per service;
//! the server shares one service across all sessions.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::CairnConfig;
use crate::embedding::{self, EmbeddingProvider, EMBEDDING_DIM};
use crate::error::MemoryError;
use crate::memory::provision;
use crate::memory::types::{
    CollectionKind, MemoryPayload, MemoryType, NewMemory, SearchHit, GLOBAL_SCOPE,
};
use crate::store::{FieldFilter, Point, QdrantStore, SearchRequest, StoreError, VectorStore};

type EmbedderFactory =
    Arc<dyn Fn() -> anyhow::Result<Arc<dyn EmbeddingProvider>> + Send + Sync>;
type StoreFactory = Arc<dyn Fn() -> Result<Arc<dyn VectorStore>, StoreError> + Send + Sync>;

pub struct MemoryService {
    config: Arc<CairnConfig>,
    embedder: OnceCell<Arc<dyn EmbeddingProvider>>,
    store: OnceCell<Arc<dyn VectorStore>>,
    make_embedder: EmbedderFactory,
    make_store: StoreFactory,
}

/// Which required collections the store currently has.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub collections: Vec<String>,
    pub global_present: bool,
    pub workspace_present: bool,
}

impl MemoryService {
    /// Service backed by the configured ONNX model and Qdrant server.
    pub fn new(config: Arc<CairnConfig>) -> Self {
        let embedding_config = config.embedding.clone();
        let store_config = config.store.clone();
        Self::with_factories(
            config,
            Arc::new(move || -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
                let provider = embedding::create_provider(&embedding_config)?;
                Ok(Arc::from(provider))
            }),
            Arc::new(move || -> Result<Arc<dyn VectorStore>, StoreError> {
                let store = QdrantStore::connect(&store_config)?;
                Ok(Arc::new(store))
            }),
        )
    }

    /// Service whose backends are produced by the given constructors on first use.
    pub fn with_factories(
        config: Arc<CairnConfig>,
        make_embedder: EmbedderFactory,
        make_store: StoreFactory,
    ) -> Self {
        Self {
            config,
            embedder: OnceCell::new(),
            store: OnceCell::new(),
            make_embedder,
            make_store,
        }
    }

    /// Service over already-constructed backends.
    pub fn with_backends(
        config: Arc<CairnConfig>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            config,
            embedder: OnceCell::from(Arc::clone(&embedder)),
            store: OnceCell::from(Arc::clone(&store)),
            make_embedder: Arc::new(move || -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
                Ok(Arc::clone(&embedder))
            }),
            make_store: Arc::new(move || -> Result<Arc<dyn VectorStore>, StoreError> {
                Ok(Arc::clone(&store))
            }),
        }
    }

    pub fn config(&self) -> &CairnConfig {
        &self.config
    }

    async fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>, MemoryError> {
        self.embedder
            .get_or_try_init(|| async {
                let factory = Arc::clone(&self.make_embedder);
                // model load is CPU/disk heavy
                let provider = tokio::task::spawn_blocking(move || factory())
                    .await
                    .map_err(|e| MemoryError::Embedding(format!("model load task failed: {e}")))?
                    .map_err(|e| MemoryError::Embedding(format!("{e:#}")))?;
                info!("embedding provider ready");
                Ok::<_, MemoryError>(provider)
            })
            .await
            .cloned()
    }

    async fn store(&self) -> Result<Arc<dyn VectorStore>, MemoryError> {
        self.store
            .get_or_try_init(|| async {
                let store = (self.make_store)()?;
                info!(url = %self.config.store.url, "vector store client ready");
                Ok::<_, MemoryError>(store)
            })
            .await
            .cloned()
    }

    /// Embed `text` on a blocking thread and check the vector shape.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let provider = self.embedder().await?;
        let dims = provider.dimensions();
        // collections are created with a fixed vector size
        if dims != EMBEDDING_DIM {
            return Err(MemoryError::Embedding(format!(
                "provider produces {dims} dimensions, collections hold {EMBEDDING_DIM}"
            )));
        }

        let text = text.to_string();
        let vector = tokio::task::spawn_blocking(move || provider.embed(&text))
            .await
            .map_err(|e| MemoryError::Embedding(format!("embedding task failed: {e}")))?
            .map_err(|e| MemoryError::Embedding(format!("{e:#}")))?;

        if vector.is_empty() {
            return Err(MemoryError::Embedding("model produced no output".into()));
        }
        if vector.len() != dims {
            return Err(MemoryError::Embedding(format!(
                "expected {dims} dimensions, got {}",
                vector.len()
            )));
        }
        Ok(vector)
    }

    /// Create the two collections if they are missing. Idempotent.
    pub async fn ensure_collections(&self) -> Result<(), MemoryError> {
        let store = self.store().await?;
        provision::ensure_collections(store.as_ref()).await?;
        Ok(())
    }

    /// Report which required collections exist. Fails if the store is unreachable.
    pub async fn health(&self) -> Result<HealthReport, MemoryError> {
        let store = self.store().await?;
        let collections = store.list_collections().await?;
        let has = |kind: CollectionKind| collections.iter().any(|c| c == kind.collection_name());
        Ok(HealthReport {
            global_present: has(CollectionKind::Global),
            workspace_present: has(CollectionKind::Workspace),
            collections,
        })
    }

    /// Embed and persist a new record; returns its id.
    pub async fn store_memory(&self, mut memory: NewMemory) -> Result<String, MemoryError> {
        require_text("text", &memory.text)?;
        require_text("scope", &memory.scope)?;
        require_text("agent", &memory.agent)?;
        // searches trim the requested scope, so the stored one must match
        memory.scope = memory.scope.trim().to_string();

        self.ensure_collections().await?;
        let vector = self.embed(&memory.text).await?;

        let id = uuid::Uuid::now_v7().to_string();
        let collection = CollectionKind::for_scope(&memory.scope);
        let payload = MemoryPayload {
            text: memory.text,
            scope: memory.scope,
            agent: memory.agent,
            memory_type: memory.memory_type.as_str().to_string(),
            tags: memory.tags,
            created_at: chrono::Utc::now().to_rfc3339(),
            updated_at: None,
        };
        let scope = payload.scope.clone();

        let store = self.store().await?;
        store
            .upsert(
                collection.collection_name(),
                vec![Point {
                    id: id.clone(),
                    vector,
                    payload: payload.into_map(),
                }],
            )
            .await?;

        info!(id = %id, scope = %scope, collection = %collection, "memory stored");
        Ok(id)
    }

    /// Search the global collection and, when a non-global `scope` is given,
    /// that scope's slice of the workspace collection. Results from both are
    /// merged by descending score and cut to `limit`.
    ///
    /// `memory_type` narrows only the workspace leg; global knowledge is
    /// always returned regardless of type.
    pub async fn semantic_search(
        &self,
        query: &str,
        scope: Option<&str>,
        memory_type: Option<MemoryType>,
        limit: Option<usize>,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        require_text("query", query)?;
        let limit = self.resolve_limit(limit)?;
        let threshold = self.config.retrieval.scoped_score_threshold;

        self.ensure_collections().await?;
        let vector = self.embed(query).await?;
        let store = self.store().await?;

        let global_request = SearchRequest {
            vector: vector.clone(),
            limit,
            score_threshold: threshold,
            filter: None,
        };
        let global_search = store.search(CollectionKind::Global.collection_name(), global_request);

        let workspace_scope = scope
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != GLOBAL_SCOPE);

        let mut hits = match workspace_scope {
            Some(scope) => {
                let mut filter = FieldFilter::new().eq("scope", scope);
                if let Some(t) = memory_type {
                    filter = filter.eq("type", t.as_str());
                }
                let workspace_request = SearchRequest {
                    vector,
                    limit,
                    score_threshold: threshold,
                    filter: Some(filter),
                };
                let workspace_search =
                    store.search(CollectionKind::Workspace.collection_name(), workspace_request);

                let (mut global, workspace) = tokio::try_join!(global_search, workspace_search)?;
                debug!(global = global.len(), workspace = workspace.len(), "search legs done");
                global.extend(workspace);
                global
            }
            None => global_search.await?,
        };

        // stable: ties keep discovery order, global hits first
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);

        info!(
            scope = workspace_scope.unwrap_or(GLOBAL_SCOPE),
            results = hits.len(),
            "semantic search"
        );
        Ok(hits.into_iter().map(into_hit).collect())
    }

    /// Broad recall over the global collection only, with the lower global threshold.
    pub async fn semantic_search_global(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        require_text("query", query)?;
        let limit = self.resolve_limit(limit)?;

        self.ensure_collections().await?;
        let vector = self.embed(query).await?;
        let store = self.store().await?;

        let hits = store
            .search(
                CollectionKind::Global.collection_name(),
                SearchRequest {
                    vector,
                    limit,
                    score_threshold: self.config.retrieval.global_score_threshold,
                    filter: None,
                },
            )
            .await?;

        info!(results = hits.len(), "global semantic search");
        Ok(hits.into_iter().map(into_hit).collect())
    }

    /// Replace a record's text and vector in place and stamp `updated_at`.
    ///
    /// The caller names the collection; an id alone does not say which one
    /// holds the record.
    pub async fn update(
        &self,
        id: &str,
        text: &str,
        collection: CollectionKind,
    ) -> Result<(), MemoryError> {
        require_id(id)?;
        require_text("text", text)?;

        self.ensure_collections().await?;
        let vector = self.embed(text).await?;
        let store = self.store().await?;
        let name = collection.collection_name();

        let mut patch = serde_json::Map::new();
        patch.insert("text".into(), text.into());
        patch.insert("updated_at".into(), chrono::Utc::now().to_rfc3339().into());

        let not_found = |e: StoreError| match e {
            StoreError::NotFound(_) => MemoryError::NotFound {
                id: id.to_string(),
                collection,
            },
            other => MemoryError::Store(other),
        };

        store.set_payload(name, id, patch).await.map_err(not_found)?;
        store.update_vector(name, id, vector).await.map_err(not_found)?;

        info!(id = %id, collection = %collection, "memory updated");
        Ok(())
    }

    /// Permanently remove a record. Deleting a missing id succeeds.
    pub async fn delete(&self, id: &str, collection: CollectionKind) -> Result<(), MemoryError> {
        require_id(id)?;

        self.ensure_collections().await?;
        let store = self.store().await?;
        store
            .delete(collection.collection_name(), &[id.to_string()])
            .await?;

        info!(id = %id, collection = %collection, "memory deleted");
        Ok(())
    }

    fn resolve_limit(&self, limit: Option<usize>) -> Result<usize, MemoryError> {
        let max = self.config.retrieval.max_limit;
        match limit.unwrap_or(self.config.retrieval.default_limit) {
            0 => Err(MemoryError::validation("limit must be at least 1")),
            n if n > max => Err(MemoryError::validation(format!(
                "limit must be at most {max}"
            ))),
            n => Ok(n),
        }
    }
}

fn into_hit(point: crate::store::ScoredPoint) -> SearchHit {
    SearchHit {
        id: point.id,
        score: point.score,
        payload: point.payload,
    }
}

fn require_text(field: &str, value: &str) -> Result<(), MemoryError> {
    if value.trim().is_empty() {
        return Err(MemoryError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Point ids are UUIDs; anything else cannot address a record.
fn require_id(id: &str) -> Result<(), MemoryError> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| MemoryError::validation(format!("invalid memory id: {id}")))
}
