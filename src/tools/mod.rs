pub mod memory_delete;
pub mod memory_store;
pub mod memory_update;
pub mod semantic_search;
pub mod semantic_search_global;

use std::sync::Arc;

use cairn::error::MemoryError;
use cairn::memory::types::{CollectionKind, MemoryType, NewMemory, SearchHit};
use cairn::memory::MemoryService;
use memory_delete::MemoryDeleteParams;
use memory_store::MemoryStoreParams;
use memory_update::MemoryUpdateParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use semantic_search::SemanticSearchParams;
use semantic_search_global::SemanticSearchGlobalParams;

/// The Cairn MCP tool handler. Holds the process-wide memory service and
/// exposes the memory tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct CairnTools {
    tool_router: ToolRouter<Self>,
    memory: Arc<MemoryService>,
}

#[tool_router]
impl CairnTools {
    pub fn new(memory: Arc<MemoryService>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            memory,
        }
    }

    /// Store a new memory.
    #[tool(description = "Store a memory. scope='global' makes it visible to every search; any other scope keeps it within that workspace. Returns the new memory id.")]
    async fn memory_store(
        &self,
        Parameters(params): Parameters<MemoryStoreParams>,
    ) -> Result<String, String> {
        let memory_type = parse_type(&params.r#type)?;

        tracing::info!(
            text_len = params.text.len(),
            scope = %params.scope,
            agent = %params.agent,
            memory_type = %memory_type,
            "memory_store called"
        );

        let id = self
            .memory
            .store_memory(NewMemory {
                text: params.text,
                scope: params.scope,
                agent: params.agent,
                memory_type,
                tags: params.tags.unwrap_or_default(),
            })
            .await
            .map_err(tool_error)?;

        Ok(serde_json::json!({ "id": id }).to_string())
    }

    /// Search global memories plus one workspace.
    #[tool(description = "Search memories by meaning. Always searches global memories; when scope is given, also searches that workspace. Results are ranked by similarity.")]
    async fn semantic_search(
        &self,
        Parameters(params): Parameters<SemanticSearchParams>,
    ) -> Result<String, String> {
        let memory_type = params.r#type.as_deref().map(parse_type).transpose()?;

        tracing::info!(
            query = %params.query,
            scope = ?params.scope,
            "semantic_search called"
        );

        let hits = self
            .memory
            .semantic_search(&params.query, params.scope.as_deref(), memory_type, params.limit)
            .await
            .map_err(tool_error)?;

        render_hits(&hits)
    }

    /// Broad recall across global memories only.
    #[tool(description = "Search only global memories by meaning, with a lower similarity threshold for broad cross-project recall.")]
    async fn semantic_search_global(
        &self,
        Parameters(params): Parameters<SemanticSearchGlobalParams>,
    ) -> Result<String, String> {
        tracing::info!(query = %params.query, "semantic_search_global called");

        let hits = self
            .memory
            .semantic_search_global(&params.query, params.limit)
            .await
            .map_err(tool_error)?;

        render_hits(&hits)
    }

    /// Replace a memory's text.
    #[tool(description = "Replace the text of an existing memory and re-embed it. Specify collection='global' for global memories (default 'workspace').")]
    async fn memory_update(
        &self,
        Parameters(params): Parameters<MemoryUpdateParams>,
    ) -> Result<String, String> {
        let collection = parse_collection(params.collection.as_deref())?;
        tracing::info!(id = %params.id, collection = %collection, "memory_update called");

        self.memory
            .update(&params.id, &params.text, collection)
            .await
            .map_err(tool_error)?;

        Ok(serde_json::json!({ "id": params.id, "status": "updated" }).to_string())
    }

    /// Permanently delete a memory.
    #[tool(description = "Permanently delete a memory by id. Specify collection='global' for global memories (default 'workspace').")]
    async fn memory_delete(
        &self,
        Parameters(params): Parameters<MemoryDeleteParams>,
    ) -> Result<String, String> {
        let collection = parse_collection(params.collection.as_deref())?;
        tracing::info!(id = %params.id, collection = %collection, "memory_delete called");

        self.memory
            .delete(&params.id, collection)
            .await
            .map_err(tool_error)?;

        Ok(serde_json::json!({ "id": params.id, "status": "deleted" }).to_string())
    }
}

#[tool_handler]
impl ServerHandler for CairnTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Cairn is a semantic memory server. Use memory_store to save memories, \
                 semantic_search to recall global and workspace memories, and \
                 semantic_search_global for cross-project recall."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

fn parse_type(raw: &str) -> Result<MemoryType, String> {
    raw.parse()
}

fn parse_collection(raw: Option<&str>) -> Result<CollectionKind, String> {
    raw.map(str::parse::<CollectionKind>).transpose().map(Option::unwrap_or_default)
}

fn render_hits(hits: &[SearchHit]) -> Result<String, String> {
    serde_json::to_string(&serde_json::json!({
        "results": hits,
        "total": hits.len(),
    }))
    .map_err(|e| format!("serialization failed: {e}"))
}

fn tool_error(err: MemoryError) -> String {
    tracing::warn!(error = %err, "tool call failed");
    err.to_string()
}
