//! MCP `semantic_search` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `semantic_search` MCP tool.
///
/// Global memories are always searched; `scope` adds that workspace's memories.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SemanticSearchParams {
    /// Natural language query.
    #[schemars(description = "Natural language query to search memories by meaning")]
    pub query: String,

    /// Workspace to search in addition to the global collection.
    #[schemars(
        description = "Workspace whose memories are searched alongside global ones. Omit (or 'global') to search global memories only."
    )]
    pub scope: Option<String>,

    /// Restrict workspace results to one memory type.
    #[schemars(
        description = "Filter workspace results by type: 'decision', 'context', 'api', 'error', 'doc', 'note', 'memory', 'person', 'event'"
    )]
    pub r#type: Option<String>,

    /// Maximum number of results. Defaults to 10.
    #[schemars(description = "Maximum number of results to return. Defaults to 10.")]
    pub limit: Option<usize>,
}
