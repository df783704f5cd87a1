//! MCP `semantic_search_global` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `semantic_search_global` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SemanticSearchGlobalParams {
    #[schemars(description = "Natural language query to search global memories by meaning")]
    pub query: String,

    #[schemars(description = "Maximum number of results to return. Defaults to 10.")]
    pub limit: Option<usize>,
}
