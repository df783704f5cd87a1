//! MCP `memory_delete` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_delete` MCP tool. Deletion is permanent.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryDeleteParams {
    #[schemars(description = "ID of the memory to delete")]
    pub id: String,

    #[schemars(
        description = "Collection holding the memory: 'workspace' (default) or 'global'"
    )]
    pub collection: Option<String>,
}
