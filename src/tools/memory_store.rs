use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryStoreParams {
    #[schemars(description = "The natural language content to remember")]
    pub text: String,

    #[schemars(
        description = "Workspace the memory belongs to. 'global' stores it in the shared collection visible to every search."
    )]
    pub scope: String,

    #[schemars(description = "Name of the agent storing this memory")]
    pub agent: String,

    #[schemars(
        description = "Memory type: 'decision', 'context', 'api', 'error', 'doc', 'note', 'memory', 'person', 'event'"
    )]
    pub r#type: String,

    #[schemars(description = "Optional free-form tags")]
    pub tags: Option<Vec<String>>,
}
