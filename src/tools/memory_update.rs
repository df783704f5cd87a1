use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryUpdateParams {
    #[schemars(description = "ID of the memory to update")]
    pub id: String,

    #[schemars(description = "Replacement text; the memory is re-embedded from it")]
    pub text: String,

    #[schemars(
        description = "Collection holding the memory: 'workspace' (default) or 'global'"
    )]
    pub collection: Option<String>,
}
