//! MCP `substrate_get` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `substrate_get` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SubstrateGetParams {
    #[schemars(description = "The content hash of the atom to retrieve (64 lowercase hex chars)")]
    pub hash: String,
}
