//! MCP `substrate_list` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `substrate_list` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SubstrateListParams {
    #[schemars(description = "Filter by domain prefix")]
    pub domain: Option<String>,

    #[schemars(
        description = "Filter by type: 'fact', 'concept', 'relationship', 'procedure', 'insight', 'question', 'artifact'"
    )]
    pub r#type: Option<String>,

    #[schemars(description = "Maximum results (default: 20)")]
    pub limit: Option<usize>,
}
