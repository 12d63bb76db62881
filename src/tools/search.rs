//! MCP `substrate_search` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `substrate_search` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SubstrateSearchParams {
    #[schemars(description = "Search query - keywords or natural language")]
    pub query: String,

    #[schemars(description = "Maximum results to return (default: 5)")]
    pub limit: Option<usize>,

    #[schemars(description = "Filter by domain prefix (e.g. 'data-systems')")]
    pub domain: Option<String>,
}
