//! MCP `substrate_recent` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `substrate_recent` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SubstrateRecentParams {
    #[schemars(description = "Number of recent atoms (default: 10)")]
    pub limit: Option<usize>,
}
