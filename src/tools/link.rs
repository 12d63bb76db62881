//! MCP `substrate_link` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `substrate_link` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SubstrateLinkParams {
    #[schemars(description = "Content hash of the source atom (must exist)")]
    pub from: String,

    #[schemars(description = "Content hash of the target atom (may not exist yet)")]
    pub to: String,

    #[schemars(
        description = "Relation kind: 'relates_to', 'derived_from', 'supersedes', 'contradicts', 'part_of', 'instance_of', 'causes', 'requires'"
    )]
    pub relation: String,
}
