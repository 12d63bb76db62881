//! MCP `substrate_ingest` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `substrate_ingest` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SubstrateIngestParams {
    #[schemars(description = "The content of the atom (markdown format)")]
    pub body: String,

    #[schemars(description = "Domain path, e.g. 'learned/conversations/insight'")]
    pub domain: String,

    #[schemars(
        description = "Type of knowledge: 'fact', 'concept', 'relationship', 'procedure', 'insight', 'question', 'artifact'. Defaults to 'fact'."
    )]
    pub r#type: Option<String>,

    #[schemars(description = "Tags for categorization")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Confidence level 0.0-1.0. Defaults to the store's configured default.")]
    pub confidence: Option<f64>,

    #[schemars(
        description = "Volatility: 'stable', 'evolving', or 'ephemeral'. Defaults to the store's configured default."
    )]
    pub volatility: Option<String>,
}
