pub mod get;
pub mod ingest;
pub mod link;
pub mod list;
pub mod recent;
pub mod search;
pub mod stats;

use std::sync::{Arc, Mutex};

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};

use aku::aku::{AkuFilter, IngestInput, KnowledgeType, RelationKind, Volatility};
use aku::hash::ContentHash;
use aku::index::IndexManager;
use aku::substrate::Substrate;

use get::SubstrateGetParams;
use ingest::SubstrateIngestParams;
use link::SubstrateLinkParams;
use list::SubstrateListParams;
use recent::SubstrateRecentParams;
use search::SubstrateSearchParams;
use stats::SubstrateStatsParams;

/// The substrate MCP tool handler. Holds the store and its derived indexes
/// and exposes all tools via the `#[tool_router]` macro. Indexing after
/// ingest happens here — the substrate itself never pushes to indexes.
#[derive(Clone)]
pub struct SubstrateTools {
    tool_router: ToolRouter<Self>,
    substrate: Arc<Substrate>,
    indexes: Arc<Mutex<IndexManager>>,
}

#[tool_router]
impl SubstrateTools {
    pub fn new(substrate: Arc<Substrate>, indexes: Arc<Mutex<IndexManager>>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            substrate,
            indexes,
        }
    }

    /// Ingest knowledge into the substrate and index it.
    #[tool(description = "Store a piece of knowledge as an immutable content-addressed atom. Identical content deduplicates to the same hash.")]
    async fn substrate_ingest(
        &self,
        Parameters(params): Parameters<SubstrateIngestParams>,
    ) -> Result<String, String> {
        let knowledge_type = params
            .r#type
            .as_deref()
            .map(str::parse::<KnowledgeType>)
            .transpose()?;
        let volatility = params
            .volatility
            .as_deref()
            .map(str::parse::<Volatility>)
            .transpose()?;

        if params.body.is_empty() {
            return Err("body must not be empty".into());
        }
        if let Some(confidence) = params.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err("confidence must be between 0.0 and 1.0".into());
            }
        }

        tracing::info!(
            body_len = params.body.len(),
            domain = %params.domain,
            "substrate_ingest called"
        );

        let substrate = Arc::clone(&self.substrate);
        let indexes = Arc::clone(&self.indexes);
        let input = IngestInput {
            body: params.body,
            domain: params.domain,
            knowledge_type,
            confidence: params.confidence,
            volatility,
            tags: params.tags,
            ..Default::default()
        };

        let hash = tokio::task::spawn_blocking(move || -> anyhow::Result<ContentHash> {
            let hash = substrate.ingest(input)?;
            if let Some(atom) = substrate.get(&hash)? {
                let indexes = indexes
                    .lock()
                    .map_err(|e| anyhow::anyhow!("index lock poisoned: {e}"))?;
                indexes.index_aku(&atom)?;
            }
            Ok(hash)
        })
        .await
        .map_err(|e| format!("ingest task failed: {e}"))?
        .map_err(|e| format!("ingest failed: {e}"))?;

        tracing::info!(hash = %hash, "atom ingested");
        Ok(serde_json::json!({ "hash": hash.as_str() }).to_string())
    }

    /// Ranked full-text search across all atoms.
    #[tool(description = "Search the knowledge substrate by keywords or natural language. Returns ranked hashes with titles.")]
    async fn substrate_search(
        &self,
        Parameters(params): Parameters<SubstrateSearchParams>,
    ) -> Result<String, String> {
        let limit = params.limit.unwrap_or(5);
        let substrate = Arc::clone(&self.substrate);
        let indexes = Arc::clone(&self.indexes);
        let query = params.query;
        let domain_filter = params.domain;

        let results = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<serde_json::Value>> {
            let hits = {
                let indexes = indexes
                    .lock()
                    .map_err(|e| anyhow::anyhow!("index lock poisoned: {e}"))?;
                indexes.search(&query, limit.max(1) * 3)?
            };

            let mut results = Vec::new();
            for hit in hits {
                let Some(atom) = substrate.get(&hit.hash)? else {
                    continue;
                };
                if let Some(ref prefix) = domain_filter {
                    if !atom.meta.domain.starts_with(prefix.as_str()) {
                        continue;
                    }
                }
                results.push(serde_json::json!({
                    "hash": hit.hash.as_str(),
                    "score": hit.score,
                    "domain": atom.meta.domain,
                    "type": atom.meta.knowledge_type.as_str(),
                    "title": title_of(&atom.body),
                }));
                if results.len() >= limit {
                    break;
                }
            }
            Ok(results)
        })
        .await
        .map_err(|e| format!("search task failed: {e}"))?
        .map_err(|e| format!("search failed: {e}"))?;

        serde_json::to_string(&results).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Retrieve a full atom by content hash.
    #[tool(description = "Get the full content and metadata of an atom by its content hash.")]
    async fn substrate_get(
        &self,
        Parameters(params): Parameters<SubstrateGetParams>,
    ) -> Result<String, String> {
        let hash = ContentHash::parse(&params.hash).map_err(|e| e.to_string())?;
        let substrate = Arc::clone(&self.substrate);

        let atom = tokio::task::spawn_blocking(move || substrate.get(&hash))
            .await
            .map_err(|e| format!("get task failed: {e}"))?
            .map_err(|e| format!("get failed: {e}"))?;

        match atom {
            Some(atom) => {
                serde_json::to_string(&atom).map_err(|e| format!("serialization failed: {e}"))
            }
            None => Err(format!("AKU not found: {}", params.hash)),
        }
    }

    /// List atom hashes with optional domain/type filters.
    #[tool(description = "List atom hashes, optionally filtered by domain prefix and knowledge type.")]
    async fn substrate_list(
        &self,
        Parameters(params): Parameters<SubstrateListParams>,
    ) -> Result<String, String> {
        let knowledge_type = params
            .r#type
            .as_deref()
            .map(str::parse::<KnowledgeType>)
            .transpose()?;
        let filter = AkuFilter {
            domain_prefix: params.domain,
            knowledge_type,
            limit: Some(params.limit.unwrap_or(20)),
            ..Default::default()
        };

        let substrate = Arc::clone(&self.substrate);
        let hashes = tokio::task::spawn_blocking(move || {
            substrate
                .list(filter)
                .map(|h| h.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| format!("list task failed: {e}"))?;

        Ok(serde_json::json!({ "count": hashes.len(), "hashes": hashes }).to_string())
    }

    /// Most recently ingested atoms.
    #[tool(description = "Get the most recently ingested atoms, newest first.")]
    async fn substrate_recent(
        &self,
        Parameters(params): Parameters<SubstrateRecentParams>,
    ) -> Result<String, String> {
        let limit = params.limit.unwrap_or(10);
        let indexes = Arc::clone(&self.indexes);

        let hashes = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<String>> {
            let indexes = indexes
                .lock()
                .map_err(|e| anyhow::anyhow!("index lock poisoned: {e}"))?;
            Ok(indexes
                .recent(limit)?
                .into_iter()
                .map(|h| h.as_str().to_string())
                .collect())
        })
        .await
        .map_err(|e| format!("recent task failed: {e}"))?
        .map_err(|e| format!("recent failed: {e}"))?;

        Ok(serde_json::json!({ "count": hashes.len(), "hashes": hashes }).to_string())
    }

    /// Store-wide statistics.
    #[tool(description = "Get substrate statistics: atom counts by type and domain, link totals, time range, disk usage.")]
    async fn substrate_stats(
        &self,
        Parameters(_params): Parameters<SubstrateStatsParams>,
    ) -> Result<String, String> {
        let substrate = Arc::clone(&self.substrate);
        let stats = tokio::task::spawn_blocking(move || substrate.stats())
            .await
            .map_err(|e| format!("stats task failed: {e}"))?
            .map_err(|e| format!("stats failed: {e}"))?;

        serde_json::to_string(&stats).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Record an edge between two atoms.
    #[tool(description = "Link two atoms in the knowledge graph. The source must exist; the target may be forward-declared.")]
    async fn substrate_link(
        &self,
        Parameters(params): Parameters<SubstrateLinkParams>,
    ) -> Result<String, String> {
        let from = ContentHash::parse(&params.from).map_err(|e| e.to_string())?;
        let to = ContentHash::parse(&params.to).map_err(|e| e.to_string())?;
        let relation: RelationKind = params.relation.parse()?;

        let substrate = Arc::clone(&self.substrate);
        tokio::task::spawn_blocking(move || substrate.link(&from, &to, relation))
            .await
            .map_err(|e| format!("link task failed: {e}"))?
            .map_err(|e| format!("link failed: {e}"))?;

        Ok(serde_json::json!({
            "from": params.from,
            "to": params.to,
            "relation": params.relation,
            "status": "linked",
        })
        .to_string())
    }
}

#[tool_handler]
impl ServerHandler for SubstrateTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Content-addressed knowledge substrate. Use substrate_ingest to store \
                 knowledge, substrate_search to find it, substrate_get for full atoms, \
                 and substrate_link to connect related atoms."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

/// First heading or first non-blank line of a body, for compact previews.
fn title_of(body: &str) -> String {
    for line in body.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix("# ") {
            return heading.to_string();
        }
        if !trimmed.is_empty() {
            return trimmed.chars().take(100).collect();
        }
    }
    "(untitled)".to_string()
}
