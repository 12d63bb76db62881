pub mod get;
pub mod graph;
pub mod ingest;
pub mod init;
pub mod link;
pub mod list;
pub mod rebuild;
pub mod recent;
pub mod search;
pub mod stats;
pub mod vectors;
pub mod verify;

use std::path::Path;

use anyhow::{bail, Result};

use aku::embedding::{create_provider, EmbeddingProvider};
use aku::index::vector::VectorIndex;
use aku::index::IndexManager;
use aku::substrate::Substrate;

/// Open the store at `root` along with its enabled indexes.
pub fn open_store(root: &Path) -> Result<(Substrate, IndexManager)> {
    let substrate = Substrate::open(root)?;
    let indexes = IndexManager::open(&substrate.indexes_dir(), &substrate.config().indexes)?;
    Ok((substrate, indexes))
}

/// Open the vector index and its embedding provider. Errors if vectors are
/// disabled in the store config.
pub fn open_vectors(substrate: &Substrate) -> Result<(VectorIndex, Box<dyn EmbeddingProvider>)> {
    let config = &substrate.config().indexes.vectors;
    if !config.enabled {
        bail!("vector index is disabled — set indexes.vectors.enabled in .aku/config.yaml");
    }
    let provider = create_provider(config)?;
    let vectors = VectorIndex::open(
        &substrate.indexes_dir(),
        provider.dimensions(),
        provider.model(),
    )?;
    Ok((vectors, provider))
}

/// Short display form of a hash for terminal listings.
pub fn short_hash(hash: &aku::hash::ContentHash) -> String {
    format!("{}...", &hash.as_str()[..12])
}

/// First heading or first non-blank line, for one-line listings.
pub fn title_of(body: &str) -> String {
    for line in body.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix("# ") {
            return heading.to_string();
        }
        if !trimmed.is_empty() {
            return trimmed.chars().take(80).collect();
        }
    }
    "(untitled)".to_string()
}
