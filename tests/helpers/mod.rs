#![allow(dead_code)]

use std::path::Path;

use tempfile::TempDir;

use aku::aku::{IngestInput, KnowledgeType};
use aku::config::SubstrateConfig;
use aku::hash::ContentHash;
use aku::index::IndexManager;
use aku::substrate::Substrate;

/// Create a store in a fresh temp directory. The `TempDir` guard must stay
/// alive for the duration of the test.
pub fn test_store() -> (TempDir, Substrate, IndexManager) {
    let dir = tempfile::tempdir().unwrap();
    let substrate = Substrate::init(dir.path(), SubstrateConfig::default()).unwrap();
    let indexes =
        IndexManager::open(&substrate.indexes_dir(), &substrate.config().indexes).unwrap();
    (dir, substrate, indexes)
}

/// Ingest a plain fact atom. Returns its content hash.
pub fn ingest(substrate: &Substrate, body: &str, domain: &str) -> ContentHash {
    substrate
        .ingest(IngestInput {
            body: body.to_string(),
            domain: domain.to_string(),
            ..Default::default()
        })
        .unwrap()
}

/// Ingest an atom with tags and index it into every enabled index.
pub fn ingest_indexed(
    substrate: &Substrate,
    indexes: &IndexManager,
    body: &str,
    domain: &str,
    tags: &[&str],
) -> ContentHash {
    let hash = substrate
        .ingest(IngestInput {
            body: body.to_string(),
            domain: domain.to_string(),
            knowledge_type: Some(KnowledgeType::Fact),
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            ..Default::default()
        })
        .unwrap();
    let atom = substrate.get(&hash).unwrap().unwrap();
    indexes.index_aku(&atom).unwrap();
    hash
}

/// On-disk path of an atom file (shard depth 2, the default config).
pub fn atom_path(root: &Path, hash: &ContentHash) -> std::path::PathBuf {
    root.join("atoms")
        .join(hash.shard_prefix(2))
        .join(hash.as_str())
}
