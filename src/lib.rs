//! Content-addressed knowledge substrate for AI agents.
//!
//! Knowledge is stored as AKUs (Atomic Knowledge Units): immutable records
//! whose identity is the SHA-256 hash of their canonical content. Identical
//! knowledge ingested twice collapses to one atom; corrections are new atoms
//! linked via `supersedes`. Atoms live as human-readable frontmatter files,
//! sharded by hash prefix; everything else is a rebuildable projection.
//!
//! # Architecture
//!
//! - **Storage**: one file per atom under `atoms/<shard>/<hash>`, plus head
//!   pointers, an append-only external link log, and write-ahead markers
//! - **Indexes**: SQLite-backed graph, temporal, and FTS5 indexes, each
//!   derived from the atom stream and rebuildable at any time
//! - **Vectors**: brute-force cosine similarity over externally supplied
//!   embeddings
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP/SSE, plus a
//!   terminal CLI
//!
//! # Modules
//!
//! - [`aku`] — AKU types and the frontmatter atom format
//! - [`hash`] — canonical serialization and content hashing
//! - [`substrate`] — ingest, get, list, link, neighbors, verify, stats
//! - [`index`] — derived graph/temporal/full-text/vector indexes
//! - [`embedding`] — embedding provider trait and the deterministic mock
//! - [`config`] — store configuration loaded from `.aku/config.yaml`

pub mod aku;
pub mod config;
pub mod embedding;
pub mod error;
pub mod hash;
pub mod index;
pub mod substrate;
