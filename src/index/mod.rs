//! Derived indexes over the atom store.
//!
//! Indexes are projections, never a source of truth — every one of them can
//! be cleared and rebuilt from the atom stream at any time. The caller is
//! responsible for indexing after ingest; nothing here subscribes to the
//! substrate.

pub mod fts;
pub mod graph;
pub mod temporal;
pub mod vector;

use std::path::Path;

use crate::aku::{Aku, KnowledgeType};
use crate::config::IndexConfig;
use crate::error::Result;
use crate::hash::ContentHash;
use crate::substrate::Direction;

use fts::{FtsIndex, SearchHit};
use graph::{GraphIndex, GraphNode, IncomingLink, OutgoingLink};
use temporal::TemporalIndex;

/// Owns the graph, temporal, and full-text indexes behind one façade. An
/// index disabled in config indexes nothing and answers every query with an
/// empty result. The vector index is managed separately — it consumes
/// externally supplied embeddings, not the atom stream.
pub struct IndexManager {
    graph: Option<GraphIndex>,
    temporal: Option<TemporalIndex>,
    fts: Option<FtsIndex>,
}

impl IndexManager {
    /// Open the enabled indexes under `dir` (the store's `indexes/`
    /// directory).
    pub fn open(dir: &Path, config: &IndexConfig) -> Result<Self> {
        Ok(Self {
            graph: config
                .graph
                .enabled
                .then(|| GraphIndex::open(dir))
                .transpose()?,
            temporal: config
                .temporal
                .enabled
                .then(|| TemporalIndex::open(dir))
                .transpose()?,
            fts: config
                .fts
                .enabled
                .then(|| FtsIndex::open(dir))
                .transpose()?,
        })
    }

    /// All three indexes, in memory. Used by tests.
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            graph: Some(GraphIndex::in_memory()?),
            temporal: Some(TemporalIndex::in_memory()?),
            fts: Some(FtsIndex::in_memory()?),
        })
    }

    /// Index an AKU into every enabled index. Call after each ingest.
    pub fn index_aku(&self, aku: &Aku) -> Result<()> {
        if let Some(graph) = &self.graph {
            graph.index_aku(aku)?;
        }
        if let Some(temporal) = &self.temporal {
            temporal.index_aku(aku)?;
        }
        if let Some(fts) = &self.fts {
            fts.index_aku(aku)?;
        }
        Ok(())
    }

    /// Clear every enabled index and re-populate it from the atom stream.
    /// Returns the number of atoms indexed. This is the recovery path — the
    /// stream is the only input.
    pub fn rebuild(&self, atoms: impl Iterator<Item = Aku>) -> Result<usize> {
        if let Some(graph) = &self.graph {
            graph.clear()?;
        }
        if let Some(temporal) = &self.temporal {
            temporal.clear()?;
        }
        if let Some(fts) = &self.fts {
            fts.clear()?;
        }

        let mut count = 0usize;
        for aku in atoms {
            self.index_aku(&aku)?;
            count += 1;
        }

        tracing::info!(count, "indexes rebuilt");
        Ok(count)
    }

    // ── Query delegation — disabled index ⇒ empty result ─────────────────────

    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        match &self.fts {
            Some(fts) => fts.search(query, limit),
            None => Ok(Vec::new()),
        }
    }

    pub fn by_domain(&self, prefix: &str, limit: usize) -> Result<Vec<ContentHash>> {
        match &self.graph {
            Some(graph) => graph.by_domain(prefix, limit),
            None => Ok(Vec::new()),
        }
    }

    pub fn by_type(&self, knowledge_type: KnowledgeType, limit: usize) -> Result<Vec<ContentHash>> {
        match &self.graph {
            Some(graph) => graph.by_type(knowledge_type, limit),
            None => Ok(Vec::new()),
        }
    }

    pub fn by_tag(&self, tag: &str, limit: usize) -> Result<Vec<ContentHash>> {
        match &self.graph {
            Some(graph) => graph.by_tag(tag, limit),
            None => Ok(Vec::new()),
        }
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<ContentHash>> {
        match &self.temporal {
            Some(temporal) => temporal.recent(limit),
            None => Ok(Vec::new()),
        }
    }

    pub fn in_time_range(&self, from: &str, to: &str, limit: usize) -> Result<Vec<ContentHash>> {
        match &self.temporal {
            Some(temporal) => temporal.in_time_range(from, to, limit),
            None => Ok(Vec::new()),
        }
    }

    pub fn outgoing_links(&self, hash: &ContentHash) -> Result<Vec<OutgoingLink>> {
        match &self.graph {
            Some(graph) => graph.outgoing_links(hash),
            None => Ok(Vec::new()),
        }
    }

    pub fn incoming_links(&self, hash: &ContentHash) -> Result<Vec<IncomingLink>> {
        match &self.graph {
            Some(graph) => graph.incoming_links(hash),
            None => Ok(Vec::new()),
        }
    }

    pub fn traverse(
        &self,
        start: &ContentHash,
        max_depth: usize,
        direction: Direction,
    ) -> Result<Vec<GraphNode>> {
        match &self.graph {
            Some(graph) => graph.traverse(start, max_depth, direction),
            None => Ok(Vec::new()),
        }
    }

    pub fn shortest_path(
        &self,
        from: &ContentHash,
        to: &ContentHash,
        max_depth: usize,
    ) -> Result<Option<Vec<ContentHash>>> {
        match &self.graph {
            Some(graph) => graph.shortest_path(from, to, max_depth),
            None => Ok(None),
        }
    }
}

/// Read a hash column, surfacing a bad row as a conversion failure rather
/// than a panic.
pub(crate) fn hash_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<ContentHash> {
    let raw: String = row.get(idx)?;
    ContentHash::parse(&raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            err.to_string().into(),
        )
    })
}

/// Read a relation-kind column stored as its snake_case string.
pub(crate) fn relation_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<crate::aku::RelationKind> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|err: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, err.into())
    })
}
