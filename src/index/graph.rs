//! Relational graph index over atoms, embedded links, and tags.
//!
//! Covers embedded links only: they are the durable, hash-covered graph.
//! External links are post-hoc annotations served by
//! [`Substrate::neighbors`](crate::substrate::Substrate::neighbors).

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::aku::{Aku, KnowledgeType, RelationKind};
use crate::error::Result;
use crate::hash::ContentHash;
use crate::index::{hash_column, relation_column};
use crate::substrate::Direction;

/// All graph tables. `IF NOT EXISTS` keeps initialization idempotent.
const SCHEMA_SQL: &str = r#"
-- Minimal atom metadata for fast lookups
CREATE TABLE IF NOT EXISTS atoms (
    hash TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    type TEXT NOT NULL,
    confidence REAL NOT NULL,
    created TEXT NOT NULL
);

-- Embedded edges
CREATE TABLE IF NOT EXISTS links (
    from_hash TEXT NOT NULL,
    to_hash TEXT NOT NULL,
    relation TEXT NOT NULL,
    created TEXT NOT NULL,
    PRIMARY KEY (from_hash, to_hash, relation),
    FOREIGN KEY (from_hash) REFERENCES atoms(hash)
);

-- Tags, many-to-many
CREATE TABLE IF NOT EXISTS tags (
    hash TEXT NOT NULL,
    tag TEXT NOT NULL,
    PRIMARY KEY (hash, tag),
    FOREIGN KEY (hash) REFERENCES atoms(hash)
);

CREATE INDEX IF NOT EXISTS idx_atoms_domain ON atoms(domain);
CREATE INDEX IF NOT EXISTS idx_atoms_type ON atoms(type);
CREATE INDEX IF NOT EXISTS idx_atoms_created ON atoms(created);
CREATE INDEX IF NOT EXISTS idx_links_from ON links(from_hash);
CREATE INDEX IF NOT EXISTS idx_links_to ON links(to_hash);
CREATE INDEX IF NOT EXISTS idx_links_relation ON links(relation);
CREATE INDEX IF NOT EXISTS idx_tags_tag ON tags(tag);
"#;

/// An embedded edge leaving an atom.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingLink {
    pub to: ContentHash,
    pub relation: RelationKind,
}

/// An embedded edge arriving at an atom.
#[derive(Debug, Clone, Serialize)]
pub struct IncomingLink {
    pub from: ContentHash,
    pub relation: RelationKind,
}

/// A node discovered during traversal, tagged with its BFS depth.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub hash: ContentHash,
    pub depth: usize,
}

pub struct GraphIndex {
    conn: Connection,
}

impl GraphIndex {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join("graph.db"))?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Upsert an atom's row, tags, and embedded-link rows. Idempotent —
    /// replace semantics on every primary key.
    pub fn index_aku(&self, aku: &Aku) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO atoms (hash, domain, type, confidence, created) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                aku.id.as_str(),
                aku.meta.domain,
                aku.meta.knowledge_type.as_str(),
                aku.meta.confidence,
                aku.meta.created,
            ],
        )?;

        let mut insert_tag = self
            .conn
            .prepare("INSERT OR IGNORE INTO tags (hash, tag) VALUES (?1, ?2)")?;
        for tag in &aku.meta.tags {
            insert_tag.execute(params![aku.id.as_str(), tag])?;
        }

        let mut insert_link = self.conn.prepare(
            "INSERT OR IGNORE INTO links (from_hash, to_hash, relation, created) \
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (relation, targets) in &aku.meta.links {
            for target in targets {
                insert_link.execute(params![
                    aku.id.as_str(),
                    target.as_str(),
                    relation.as_str(),
                    aku.meta.created,
                ])?;
            }
        }

        Ok(())
    }

    /// Atoms whose domain starts with `prefix`, most recent first.
    pub fn by_domain(&self, prefix: &str, limit: usize) -> Result<Vec<ContentHash>> {
        let mut stmt = self.conn.prepare(
            "SELECT hash FROM atoms WHERE domain LIKE ?1 || '%' \
             ORDER BY created DESC LIMIT ?2",
        )?;
        let hashes = stmt
            .query_map(params![prefix, limit as i64], |row| hash_column(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hashes)
    }

    /// Atoms of one knowledge type, most recent first.
    pub fn by_type(&self, knowledge_type: KnowledgeType, limit: usize) -> Result<Vec<ContentHash>> {
        let mut stmt = self.conn.prepare(
            "SELECT hash FROM atoms WHERE type = ?1 ORDER BY created DESC LIMIT ?2",
        )?;
        let hashes = stmt
            .query_map(params![knowledge_type.as_str(), limit as i64], |row| {
                hash_column(row, 0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hashes)
    }

    pub fn by_tag(&self, tag: &str, limit: usize) -> Result<Vec<ContentHash>> {
        let mut stmt = self
            .conn
            .prepare("SELECT hash FROM tags WHERE tag = ?1 LIMIT ?2")?;
        let hashes = stmt
            .query_map(params![tag, limit as i64], |row| hash_column(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hashes)
    }

    pub fn outgoing_links(&self, hash: &ContentHash) -> Result<Vec<OutgoingLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT to_hash, relation FROM links WHERE from_hash = ?1 ORDER BY to_hash",
        )?;
        let links = stmt
            .query_map(params![hash.as_str()], |row| {
                Ok(OutgoingLink {
                    to: hash_column(row, 0)?,
                    relation: relation_column(row, 1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    pub fn incoming_links(&self, hash: &ContentHash) -> Result<Vec<IncomingLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT from_hash, relation FROM links WHERE to_hash = ?1 ORDER BY from_hash",
        )?;
        let links = stmt
            .query_map(params![hash.as_str()], |row| {
                Ok(IncomingLink {
                    from: hash_column(row, 0)?,
                    relation: relation_column(row, 1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    /// Breadth-first exploration from `start`, up to `max_depth` hops. Each
    /// node is visited once; the first-discovered depth wins.
    pub fn traverse(
        &self,
        start: &ContentHash,
        max_depth: usize,
        direction: Direction,
    ) -> Result<Vec<GraphNode>> {
        let mut visited: HashSet<ContentHash> = HashSet::new();
        let mut result = Vec::new();
        let mut queue: VecDeque<(ContentHash, usize)> = VecDeque::new();
        queue.push_back((start.clone(), 0));

        while let Some((hash, depth)) = queue.pop_front() {
            if !visited.insert(hash.clone()) {
                continue;
            }
            result.push(GraphNode {
                hash: hash.clone(),
                depth,
            });
            if depth == max_depth {
                continue;
            }
            for neighbor in self.neighbor_hashes(&hash, direction)? {
                if !visited.contains(&neighbor) {
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        Ok(result)
    }

    /// Shortest path from `from` to `to`, treating every stored edge as
    /// navigable in both directions. Returns the inclusive hash sequence, or
    /// `None` if unreachable within `max_depth` hops. Neighbors expand in
    /// lexicographic hash order, so the choice among equal-length paths is
    /// deterministic.
    pub fn shortest_path(
        &self,
        from: &ContentHash,
        to: &ContentHash,
        max_depth: usize,
    ) -> Result<Option<Vec<ContentHash>>> {
        let mut visited: HashSet<ContentHash> = HashSet::new();
        let mut parent: HashMap<ContentHash, ContentHash> = HashMap::new();
        let mut queue: VecDeque<ContentHash> = VecDeque::new();

        visited.insert(from.clone());
        queue.push_back(from.clone());

        let mut depth = 0usize;
        let mut level_size = 1usize;

        while let Some(current) = queue.pop_front() {
            if depth > max_depth {
                return Ok(None);
            }
            level_size -= 1;

            if current == *to {
                let mut path = vec![current.clone()];
                let mut node = current;
                while let Some(prev) = parent.get(&node) {
                    path.push(prev.clone());
                    node = prev.clone();
                }
                path.reverse();
                return Ok(Some(path));
            }

            for neighbor in self.neighbor_hashes(&current, Direction::Both)? {
                if visited.insert(neighbor.clone()) {
                    parent.insert(neighbor.clone(), current.clone());
                    queue.push_back(neighbor);
                }
            }

            if level_size == 0 {
                depth += 1;
                level_size = queue.len();
            }
        }

        Ok(None)
    }

    /// Clear all graph tables, dependents first.
    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM tags; DELETE FROM links; DELETE FROM atoms;")?;
        Ok(())
    }

    fn neighbor_hashes(
        &self,
        hash: &ContentHash,
        direction: Direction,
    ) -> Result<Vec<ContentHash>> {
        let mut neighbors = Vec::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            for link in self.outgoing_links(hash)? {
                neighbors.push(link.to);
            }
        }
        if matches!(direction, Direction::In | Direction::Both) {
            for link in self.incoming_links(hash)? {
                neighbors.push(link.from);
            }
        }
        Ok(neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aku::{AkuLinks, AkuMeta, KnowledgeSource, SourceKind, Volatility};
    use crate::hash::hash_string;

    fn test_aku(body: &str, domain: &str, links: AkuLinks, tags: Vec<&str>) -> Aku {
        let meta = AkuMeta {
            created: "2025-01-01T00:00:00+00:00".to_string(),
            source: KnowledgeSource {
                kind: SourceKind::User,
                uri: None,
                session: None,
                timestamp: "2025-01-01T00:00:00+00:00".to_string(),
                citation: None,
            },
            domain: domain.to_string(),
            knowledge_type: KnowledgeType::Fact,
            confidence: 0.8,
            volatility: Volatility::Evolving,
            links,
            tags: tags.into_iter().map(String::from).collect(),
            extra: None,
        };
        let id = crate::hash::compute_hash(&meta, body).unwrap();
        Aku {
            id,
            meta,
            body: body.to_string(),
        }
    }

    fn linked(targets: &[&ContentHash]) -> AkuLinks {
        let mut links = AkuLinks::new();
        links.insert(
            RelationKind::RelatesTo,
            targets.iter().map(|h| (*h).clone()).collect(),
        );
        links
    }

    /// Chain a → b → c through embedded links.
    fn chain(index: &GraphIndex) -> (ContentHash, ContentHash, ContentHash) {
        let c = test_aku("node c", "test/chain", AkuLinks::new(), vec![]);
        let b = test_aku("node b", "test/chain", linked(&[&c.id]), vec![]);
        let a = test_aku("node a", "test/chain", linked(&[&b.id]), vec![]);
        index.index_aku(&a).unwrap();
        index.index_aku(&b).unwrap();
        index.index_aku(&c).unwrap();
        (a.id, b.id, c.id)
    }

    #[test]
    fn index_is_idempotent() {
        let index = GraphIndex::in_memory().unwrap();
        let aku = test_aku("repeat", "test/idempotent", AkuLinks::new(), vec!["tag"]);
        index.index_aku(&aku).unwrap();
        index.index_aku(&aku).unwrap();

        assert_eq!(index.by_tag("tag", 10).unwrap(), vec![aku.id]);
    }

    #[test]
    fn by_domain_matches_prefix() {
        let index = GraphIndex::in_memory().unwrap();
        let physics = test_aku("one", "physics/thermo", AkuLinks::new(), vec![]);
        let biology = test_aku("two", "biology/cells", AkuLinks::new(), vec![]);
        index.index_aku(&physics).unwrap();
        index.index_aku(&biology).unwrap();

        assert_eq!(index.by_domain("physics", 10).unwrap(), vec![physics.id]);
        assert_eq!(index.by_domain("", 10).unwrap().len(), 2);
    }

    #[test]
    fn traverse_respects_depth_bound() {
        let index = GraphIndex::in_memory().unwrap();
        let (a, b, c) = chain(&index);

        let one_hop = index.traverse(&a, 1, Direction::Out).unwrap();
        let hashes: Vec<&ContentHash> = one_hop.iter().map(|n| &n.hash).collect();
        assert!(hashes.contains(&&a));
        assert!(hashes.contains(&&b));
        assert!(!hashes.contains(&&c));

        let two_hops = index.traverse(&a, 2, Direction::Out).unwrap();
        assert_eq!(two_hops.len(), 3);
        let depth_of = |hash: &ContentHash| {
            two_hops.iter().find(|n| n.hash == *hash).map(|n| n.depth)
        };
        assert_eq!(depth_of(&a), Some(0));
        assert_eq!(depth_of(&b), Some(1));
        assert_eq!(depth_of(&c), Some(2));
    }

    #[test]
    fn traverse_in_direction_walks_backwards() {
        let index = GraphIndex::in_memory().unwrap();
        let (a, b, c) = chain(&index);

        let upstream = index.traverse(&c, 2, Direction::In).unwrap();
        let hashes: Vec<&ContentHash> = upstream.iter().map(|n| &n.hash).collect();
        assert!(hashes.contains(&&a));
        assert!(hashes.contains(&&b));
        assert!(hashes.contains(&&c));
    }

    #[test]
    fn shortest_path_follows_chain() {
        let index = GraphIndex::in_memory().unwrap();
        let (a, b, c) = chain(&index);

        let path = index.shortest_path(&a, &c, 5).unwrap().unwrap();
        assert_eq!(path, vec![a.clone(), b, c]);

        let trivial = index.shortest_path(&a, &a, 5).unwrap().unwrap();
        assert_eq!(trivial, vec![a]);
    }

    #[test]
    fn shortest_path_disconnected_is_none() {
        let index = GraphIndex::in_memory().unwrap();
        let (a, _, _) = chain(&index);
        let island = test_aku("island", "test/island", AkuLinks::new(), vec![]);
        index.index_aku(&island).unwrap();

        assert!(index.shortest_path(&a, &island.id, 5).unwrap().is_none());
    }

    #[test]
    fn shortest_path_respects_max_depth() {
        let index = GraphIndex::in_memory().unwrap();
        let (a, _, c) = chain(&index);

        assert!(index.shortest_path(&a, &c, 1).unwrap().is_none());
        assert!(index.shortest_path(&a, &c, 2).unwrap().is_some());
    }

    #[test]
    fn links_queries_return_both_directions() {
        let index = GraphIndex::in_memory().unwrap();
        let (a, b, _) = chain(&index);

        let out = index.outgoing_links(&a).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, b);
        assert_eq!(out[0].relation, RelationKind::RelatesTo);

        let incoming = index.incoming_links(&b).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].from, a);
    }

    #[test]
    fn clear_empties_all_tables() {
        let index = GraphIndex::in_memory().unwrap();
        let aku = test_aku("to clear", "test/clear", AkuLinks::new(), vec!["old"]);
        index.index_aku(&aku).unwrap();

        index.clear().unwrap();

        assert!(index.by_tag("old", 10).unwrap().is_empty());
        assert!(index.by_domain("test", 10).unwrap().is_empty());

        let atom_rows: i64 = index
            .conn
            .query_row("SELECT COUNT(*) FROM atoms", [], |row| row.get(0))
            .unwrap();
        assert_eq!(atom_rows, 0);
    }
}
