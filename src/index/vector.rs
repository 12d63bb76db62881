//! Vector similarity store over fixed-dimension embeddings.
//!
//! Vectors are L2-normalized on write and stored as little-endian float
//! blobs. Search is brute-force cosine over every row — exact, and fine up
//! to roughly 10^5 vectors; beyond that an approximate index is the next
//! step, not a bigger scan.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::{Result, SubstrateError};
use crate::hash::ContentHash;
use crate::index::hash_column;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS embeddings (
    hash TEXT PRIMARY KEY,
    vector BLOB NOT NULL,
    dimensions INTEGER NOT NULL,
    model TEXT NOT NULL,
    created TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_embeddings_model ON embeddings(model);
"#;

/// A ranked similarity match. `distance` is the angular transform
/// `sqrt(2 * (1 - similarity))`, not an independent metric.
#[derive(Debug, Clone, Serialize)]
pub struct VectorHit {
    pub hash: ContentHash,
    pub similarity: f64,
    pub distance: f64,
}

#[derive(Debug, Serialize)]
pub struct VectorIndexStats {
    pub count: u64,
    pub dimensions: usize,
    pub model: String,
}

pub struct VectorIndex {
    conn: Connection,
    dimensions: usize,
    model: String,
}

impl VectorIndex {
    pub fn open(dir: &Path, dimensions: usize, model: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join("vectors.db"))?;
        Self::init(conn, dimensions, model)
    }

    pub fn in_memory(dimensions: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, dimensions, "mock")
    }

    fn init(conn: Connection, dimensions: usize, model: &str) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        let mut insert_meta = conn
            .prepare("INSERT OR REPLACE INTO index_meta (key, value) VALUES (?1, ?2)")?;
        insert_meta.execute(params!["dimensions", dimensions.to_string()])?;
        insert_meta.execute(params!["model", model])?;
        drop(insert_meta);

        Ok(Self {
            conn,
            dimensions,
            model: model.to_string(),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Store an embedding for an AKU, normalized to unit length. Rejects a
    /// vector of the wrong dimensionality outright — never pads or truncates.
    pub fn store(&self, hash: &ContentHash, embedding: &[f32]) -> Result<()> {
        self.check_dimensions(embedding)?;

        let normalized = normalize_vector(embedding);
        self.conn.execute(
            "INSERT OR REPLACE INTO embeddings (hash, vector, dimensions, model, created) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                hash.as_str(),
                embedding_to_bytes(&normalized),
                self.dimensions as i64,
                self.model,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, hash: &ContentHash) -> Result<Option<Vec<f32>>> {
        let row: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT vector FROM embeddings WHERE hash = ?1",
                params![hash.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.map(|bytes| bytes_to_embedding(&bytes)))
    }

    pub fn has(&self, hash: &ContentHash) -> Result<bool> {
        let row: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM embeddings WHERE hash = ?1",
                params![hash.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.is_some())
    }

    /// Remove an embedding. `true` iff a row was deleted.
    pub fn delete(&self, hash: &ContentHash) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM embeddings WHERE hash = ?1",
            params![hash.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Brute-force cosine search, descending by similarity, filtered to
    /// `similarity >= min_similarity` and truncated to `limit`.
    pub fn search(
        &self,
        query: &[f32],
        limit: usize,
        min_similarity: f64,
    ) -> Result<Vec<VectorHit>> {
        self.check_dimensions(query)?;
        let normalized_query = normalize_vector(query);

        let mut stmt = self.conn.prepare("SELECT hash, vector FROM embeddings")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((hash_column(row, 0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut hits = Vec::new();
        for (hash, bytes) in rows {
            let embedding = bytes_to_embedding(&bytes);
            let similarity = cosine_similarity(&normalized_query, &embedding);
            if similarity >= min_similarity {
                hits.push(VectorHit {
                    hash,
                    similarity,
                    distance: (2.0 * (1.0 - similarity)).sqrt(),
                });
            }
        }

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    /// The `k` nearest neighbors of an already-stored embedding, excluding
    /// the atom itself. Errors if no embedding is stored for `hash`.
    pub fn find_nearest(&self, hash: &ContentHash, k: usize) -> Result<Vec<VectorHit>> {
        let embedding = self
            .get(hash)?
            .ok_or_else(|| SubstrateError::EmbeddingNotFound(hash.clone()))?;

        let mut hits = self.search(&embedding, k + 1, 0.0)?;
        hits.retain(|hit| hit.hash != *hash);
        hits.truncate(k);
        Ok(hits)
    }

    pub fn stats(&self) -> Result<VectorIndexStats> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(VectorIndexStats {
            count: count as u64,
            dimensions: self.dimensions,
            model: self.model.clone(),
        })
    }

    /// Drop every embedding (rebuild support).
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM embeddings", [])?;
        Ok(())
    }

    fn check_dimensions(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(SubstrateError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        Ok(())
    }
}

// ── Vector math ───────────────────────────────────────────────────────────────

/// Cosine similarity in `[-1, 1]`. Defined as 0 when either vector has zero
/// magnitude. Callers guarantee equal dimensionality.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 {
        return 0.0;
    }
    dot / magnitude
}

/// Scale a vector to unit L2 norm. A zero vector is returned unchanged.
pub fn normalize_vector(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_string;

    const DIM: usize = 8;

    fn unit(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; DIM];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn cosine_identities() {
        let a = unit(0);
        let b = unit(1);
        let neg: Vec<f32> = a.iter().map(|x| -x).collect();

        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
        assert!((cosine_similarity(&a, &neg) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &vec![0.0; DIM]), 0.0);
    }

    #[test]
    fn stored_vectors_are_unit_norm() {
        let index = VectorIndex::in_memory(DIM).unwrap();
        let hash = hash_string("scaled");
        let scaled: Vec<f32> = unit(0).iter().map(|x| x * 42.0).collect();

        index.store(&hash, &scaled).unwrap();

        let stored = index.get(&hash).unwrap().unwrap();
        let norm: f32 = stored.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn dimension_mismatch_names_both_sizes() {
        let index = VectorIndex::in_memory(DIM).unwrap();
        let hash = hash_string("wrong size");

        let err = index.store(&hash, &[1.0, 2.0]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(&DIM.to_string()));
        assert!(message.contains('2'));

        assert!(index.search(&[1.0, 2.0], 5, 0.0).is_err());
    }

    #[test]
    fn search_ranks_by_similarity() {
        let index = VectorIndex::in_memory(DIM).unwrap();
        let close = hash_string("close");
        let far = hash_string("far");

        let mut near_query = unit(0);
        near_query[1] = 0.1;
        index.store(&close, &near_query).unwrap();
        index.store(&far, &unit(3)).unwrap();

        let hits = index.search(&unit(0), 10, 0.0).unwrap();
        assert_eq!(hits[0].hash, close);
        assert!(hits[0].similarity > 0.9);
        // Angular distance transform, not an independent metric.
        let expected = (2.0 * (1.0 - hits[0].similarity)).sqrt();
        assert!((hits[0].distance - expected).abs() < 1e-9);
    }

    #[test]
    fn min_similarity_filters() {
        let index = VectorIndex::in_memory(DIM).unwrap();
        index.store(&hash_string("aligned"), &unit(0)).unwrap();
        index.store(&hash_string("orthogonal"), &unit(5)).unwrap();

        let hits = index.search(&unit(0), 10, 0.5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].hash, hash_string("aligned"));
    }

    #[test]
    fn find_nearest_excludes_self() {
        let index = VectorIndex::in_memory(DIM).unwrap();
        let anchor = hash_string("anchor");
        let neighbor = hash_string("neighbor");
        let mut near = unit(0);
        near[1] = 0.2;

        index.store(&anchor, &unit(0)).unwrap();
        index.store(&neighbor, &near).unwrap();

        let hits = index.find_nearest(&anchor, 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].hash, neighbor);
    }

    #[test]
    fn find_nearest_missing_embedding_errors() {
        let index = VectorIndex::in_memory(DIM).unwrap();
        let err = index.find_nearest(&hash_string("absent"), 3).unwrap_err();
        assert!(matches!(err, SubstrateError::EmbeddingNotFound(_)));
    }

    #[test]
    fn delete_reports_whether_row_existed() {
        let index = VectorIndex::in_memory(DIM).unwrap();
        let hash = hash_string("deletable");
        index.store(&hash, &unit(2)).unwrap();

        assert!(index.has(&hash).unwrap());
        assert!(index.delete(&hash).unwrap());
        assert!(!index.has(&hash).unwrap());
        assert!(!index.delete(&hash).unwrap());
    }

    #[test]
    fn stats_and_clear() {
        let index = VectorIndex::in_memory(DIM).unwrap();
        index.store(&hash_string("one"), &unit(0)).unwrap();
        index.store(&hash_string("two"), &unit(1)).unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.dimensions, DIM);

        index.clear().unwrap();
        assert_eq!(index.stats().unwrap().count, 0);
    }
}
