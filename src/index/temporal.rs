//! Time-ordered index for recency and range queries.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::aku::Aku;
use crate::error::Result;
use crate::hash::ContentHash;
use crate::index::hash_column;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS timeline (
    hash TEXT PRIMARY KEY,
    created TEXT NOT NULL,
    domain TEXT NOT NULL,
    type TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_timeline_created ON timeline(created);
CREATE INDEX IF NOT EXISTS idx_timeline_domain_created ON timeline(domain, created);
"#;

pub struct TemporalIndex {
    conn: Connection,
}

impl TemporalIndex {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join("temporal.db"))?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    pub fn index_aku(&self, aku: &Aku) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO timeline (hash, created, domain, type) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                aku.id.as_str(),
                aku.meta.created,
                aku.meta.domain,
                aku.meta.knowledge_type.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Most recently created atoms first.
    pub fn recent(&self, limit: usize) -> Result<Vec<ContentHash>> {
        let mut stmt = self
            .conn
            .prepare("SELECT hash FROM timeline ORDER BY created DESC LIMIT ?1")?;
        let hashes = stmt
            .query_map(params![limit as i64], |row| hash_column(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hashes)
    }

    /// Atoms created in `[from, to]`, inclusive bounds, most recent first.
    pub fn in_time_range(&self, from: &str, to: &str, limit: usize) -> Result<Vec<ContentHash>> {
        let mut stmt = self.conn.prepare(
            "SELECT hash FROM timeline WHERE created >= ?1 AND created <= ?2 \
             ORDER BY created DESC LIMIT ?3",
        )?;
        let hashes = stmt
            .query_map(params![from, to, limit as i64], |row| hash_column(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hashes)
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM timeline", [])?;
        Ok(())
    }
}
