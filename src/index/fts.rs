//! Full-text index over body, title, domain, and tags (FTS5, BM25 ranked).

use std::path::Path;

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::aku::Aku;
use crate::error::Result;
use crate::hash::ContentHash;
use crate::index::hash_column;

const SCHEMA_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS content USING fts5(
    hash UNINDEXED,
    domain,
    title,
    body,
    tags,
    tokenize='porter unicode61'
);
"#;

/// A ranked full-text match. Higher score = more relevant.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub hash: ContentHash,
    pub score: f64,
}

pub struct FtsIndex {
    conn: Connection,
}

impl FtsIndex {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join("fts.db"))?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Index an atom's searchable text. Re-indexing the same hash replaces
    /// the previous row.
    pub fn index_aku(&self, aku: &Aku) -> Result<()> {
        self.conn
            .execute("DELETE FROM content WHERE hash = ?1", params![aku.id.as_str()])?;
        self.conn.execute(
            "INSERT INTO content (hash, domain, title, body, tags) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                aku.id.as_str(),
                aku.meta.domain,
                extract_title(&aku.body),
                aku.body,
                aku.meta.tags.join(" "),
            ],
        )?;
        Ok(())
    }

    /// Ranked search. Query tokens are sanitized, quoted, and joined with OR
    /// — a match on any token is sufficient. An empty or fully-sanitized
    /// query returns no results. A query FTS5 still refuses falls back to a
    /// case-insensitive substring scan with a flat score instead of erroring.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let sanitized = sanitize_query(query);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }

        match self.match_query(&sanitized, limit) {
            Ok(hits) => Ok(hits),
            Err(err) => {
                tracing::warn!(query, %err, "FTS5 query failed, falling back to substring scan");
                self.fallback_search(query, limit)
            }
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM content", [])?;
        Ok(())
    }

    fn match_query(&self, sanitized: &str, limit: usize) -> rusqlite::Result<Vec<SearchHit>> {
        let mut stmt = self.conn.prepare(
            "SELECT hash, bm25(content) AS score FROM content \
             WHERE content MATCH ?1 ORDER BY score LIMIT ?2",
        )?;
        // BM25 scores are negative with lower = better; negate so callers
        // see higher = better.
        let hits = stmt
            .query_map(params![sanitized, limit as i64], |row| {
                Ok(SearchHit {
                    hash: hash_column(row, 0)?,
                    score: -row.get::<_, f64>(1)?,
                })
            })?
            .collect();
        hits
    }

    fn fallback_search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let conditions = terms
            .iter()
            .enumerate()
            .map(|(i, _)| format!("(LOWER(body) LIKE ?{0} OR LOWER(title) LIKE ?{0})", i + 1))
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!(
            "SELECT hash FROM content WHERE {conditions} LIMIT ?{}",
            terms.len() + 1
        );

        let patterns: Vec<String> = terms.iter().map(|t| format!("%{t}%")).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let mut sql_params: Vec<&dyn rusqlite::types::ToSql> = patterns
            .iter()
            .map(|p| p as &dyn rusqlite::types::ToSql)
            .collect();
        let limit = limit as i64;
        sql_params.push(&limit);

        let hits = stmt
            .query_map(sql_params.as_slice(), |row| {
                Ok(SearchHit {
                    hash: hash_column(row, 0)?,
                    score: 1.0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hits)
    }
}

/// Strip FTS5 metacharacters from each token, wrap it in an exact-phrase
/// quote, and join with OR.
fn sanitize_query(query: &str) -> String {
    query
        .split_whitespace()
        .filter_map(|term| {
            let cleaned: String = term
                .chars()
                .filter(|c| !matches!(c, '"' | ':' | '*' | '^' | '~' | '(' | ')' | '{' | '}' | '[' | ']' | '\\'))
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(format!("\"{cleaned}\""))
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Title for the FTS row: first markdown heading, else the first non-blank
/// line truncated to 100 characters, else empty.
fn extract_title(body: &str) -> String {
    for line in body.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix("# ") {
            return heading.to_string();
        }
        if !trimmed.is_empty() {
            let end = trimmed
                .char_indices()
                .take_while(|(i, _)| *i < 100)
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(trimmed.len());
            return trimmed[..end].to_string();
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aku::{AkuLinks, AkuMeta, KnowledgeSource, KnowledgeType, SourceKind, Volatility};

    fn test_aku(body: &str, tags: Vec<&str>) -> Aku {
        let meta = AkuMeta {
            created: "2025-01-01T00:00:00+00:00".to_string(),
            source: KnowledgeSource {
                kind: SourceKind::User,
                uri: None,
                session: None,
                timestamp: "2025-01-01T00:00:00+00:00".to_string(),
                citation: None,
            },
            domain: "test/fts".to_string(),
            knowledge_type: KnowledgeType::Fact,
            confidence: 0.8,
            volatility: Volatility::Evolving,
            links: AkuLinks::new(),
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

    #[test]
    fn search_finds_body_terms() {
        let index = FtsIndex::in_memory().unwrap();
        let quantum = test_aku("The quantum computer operates at low temperatures", vec![]);
        let rust = test_aku("Rust is a systems programming language", vec![]);
        index.index_aku(&quantum).unwrap();
        index.index_aku(&rust).unwrap();

        let hits = index.search("quantum", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].hash, quantum.id);
        assert!(hits[0].score > 0.0);
    }

    #[test]
    fn any_token_is_sufficient() {
        let index = FtsIndex::in_memory().unwrap();
        let a = test_aku("All about volcanoes", vec![]);
        let b = test_aku("All about glaciers", vec![]);
        index.index_aku(&a).unwrap();
        index.index_aku(&b).unwrap();

        let hits = index.search("volcanoes glaciers", 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn tags_are_searchable() {
        let index = FtsIndex::in_memory().unwrap();
        let tagged = test_aku("Body without the keyword", vec!["distributed-systems"]);
        index.index_aku(&tagged).unwrap();

        let hits = index.search("distributed", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].hash, tagged.id);
    }

    #[test]
    fn metacharacters_do_not_error() {
        let index = FtsIndex::in_memory().unwrap();
        index
            .index_aku(&test_aku("C notes on pointer arithmetic", vec![]))
            .unwrap();

        for query in ["c* (notes)", "\"quoted\"", "weird:colon", "brackets[0]"] {
            assert!(index.search(query, 10).is_ok(), "query {query:?} errored");
        }
    }

    #[test]
    fn empty_query_yields_nothing() {
        let index = FtsIndex::in_memory().unwrap();
        index.index_aku(&test_aku("Some content", vec![])).unwrap();

        assert!(index.search("", 10).unwrap().is_empty());
        assert!(index.search("   ", 10).unwrap().is_empty());
        // Tokens that sanitize away entirely must not match everything.
        assert!(index.search("\"\" :: **", 10).unwrap().is_empty());
    }

    #[test]
    fn reindex_replaces_previous_row() {
        let index = FtsIndex::in_memory().unwrap();
        let aku = test_aku("Original searchable text", vec![]);
        index.index_aku(&aku).unwrap();
        index.index_aku(&aku).unwrap();

        let hits = index.search("searchable", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn extract_title_prefers_heading() {
        assert_eq!(extract_title("# The Title\n\nBody"), "The Title");
        assert_eq!(extract_title("\nFirst real line\nMore"), "First real line");
        assert_eq!(extract_title(""), "");
        let long = "x".repeat(200);
        assert_eq!(extract_title(&long).len(), 100);
    }

    #[test]
    fn sanitize_query_quotes_tokens() {
        assert_eq!(sanitize_query("hello world"), "\"hello\" OR \"world\"");
        assert_eq!(sanitize_query("dash-ed"), "\"dash-ed\"");
        assert_eq!(sanitize_query("a:b c*d"), "\"ab\" OR \"cd\"");
        assert_eq!(sanitize_query("::"), "");
    }
}
