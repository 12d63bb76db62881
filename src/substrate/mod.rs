//! Core substrate operations — ingest, get, list, link, neighbors.
//!
//! The substrate is append-only and content-addressed: every atom is stored
//! under its own hash, identical knowledge deduplicates to a single file, and
//! corrections are new atoms linked via `supersedes`. Derived indexes live
//! elsewhere and are never a source of truth.

pub mod integrity;
pub mod links;
pub mod storage;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::aku::{
    parse_aku, serialize_aku, Aku, AkuFilter, AkuMeta, IngestInput, KnowledgeSource,
    KnowledgeType, RelationKind, SourceKind,
};
use crate::config::{SubstrateConfig, AKU_VERSION};
use crate::error::{Result, SubstrateError};
use crate::hash::{compute_hash, normalize_body, ContentHash};
use crate::substrate::links::ExternalLink;
use crate::substrate::storage::{AtomStorage, FsAtomStorage, MemAtomStorage, StoreLog};

/// Edge direction for neighbor and traversal queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
    Both,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "out" => Ok(Self::Out),
            "in" => Ok(Self::In),
            "both" => Ok(Self::Both),
            _ => Err(format!("unknown direction: {s} (expected out, in, or both)")),
        }
    }
}

/// The knowledge substrate. Owns validation, defaults, deduplication, head
/// pointers, and the write-ahead markers around each atom write.
pub struct Substrate {
    root: PathBuf,
    config: SubstrateConfig,
    storage: Box<dyn AtomStorage>,
}

impl Substrate {
    /// Initialize a new store at `root`: directory skeleton, version marker,
    /// config file, and the index .gitignore (indexes are disposable).
    pub fn init(root: &Path, config: SubstrateConfig) -> Result<Self> {
        for dir in [".aku", "atoms", "heads/domains", "indexes", "WAL"] {
            std::fs::create_dir_all(root.join(dir))?;
        }
        std::fs::write(root.join(".aku").join("version"), AKU_VERSION.to_string())?;
        let yaml = serde_yaml::to_string(&config)?;
        std::fs::write(root.join(".aku").join("config.yaml"), yaml)?;
        std::fs::write(root.join("indexes").join(".gitignore"), "*\n!.gitignore\n")?;

        tracing::info!(root = %root.display(), "substrate initialized");
        Ok(Self::with_fs_storage(root, config))
    }

    /// Open an existing store, initializing it first if the version marker is
    /// absent.
    pub fn open(root: &Path) -> Result<Self> {
        if !root.join(".aku").join("version").exists() {
            return Self::init(root, SubstrateConfig::default());
        }
        let config = SubstrateConfig::load_from(root.join(".aku").join("config.yaml"))
            .map_err(|err| std::io::Error::other(err.to_string()))?;
        Ok(Self::with_fs_storage(root, config))
    }

    /// A substrate backed by in-memory storage. Used by tests; `root()` is
    /// empty for these stores.
    pub fn in_memory(config: SubstrateConfig) -> Self {
        Self {
            root: PathBuf::new(),
            config,
            storage: Box::new(MemAtomStorage::new()),
        }
    }

    fn with_fs_storage(root: &Path, config: SubstrateConfig) -> Self {
        let storage = FsAtomStorage::new(root, config.substrate.shard_depth);
        Self {
            root: root.to_path_buf(),
            config,
            storage: Box::new(storage),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SubstrateConfig {
        &self.config
    }

    pub fn indexes_dir(&self) -> PathBuf {
        self.root.join("indexes")
    }

    pub(crate) fn storage(&self) -> &dyn AtomStorage {
        self.storage.as_ref()
    }

    // ── Core operations ───────────────────────────────────────────────────────

    /// Ingest knowledge. Returns the content hash of the AKU — the existing
    /// one if equal content was already stored (no duplicate write, no
    /// duplicate side effects).
    pub fn ingest(&self, input: IngestInput) -> Result<ContentHash> {
        // Must run before any path is derived from the domain.
        validate_domain(&input.domain)?;

        let now = chrono::Utc::now().to_rfc3339();
        let source_input = input.source.unwrap_or_default();
        let source = KnowledgeSource {
            kind: source_input.kind.unwrap_or(SourceKind::User),
            uri: source_input.uri,
            session: source_input.session,
            timestamp: source_input.timestamp.unwrap_or_else(|| now.clone()),
            citation: source_input.citation,
        };

        let meta = AkuMeta {
            created: now,
            source,
            domain: input.domain,
            knowledge_type: input.knowledge_type.unwrap_or(KnowledgeType::Fact),
            confidence: input
                .confidence
                .unwrap_or(self.config.defaults.confidence),
            volatility: input
                .volatility
                .unwrap_or(self.config.defaults.volatility),
            links: input.links.unwrap_or_default(),
            tags: input.tags.unwrap_or_default(),
            extra: input.extra,
        };

        let body = normalize_body(&input.body);
        let hash = compute_hash(&meta, &body)?;

        if self.exists(&hash) {
            tracing::debug!(hash = %hash, "ingest deduplicated");
            return Ok(hash);
        }

        let aku = Aku {
            id: hash.clone(),
            meta,
            body,
        };

        self.wal_mark(&hash, "pending")?;
        self.storage.write_atom(&hash, &serialize_aku(&aku)?)?;
        self.storage.write_head("latest", &hash)?;
        self.storage.append_line(
            &StoreLog::DomainHead(top_level(&aku.meta.domain).to_string()),
            hash.as_str(),
        )?;
        self.wal_mark(&hash, "committed")?;

        tracing::info!(hash = %hash, domain = %aku.meta.domain, "AKU ingested");
        Ok(hash)
    }

    /// Get an AKU by hash. `Ok(None)` means well-formed but absent; malformed
    /// hash strings never reach this point because [`ContentHash`] validates
    /// at construction.
    pub fn get(&self, hash: &ContentHash) -> Result<Option<Aku>> {
        match self.storage.read_atom(hash)? {
            Some(content) => Ok(Some(parse_aku(&content, hash.clone())?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, hash: &ContentHash) -> bool {
        self.storage.atom_exists(hash)
    }

    /// Lazily iterate hashes matching `filter`. Each call starts a fresh
    /// scan; the iterator is finite and not restartable mid-stream. Entries
    /// that fail to load are skipped here — `verify` reports them.
    pub fn list(&self, filter: AkuFilter) -> impl Iterator<Item = ContentHash> + '_ {
        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(usize::MAX);
        let needs_meta = filter.filters_meta();

        self.storage
            .atom_hashes()
            .filter(move |hash| {
                if !needs_meta {
                    return true;
                }
                matches!(self.get(hash), Ok(Some(aku)) if filter.matches(&aku))
            })
            .skip(offset)
            .take(limit)
    }

    /// Iterate full AKUs, skipping undecodable entries. This is the stream
    /// the index rebuild consumes.
    pub fn atoms(&self) -> impl Iterator<Item = Aku> + '_ {
        self.storage
            .atom_hashes()
            .filter_map(move |hash| self.get(&hash).ok().flatten())
    }

    /// Record an edge between two AKUs in the external link log. The source
    /// must exist; the target is not checked, so links to atoms that arrive
    /// later (or live elsewhere) are allowed.
    pub fn link(
        &self,
        from: &ContentHash,
        to: &ContentHash,
        relation: RelationKind,
    ) -> Result<()> {
        if !self.exists(from) {
            return Err(SubstrateError::SourceNotFound(from.clone()));
        }

        let entry = ExternalLink {
            from: from.clone(),
            to: to.clone(),
            relation,
            created: chrono::Utc::now().to_rfc3339(),
        };
        links::append_link(self.storage.as_ref(), &entry)?;

        tracing::info!(from = %from, to = %to, relation = %relation, "external link recorded");
        Ok(())
    }

    /// Neighboring AKUs in the knowledge graph, merging embedded links
    /// (outgoing only — they are authored by the source atom) with the
    /// external log in both directions. Duplicate edges collapse.
    pub fn neighbors(
        &self,
        hash: &ContentHash,
        direction: Direction,
    ) -> Result<BTreeSet<ContentHash>> {
        let mut neighbors = BTreeSet::new();

        if matches!(direction, Direction::Out | Direction::Both) {
            if let Some(aku) = self.get(hash)? {
                for targets in aku.meta.links.values() {
                    neighbors.extend(targets.iter().cloned());
                }
            }
        }

        for link in links::read_links(self.storage.as_ref())? {
            match direction {
                Direction::Out if link.from == *hash => {
                    neighbors.insert(link.to);
                }
                Direction::In if link.to == *hash => {
                    neighbors.insert(link.from);
                }
                Direction::Both => {
                    if link.from == *hash {
                        neighbors.insert(link.to);
                    } else if link.to == *hash {
                        neighbors.insert(link.from);
                    }
                }
                _ => {}
            }
        }

        Ok(neighbors)
    }

    /// All recorded external links, in append order.
    pub fn external_links(&self) -> Result<Vec<ExternalLink>> {
        links::read_links(self.storage.as_ref())
    }

    /// Read a head pointer (`latest` is written on every ingest).
    pub fn head(&self, name: &str) -> Result<Option<ContentHash>> {
        self.storage.read_head(name)
    }

    fn wal_mark(&self, hash: &ContentHash, status: &str) -> Result<()> {
        let entry = serde_json::json!({
            "hash": hash.as_str(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "status": status,
        });
        self.storage.append_line(&StoreLog::Wal, &entry.to_string())
    }
}

/// First segment of a domain path.
pub(crate) fn top_level(domain: &str) -> &str {
    domain.split('/').next().unwrap_or(domain)
}

/// Validate a domain path before it is used in any filesystem path.
///
/// Rejects traversal patterns (`..`, `//`, leading `/`, backslashes, and
/// URL-encoded variants) and requires every `/`-separated segment to start
/// with an alphanumeric character followed by alphanumerics, underscores, or
/// hyphens.
pub fn validate_domain(domain: &str) -> Result<()> {
    let invalid = |reason: &str| SubstrateError::InvalidDomain {
        domain: domain.to_string(),
        reason: reason.to_string(),
    };

    if domain.is_empty() {
        return Err(invalid("empty domain"));
    }
    if domain.contains("..")
        || domain.contains("//")
        || domain.starts_with('/')
        || domain.contains('\\')
    {
        return Err(invalid("path traversal detected"));
    }
    let lowered = domain.to_ascii_lowercase();
    if lowered.contains("%2f") || lowered.contains("%2e%2e") {
        return Err(invalid("path traversal detected"));
    }

    for segment in domain.split('/') {
        let mut bytes = segment.bytes();
        let starts_alnum = matches!(
            bytes.next(),
            Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9')
        );
        let rest_safe = bytes.all(|b| {
            matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-')
        });
        if !starts_alnum || !rest_safe {
            return Err(invalid(&format!(
                "segment {segment:?} must start with alphanumeric and contain only alphanumeric, underscore, or hyphen"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_substrate() -> Substrate {
        Substrate::in_memory(SubstrateConfig::default())
    }

    fn ingest_fact(substrate: &Substrate, body: &str, domain: &str) -> ContentHash {
        substrate
            .ingest(IngestInput {
                body: body.to_string(),
                domain: domain.to_string(),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn ingest_applies_defaults() {
        let substrate = test_substrate();
        let hash = ingest_fact(&substrate, "Water boils at 100C at sea level", "physics/thermo");

        let aku = substrate.get(&hash).unwrap().unwrap();
        assert_eq!(aku.meta.knowledge_type, KnowledgeType::Fact);
        assert!((aku.meta.confidence - 0.8).abs() < f64::EPSILON);
        assert_eq!(aku.meta.volatility, crate::aku::Volatility::Evolving);
        assert_eq!(aku.meta.source.kind, SourceKind::User);
        assert!(aku.meta.links.is_empty());
        assert!(aku.meta.tags.is_empty());
    }

    #[test]
    fn ingest_is_idempotent() {
        let substrate = test_substrate();
        let first = ingest_fact(&substrate, "Same knowledge", "test/dedup");
        let second = ingest_fact(&substrate, "Same knowledge", "test/dedup");

        assert_eq!(first, second);
        assert_eq!(substrate.list(AkuFilter::default()).count(), 1);
    }

    #[test]
    fn ingest_updates_latest_head() {
        let substrate = test_substrate();
        let first = ingest_fact(&substrate, "first", "test/heads");
        assert_eq!(substrate.head("latest").unwrap(), Some(first));

        let second = ingest_fact(&substrate, "second", "test/heads");
        assert_eq!(substrate.head("latest").unwrap(), Some(second));
    }

    #[test]
    fn ingest_writes_wal_markers() {
        let substrate = test_substrate();
        let hash = ingest_fact(&substrate, "logged", "test/wal");

        let lines = substrate
            .storage()
            .read_lines(&StoreLog::Wal)
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("pending"));
        assert!(lines[1].contains("committed"));
        assert!(lines[0].contains(hash.as_str()));
    }

    #[test]
    fn dedup_skips_wal_and_heads() {
        let substrate = test_substrate();
        ingest_fact(&substrate, "once", "test/side-effects");
        ingest_fact(&substrate, "once", "test/side-effects");

        let wal = substrate.storage().read_lines(&StoreLog::Wal).unwrap();
        assert_eq!(wal.len(), 2, "second ingest must not append WAL markers");

        let domain_log = substrate
            .storage()
            .read_lines(&StoreLog::DomainHead("test".to_string()))
            .unwrap();
        assert_eq!(domain_log.len(), 1);
    }

    #[test]
    fn get_absent_returns_none() {
        let substrate = test_substrate();
        let absent = crate::hash::hash_string("never ingested");
        assert!(substrate.get(&absent).unwrap().is_none());
        assert!(!substrate.exists(&absent));
    }

    #[test]
    fn list_filters_by_domain_and_type() {
        let substrate = test_substrate();
        let physics = ingest_fact(&substrate, "one", "physics/thermo");
        let _biology = ingest_fact(&substrate, "two", "biology/cells");
        let insight = substrate
            .ingest(IngestInput {
                body: "three".to_string(),
                domain: "physics/quantum".to_string(),
                knowledge_type: Some(KnowledgeType::Insight),
                ..Default::default()
            })
            .unwrap();

        let by_domain: Vec<ContentHash> = substrate
            .list(AkuFilter {
                domain: Some("physics/thermo".to_string()),
                ..Default::default()
            })
            .collect();
        assert_eq!(by_domain, vec![physics]);

        let by_prefix = substrate
            .list(AkuFilter {
                domain_prefix: Some("physics".to_string()),
                ..Default::default()
            })
            .count();
        assert_eq!(by_prefix, 2);

        let by_type: Vec<ContentHash> = substrate
            .list(AkuFilter {
                knowledge_type: Some(KnowledgeType::Insight),
                ..Default::default()
            })
            .collect();
        assert_eq!(by_type, vec![insight]);
    }

    #[test]
    fn list_honors_limit_and_offset() {
        let substrate = test_substrate();
        for i in 0..5 {
            ingest_fact(&substrate, &format!("atom {i}"), "test/paging");
        }

        assert_eq!(substrate.list(AkuFilter::default()).count(), 5);
        let limited = substrate
            .list(AkuFilter {
                limit: Some(2),
                ..Default::default()
            })
            .count();
        assert_eq!(limited, 2);
        let offset = substrate
            .list(AkuFilter {
                offset: Some(3),
                ..Default::default()
            })
            .count();
        assert_eq!(offset, 2);
    }

    #[test]
    fn link_requires_existing_source() {
        let substrate = test_substrate();
        let target = crate::hash::hash_string("somewhere");
        let missing = crate::hash::hash_string("not ingested");

        let err = substrate
            .link(&missing, &target, RelationKind::RelatesTo)
            .unwrap_err();
        assert!(matches!(err, SubstrateError::SourceNotFound(_)));
    }

    #[test]
    fn link_allows_absent_target() {
        let substrate = test_substrate();
        let from = ingest_fact(&substrate, "source atom", "test/links");
        let forward = crate::hash::hash_string("declared before it exists");

        substrate
            .link(&from, &forward, RelationKind::Requires)
            .unwrap();

        let out = substrate.neighbors(&from, Direction::Out).unwrap();
        assert!(out.contains(&forward));
    }

    #[test]
    fn neighbors_merges_embedded_and_external() {
        let substrate = test_substrate();
        let embedded_target = ingest_fact(&substrate, "embedded target", "test/graph");
        let mut links = crate::aku::AkuLinks::new();
        links.insert(RelationKind::DerivedFrom, vec![embedded_target.clone()]);

        let source = substrate
            .ingest(IngestInput {
                body: "source".to_string(),
                domain: "test/graph".to_string(),
                links: Some(links),
                ..Default::default()
            })
            .unwrap();

        let external_target = ingest_fact(&substrate, "external target", "test/graph");
        substrate
            .link(&source, &external_target, RelationKind::RelatesTo)
            .unwrap();
        // Duplicate of the embedded edge — must collapse in the set.
        substrate
            .link(&source, &embedded_target, RelationKind::RelatesTo)
            .unwrap();

        let out = substrate.neighbors(&source, Direction::Out).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.contains(&embedded_target));
        assert!(out.contains(&external_target));

        let incoming = substrate
            .neighbors(&external_target, Direction::In)
            .unwrap();
        assert!(incoming.contains(&source));
    }

    #[test]
    fn domain_validation_rejects_traversal() {
        for domain in [
            "../../../etc/passwd",
            "test/../../../etc",
            "a//b",
            "/leading",
            "back\\slash",
            "enc%2Foded",
            "enc%2e%2eoded",
            "",
            "bad segment",
            "-starts-with-dash",
        ] {
            assert!(
                validate_domain(domain).is_err(),
                "domain {domain:?} should be rejected"
            );
        }
    }

    #[test]
    fn domain_validation_accepts_safe_paths() {
        for domain in ["a", "a/b/c", "data-systems/storage/lsm_tree", "v2/api"] {
            assert!(validate_domain(domain).is_ok(), "domain {domain:?} should pass");
        }
    }
}
