//! Storage backends for the content-addressed atom store.
//!
//! [`AtomStorage`] is the persistence seam: the filesystem implementation is
//! the production store, the in-memory implementation backs unit tests that
//! never touch disk. Atom files are sharded by hash prefix to bound
//! directory fan-out.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;
use crate::hash::ContentHash;

/// Append-only auxiliary files under the store root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreLog {
    /// `WAL/pending.jsonl` — pending/committed ingest markers.
    Wal,
    /// `external-links.jsonl` — edges added after ingestion.
    ExternalLinks,
    /// `heads/domains/<top>` — ingest history per top-level domain.
    DomainHead(String),
}

impl StoreLog {
    fn rel_path(&self) -> PathBuf {
        match self {
            Self::Wal => PathBuf::from("WAL").join("pending.jsonl"),
            Self::ExternalLinks => PathBuf::from("external-links.jsonl"),
            Self::DomainHead(top) => PathBuf::from("heads").join("domains").join(top),
        }
    }
}

/// Persistence interface for atoms, head pointers, and append-only logs.
pub trait AtomStorage: Send + Sync {
    fn write_atom(&self, hash: &ContentHash, content: &str) -> Result<()>;
    fn read_atom(&self, hash: &ContentHash) -> Result<Option<String>>;
    fn atom_exists(&self, hash: &ContentHash) -> bool;
    /// Size in bytes of the stored atom; 0 if absent.
    fn atom_size(&self, hash: &ContentHash) -> u64;
    /// Every stored atom hash. Lazy where the backend allows it; finite and
    /// fresh per call.
    fn atom_hashes(&self) -> Box<dyn Iterator<Item = ContentHash> + '_>;
    fn write_head(&self, name: &str, hash: &ContentHash) -> Result<()>;
    fn read_head(&self, name: &str) -> Result<Option<ContentHash>>;
    fn append_line(&self, log: &StoreLog, line: &str) -> Result<()>;
    fn read_lines(&self, log: &StoreLog) -> Result<Vec<String>>;
}

// ── Filesystem backend ────────────────────────────────────────────────────────

pub struct FsAtomStorage {
    root: PathBuf,
    shard_depth: usize,
}

impl FsAtomStorage {
    pub fn new(root: impl Into<PathBuf>, shard_depth: usize) -> Self {
        Self {
            root: root.into(),
            shard_depth,
        }
    }

    fn atoms_dir(&self) -> PathBuf {
        self.root.join("atoms")
    }

    fn atom_path(&self, hash: &ContentHash) -> PathBuf {
        self.atoms_dir()
            .join(hash.shard_prefix(self.shard_depth))
            .join(hash.as_str())
    }

    fn head_path(&self, name: &str) -> PathBuf {
        self.root.join("heads").join(name)
    }
}

impl AtomStorage for FsAtomStorage {
    fn write_atom(&self, hash: &ContentHash, content: &str) -> Result<()> {
        let path = self.atom_path(hash);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Temp file + rename: a concurrent writer racing on the same hash
        // writes identical bytes, and the rename is atomic either way.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn read_atom(&self, hash: &ContentHash) -> Result<Option<String>> {
        let path = self.atom_path(hash);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn atom_exists(&self, hash: &ContentHash) -> bool {
        self.atom_path(hash).exists()
    }

    fn atom_size(&self, hash: &ContentHash) -> u64 {
        std::fs::metadata(self.atom_path(hash))
            .map(|m| m.len())
            .unwrap_or(0)
    }

    fn atom_hashes(&self) -> Box<dyn Iterator<Item = ContentHash> + '_> {
        let shards = std::fs::read_dir(self.atoms_dir())
            .into_iter()
            .flatten()
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false));

        Box::new(shards.flat_map(|shard| {
            std::fs::read_dir(shard.path())
                .into_iter()
                .flatten()
                .flatten()
                .filter_map(|entry| {
                    let name = entry.file_name();
                    ContentHash::parse(name.to_str()?).ok()
                })
        }))
    }

    fn write_head(&self, name: &str, hash: &ContentHash) -> Result<()> {
        let path = self.head_path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, hash.as_str())?;
        Ok(())
    }

    fn read_head(&self, name: &str) -> Result<Option<ContentHash>> {
        let path = self.head_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(ContentHash::parse(contents.trim()).ok())
    }

    fn append_line(&self, log: &StoreLog, line: &str) -> Result<()> {
        let path = self.root.join(log.rel_path());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn read_lines(&self, log: &StoreLog) -> Result<Vec<String>> {
        let path = self.root.join(log.rel_path());
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

// ── In-memory backend ─────────────────────────────────────────────────────────

#[derive(Default)]
struct MemInner {
    atoms: BTreeMap<ContentHash, String>,
    heads: BTreeMap<String, ContentHash>,
    logs: BTreeMap<PathBuf, Vec<String>>,
}

/// In-memory store for unit tests. Same contract as the filesystem backend,
/// no disk involved.
#[derive(Default)]
pub struct MemAtomStorage {
    inner: Mutex<MemInner>,
}

impl MemAtomStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AtomStorage for MemAtomStorage {
    fn write_atom(&self, hash: &ContentHash, content: &str) -> Result<()> {
        self.lock().atoms.insert(hash.clone(), content.to_string());
        Ok(())
    }

    fn read_atom(&self, hash: &ContentHash) -> Result<Option<String>> {
        Ok(self.lock().atoms.get(hash).cloned())
    }

    fn atom_exists(&self, hash: &ContentHash) -> bool {
        self.lock().atoms.contains_key(hash)
    }

    fn atom_size(&self, hash: &ContentHash) -> u64 {
        self.lock()
            .atoms
            .get(hash)
            .map(|content| content.len() as u64)
            .unwrap_or(0)
    }

    fn atom_hashes(&self) -> Box<dyn Iterator<Item = ContentHash> + '_> {
        let hashes: Vec<ContentHash> = self.lock().atoms.keys().cloned().collect();
        Box::new(hashes.into_iter())
    }

    fn write_head(&self, name: &str, hash: &ContentHash) -> Result<()> {
        self.lock().heads.insert(name.to_string(), hash.clone());
        Ok(())
    }

    fn read_head(&self, name: &str) -> Result<Option<ContentHash>> {
        Ok(self.lock().heads.get(name).cloned())
    }

    fn append_line(&self, log: &StoreLog, line: &str) -> Result<()> {
        self.lock()
            .logs
            .entry(log.rel_path())
            .or_default()
            .push(line.to_string());
        Ok(())
    }

    fn read_lines(&self, log: &StoreLog) -> Result<Vec<String>> {
        Ok(self.lock().logs.get(&log.rel_path()).cloned().unwrap_or_default())
    }
}
