//! Substrate configuration, persisted as YAML at `.aku/config.yaml`.
//!
//! The config is an explicit struct passed into constructors — nothing in the
//! core reads the environment. `AKU_ROOT` resolution happens at the CLI and
//! server boundary via [`resolve_root`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::aku::Volatility;

/// On-disk format version, written to `.aku/version`.
pub const AKU_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstrateConfig {
    pub version: u32,
    pub substrate: StoreConfig,
    pub indexes: IndexConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Fixed to `sha256`; recorded so a future algorithm change is detectable.
    pub hash_algorithm: String,
    /// Leading hash characters used as the atom shard directory.
    pub shard_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub vectors: VectorIndexConfig,
    pub graph: IndexToggle,
    pub temporal: IndexToggle,
    pub fts: IndexToggle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexToggle {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    pub enabled: bool,
    /// Embedding model identifier; `mock` is the built-in provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub confidence: f64,
    pub volatility: Volatility,
}

impl Default for SubstrateConfig {
    fn default() -> Self {
        Self {
            version: AKU_VERSION,
            substrate: StoreConfig::default(),
            indexes: IndexConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: "sha256".into(),
            shard_depth: 2,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            vectors: VectorIndexConfig::default(),
            graph: IndexToggle { enabled: true },
            temporal: IndexToggle { enabled: true },
            fts: IndexToggle { enabled: true },
        }
    }
}

impl Default for IndexToggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: None,
            dimensions: None,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            confidence: 0.8,
            volatility: Volatility::Evolving,
        }
    }
}

impl SubstrateConfig {
    /// Load config from a YAML file. Falls back to defaults if the file is
    /// missing (a store initialized by an older build).
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            serde_yaml::from_str(&contents).context("failed to parse config YAML")
        } else {
            info!("no config file at {}, using defaults", path.display());
            Ok(SubstrateConfig::default())
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize config")
    }
}

/// Returns `~/.aku/knowledge`, the default store root.
pub fn default_root() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".aku")
        .join("knowledge")
}

/// Resolve the store root: explicit flag, then `AKU_ROOT`, then the default.
/// Called only from the CLI/server entry points.
pub fn resolve_root(flag: Option<PathBuf>) -> PathBuf {
    if let Some(root) = flag {
        return root;
    }
    if let Ok(root) = std::env::var("AKU_ROOT") {
        return PathBuf::from(root);
    }
    default_root()
}
