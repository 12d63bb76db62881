//! Error taxonomy for the substrate core.
//!
//! Validation failures (bad domain path, malformed hash) are raised before
//! any side effect. Not-found conditions for well-formed input are `Ok(None)`
//! at the call site, never errors. Integrity findings (corrupted atoms,
//! orphaned links) are report data from `verify()` and do not appear here.

use crate::hash::ContentHash;

pub type Result<T> = std::result::Result<T, SubstrateError>;

#[derive(Debug, thiserror::Error)]
pub enum SubstrateError {
    /// Domain path failed validation. Raised before any on-disk path is
    /// built from the domain.
    #[error("invalid domain {domain:?}: {reason}")]
    InvalidDomain { domain: String, reason: String },

    /// Input string is not a 64-character lowercase hex digest.
    #[error("invalid hash format: {0:?}")]
    InvalidHash(String),

    /// Stored atom text could not be parsed back into an AKU.
    #[error("malformed atom {hash}: {reason}")]
    MalformedAtom { hash: ContentHash, reason: String },

    /// `link` was called with a source atom that does not exist.
    #[error("source AKU not found: {0}")]
    SourceNotFound(ContentHash),

    /// Embedding length does not match the vector index dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// `find_nearest` was called for a hash with no stored embedding.
    #[error("no embedding stored for hash: {0}")]
    EmbeddingNotFound(ContentHash),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
