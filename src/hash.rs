//! Content-addressed identity.
//!
//! The hash IS the identity: SHA-256 over a canonical serialization of an
//! AKU's semantic metadata and normalized body. Temporal fields (`created`,
//! `source.timestamp`) are excluded from the canonical form so the same
//! knowledge discovered at different times maps to the same atom.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::aku::AkuMeta;
use crate::error::{Result, SubstrateError};

const META_DELIMITER: &str = "---AKU-META---";
const BODY_DELIMITER: &str = "---AKU-BODY---";

/// A validated content hash: exactly 64 lowercase hex characters.
///
/// Values exist only via [`ContentHash::parse`] or [`compute_hash`], so an
/// invalid hash is unrepresentable after construction. Uppercase or
/// wrong-length input is rejected, never normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Parse and validate a hash string.
    pub fn parse(s: &str) -> Result<Self> {
        if is_valid_hash(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(SubstrateError::InvalidHash(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading hex characters used as the shard directory name.
    pub fn shard_prefix(&self, depth: usize) -> &str {
        &self.0[..depth.min(self.0.len())]
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ContentHash {
    type Err = SubstrateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if is_valid_hash(&s) {
            Ok(ContentHash(s))
        } else {
            Err(serde::de::Error::custom(format!("invalid content hash: {s:?}")))
        }
    }
}

/// `true` iff `s` is exactly 64 lowercase hex characters.
pub fn is_valid_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Normalize body text for consistent hashing: CRLF/CR to LF, trailing
/// whitespace stripped per line, leading/trailing whitespace trimmed overall.
pub fn normalize_body(body: &str) -> String {
    body.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Canonical representation of an AKU for hashing: semantic metadata as
/// canonical JSON, then the normalized body, joined by delimiters that cannot
/// appear in the metadata section.
pub fn canonicalize(meta: &AkuMeta, body: &str) -> Result<String> {
    let meta_json = canonical_meta_json(meta)?;
    let body = normalize_body(body);
    Ok(format!("{META_DELIMITER}\n{meta_json}\n{BODY_DELIMITER}\n{body}"))
}

/// SHA-256 of the canonical AKU content, hex-encoded lowercase.
pub fn compute_hash(meta: &AkuMeta, body: &str) -> Result<ContentHash> {
    Ok(ContentHash(hex_digest(canonicalize(meta, body)?.as_bytes())))
}

/// Hash arbitrary string content. Used for seeding deterministic values
/// from text before a full AKU exists.
pub fn hash_string(content: &str) -> ContentHash {
    ContentHash(hex_digest(content.as_bytes()))
}

/// `true` iff the hash matches the content it claims to identify.
pub fn verify_hash(hash: &ContentHash, meta: &AkuMeta, body: &str) -> bool {
    matches!(compute_hash(meta, body), Ok(computed) if computed == *hash)
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Semantic metadata as deterministic JSON: `created` and `source.timestamp`
/// removed, mapping keys recursively sorted, arrays of primitives sorted.
fn canonical_meta_json(meta: &AkuMeta) -> Result<String> {
    let mut value = serde_json::to_value(meta)?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("created");
        if let Some(source) = obj.get_mut("source").and_then(|s| s.as_object_mut()) {
            source.remove("timestamp");
        }
    }
    Ok(canonical_value(value).to_string())
}

/// Rebuild a JSON value with keys inserted in sorted order and arrays of
/// primitives (strings, numbers) sorted by their serialized form. Arrays
/// containing structured values keep their order.
fn canonical_value(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Array(items) => {
            let mut items: Vec<serde_json::Value> =
                items.into_iter().map(canonical_value).collect();
            let all_primitive = !items.is_empty()
                && items
                    .iter()
                    .all(|item| item.is_string() || item.is_number());
            if all_primitive {
                items.sort_by_key(|item| item.to_string());
            }
            serde_json::Value::Array(items)
        }
        serde_json::Value::Object(fields) => {
            let mut entries: Vec<(String, serde_json::Value)> = fields.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = serde_json::Map::new();
            for (key, val) in entries {
                sorted.insert(key, canonical_value(val));
            }
            serde_json::Value::Object(sorted)
        }
        other => other,
    }
}
