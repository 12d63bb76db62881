//! Core AKU type definitions and the on-disk atom format.
//!
//! Defines [`KnowledgeType`] (the closed knowledge ontology), [`Volatility`],
//! [`RelationKind`] (graph edge labels), [`AkuMeta`]/[`Aku`] (a full record),
//! and [`serialize_aku`]/[`parse_aku`] for the frontmatter document format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SubstrateError};
use crate::hash::ContentHash;

const FRONTMATTER_DELIMITER: &str = "---";

/// The fundamental ontology of knowledge. Small, closed set — extend via
/// tags, not new variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeType {
    /// Atomic true statement.
    Fact,
    /// Abstract idea with a definition.
    Concept,
    /// Connection between concepts.
    Relationship,
    /// How to do something.
    Procedure,
    /// Pattern or meta-observation.
    Insight,
    /// Open inquiry.
    Question,
    /// Code, diagram, or other structured output.
    Artifact,
}

impl KnowledgeType {
    pub const ALL: [KnowledgeType; 7] = [
        Self::Fact,
        Self::Concept,
        Self::Relationship,
        Self::Procedure,
        Self::Insight,
        Self::Question,
        Self::Artifact,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Concept => "concept",
            Self::Relationship => "relationship",
            Self::Procedure => "procedure",
            Self::Insight => "insight",
            Self::Question => "question",
            Self::Artifact => "artifact",
        }
    }
}

impl std::fmt::Display for KnowledgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KnowledgeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fact" => Ok(Self::Fact),
            "concept" => Ok(Self::Concept),
            "relationship" => Ok(Self::Relationship),
            "procedure" => Ok(Self::Procedure),
            "insight" => Ok(Self::Insight),
            "question" => Ok(Self::Question),
            "artifact" => Ok(Self::Artifact),
            _ => Err(format!("unknown knowledge type: {s}")),
        }
    }
}

/// How likely a piece of knowledge is to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Volatility {
    Stable,
    Evolving,
    Ephemeral,
}

impl Volatility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Evolving => "evolving",
            Self::Ephemeral => "ephemeral",
        }
    }
}

impl std::fmt::Display for Volatility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Volatility {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Self::Stable),
            "evolving" => Ok(Self::Evolving),
            "ephemeral" => Ok(Self::Ephemeral),
            _ => Err(format!("unknown volatility: {s}")),
        }
    }
}

/// Edge labels for linking AKUs, embedded or external.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// General association.
    RelatesTo,
    /// Source or origin.
    DerivedFrom,
    /// Newer version of the target.
    Supersedes,
    /// Conflicting information.
    Contradicts,
    /// Hierarchical containment.
    PartOf,
    /// Type relationship.
    InstanceOf,
    /// Causal relationship.
    Causes,
    /// Dependency.
    Requires,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RelatesTo => "relates_to",
            Self::DerivedFrom => "derived_from",
            Self::Supersedes => "supersedes",
            Self::Contradicts => "contradicts",
            Self::PartOf => "part_of",
            Self::InstanceOf => "instance_of",
            Self::Causes => "causes",
            Self::Requires => "requires",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "relates_to" => Ok(Self::RelatesTo),
            "derived_from" => Ok(Self::DerivedFrom),
            "supersedes" => Ok(Self::Supersedes),
            "contradicts" => Ok(Self::Contradicts),
            "part_of" => Ok(Self::PartOf),
            "instance_of" => Ok(Self::InstanceOf),
            "causes" => Ok(Self::Causes),
            "requires" => Ok(Self::Requires),
            _ => Err(format!("unknown relation kind: {s}")),
        }
    }
}

/// How a piece of knowledge was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Training,
    Search,
    Conversation,
    Inference,
    User,
    Import,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Search => "search",
            Self::Conversation => "conversation",
            Self::Inference => "inference",
            Self::User => "user",
            Self::Import => "import",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "training" => Ok(Self::Training),
            "search" => Ok(Self::Search),
            "conversation" => Ok(Self::Conversation),
            "inference" => Ok(Self::Inference),
            "user" => Ok(Self::User),
            "import" => Ok(Self::Import),
            _ => Err(format!("unknown source kind: {s}")),
        }
    }
}

/// Provenance record for an AKU. The timestamp is informational and excluded
/// from the content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
}

/// Embedded links: relation kind to ordered target hashes. Frozen at ingest
/// time — later edges go through the external link log instead.
pub type AkuLinks = BTreeMap<RelationKind, Vec<ContentHash>>;

/// AKU metadata, stored as YAML frontmatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AkuMeta {
    /// ISO 8601 creation timestamp. Informational only; excluded from hash.
    pub created: String,
    pub source: KnowledgeSource,
    /// Hierarchical namespace path, e.g. `data-systems/storage/lsm-tree`.
    pub domain: String,
    #[serde(rename = "type")]
    pub knowledge_type: KnowledgeType,
    /// Confidence score in `[0.0, 1.0]`.
    pub confidence: f64,
    pub volatility: Volatility,
    #[serde(default)]
    pub links: AkuLinks,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Open-ended extension mapping; participates in the content hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<BTreeMap<String, serde_json::Value>>,
}

/// The Atomic Knowledge Unit — an immutable, content-addressed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aku {
    /// Content hash. Computed, never stored inside the atom file.
    pub id: ContentHash,
    pub meta: AkuMeta,
    /// Markdown body, normalized (LF line endings, trimmed).
    pub body: String,
}

/// Partial source fields supplied at ingest time; unset fields get defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceInput {
    #[serde(rename = "type")]
    pub kind: Option<SourceKind>,
    pub uri: Option<String>,
    pub session: Option<String>,
    pub timestamp: Option<String>,
    pub citation: Option<String>,
}

/// Input for ingesting knowledge. Everything except `body` and `domain` is
/// optional and defaulted by the substrate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestInput {
    pub body: String,
    pub domain: String,
    #[serde(rename = "type")]
    pub knowledge_type: Option<KnowledgeType>,
    pub source: Option<SourceInput>,
    pub confidence: Option<f64>,
    pub volatility: Option<Volatility>,
    pub links: Option<AkuLinks>,
    pub tags: Option<Vec<String>>,
    pub extra: Option<BTreeMap<String, serde_json::Value>>,
}

/// Filter for listing AKUs. All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct AkuFilter {
    pub domain: Option<String>,
    pub domain_prefix: Option<String>,
    pub knowledge_type: Option<KnowledgeType>,
    /// Every listed tag must be present on the atom.
    pub tags: Option<Vec<String>>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub min_confidence: Option<f64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AkuFilter {
    /// `true` if any criterion requires loading the atom's metadata.
    pub fn filters_meta(&self) -> bool {
        self.domain.is_some()
            || self.domain_prefix.is_some()
            || self.knowledge_type.is_some()
            || self.tags.is_some()
            || self.since.is_some()
            || self.until.is_some()
            || self.min_confidence.is_some()
    }

    pub fn matches(&self, aku: &Aku) -> bool {
        if let Some(ref domain) = self.domain {
            if aku.meta.domain != *domain {
                return false;
            }
        }
        if let Some(ref prefix) = self.domain_prefix {
            if !aku.meta.domain.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(knowledge_type) = self.knowledge_type {
            if aku.meta.knowledge_type != knowledge_type {
                return false;
            }
        }
        if let Some(min) = self.min_confidence {
            if aku.meta.confidence < min {
                return false;
            }
        }
        if let Some(ref since) = self.since {
            if aku.meta.created < *since {
                return false;
            }
        }
        if let Some(ref until) = self.until {
            if aku.meta.created > *until {
                return false;
            }
        }
        if let Some(ref tags) = self.tags {
            if !tags.iter().all(|t| aku.meta.tags.contains(t)) {
                return false;
            }
        }
        true
    }
}

/// Serialize an AKU to its on-disk form: YAML frontmatter, a blank line,
/// then the body.
pub fn serialize_aku(aku: &Aku) -> Result<String> {
    let frontmatter = serde_yaml::to_string(&aku.meta)?;
    Ok(format!(
        "{FRONTMATTER_DELIMITER}\n{frontmatter}{FRONTMATTER_DELIMITER}\n\n{}",
        aku.body
    ))
}

/// Parse an AKU from its on-disk form. The id is supplied by the caller —
/// it is the storage key, not part of the file.
pub fn parse_aku(content: &str, hash: ContentHash) -> Result<Aku> {
    let lines: Vec<&str> = content.split('\n').collect();

    if lines.first().copied() != Some(FRONTMATTER_DELIMITER) {
        return Err(SubstrateError::MalformedAtom {
            hash,
            reason: "missing frontmatter start".to_string(),
        });
    }

    let end = match lines
        .iter()
        .skip(1)
        .position(|line| *line == FRONTMATTER_DELIMITER)
    {
        Some(offset) => offset + 1,
        None => {
            return Err(SubstrateError::MalformedAtom {
                hash,
                reason: "missing frontmatter end".to_string(),
            })
        }
    };

    let meta: AkuMeta =
        serde_yaml::from_str(&lines[1..end].join("\n")).map_err(|err| {
            SubstrateError::MalformedAtom {
                hash: hash.clone(),
                reason: format!("frontmatter parse failed: {err}"),
            }
        })?;

    let body = lines[end + 1..].join("\n").trim().to_string();

    Ok(Aku {
        id: hash,
        meta,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{compute_hash, hash_string};

    fn test_aku() -> Aku {
        let mut links = AkuLinks::new();
        links.insert(
            RelationKind::DerivedFrom,
            vec![hash_string("some earlier atom")],
        );
        let meta = AkuMeta {
            created: "2025-03-01T09:30:00+00:00".to_string(),
            source: KnowledgeSource {
                kind: SourceKind::Conversation,
                uri: Some("https://example.com/ref".to_string()),
                session: Some("session-42".to_string()),
                timestamp: "2025-03-01T09:30:00+00:00".to_string(),
                citation: None,
            },
            domain: "data-systems/storage".to_string(),
            knowledge_type: KnowledgeType::Concept,
            confidence: 0.9,
            volatility: Volatility::Stable,
            links,
            tags: vec!["lsm".to_string(), "storage".to_string()],
            extra: None,
        };
        let body = "# LSM trees\n\nWrite-optimized storage structure.".to_string();
        let id = compute_hash(&meta, &body).unwrap();
        Aku { id, meta, body }
    }

    #[test]
    fn serialize_parse_round_trip() {
        let aku = test_aku();
        let serialized = serialize_aku(&aku).unwrap();
        let parsed = parse_aku(&serialized, aku.id.clone()).unwrap();
        assert_eq!(parsed, aku);
    }

    #[test]
    fn round_trip_preserves_extra() {
        let mut aku = test_aku();
        let mut extra = BTreeMap::new();
        extra.insert("reviewed".to_string(), serde_json::json!(true));
        extra.insert("priority".to_string(), serde_json::json!(3));
        aku.meta.extra = Some(extra);
        aku.id = compute_hash(&aku.meta, &aku.body).unwrap();

        let parsed = parse_aku(&serialize_aku(&aku).unwrap(), aku.id.clone()).unwrap();
        assert_eq!(parsed, aku);
    }

    #[test]
    fn parse_rejects_missing_start() {
        let err = parse_aku("no frontmatter here", hash_string("x")).unwrap_err();
        assert!(err.to_string().contains("missing frontmatter start"));
    }

    #[test]
    fn parse_rejects_missing_end() {
        let err = parse_aku("---\ndomain: test", hash_string("x")).unwrap_err();
        assert!(err.to_string().contains("missing frontmatter end"));
    }

    #[test]
    fn enum_string_round_trips() {
        for knowledge_type in KnowledgeType::ALL {
            assert_eq!(
                knowledge_type.as_str().parse::<KnowledgeType>().unwrap(),
                knowledge_type
            );
        }
        assert!("nonsense".parse::<KnowledgeType>().is_err());
        assert_eq!("supersedes".parse::<RelationKind>().unwrap(), RelationKind::Supersedes);
        assert!("friend_of".parse::<RelationKind>().is_err());
        assert_eq!("ephemeral".parse::<Volatility>().unwrap(), Volatility::Ephemeral);
    }

    #[test]
    fn filter_matches_tags_conjunctively() {
        let aku = test_aku();
        let both = AkuFilter {
            tags: Some(vec!["lsm".to_string(), "storage".to_string()]),
            ..Default::default()
        };
        assert!(both.matches(&aku));

        let missing = AkuFilter {
            tags: Some(vec!["lsm".to_string(), "absent".to_string()]),
            ..Default::default()
        };
        assert!(!missing.matches(&aku));
    }
}
