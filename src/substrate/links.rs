//! External link log — graph edges recorded after ingestion.
//!
//! Atoms are immutable, so edges discovered later cannot be written into
//! `meta.links`. They land in `external-links.jsonl` instead, one JSON record
//! per line. Both edge sources are merged by [`Substrate::neighbors`].
//!
//! [`Substrate::neighbors`]: crate::substrate::Substrate::neighbors

use serde::{Deserialize, Serialize};

use crate::aku::RelationKind;
use crate::error::Result;
use crate::hash::ContentHash;
use crate::substrate::storage::{AtomStorage, StoreLog};

/// One edge in the external link log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalLink {
    pub from: ContentHash,
    pub to: ContentHash,
    pub relation: RelationKind,
    pub created: String,
}

/// Append an edge record to the log.
pub fn append_link(storage: &dyn AtomStorage, link: &ExternalLink) -> Result<()> {
    let line = serde_json::to_string(link)?;
    storage.append_line(&StoreLog::ExternalLinks, &line)
}

/// Read every edge in the log, in append order.
pub fn read_links(storage: &dyn AtomStorage) -> Result<Vec<ExternalLink>> {
    storage
        .read_lines(&StoreLog::ExternalLinks)?
        .iter()
        .map(|line| Ok(serde_json::from_str(line)?))
        .collect()
}
