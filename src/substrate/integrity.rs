//! Integrity audit and store statistics.
//!
//! Both are full scans over the atom store. Findings are returned as report
//! data — a corrupted atom or an orphaned link is a property of the stored
//! data, not a failure of the audit itself.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::aku::KnowledgeType;
use crate::error::Result;
use crate::hash::{verify_hash, ContentHash};
use crate::substrate::{top_level, Substrate};

/// An embedded link whose target is not present in the store.
#[derive(Debug, Clone, Serialize)]
pub struct OrphanedLink {
    pub from: ContentHash,
    pub to: ContentHash,
}

/// Result of a full integrity audit.
#[derive(Debug, Serialize)]
pub struct IntegrityReport {
    /// `true` iff no corruption and no orphaned links were found.
    pub valid: bool,
    pub total_checked: usize,
    /// Atoms whose stored content no longer matches their hash.
    pub corrupted: Vec<ContentHash>,
    pub orphaned_links: Vec<OrphanedLink>,
    /// Targets of the orphaned links.
    pub missing_atoms: Vec<ContentHash>,
}

/// Aggregate statistics over the whole store.
#[derive(Debug, Serialize)]
pub struct SubstrateStats {
    pub total_atoms: u64,
    pub by_type: HashMap<String, u64>,
    /// Bucketed by the first domain segment only.
    pub by_domain: HashMap<String, u64>,
    /// Embedded links only; external links live in their own log.
    pub total_links: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_atom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_atom: Option<String>,
    pub disk_usage: u64,
}

impl Substrate {
    /// Audit every atom: recompute hashes and flag embedded links pointing at
    /// absent targets. O(total atoms), two passes.
    pub fn verify(&self) -> Result<IntegrityReport> {
        let mut corrupted = Vec::new();
        let mut all_hashes: BTreeSet<ContentHash> = BTreeSet::new();
        let mut total_checked = 0usize;

        for hash in self.storage().atom_hashes() {
            total_checked += 1;
            all_hashes.insert(hash.clone());

            match self.get(&hash) {
                Ok(Some(aku)) => {
                    if !verify_hash(&hash, &aku.meta, &aku.body) {
                        corrupted.push(hash);
                    }
                }
                // Unreadable or unparseable counts as corrupted.
                _ => corrupted.push(hash),
            }
        }

        let mut orphaned_links = Vec::new();
        for hash in self.storage().atom_hashes() {
            let Ok(Some(aku)) = self.get(&hash) else {
                continue;
            };
            for targets in aku.meta.links.values() {
                for target in targets {
                    if !all_hashes.contains(target) {
                        orphaned_links.push(OrphanedLink {
                            from: hash.clone(),
                            to: target.clone(),
                        });
                    }
                }
            }
        }

        let missing_atoms = orphaned_links.iter().map(|l| l.to.clone()).collect();

        Ok(IntegrityReport {
            valid: corrupted.is_empty() && orphaned_links.is_empty(),
            total_checked,
            corrupted,
            orphaned_links,
            missing_atoms,
        })
    }

    /// Aggregate counts, link totals, time range, and disk usage. O(total
    /// atoms).
    pub fn stats(&self) -> Result<SubstrateStats> {
        let mut total_atoms = 0u64;
        let mut by_type: HashMap<String, u64> = KnowledgeType::ALL
            .iter()
            .map(|t| (t.as_str().to_string(), 0))
            .collect();
        let mut by_domain: HashMap<String, u64> = HashMap::new();
        let mut total_links = 0u64;
        let mut oldest_atom: Option<String> = None;
        let mut newest_atom: Option<String> = None;
        let mut disk_usage = 0u64;

        for hash in self.storage().atom_hashes() {
            let Ok(Some(aku)) = self.get(&hash) else {
                continue;
            };

            total_atoms += 1;
            *by_type
                .entry(aku.meta.knowledge_type.as_str().to_string())
                .or_insert(0) += 1;
            *by_domain
                .entry(top_level(&aku.meta.domain).to_string())
                .or_insert(0) += 1;
            total_links += aku.meta.links.values().map(|t| t.len() as u64).sum::<u64>();

            if oldest_atom.as_deref().map_or(true, |o| aku.meta.created.as_str() < o) {
                oldest_atom = Some(aku.meta.created.clone());
            }
            if newest_atom.as_deref().map_or(true, |n| aku.meta.created.as_str() > n) {
                newest_atom = Some(aku.meta.created.clone());
            }

            disk_usage += self.storage().atom_size(&hash);
        }

        Ok(SubstrateStats {
            total_atoms,
            by_type,
            by_domain,
            total_links,
            oldest_atom,
            newest_atom,
            disk_usage,
        })
    }
}
