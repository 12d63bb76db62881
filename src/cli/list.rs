use std::path::Path;

use anyhow::Result;

use aku::aku::{AkuFilter, KnowledgeType};
use aku::substrate::Substrate;

/// List atoms matching the filters, one line per atom.
pub fn list(
    root: &Path,
    domain: Option<String>,
    knowledge_type: Option<KnowledgeType>,
    tag: Option<String>,
    limit: usize,
) -> Result<()> {
    let substrate = Substrate::open(root)?;
    let filter = AkuFilter {
        domain_prefix: domain,
        knowledge_type,
        tags: tag.map(|t| vec![t]),
        limit: Some(limit),
        ..Default::default()
    };

    let mut count = 0usize;
    for hash in substrate.list(filter) {
        if let Some(atom) = substrate.get(&hash)? {
            println!(
                "{} | {} | {}",
                super::short_hash(&hash),
                atom.meta.domain,
                atom.meta.knowledge_type,
            );
        }
        count += 1;
    }

    if count == 0 {
        println!("No atoms found.");
    }
    Ok(())
}
