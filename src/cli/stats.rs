use std::path::Path;

use anyhow::Result;

use aku::aku::KnowledgeType;
use aku::substrate::Substrate;

/// Display substrate statistics in the terminal.
pub fn stats(root: &Path) -> Result<()> {
    let substrate = Substrate::open(root)?;
    let stats = substrate.stats()?;

    println!("Substrate Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total atoms:      {}", stats.total_atoms);
    println!("  Embedded links:   {}", stats.total_links);
    println!("  Disk usage:       {} bytes", stats.disk_usage);
    println!();

    println!("By Type:");
    for knowledge_type in KnowledgeType::ALL {
        let count = stats
            .by_type
            .get(knowledge_type.as_str())
            .copied()
            .unwrap_or(0);
        println!("  {:<14} {}", knowledge_type.as_str(), count);
    }
    println!();

    if !stats.by_domain.is_empty() {
        println!("By Domain:");
        let mut domains: Vec<_> = stats.by_domain.iter().collect();
        domains.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (domain, count) in domains {
            println!("  {domain:<14} {count}");
        }
        println!();
    }

    if let Some(ref oldest) = stats.oldest_atom {
        println!("Oldest atom:        {oldest}");
    }
    if let Some(ref newest) = stats.newest_atom {
        println!("Newest atom:        {newest}");
    }

    Ok(())
}
