use std::path::Path;

use anyhow::Result;

use aku::substrate::Substrate;

/// Run a full integrity audit and print the findings. Exits nonzero if the
/// store is not clean.
pub fn verify(root: &Path) -> Result<()> {
    let substrate = Substrate::open(root)?;

    println!("Verifying substrate integrity...");
    let report = substrate.verify()?;

    println!("  Atoms checked:    {}", report.total_checked);
    println!("  Corrupted:        {}", report.corrupted.len());
    println!("  Orphaned links:   {}", report.orphaned_links.len());

    if !report.corrupted.is_empty() {
        println!();
        println!("Corrupted atoms:");
        for hash in &report.corrupted {
            println!("  {}", hash);
        }
    }

    if !report.orphaned_links.is_empty() {
        println!();
        println!("Orphaned links (first 10):");
        for link in report.orphaned_links.iter().take(10) {
            println!(
                "  {} -> {}",
                super::short_hash(&link.from),
                super::short_hash(&link.to)
            );
        }
    }

    println!();
    if report.valid {
        println!("Substrate is healthy.");
        Ok(())
    } else {
        anyhow::bail!("integrity check failed");
    }
}
