use std::path::Path;

use anyhow::Result;

/// Clear all derived indexes and repopulate them from the atom store.
pub fn rebuild(root: &Path) -> Result<()> {
    let (substrate, indexes) = super::open_store(root)?;

    println!("Rebuilding indexes from atom store...");
    let count = indexes.rebuild(substrate.atoms())?;
    println!("Indexed {count} atom(s).");
    Ok(())
}
