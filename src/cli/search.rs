use std::path::Path;

use anyhow::Result;

/// Run a full-text search and print ranked results.
pub fn search(root: &Path, query: &str, limit: usize) -> Result<()> {
    let (substrate, indexes) = super::open_store(root)?;

    let hits = indexes.search(query, limit)?;
    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    for hit in hits {
        let title = match substrate.get(&hit.hash)? {
            Some(atom) => super::title_of(&atom.body),
            None => "(not in store)".to_string(),
        };
        println!("{:.2} | {} | {}", hit.score, super::short_hash(&hit.hash), title);
    }
    Ok(())
}
