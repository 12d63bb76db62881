use std::path::Path;

use anyhow::Result;

/// Print the most recently ingested atoms, newest first. With `--since` and
/// `--until`, restricts to the inclusive creation-time range.
pub fn recent(
    root: &Path,
    limit: usize,
    since: Option<String>,
    until: Option<String>,
) -> Result<()> {
    let (substrate, indexes) = super::open_store(root)?;

    let hashes = match (since, until) {
        (Some(since), Some(until)) => indexes.in_time_range(&since, &until, limit)?,
        (Some(since), None) => {
            indexes.in_time_range(&since, "9999-12-31T23:59:59+00:00", limit)?
        }
        (None, Some(until)) => indexes.in_time_range("", &until, limit)?,
        (None, None) => indexes.recent(limit)?,
    };
    if hashes.is_empty() {
        println!("No atoms indexed yet. Run `aku rebuild` if the store is not empty.");
        return Ok(());
    }

    for hash in hashes {
        if let Some(atom) = substrate.get(&hash)? {
            println!(
                "{} | {} | {}",
                &atom.meta.created[..19.min(atom.meta.created.len())],
                super::short_hash(&hash),
                super::title_of(&atom.body),
            );
        }
    }
    Ok(())
}
