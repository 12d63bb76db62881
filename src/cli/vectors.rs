use std::path::Path;

use anyhow::{bail, Result};

use aku::aku::AkuFilter;
use aku::hash::ContentHash;
use aku::substrate::Substrate;

/// Embed one atom's body (or every atom with `--all`) and store the vectors.
pub fn embed(root: &Path, hash: Option<String>, all: bool) -> Result<()> {
    let substrate = Substrate::open(root)?;
    let (vectors, provider) = super::open_vectors(&substrate)?;

    let hashes: Vec<ContentHash> = match (hash, all) {
        (Some(hash), false) => vec![ContentHash::parse(&hash)?],
        (None, true) => substrate.list(AkuFilter::default()).collect(),
        _ => bail!("pass a hash or --all"),
    };

    let mut embedded = 0usize;
    for hash in hashes {
        let Some(atom) = substrate.get(&hash)? else {
            bail!("AKU not found: {hash}");
        };
        let embedding = provider.embed(&atom.body)?;
        vectors.store(&hash, &embedding)?;
        embedded += 1;
    }

    println!("Embedded {embedded} atom(s) with {}.", provider.model());
    Ok(())
}

/// Print the atoms most similar to a stored one.
pub fn similar(root: &Path, hash: &str, k: usize) -> Result<()> {
    let hash = ContentHash::parse(hash)?;
    let substrate = Substrate::open(root)?;
    let (vectors, _) = super::open_vectors(&substrate)?;

    let hits = vectors.find_nearest(&hash, k)?;
    if hits.is_empty() {
        println!("No similar atoms found.");
        return Ok(());
    }

    for hit in hits {
        let title = match substrate.get(&hit.hash)? {
            Some(atom) => super::title_of(&atom.body),
            None => "(not in store)".to_string(),
        };
        println!(
            "{:.4} | {} | {}",
            hit.similarity,
            super::short_hash(&hit.hash),
            title,
        );
    }
    Ok(())
}
