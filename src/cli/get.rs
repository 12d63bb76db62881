use std::path::Path;

use anyhow::{bail, Result};

use aku::aku::serialize_aku;
use aku::hash::ContentHash;
use aku::substrate::Substrate;

/// Print a full atom in its on-disk format.
pub fn get(root: &Path, hash: &str) -> Result<()> {
    let hash = ContentHash::parse(hash)?;
    let substrate = Substrate::open(root)?;

    match substrate.get(&hash)? {
        Some(atom) => {
            print!("{}", serialize_aku(&atom)?);
            println!();
            Ok(())
        }
        None => bail!("AKU not found: {hash}"),
    }
}
