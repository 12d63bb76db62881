use std::path::Path;

use anyhow::Result;

use aku::aku::RelationKind;
use aku::hash::ContentHash;
use aku::substrate::{Direction, Substrate};

/// Record an external link between two atoms.
pub fn link(root: &Path, from: &str, to: &str, relation: RelationKind) -> Result<()> {
    let from = ContentHash::parse(from)?;
    let to = ContentHash::parse(to)?;

    let substrate = Substrate::open(root)?;
    substrate.link(&from, &to, relation)?;

    println!("{} -[{relation}]-> {}", super::short_hash(&from), super::short_hash(&to));
    Ok(())
}

/// Print the neighbors of an atom across embedded and external links.
pub fn neighbors(root: &Path, hash: &str, direction: Direction) -> Result<()> {
    let hash = ContentHash::parse(hash)?;
    let substrate = Substrate::open(root)?;

    let neighbors = substrate.neighbors(&hash, direction)?;
    if neighbors.is_empty() {
        println!("No neighbors.");
        return Ok(());
    }

    for neighbor in neighbors {
        match substrate.get(&neighbor)? {
            Some(atom) => println!(
                "{} | {} | {}",
                super::short_hash(&neighbor),
                atom.meta.domain,
                super::title_of(&atom.body),
            ),
            None => println!("{} | (not in store)", super::short_hash(&neighbor)),
        }
    }
    Ok(())
}
