use std::path::Path;

use anyhow::Result;

use aku::hash::ContentHash;
use aku::substrate::Direction;

/// Breadth-first graph exploration from a starting atom, printed one node
/// per line with indentation by depth.
pub fn traverse(root: &Path, start: &str, max_depth: usize, direction: Direction) -> Result<()> {
    let start = ContentHash::parse(start)?;
    let (substrate, indexes) = super::open_store(root)?;

    let nodes = indexes.traverse(&start, max_depth, direction)?;
    for node in nodes {
        let label = match substrate.get(&node.hash)? {
            Some(atom) => super::title_of(&atom.body),
            None => "(not in store)".to_string(),
        };
        println!(
            "{}{} | {}",
            "  ".repeat(node.depth),
            super::short_hash(&node.hash),
            label,
        );
    }
    Ok(())
}

/// Print the shortest path between two atoms, or report unreachability.
pub fn path(root: &Path, from: &str, to: &str, max_depth: usize) -> Result<()> {
    let from = ContentHash::parse(from)?;
    let to = ContentHash::parse(to)?;
    let (_, indexes) = super::open_store(root)?;

    match indexes.shortest_path(&from, &to, max_depth)? {
        Some(path) => {
            let hops = path.len() - 1;
            println!(
                "{} ({hops} hop{})",
                path.iter()
                    .map(super::short_hash)
                    .collect::<Vec<_>>()
                    .join(" -> "),
                if hops == 1 { "" } else { "s" },
            );
        }
        None => println!("No path found within {max_depth} hops."),
    }
    Ok(())
}
