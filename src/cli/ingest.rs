use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use aku::aku::{IngestInput, KnowledgeType, Volatility};

/// Ingest a file (or stdin) into the substrate and index the result.
/// Prints the content hash.
pub fn ingest(
    root: &Path,
    file: Option<PathBuf>,
    domain: String,
    knowledge_type: Option<KnowledgeType>,
    tags: Option<String>,
    confidence: Option<f64>,
    volatility: Option<Volatility>,
) -> Result<()> {
    let body = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let tags = tags.map(|t| {
        t.split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect::<Vec<_>>()
    });

    let (substrate, indexes) = super::open_store(root)?;
    let hash = substrate.ingest(IngestInput {
        body,
        domain,
        knowledge_type,
        tags,
        confidence,
        volatility,
        ..Default::default()
    })?;

    if let Some(atom) = substrate.get(&hash)? {
        indexes.index_aku(&atom)?;
    }

    println!("{hash}");
    Ok(())
}
