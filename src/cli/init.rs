use std::path::Path;

use anyhow::Result;

use aku::config::SubstrateConfig;
use aku::index::IndexManager;
use aku::substrate::Substrate;

/// Initialize a new knowledge substrate at `root`.
pub fn init(root: &Path) -> Result<()> {
    println!("Initializing knowledge substrate at: {}", root.display());

    let substrate = Substrate::init(root, SubstrateConfig::default())?;
    IndexManager::open(&substrate.indexes_dir(), &substrate.config().indexes)?;

    println!("  created directory structure");
    println!("  wrote configuration");
    println!("  set up indexes");
    println!();
    println!("Substrate ready at: {}", root.display());
    Ok(())
}
