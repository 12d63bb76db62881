//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and a deterministic mock
//! implementation. Real model runtimes are external collaborators — the
//! substrate only ever sees finished vectors, so any backend that produces
//! fixed-length floats can plug in here.

use anyhow::Result;

use crate::config::VectorIndexConfig;
use crate::index::vector::normalize_vector;

/// Dimensionality of the mock provider when none is configured.
pub const DEFAULT_DIMENSIONS: usize = 128;

/// Trait for embedding text into vectors.
///
/// Implementations produce unit-normalized vectors of exactly
/// `dimensions()` length. All methods are synchronous — callers in async
/// contexts should use `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts. Implementations may override for batched
    /// inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Model identifier recorded alongside stored vectors.
    fn model(&self) -> &str;
}

/// Deterministic pseudo-random embeddings seeded from the text content.
/// Identical text always embeds to the identical vector, which is what the
/// self-match tests rely on.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut seed: i32 = 0;
        for c in text.chars() {
            seed = seed
                .wrapping_shl(5)
                .wrapping_sub(seed)
                .wrapping_add(c as i32);
        }

        // LCG over the seed, one draw per dimension, mapped into [-1, 1].
        let mut embedding = Vec::with_capacity(self.dimensions);
        for _ in 0..self.dimensions {
            seed = ((i64::from(seed) * 1_103_515_245 + 12_345) & 0x7fff_ffff) as i32;
            embedding.push((seed as f32 / 0x7fff_ffff as f32) * 2.0 - 1.0);
        }

        Ok(normalize_vector(&embedding))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        "mock-v1"
    }
}

/// Create an embedding provider from the vector index config.
///
/// Currently only the deterministic `mock` model ships with the crate.
pub fn create_provider(config: &VectorIndexConfig) -> Result<Box<dyn EmbeddingProvider>> {
    let dimensions = config.dimensions.unwrap_or(DEFAULT_DIMENSIONS);
    match config.model.as_deref() {
        None | Some("mock") | Some("mock-v1") => {
            Ok(Box::new(MockEmbeddingProvider::new(dimensions)))
        }
        Some(other) => anyhow::bail!("unknown embedding model: {other}. Supported: mock"),
    }
}
