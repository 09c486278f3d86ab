//! Query and catalog text encoding.
//!
//! [`EmbeddingProvider`] is the boundary the rest of the crate sees: text in,
//! fixed-width vector out. [`local::LocalEmbeddingProvider`] runs
//! all-MiniLM-L6-v2 through ONNX Runtime and is what the catalog build and the
//! server use by default.

pub mod local;

use std::path::PathBuf;

use anyhow::Result;

use crate::config::EmbeddingConfig;

/// Output width of all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Turns text into embedding vectors.
///
/// Calls are blocking and may be slow (model inference). Async callers run
/// them under `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts at once. The default embeds them one by one.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Paths of the ONNX model and tokenizer inside the configured cache dir.
pub fn model_files(config: &EmbeddingConfig) -> (PathBuf, PathBuf) {
    let cache_dir = crate::config::expand_tilde(&config.cache_dir);
    (cache_dir.join(MODEL_FILE), cache_dir.join(TOKENIZER_FILE))
}

/// Create the provider named by `config.provider`.
///
/// Only `"local"` exists. Fails if the model files are missing; run
/// `shortlist model download` first.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => Ok(Box::new(local::LocalEmbeddingProvider::new(config)?)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local"),
    }
}
