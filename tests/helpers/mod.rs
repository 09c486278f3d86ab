#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::Array2;
use shortlist::catalog::{npy, CatalogEntry, EmbeddingStore};
use shortlist::config::RetrievalConfig;
use shortlist::embedding::EmbeddingProvider;
use shortlist::ranker::LinearScan;
use shortlist::service::Recommender;

pub fn entry(name: &str) -> CatalogEntry {
    CatalogEntry::new(name, "", format!("https://example.com/{name}"))
}

/// Build a store from `(name, vector)` pairs, in catalog order.
pub fn store(rows: &[(&str, Vec<f32>)]) -> EmbeddingStore {
    EmbeddingStore::from_rows(
        rows.iter().map(|(_, v)| v.clone()).collect(),
        rows.iter().map(|(name, _)| entry(name)).collect(),
    )
    .unwrap()
}

/// A = [1, 0], B = [0, 1], C = [0.7071, 0.7071].
pub fn abc_store() -> EmbeddingStore {
    store(&[
        ("A", vec![1.0, 0.0]),
        ("B", vec![0.0, 1.0]),
        ("C", vec![0.7071, 0.7071]),
    ])
}

/// Unit vector in 2-D whose cosine with `[1, 0]` is `cos`.
pub fn at_cosine(cos: f32) -> Vec<f32> {
    vec![cos, (1.0 - cos * cos).sqrt()]
}

/// Write `matrix` and `metadata_json` as catalog files under `dir`.
pub fn write_catalog_files(
    dir: &Path,
    matrix: &Array2<f32>,
    metadata_json: &str,
) -> (PathBuf, PathBuf) {
    let embeddings = dir.join("catalog_embeddings.npy");
    let metadata = dir.join("catalog_meta.json");
    std::fs::write(&embeddings, npy::encode(matrix.view())).unwrap();
    std::fs::write(&metadata, metadata_json).unwrap();
    (embeddings, metadata)
}

/// Encoder that maps known texts to fixed vectors and counts calls.
/// Unknown texts encode to the zero vector.
pub struct StubEncoder {
    vectors: HashMap<String, Vec<f32>>,
    dims: usize,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl StubEncoder {
    pub fn new(dims: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            dims,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn failing(dims: usize, message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(dims)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for StubEncoder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            anyhow::bail!("{message}");
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dims]))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Recommender over `store` with default limits (default_top_k 5, max_top_k 10).
pub fn recommender(store: EmbeddingStore, encoder: Arc<StubEncoder>) -> Recommender {
    Recommender::new(
        Arc::new(store),
        encoder,
        Arc::new(LinearScan),
        &RetrievalConfig::default(),
    )
}
