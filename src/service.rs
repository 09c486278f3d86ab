//! Request façade: validate a query, encode it, rank the catalog, format results.
//!
//! [`Recommender`] is what every surface (HTTP server, CLI, batch runner)
//! talks to. It owns no global state; the store, encoder and ranker are
//! handed to it once at startup and shared by `Arc`.

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::catalog::EmbeddingStore;
use crate::config::{RetrievalConfig, ShortlistConfig};
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{InvalidArgument, RecommendError};
use crate::ranker::{LinearScan, Ranker, Recommendation};

/// Result of one recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendResponse {
    /// The query exactly as the caller sent it.
    pub query: String,
    /// Best match first.
    pub recommendations: Vec<Recommendation>,
}

#[derive(Clone)]
pub struct Recommender {
    store: Arc<EmbeddingStore>,
    encoder: Arc<dyn EmbeddingProvider>,
    ranker: Arc<dyn Ranker>,
    default_top_k: usize,
    max_top_k: usize,
}

impl Recommender {
    pub fn new(
        store: Arc<EmbeddingStore>,
        encoder: Arc<dyn EmbeddingProvider>,
        ranker: Arc<dyn Ranker>,
        limits: &RetrievalConfig,
    ) -> Self {
        Self {
            store,
            encoder,
            ranker,
            default_top_k: limits.default_top_k,
            max_top_k: limits.max_top_k,
        }
    }

    /// Load the catalog and the configured encoder and wire them to a linear-scan ranker.
    ///
    /// Any load failure is returned here, before a single request is served.
    pub fn from_config(config: &ShortlistConfig) -> anyhow::Result<Self> {
        let store = EmbeddingStore::load(
            config.resolved_embeddings_path(),
            config.resolved_metadata_path(),
        )
        .context("failed to load catalog; run `shortlist build` first")?;

        let provider = embedding::create_provider(&config.embedding)?;
        let encoder: Arc<dyn EmbeddingProvider> = Arc::from(provider);
        tracing::info!(model = %config.embedding.model, "embedding provider ready");

        if !store.is_empty() {
            anyhow::ensure!(
                encoder.dimensions() == store.dimension(),
                "encoder produces {}-dim vectors but the catalog has {} dims; rebuild the catalog",
                encoder.dimensions(),
                store.dimension()
            );
        }

        Ok(Self::new(
            Arc::new(store),
            encoder,
            Arc::new(LinearScan),
            &config.retrieval,
        ))
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    /// `top_k` used when a caller does not give one.
    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    pub fn max_top_k(&self) -> usize {
        self.max_top_k
    }

    /// Recommend up to `top_k` catalog entries for `query`.
    ///
    /// Blank queries and out-of-range `top_k` are rejected before the encoder
    /// runs. Encoding happens on the blocking pool.
    pub async fn recommend(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<RecommendResponse, RecommendError> {
        self.validate(query, top_k)?;

        tracing::debug!(query_len = query.len(), top_k, "encoding query");
        let encoder = Arc::clone(&self.encoder);
        let text = query.to_string();
        let query_vector = tokio::task::spawn_blocking(move || encoder.embed(&text))
            .await
            .map_err(|e| RecommendError::Internal(format!("encoder task failed: {e}")))?
            .map_err(|e| RecommendError::Encoding(format!("{e:#}")))?;

        // A width mismatch or a NaN vector here is the encoder's fault, not
        // the caller's.
        let ranked = self
            .ranker
            .rank(&query_vector, &self.store, top_k)
            .map_err(|e| match e {
                InvalidArgument::DimensionMismatch { .. } => RecommendError::Internal(e.to_string()),
                InvalidArgument::NonFiniteQuery { .. } => RecommendError::Encoding(e.to_string()),
                other => other.into(),
            })?;
        let recommendations: Vec<Recommendation> =
            ranked.iter().map(|r| r.to_recommendation()).collect();

        tracing::info!(
            top_k,
            returned = recommendations.len(),
            best_score = recommendations.first().map(|r| r.score),
            "recommendations ranked"
        );

        Ok(RecommendResponse {
            query: query.to_string(),
            recommendations,
        })
    }

    fn validate(&self, query: &str, top_k: usize) -> Result<(), InvalidArgument> {
        if query.trim().is_empty() {
            return Err(InvalidArgument::EmptyQuery);
        }
        if top_k == 0 {
            return Err(InvalidArgument::ZeroTopK);
        }
        if top_k > self.max_top_k {
            return Err(InvalidArgument::TopKOutOfRange {
                value: top_k,
                max: self.max_top_k,
            });
        }
        Ok(())
    }
}
