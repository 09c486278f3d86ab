//! Cosine-similarity ranking of catalog entries against a query vector.
//!
//! [`rank`] is a linear scan: one matrix-vector product over the whole store,
//! then a stable descending sort. Scores keep full precision here; rounding to
//! three decimals happens only when a result is turned into a
//! [`Recommendation`] for output, so near-ties are never reordered by rounding.
//!
//! The [`Ranker`] trait is the seam for swapping in an approximate index once
//! a catalog outgrows a linear scan. Callers hold an `Arc<dyn Ranker>` and do
//! not care which implementation answers.

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogEntry, EmbeddingStore};
use crate::error::InvalidArgument;

/// Decimal places kept in reported scores.
pub const SCORE_DECIMALS: i32 = 3;

/// One ranked catalog entry with its full-precision cosine score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult<'a> {
    /// Row index of the entry in the store.
    pub index: usize,
    pub entry: &'a CatalogEntry,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f64,
}

impl RankedResult<'_> {
    /// Presentation form with the score rounded to [`SCORE_DECIMALS`].
    pub fn to_recommendation(&self) -> Recommendation {
        Recommendation {
            assessment_name: self.entry.name.clone(),
            category: self.entry.category.clone(),
            url: self.entry.url.clone(),
            score: round_score(self.score),
        }
    }
}

/// A ranked entry as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub assessment_name: String,
    pub category: String,
    pub url: String,
    pub score: f64,
}

/// Top-K retrieval over an [`EmbeddingStore`].
pub trait Ranker: Send + Sync {
    /// Rank `store` against `query` and return at most `k` results, best first.
    fn rank<'s>(
        &self,
        query: &[f32],
        store: &'s EmbeddingStore,
        k: usize,
    ) -> Result<Vec<RankedResult<'s>>, InvalidArgument>;
}

/// Exact ranking by scanning every row.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearScan;

impl Ranker for LinearScan {
    fn rank<'s>(
        &self,
        query: &[f32],
        store: &'s EmbeddingStore,
        k: usize,
    ) -> Result<Vec<RankedResult<'s>>, InvalidArgument> {
        rank(query, store, k)
    }
}

/// Rank every entry in `store` by cosine similarity to `query` and keep the top `k`.
///
/// An empty store yields an empty list for any `k`. Otherwise `k` must be at
/// least 1 and is clamped to the store size. Entries with equal scores stay in
/// catalog order. A zero-norm query or row scores `0.0`. A query holding
/// NaN or an infinity is rejected.
pub fn rank<'s>(
    query: &[f32],
    store: &'s EmbeddingStore,
    k: usize,
) -> Result<Vec<RankedResult<'s>>, InvalidArgument> {
    if store.is_empty() {
        return Ok(Vec::new());
    }
    if k == 0 {
        return Err(InvalidArgument::ZeroTopK);
    }
    if query.is_empty() {
        return Err(InvalidArgument::EmptyQuery);
    }
    if query.len() != store.dimension() {
        return Err(InvalidArgument::DimensionMismatch {
            expected: store.dimension(),
            actual: query.len(),
        });
    }
    if let Some(position) = query.iter().position(|v| !v.is_finite()) {
        return Err(InvalidArgument::NonFiniteQuery { position });
    }

    let query = ndarray::ArrayView1::from(query);
    let query_norm = query.dot(&query).sqrt();
    let dots = store.matrix().dot(&query);

    let mut scored: Vec<(usize, f64)> = dots
        .iter()
        .zip(store.norms().iter())
        .map(|(&dot, &row_norm)| cosine_from_parts(dot, query_norm, row_norm))
        .enumerate()
        .collect();

    // `sort_by` is stable, so equal scores keep ascending index order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k.min(store.len()));

    let entries = store.entries();
    Ok(scored
        .into_iter()
        .map(|(index, score)| RankedResult {
            index,
            entry: &entries[index],
            score,
        })
        .collect())
}

/// Cosine similarity between two slices. `0.0` if either has zero norm or
/// the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    cosine_from_parts(dot, norm_a, norm_b)
}

fn cosine_from_parts(dot: f32, norm_a: f32, norm_b: f32) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let score = f64::from(dot) / (f64::from(norm_a) * f64::from(norm_b));
    // f32 overflow in the dot product or a norm leaves NaN here
    if !score.is_finite() {
        return 0.0;
    }
    score.clamp(-1.0, 1.0)
}

/// Round a score to [`SCORE_DECIMALS`] places for output.
pub fn round_score(score: f64) -> f64 {
    let scale = 10f64.powi(SCORE_DECIMALS);
    (score * scale).round() / scale
}
