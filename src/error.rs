//! Error types for catalog loading, ranking, and recommendation requests.

use std::path::PathBuf;

use thiserror::Error;

/// The catalog files could not be turned into a consistent [`EmbeddingStore`].
///
/// Always fatal at startup: a service must not serve requests from a store
/// that failed to load.
///
/// [`EmbeddingStore`]: crate::catalog::EmbeddingStore
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid .npy file {}: {reason}", path.display())]
    Npy { path: PathBuf, reason: String },

    #[error("invalid catalog metadata {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("row {row} has {actual} values, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("non-finite embedding value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },

    #[error("embedding matrix has {rows} rows but metadata lists {entries} entries")]
    RowCountMismatch { rows: usize, entries: usize },
}

/// A caller passed arguments the ranker or the request façade cannot accept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidArgument {
    #[error("top_k must be at least 1")]
    ZeroTopK,

    #[error("top_k must be between 1 and {max}, got {value}")]
    TopKOutOfRange { value: usize, max: usize },

    #[error("query must not be empty")]
    EmptyQuery,

    #[error("query has {actual} dimensions, catalog embeddings have {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("query embedding contains a non-finite value at position {position}")]
    NonFiniteQuery { position: usize },
}

/// Row lookup past the end of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("row index {index} out of bounds for catalog of {len} entries")]
pub struct IndexError {
    pub index: usize,
    pub len: usize,
}

/// Per-request failure of [`Recommender::recommend`](crate::service::Recommender::recommend).
#[derive(Debug, Error)]
pub enum RecommendError {
    /// Bad input from the caller.
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),

    /// The text encoder failed. Not retried.
    #[error("failed to encode query: {0}")]
    Encoding(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RecommendError {
    /// `true` when the request itself was at fault, as opposed to the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Short machine-readable label used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Encoding(_) => "encoding",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_distinguished_from_failures() {
        let bad_input = RecommendError::from(InvalidArgument::EmptyQuery);
        assert!(bad_input.is_client_error());
        assert_eq!(bad_input.kind(), "invalid_argument");
        assert_eq!(bad_input.to_string(), "query must not be empty");

        let encoding = RecommendError::Encoding("tokenization failed".into());
        assert!(!encoding.is_client_error());
        assert_eq!(encoding.kind(), "encoding");

        let internal = RecommendError::Internal("task panicked".into());
        assert!(!internal.is_client_error());
        assert_eq!(internal.kind(), "internal");
    }

    #[test]
    fn row_count_mismatch_message_names_both_sides() {
        let err = LoadError::RowCountMismatch { rows: 3, entries: 2 };
        assert_eq!(
            err.to_string(),
            "embedding matrix has 3 rows but metadata lists 2 entries"
        );
    }
}
