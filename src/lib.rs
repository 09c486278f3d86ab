//! Semantic catalog recommender.
//!
//! Given a free-text query, `shortlist` returns the catalog entries (assessments)
//! whose precomputed text embeddings are closest to the query's embedding by
//! cosine similarity.
//!
//! # Architecture
//!
//! - **Catalog**: an immutable `[N, D]` embedding matrix (`.npy`) paired
//!   index-for-index with JSON entry metadata, loaded once at startup
//! - **Embeddings**: local ONNX Runtime with all-MiniLM-L6-v2 (384 dimensions)
//! - **Ranking**: exact linear scan, stable descending sort, top-K
//! - **Surfaces**: an axum HTTP API and a CLI, both going through one
//!   [`service::Recommender`]
//!
//! # Modules
//!
//! - [`catalog`]: Embedding store, `.npy` codec, and the offline catalog build
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`embedding`]: Text-to-vector encoding via ONNX Runtime
//! - [`error`]: Load, argument, and request error types
//! - [`ranker`]: Cosine similarity and top-K ranking
//! - [`service`]: Request validation and result formatting
//! - [`server`]: HTTP routes and startup
//! - [`batch`]: Running a file of queries and writing a results CSV

pub mod batch;
pub mod catalog;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ranker;
pub mod server;
pub mod service;
