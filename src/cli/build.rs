//! CLI `build` command: embed the catalog CSV and write the catalog files.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use shortlist::catalog::ingest;
use shortlist::config::ShortlistConfig;
use shortlist::embedding::{self, EmbeddingProvider};

pub async fn build(config: &ShortlistConfig, csv: Option<&Path>) -> Result<()> {
    let csv_path = csv
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.resolved_csv_path());
    let rows = ingest::read_catalog_csv(&csv_path)?;
    println!("Loaded {} catalog rows from {}", rows.len(), csv_path.display());

    let provider: Arc<dyn EmbeddingProvider> = Arc::from(
        embedding::create_provider(&config.embedding)
            .context("failed to create embedding provider")?,
    );

    println!("Embedding with model '{}'...", config.embedding.model);
    let pb = super::progress_bar(rows.len() as u64, "  {bar:40.cyan/blue} {pos}/{len} ({eta})");

    let mut vectors = Vec::with_capacity(rows.len());
    for chunk in rows.chunks(config.embedding.batch_size) {
        let texts: Vec<String> = chunk.iter().map(ingest::CatalogRow::embedding_text).collect();
        let provider = Arc::clone(&provider);

        let embeddings = tokio::task::spawn_blocking(move || {
            let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            provider.embed_batch(&text_refs)
        })
        .await?
        .context("embedding batch failed")?;

        vectors.extend(embeddings);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    let embeddings_path = config.resolved_embeddings_path();
    let metadata_path = config.resolved_metadata_path();
    let store = ingest::write_catalog(&embeddings_path, &metadata_path, &rows, vectors)?;

    tracing::info!(
        entries = store.len(),
        dimension = store.dimension(),
        "catalog written"
    );
    println!("Embeddings saved to: {}", embeddings_path.display());
    println!("Metadata saved to:   {}", metadata_path.display());
    Ok(())
}
