//! CLI `doctor` command: check the catalog files and embedding model.

use anyhow::Result;

use shortlist::catalog::EmbeddingStore;
use shortlist::config::ShortlistConfig;
use shortlist::embedding::{self, EMBEDDING_DIM};

/// Print a health report. Returns an error only if the report itself cannot be produced.
pub fn doctor(config: &ShortlistConfig) -> Result<()> {
    let embeddings_path = config.resolved_embeddings_path();
    let metadata_path = config.resolved_metadata_path();
    let (model_path, tokenizer_path) = embedding::model_files(&config.embedding);

    println!("Shortlist Health Report");
    println!("=======================");
    println!();
    println!("Catalog:");
    println!("  Embeddings:      {}", embeddings_path.display());
    println!("  Metadata:        {}", metadata_path.display());

    let mut healthy = true;
    match EmbeddingStore::load(&embeddings_path, &metadata_path) {
        Ok(store) => {
            println!("  Entries:         {}", store.len());
            println!("  Dimension:       {}", store.dimension());
            let missing_category = store.entries().iter().filter(|e| e.category.is_empty()).count();
            println!("  No category:     {missing_category}");
            if !store.is_empty() && store.dimension() != EMBEDDING_DIM {
                healthy = false;
                println!(
                    "  WARNING: catalog is {}-dim but {} produces {EMBEDDING_DIM}-dim vectors. Run `shortlist build`.",
                    store.dimension(),
                    config.embedding.model
                );
            } else {
                println!("  Status:          OK");
            }
        }
        Err(e) => {
            healthy = false;
            println!("  Status:          FAILED ({e})");
        }
    }

    println!();
    println!("Embedding model:   {} ({})", config.embedding.model, config.embedding.provider);
    for (label, path) in [("ONNX model:", &model_path), ("Tokenizer:", &tokenizer_path)] {
        let state = if path.exists() {
            "found"
        } else {
            healthy = false;
            "MISSING"
        };
        println!("  {label:<16} {state} ({})", path.display());
    }

    println!();
    if healthy {
        println!("All checks passed.");
    } else {
        println!("Recovery steps:");
        println!("  1. shortlist model download");
        println!("  2. shortlist build --csv <catalog.csv>");
    }

    Ok(())
}
