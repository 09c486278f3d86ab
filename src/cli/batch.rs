//! CLI `batch` command: recommendations for every query in a CSV file.

use anyhow::{Context, Result};
use std::path::Path;

use shortlist::batch;
use shortlist::config::ShortlistConfig;
use shortlist::service::Recommender;

pub async fn batch(
    config: &ShortlistConfig,
    input: &Path,
    output: &Path,
    top_k: Option<usize>,
) -> Result<()> {
    let file = batch::read_queries_csv(input)?;
    println!(
        "Loaded {} queries from {} (column '{}')",
        file.queries.len(),
        input.display(),
        file.column
    );

    let recommender = Recommender::from_config(config)?;
    let top_k = top_k.unwrap_or(recommender.default_top_k());

    let pb = super::progress_bar(file.queries.len() as u64, "  {bar:40.cyan/blue} {pos}/{len} ({eta})");
    let rows = batch::run(&recommender, &file.queries, top_k, || pb.inc(1)).await?;
    pb.finish_and_clear();

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let out = std::fs::File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    batch::write_submission(out, &rows)?;

    println!("Wrote {} rows to {}", rows.len(), output.display());
    Ok(())
}
