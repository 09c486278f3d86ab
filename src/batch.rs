//! Batch recommendations: a CSV of queries in, a CSV of ranked matches out.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error::RecommendError;
use crate::service::{RecommendResponse, Recommender};

/// Columns searched for query text, in order of preference.
pub const QUERY_COLUMNS: [&str; 4] = ["query", "requirement", "problem_statement", "text"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFile {
    /// Header of the column the queries came from.
    pub column: String,
    pub queries: Vec<String>,
}

/// One output line: a query paired with one of its recommendations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRow {
    pub input_query: String,
    pub recommended_assessment: String,
    pub url: String,
    pub similarity_score: f64,
}

pub fn read_queries_csv(path: impl AsRef<Path>) -> Result<QueryFile> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open query file: {}", path.display()))?;
    read_queries(file).with_context(|| format!("failed to read queries from {}", path.display()))
}

/// Read the first column named in [`QUERY_COLUMNS`] that the CSV has.
pub fn read_queries<R: Read>(reader: R) -> Result<QueryFile> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();

    let (column, index) = QUERY_COLUMNS
        .iter()
        .find_map(|wanted| {
            headers
                .iter()
                .position(|h| h.trim() == *wanted)
                .map(|i| (wanted.to_string(), i))
        })
        .with_context(|| {
            format!(
                "no query column found; expected one of {}",
                QUERY_COLUMNS.join(", ")
            )
        })?;

    let queries = reader
        .records()
        .map(|record| Ok(record?.get(index).unwrap_or_default().to_string()))
        .collect::<Result<Vec<_>>>()?;

    Ok(QueryFile { column, queries })
}

/// One [`SubmissionRow`] per recommendation in `response`.
pub fn submission_rows(response: &RecommendResponse) -> Vec<SubmissionRow> {
    response
        .recommendations
        .iter()
        .map(|rec| SubmissionRow {
            input_query: response.query.clone(),
            recommended_assessment: rec.assessment_name.clone(),
            url: rec.url.clone(),
            similarity_score: rec.score,
        })
        .collect()
}

/// Run every query through `recommender`.
///
/// Blank queries are skipped with a warning. Any other failure stops the run,
/// so a results file is never missing rows silently. `on_done` is called once
/// per query, skipped or not.
pub async fn run(
    recommender: &Recommender,
    queries: &[String],
    top_k: usize,
    mut on_done: impl FnMut(),
) -> Result<Vec<SubmissionRow>> {
    let mut rows = Vec::with_capacity(queries.len() * top_k);
    for (i, query) in queries.iter().enumerate() {
        match recommender.recommend(query, top_k).await {
            Ok(response) => rows.extend(submission_rows(&response)),
            Err(RecommendError::InvalidArgument(e)) if query.trim().is_empty() => {
                tracing::warn!(row = i + 1, error = %e, "skipping blank query");
            }
            Err(e) => return Err(e).with_context(|| format!("query {} failed: {query:?}", i + 1)),
        }
        on_done();
    }
    Ok(rows)
}

pub fn write_submission<W: Write>(writer: W, rows: &[SubmissionRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
