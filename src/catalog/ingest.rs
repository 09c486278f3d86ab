//! Offline catalog build: CSV table → per-row text → vectors → `.npy` + JSON.
//!
//! The encoder call itself lives with the caller (`shortlist build`), which
//! batches rows and reports progress. This module owns the parts with a fixed
//! format: reading the table, composing the text each row is embedded from,
//! and writing the two files [`EmbeddingStore::load`] reads back.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::{npy, CatalogEntry, EmbeddingStore};

pub const NAME_COLUMN: &str = "assessment_name";
pub const CATEGORY_COLUMN: &str = "category";
pub const DESCRIPTION_COLUMN: &str = "description";
pub const URL_COLUMN: &str = "url";

/// One row of the source catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogRow {
    pub assessment_name: String,
    pub category: String,
    pub description: String,
    pub url: String,
}

impl CatalogRow {
    /// Text the row is embedded from: `"{name}. {category}. {description}"`.
    pub fn embedding_text(&self) -> String {
        format!(
            "{}. {}. {}",
            self.assessment_name, self.category, self.description
        )
    }

    pub fn to_entry(&self) -> CatalogEntry {
        CatalogEntry::new(&self.assessment_name, &self.category, &self.url)
    }
}

/// Read the catalog CSV at `path`.
pub fn read_catalog_csv(path: impl AsRef<Path>) -> Result<Vec<CatalogRow>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open catalog CSV: {}", path.display()))?;
    read_catalog(file).with_context(|| format!("failed to parse catalog CSV: {}", path.display()))
}

/// Read catalog rows from CSV. Missing columns are filled with blanks.
pub fn read_catalog<R: Read>(reader: R) -> Result<Vec<CatalogRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();

    let column = |name: &str| {
        let found = index.get(name).copied();
        if found.is_none() {
            tracing::warn!(column = name, "catalog CSV has no such column, filling with blanks");
        }
        found
    };
    let name_col = column(NAME_COLUMN);
    let category_col = column(CATEGORY_COLUMN);
    let description_col = column(DESCRIPTION_COLUMN);
    let url_col = column(URL_COLUMN);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |col: Option<usize>| {
            col.and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string()
        };
        rows.push(CatalogRow {
            assessment_name: field(name_col),
            category: field(category_col),
            description: field(description_col),
            url: field(url_col),
        });
    }

    tracing::info!(rows = rows.len(), "catalog CSV read");
    Ok(rows)
}

/// Validate `vectors` against `rows` and write both catalog files.
///
/// Each file is written to a temporary sibling and renamed into place, so a
/// failed build never leaves a half-written catalog behind.
pub fn write_catalog(
    embeddings_path: impl AsRef<Path>,
    metadata_path: impl AsRef<Path>,
    rows: &[CatalogRow],
    vectors: Vec<Vec<f32>>,
) -> Result<EmbeddingStore> {
    let entries = rows.iter().map(CatalogRow::to_entry).collect();
    let store = EmbeddingStore::from_rows(vectors, entries)
        .context("encoded vectors do not form a valid catalog")?;

    write_atomic(embeddings_path.as_ref(), &npy::encode(store.matrix().view()))?;
    let json = serde_json::to_vec_pretty(rows).context("failed to serialize catalog metadata")?;
    write_atomic(metadata_path.as_ref(), &json)?;

    Ok(store)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, bytes)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to move {} into place", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_text_joins_name_category_description() {
        let row = CatalogRow {
            assessment_name: "Verify Numerical".into(),
            category: "Cognitive".into(),
            description: "Measures numerical reasoning".into(),
            url: "https://example.com/verify".into(),
        };
        assert_eq!(
            row.embedding_text(),
            "Verify Numerical. Cognitive. Measures numerical reasoning"
        );
    }

    #[test]
    fn missing_columns_are_blank() {
        let csv = "assessment_name,url\nOPQ32,https://example.com/opq\n";
        let rows = read_catalog(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].assessment_name, "OPQ32");
        assert_eq!(rows[0].category, "");
        assert_eq!(rows[0].description, "");
        assert_eq!(rows[0].url, "https://example.com/opq");
        assert_eq!(rows[0].embedding_text(), "OPQ32. . ");
    }

    #[test]
    fn columns_are_matched_by_name_not_position() {
        let csv = "url,description,category,assessment_name,duration\n\
                   u1,Java coding test,Technical,Java 8,30\n\
                   u2,,Behavioral,\n";
        let rows = read_catalog(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].to_entry(), CatalogEntry::new("Java 8", "Technical", "u1"));
        assert_eq!(rows[0].description, "Java coding test");
        // short row: `duration` is absent
        assert_eq!(rows[1].assessment_name, "");
        assert_eq!(rows[1].category, "Behavioral");
    }

    #[test]
    fn write_catalog_produces_loadable_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let embeddings = tmp.path().join("data").join("catalog_embeddings.npy");
        let metadata = tmp.path().join("data").join("catalog_meta.json");
        let rows = vec![
            CatalogRow {
                assessment_name: "A".into(),
                category: "".into(),
                description: "first".into(),
                url: "ua".into(),
            },
            CatalogRow {
                assessment_name: "B".into(),
                category: "Skills".into(),
                description: "second".into(),
                url: "ub".into(),
            },
        ];

        write_catalog(&embeddings, &metadata, &rows, vec![vec![1.0, 0.0], vec![0.0, 1.0]])
            .unwrap();

        let store = EmbeddingStore::load(&embeddings, &metadata).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.dimension(), 2);
        let (vector, entry) = store.row_at(1).unwrap();
        assert_eq!(vector.to_vec(), vec![0.0, 1.0]);
        assert_eq!(entry, &CatalogEntry::new("B", "Skills", "ub"));
        assert!(!embeddings.with_extension("tmp").exists());
    }

    #[test]
    fn write_catalog_rejects_vector_count_mismatch() {
        let tmp = tempfile::TempDir::new().unwrap();
        let embeddings = tmp.path().join("e.npy");
        let metadata = tmp.path().join("m.json");
        let rows = vec![CatalogRow {
            assessment_name: "A".into(),
            category: "".into(),
            description: "".into(),
            url: "ua".into(),
        }];

        assert!(write_catalog(&embeddings, &metadata, &rows, vec![]).is_err());
        assert!(!embeddings.exists());
        assert!(!metadata.exists());
    }
}
