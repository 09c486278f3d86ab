//! The embedding store: catalog vectors plus their parallel entry metadata.
//!
//! An [`EmbeddingStore`] is built once from a `.npy` matrix and a JSON list of
//! [`CatalogEntry`] records, checked for consistency, and never mutated
//! afterwards. Row `i` of the matrix always describes entry `i`.

pub mod ingest;
pub mod npy;

use std::borrow::Cow;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{IndexError, LoadError};

/// One catalog item (an assessment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "assessment_name")]
    pub name: String,
    /// Empty when the source omits it or stores `null`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,
    pub url: String,
}

impl CatalogEntry {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            url: url.into(),
        }
    }
}

/// Strings pass through; `null`, numbers and anything else become `""`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

/// Replace the bare `NaN`, `Infinity` and `-Infinity` tokens Python's `json`
/// module emits for blank cells with `null`. String contents are untouched.
fn replace_non_finite_tokens(json: &str) -> Cow<'_, str> {
    const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

    if !TOKENS.iter().any(|t| json.contains(t)) {
        return Cow::Borrowed(json);
    }

    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = json;
    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(*t)) {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    Cow::Owned(out)
}

/// Immutable `[N, D]` embedding matrix with index-aligned catalog entries.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    matrix: Array2<f32>,
    norms: Array1<f32>,
    entries: Vec<CatalogEntry>,
}

impl EmbeddingStore {
    /// Load the matrix from `embeddings_path` (`.npy`) and entries from
    /// `metadata_path` (JSON array).
    pub fn load(
        embeddings_path: impl AsRef<Path>,
        metadata_path: impl AsRef<Path>,
    ) -> Result<Self, LoadError> {
        let embeddings_path = embeddings_path.as_ref();
        let metadata_path = metadata_path.as_ref();

        let bytes = std::fs::read(embeddings_path).map_err(|source| LoadError::Io {
            path: embeddings_path.to_path_buf(),
            source,
        })?;
        let matrix = npy::decode(&bytes).map_err(|reason| LoadError::Npy {
            path: embeddings_path.to_path_buf(),
            reason,
        })?;

        let json = std::fs::read_to_string(metadata_path).map_err(|source| LoadError::Io {
            path: metadata_path.to_path_buf(),
            source,
        })?;
        let json = replace_non_finite_tokens(&json);
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(&json).map_err(|source| LoadError::Metadata {
                path: metadata_path.to_path_buf(),
                source,
            })?;

        let store = Self::from_parts(matrix, entries)?;
        tracing::info!(
            embeddings = %embeddings_path.display(),
            metadata = %metadata_path.display(),
            entries = store.len(),
            dimension = store.dimension(),
            "catalog loaded"
        );
        Ok(store)
    }

    /// Build a store from an in-memory matrix, applying the same checks as [`load`](Self::load).
    pub fn from_parts(matrix: Array2<f32>, entries: Vec<CatalogEntry>) -> Result<Self, LoadError> {
        if matrix.nrows() != entries.len() {
            return Err(LoadError::RowCountMismatch {
                rows: matrix.nrows(),
                entries: entries.len(),
            });
        }

        for (row, values) in matrix.outer_iter().enumerate() {
            if let Some(column) = values.iter().position(|v| !v.is_finite()) {
                return Err(LoadError::NonFinite { row, column });
            }
        }

        let norms = matrix.map_axis(Axis(1), |row| row.dot(&row).sqrt());

        Ok(Self {
            matrix,
            norms,
            entries,
        })
    }

    /// Build a store from one `Vec<f32>` per entry. All rows must share a length.
    pub fn from_rows(rows: Vec<Vec<f32>>, entries: Vec<CatalogEntry>) -> Result<Self, LoadError> {
        let dimension = rows.first().map_or(0, Vec::len);
        if let Some((row, values)) = rows
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != dimension)
        {
            return Err(LoadError::RaggedRows {
                row,
                expected: dimension,
                actual: values.len(),
            });
        }

        let matrix = Array2::from_shape_fn((rows.len(), dimension), |(i, j)| rows[i][j]);
        Self::from_parts(matrix, entries)
    }

    /// Number of catalog entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding width. `0` for a store built from no rows.
    pub fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    /// Vector and entry at row `index`.
    pub fn row_at(&self, index: usize) -> Result<(ArrayView1<'_, f32>, &CatalogEntry), IndexError> {
        let entry = self.entries.get(index).ok_or(IndexError {
            index,
            len: self.len(),
        })?;
        Ok((self.matrix.row(index), entry))
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub(crate) fn matrix(&self) -> &Array2<f32> {
        &self.matrix
    }

    /// L2 norm of every row, computed once at construction.
    pub(crate) fn norms(&self) -> &Array1<f32> {
        &self.norms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn entry(name: &str) -> CatalogEntry {
        CatalogEntry::new(name, "", format!("https://example.com/{name}"))
    }

    #[test]
    fn norms_are_precomputed_per_row() {
        let store = EmbeddingStore::from_parts(
            array![[3.0, 4.0], [0.0, 0.0]],
            vec![entry("a"), entry("b")],
        )
        .unwrap();
        assert_eq!(store.norms().to_vec(), vec![5.0, 0.0]);
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let err = EmbeddingStore::from_parts(
            array![[1.0, 0.0], [0.0, f32::NAN]],
            vec![entry("a"), entry("b")],
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::NonFinite { row: 1, column: 1 }));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = EmbeddingStore::from_rows(
            vec![vec![1.0, 0.0], vec![1.0]],
            vec![entry("a"), entry("b")],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LoadError::RaggedRows { row: 1, expected: 2, actual: 1 }
        ));
    }

    #[test]
    fn category_defaults_to_empty() {
        let entries: Vec<CatalogEntry> = serde_json::from_str(
            r#"[
                {"assessment_name": "Verify", "url": "u1"},
                {"assessment_name": "OPQ", "category": null, "url": "u2"},
                {"assessment_name": "Coding", "category": "Technical", "url": "u3", "description": "ignored"}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries[0].category, "");
        assert_eq!(entries[1].category, "");
        assert_eq!(entries[2].category, "Technical");
    }

    #[test]
    fn non_finite_tokens_become_null_outside_strings() {
        let json = r#"[{"assessment_name": "NaN \"Infinity\"", "category": NaN, "x": -Infinity, "y": [Infinity]}]"#;
        assert_eq!(
            replace_non_finite_tokens(json),
            r#"[{"assessment_name": "NaN \"Infinity\"", "category": null, "x": null, "y": [null]}]"#
        );
        assert!(matches!(
            replace_non_finite_tokens(r#"{"a": 1.5}"#),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn non_string_category_is_empty() {
        let entries: Vec<CatalogEntry> = serde_json::from_str(
            r#"[{"assessment_name": "A", "category": 3.5, "url": "u"}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].category, "");
    }

    #[test]
    fn entry_serializes_with_wire_name() {
        let json = serde_json::to_value(entry("Verify")).unwrap();
        assert_eq!(json["assessment_name"], "Verify");
        assert!(json.get("name").is_none());
    }
}
