//! Embedding store: the aligned (vector, metadata) arrays loaded once at startup.
//!
//! Row `i` of the vector matrix describes `records[i]`. Vectors are L2-normalized
//! exactly once during load and never mutated afterwards.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::npy;
use crate::core::errors::LoadError;
use crate::vector_math;

/// Metadata for a single place.
///
/// Only `name` is required. Fields the service does not interpret are kept in
/// `extra` and echoed back unchanged in API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A rating exactly as the metadata wrote it: a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rating {
    Number(Number),
    Text(String),
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::Number(number) => write!(f, "{}", number),
            Rating::Text(text) => f.write_str(text),
        }
    }
}

impl PlaceRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rating: None,
            summary: None,
            reviews: None,
            extra: Map::new(),
        }
    }

    /// Rating as written in the source data, or `"?"`.
    pub fn rating_or_placeholder(&self) -> String {
        self.rating
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "?".to_string())
    }

    pub fn summary_or_empty(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }

    pub fn first_review_or_placeholder(&self) -> &str {
        self.reviews
            .as_ref()
            .and_then(|reviews| reviews.first())
            .map(String::as_str)
            .unwrap_or("No review")
    }
}

#[derive(Debug)]
pub struct EmbeddingStore {
    vectors: Arc<Array2<f32>>,
    records: Vec<PlaceRecord>,
}

impl EmbeddingStore {
    /// Loads and validates both files. `.json` embeddings are read as nested
    /// arrays; anything else is treated as `.npy`.
    pub fn load(embeddings_path: &Path, metadata_path: &Path) -> Result<Self, LoadError> {
        let started = Instant::now();
        let vectors = load_embeddings(embeddings_path)?;
        let records = load_metadata(metadata_path)?;
        let store = Self::from_parts(vectors, records)?;

        tracing::info!(
            "Loaded {} places ({} dims) from {} in {:?}",
            store.len(),
            store.dimension(),
            embeddings_path.display(),
            started.elapsed()
        );
        Ok(store)
    }

    /// Builds a store from raw (not yet normalized) vectors.
    pub fn from_parts(
        mut vectors: Array2<f32>,
        records: Vec<PlaceRecord>,
    ) -> Result<Self, LoadError> {
        if vectors.nrows() != records.len() {
            return Err(LoadError::CountMismatch {
                vectors: vectors.nrows(),
                records: records.len(),
            });
        }
        if vectors.ncols() == 0 && vectors.nrows() > 0 {
            return Err(LoadError::ZeroDimension);
        }

        vector_math::normalize_rows(&mut vectors)
            .map_err(|(row, source)| LoadError::InvalidVector { row, source })?;

        Ok(Self {
            vectors: Arc::new(vectors),
            records,
        })
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn vector(&self, position: usize) -> Option<ArrayView1<'_, f32>> {
        (position < self.vectors.nrows()).then(|| self.vectors.row(position))
    }

    pub fn record(&self, position: usize) -> Option<&PlaceRecord> {
        self.records.get(position)
    }

    /// Shared handle to the normalized matrix, used by indexes built over the store.
    pub fn shared_vectors(&self) -> Arc<Array2<f32>> {
        Arc::clone(&self.vectors)
    }
}

fn read_file(kind: &'static str, path: &Path) -> Result<Vec<u8>, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing {
            kind,
            path: path.to_path_buf(),
        });
    }
    fs::read(path).map_err(|source| LoadError::Io {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

fn load_embeddings(path: &Path) -> Result<Array2<f32>, LoadError> {
    let bytes = read_file("embeddings", path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let rows: Vec<Vec<f32>> =
            serde_json::from_slice(&bytes).map_err(|e| LoadError::MalformedEmbeddings {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        return rows_to_matrix(path, rows);
    }

    npy::read_matrix(&bytes).map_err(|e| LoadError::MalformedEmbeddings {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn rows_to_matrix(path: &Path, rows: Vec<Vec<f32>>) -> Result<Array2<f32>, LoadError> {
    // An empty JSON array carries no dimension; the store is then empty with D = 0.
    let dimension = rows.first().map(Vec::len).unwrap_or(0);

    let mut flat = Vec::with_capacity(rows.len() * dimension);
    for (row_idx, row) in rows.iter().enumerate() {
        if row.len() != dimension {
            return Err(LoadError::RaggedVectors {
                row: row_idx,
                expected: dimension,
                found: row.len(),
            });
        }
        flat.extend_from_slice(row);
    }

    Array2::from_shape_vec((rows.len(), dimension), flat).map_err(|e| {
        LoadError::MalformedEmbeddings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })
}

fn load_metadata(path: &Path) -> Result<Vec<PlaceRecord>, LoadError> {
    let bytes = read_file("metadata", path)?;
    serde_json::from_slice(&bytes).map_err(|source| LoadError::MalformedMetadata {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use serde_json::json;

    use crate::vector_math::{l2_norm, NormalizeError};

    fn records(names: &[&str]) -> Vec<PlaceRecord> {
        names.iter().map(|n| PlaceRecord::new(*n)).collect()
    }

    fn write(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn from_parts_normalizes_every_vector() {
        let store =
            EmbeddingStore::from_parts(array![[3.0, 4.0], [0.0, 2.0]], records(&["a", "b"]))
                .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.dimension(), 2);
        for i in 0..store.len() {
            assert!((l2_norm(store.vector(i).unwrap()) - 1.0).abs() < 1e-5);
        }
        assert!((store.vector(0).unwrap()[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn from_parts_rejects_count_mismatch() {
        let err = EmbeddingStore::from_parts(array![[1.0, 0.0]], records(&["a", "b"]))
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::CountMismatch {
                vectors: 1,
                records: 2
            }
        ));
    }

    #[test]
    fn from_parts_rejects_zero_vector() {
        let err = EmbeddingStore::from_parts(array![[1.0, 0.0], [0.0, 0.0]], records(&["a", "b"]))
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidVector {
                row: 1,
                source: NormalizeError::ZeroNorm
            }
        ));
    }

    #[test]
    fn empty_store_is_valid() {
        let store = EmbeddingStore::from_parts(Array2::zeros((0, 4)), vec![]).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), 4);
        assert!(store.vector(0).is_none());
        assert!(store.record(0).is_none());
    }

    #[test]
    fn load_reads_npy_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write(
            &dir,
            "embeddings.npy",
            &npy::encode_f32(&[vec![1.0, 1.0], vec![0.0, 5.0]]),
        );
        let meta = write(
            &dir,
            "metadata.json",
            json!([
                {"name": "Cafe A", "rating": 4.5, "summary": "cozy", "reviews": ["lovely"]},
                {"name": "Cafe B", "address": "Road 12"}
            ])
            .to_string()
            .as_bytes(),
        );

        let store = EmbeddingStore::load(&emb, &meta).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.record(0).unwrap().name, "Cafe A");
        assert_eq!(store.record(1).unwrap().extra["address"], "Road 12");
        assert!((store.vector(1).unwrap()[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_json_store_loads() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write(&dir, "embeddings.json", b"[]");
        let meta = write(&dir, "metadata.json", b"[]");
        let store = EmbeddingStore::load(&emb, &meta).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn rejects_zero_dimension_rows() {
        let err =
            EmbeddingStore::from_parts(Array2::zeros((2, 0)), records(&["a", "b"])).unwrap_err();
        assert!(matches!(err, LoadError::ZeroDimension));
    }

    #[test]
    fn load_reads_json_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write(&dir, "embeddings.json", b"[[1, 0, 0], [0, 0, 2]]");
        let meta = write(&dir, "metadata.json", br#"[{"name": "x"}, {"name": "y"}]"#);
        let store = EmbeddingStore::load(&emb, &meta).unwrap();
        assert_eq!(store.dimension(), 3);
    }

    #[test]
    fn load_rejects_ragged_json_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write(&dir, "embeddings.json", b"[[1, 0, 0], [0, 2]]");
        let meta = write(&dir, "metadata.json", br#"[{"name": "x"}, {"name": "y"}]"#);
        let err = EmbeddingStore::load(&emb, &meta).unwrap_err();
        assert!(matches!(
            err,
            LoadError::RaggedVectors {
                row: 1,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn load_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let meta = write(&dir, "metadata.json", b"[]");
        let err = EmbeddingStore::load(&dir.path().join("nope.npy"), &meta).unwrap_err();
        assert!(matches!(err, LoadError::Missing { kind: "embeddings", .. }));
    }

    #[test]
    fn load_rejects_metadata_without_name() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write(&dir, "embeddings.npy", &npy::encode_f32(&[vec![1.0]]));
        let meta = write(&dir, "metadata.json", br#"[{"rating": 4}]"#);
        let err = EmbeddingStore::load(&emb, &meta).unwrap_err();
        assert!(matches!(err, LoadError::MalformedMetadata { .. }));
    }

    #[test]
    fn load_rejects_corrupt_npy() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write(&dir, "embeddings.npy", b"garbage");
        let meta = write(&dir, "metadata.json", b"[]");
        let err = EmbeddingStore::load(&emb, &meta).unwrap_err();
        assert!(matches!(err, LoadError::MalformedEmbeddings { .. }));
    }

    #[test]
    fn record_fallbacks() {
        let bare = PlaceRecord::new("Bare");
        assert_eq!(bare.rating_or_placeholder(), "?");
        assert_eq!(bare.summary_or_empty(), "");
        assert_eq!(bare.first_review_or_placeholder(), "No review");

        let mut empty_reviews = PlaceRecord::new("Empty");
        empty_reviews.reviews = Some(vec![]);
        assert_eq!(empty_reviews.first_review_or_placeholder(), "No review");
    }

    #[test]
    fn rating_keeps_source_form() {
        let parsed: Vec<PlaceRecord> = serde_json::from_value(json!([
            {"name": "int", "rating": 4},
            {"name": "float", "rating": 4.5},
            {"name": "null", "rating": null}
        ]))
        .unwrap();
        assert_eq!(parsed[0].rating_or_placeholder(), "4");
        assert_eq!(parsed[1].rating_or_placeholder(), "4.5");
        assert_eq!(parsed[2].rating_or_placeholder(), "?");
    }

    #[test]
    fn text_rating_loads_and_renders_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let emb = write(&dir, "embeddings.json", b"[[1.0, 0.0], [0.0, 1.0]]");
        let meta = write(
            &dir,
            "metadata.json",
            br#"[{"name": "A", "rating": "4.5"}, {"name": "B", "rating": "4.5 / 5"}]"#,
        );
        let store = EmbeddingStore::load(&emb, &meta).unwrap();

        let a = store.record(0).unwrap();
        assert_eq!(a.rating, Some(Rating::Text("4.5".to_string())));
        assert_eq!(a.rating_or_placeholder(), "4.5");
        assert_eq!(store.record(1).unwrap().rating_or_placeholder(), "4.5 / 5");
        assert_eq!(serde_json::to_value(a).unwrap(), json!({"name": "A", "rating": "4.5"}));
    }

    #[test]
    fn serialization_omits_absent_fields_and_keeps_extras() {
        let parsed: PlaceRecord =
            serde_json::from_value(json!({"name": "A", "lat": 17.4, "tags": ["quiet"]})).unwrap();
        let back = serde_json::to_value(&parsed).unwrap();
        assert_eq!(back, json!({"name": "A", "lat": 17.4, "tags": ["quiet"]}));
    }
}
