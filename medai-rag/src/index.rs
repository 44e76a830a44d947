//! Exact nearest-neighbour index over chunk embeddings.
//!
//! [`VectorIndex`] stores one embedding row per chunk, in chunk order, and
//! answers k-nearest queries by a flat scan under squared Euclidean
//! distance. It is built once offline, persisted as two co-located files,
//! and loaded read-only at query time:
//!
//! - `vectors.json` — embedding model id, dimension, row count and rows
//! - `chunks.json` — the ordered chunk texts, one per row
//!
//! Row `i` always dereferences chunk `i`; any disagreement between the two
//! files is reported as [`RagError::IntegrityError`] on load.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{Chunk, SearchHit};
use crate::error::{RagError, Result};

/// File name of the persisted embedding rows.
pub const VECTORS_FILE: &str = "vectors.json";

/// File name of the persisted chunk list.
pub const CHUNKS_FILE: &str = "chunks.json";

/// On-disk layout of [`VECTORS_FILE`].
#[derive(Serialize, Deserialize)]
struct PersistedVectors {
    model_id: String,
    dimension: usize,
    row_count: usize,
    rows: Vec<Vec<f32>>,
}

/// A flat L2 index paired with the chunk texts its rows point at.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    model_id: String,
    dimension: usize,
    /// Row-major embedding storage, `rows * dimension` values.
    data: Vec<f32>,
    chunks: Vec<String>,
}

impl VectorIndex {
    /// Build an index from embeddings and their chunk texts, in the same order.
    ///
    /// # Errors
    ///
    /// - [`RagError::DimensionMismatch`] if any embedding is not `dimension` long
    /// - [`RagError::IntegrityError`] if the two sequences differ in length,
    ///   `dimension` is zero, or an embedding holds a non-finite value
    pub fn build(
        model_id: impl Into<String>,
        dimension: usize,
        embeddings: Vec<Vec<f32>>,
        chunks: Vec<String>,
    ) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::IntegrityError("index dimension must be non-zero".into()));
        }
        if embeddings.len() != chunks.len() {
            return Err(RagError::IntegrityError(format!(
                "{} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut data = Vec::with_capacity(embeddings.len() * dimension);
        for (row, embedding) in embeddings.into_iter().enumerate() {
            if embedding.len() != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            if embedding.iter().any(|v| !v.is_finite()) {
                return Err(RagError::IntegrityError(format!(
                    "embedding row {row} contains a non-finite value"
                )));
            }
            data.extend(embedding);
        }

        Ok(Self { model_id: model_id.into(), dimension, data, chunks })
    }

    /// Identity of the embedding model the rows were produced with.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Length of every row.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of rows (and chunks).
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no rows.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The chunk stored at `row`.
    pub fn chunk(&self, row: usize) -> Option<Chunk> {
        self.chunks.get(row).map(|text| Chunk { index: row, text: text.clone() })
    }

    /// The embedding stored at `row`.
    pub fn embedding(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Return the `k` rows nearest to `query`.
    ///
    /// Hits are ordered by ascending squared Euclidean distance, ties by
    /// ascending row. When `k` exceeds the row count every row is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if `query` is not `dimension` long.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, embedding)| SearchHit { row, distance: squared_l2(query, embedding) })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.row.cmp(&b.row)));
        hits.truncate(k);

        debug!(rows = self.len(), k, returned = hits.len(), "index search");
        Ok(hits)
    }

    /// Write both index files into `dir`, creating it if needed.
    ///
    /// Each file is written to a temporary sibling and renamed into place.
    pub fn persist(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let vectors = PersistedVectors {
            model_id: self.model_id.clone(),
            dimension: self.dimension,
            row_count: self.len(),
            rows: self.data.chunks_exact(self.dimension).map(<[f32]>::to_vec).collect(),
        };

        write_atomically(&dir.join(VECTORS_FILE), &serde_json::to_vec(&vectors)?)?;
        write_atomically(&dir.join(CHUNKS_FILE), &serde_json::to_vec_pretty(&self.chunks)?)?;

        info!(dir = %dir.display(), rows = self.len(), model = %self.model_id, "persisted index");
        Ok(())
    }

    /// Load an index from `dir`, checking it against the runtime embedding model.
    ///
    /// # Errors
    ///
    /// - [`RagError::IntegrityError`] if either file is missing, the row count
    ///   header disagrees with the rows, a row has the wrong length, or the
    ///   chunk list length differs from the row count
    /// - [`RagError::ModelMismatch`] if the index was built with another model
    pub fn load(dir: impl AsRef<Path>, expected_model_id: &str) -> Result<Self> {
        let dir = dir.as_ref();
        let vectors: PersistedVectors = serde_json::from_slice(&read_artifact(dir, VECTORS_FILE)?)?;
        let chunks: Vec<String> = serde_json::from_slice(&read_artifact(dir, CHUNKS_FILE)?)?;

        if vectors.model_id != expected_model_id {
            return Err(RagError::ModelMismatch {
                stored: vectors.model_id,
                expected: expected_model_id.to_string(),
            });
        }
        if vectors.row_count != vectors.rows.len() {
            return Err(RagError::IntegrityError(format!(
                "{VECTORS_FILE} declares {} rows but contains {}",
                vectors.row_count,
                vectors.rows.len()
            )));
        }
        if chunks.len() != vectors.rows.len() {
            return Err(RagError::IntegrityError(format!(
                "{CHUNKS_FILE} holds {} chunks but the index has {} rows",
                chunks.len(),
                vectors.rows.len()
            )));
        }

        let index = Self::build(vectors.model_id, vectors.dimension, vectors.rows, chunks)
            .map_err(|e| match e {
                RagError::DimensionMismatch { expected, actual } => RagError::IntegrityError(
                    format!("stored row of length {actual} in a {expected}-dimensional index"),
                ),
                other => other,
            })?;

        info!(dir = %dir.display(), rows = index.len(), model = %index.model_id, "loaded index");
        Ok(index)
    }
}

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn read_artifact(dir: &Path, name: &str) -> Result<Vec<u8>> {
    let path = dir.join(name);
    fs::read(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            RagError::IntegrityError(format!("missing index artifact {}", path.display()))
        }
        _ => RagError::Io(e),
    })
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VectorIndex {
        VectorIndex::build(
            "mini",
            2,
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 2.0]],
            vec!["origin".into(), "east".into(), "north".into()],
        )
        .unwrap()
    }

    #[test]
    fn identical_query_is_distance_zero_and_ranked_first() {
        let index = sample();
        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits[0], SearchHit { row: 1, distance: 0.0 });
        assert_eq!(hits[1], SearchHit { row: 0, distance: 1.0 });
        assert_eq!(hits[2], SearchHit { row: 2, distance: 5.0 });
    }

    #[test]
    fn ties_break_by_row() {
        let index = VectorIndex::build(
            "mini",
            1,
            vec![vec![2.0], vec![0.0], vec![2.0]],
            vec!["a".into(), "b".into(), "c".into()],
        )
        .unwrap();
        let rows: Vec<usize> = index.search(&[1.0], 3).unwrap().iter().map(|h| h.row).collect();
        assert_eq!(rows, [0, 1, 2]);
    }

    #[test]
    fn k_larger_than_index_returns_every_row() {
        assert_eq!(sample().search(&[0.0, 0.0], 10).unwrap().len(), 3);
    }

    #[test]
    fn build_enforces_dimension_and_parallel_lengths() {
        let err = VectorIndex::build("m", 2, vec![vec![1.0]], vec!["a".into()]).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 1 }));

        let err = VectorIndex::build("m", 1, vec![vec![1.0]], vec![]).unwrap_err();
        assert!(matches!(err, RagError::IntegrityError(_)));
    }

    #[test]
    fn search_rejects_wrong_query_dimension() {
        assert!(matches!(
            sample().search(&[1.0], 1),
            Err(RagError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn chunk_and_embedding_lookup_by_row() {
        let index = sample();
        assert_eq!(index.chunk(2), Some(Chunk { index: 2, text: "north".into() }));
        assert_eq!(index.embedding(1), Some(&[1.0, 0.0][..]));
        assert_eq!(index.chunk(3), None);
        assert_eq!(index.embedding(3), None);
    }

    #[test]
    fn load_rejects_missing_chunk_list() {
        let dir = tempfile::tempdir().unwrap();
        sample().persist(dir.path()).unwrap();
        fs::remove_file(dir.path().join(CHUNKS_FILE)).unwrap();

        let err = VectorIndex::load(dir.path(), "mini").unwrap_err();
        assert!(matches!(err, RagError::IntegrityError(_)), "got {err}");
    }

    #[test]
    fn load_rejects_mismatched_chunk_list() {
        let dir = tempfile::tempdir().unwrap();
        sample().persist(dir.path()).unwrap();
        fs::write(dir.path().join(CHUNKS_FILE), r#"["only one"]"#).unwrap();

        let err = VectorIndex::load(dir.path(), "mini").unwrap_err();
        assert!(matches!(err, RagError::IntegrityError(_)), "got {err}");
    }

    #[test]
    fn load_rejects_other_embedding_model() {
        let dir = tempfile::tempdir().unwrap();
        sample().persist(dir.path()).unwrap();

        let err = VectorIndex::load(dir.path(), "other-model").unwrap_err();
        assert!(matches!(err, RagError::ModelMismatch { .. }), "got {err}");
    }

    #[test]
    fn persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample();
        index.persist(dir.path()).unwrap();
        assert_eq!(VectorIndex::load(dir.path(), "mini").unwrap(), index);
        assert!(!dir.path().join("vectors.json.tmp").exists());
    }
}
