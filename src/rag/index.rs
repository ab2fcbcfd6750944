//! Nearest-neighbour search over the store's normalized vectors.

use std::cmp::Ordering;
use std::sync::Arc;

use ndarray::{Array2, ArrayView1, Axis};
use serde::Serialize;

use super::store::EmbeddingStore;
use crate::core::errors::SearchError;
use crate::vector_math::squared_euclidean;

/// A single hit: the store position and its Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchResult {
    pub position: usize,
    pub distance: f32,
}

/// Read-only search structure shared by all requests.
///
/// Implementations must return at most `k` results ordered by non-decreasing
/// distance, and exactly `min(k, len)` when the query is valid.
pub trait VectorIndex: Send + Sync {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn search(&self, query: ArrayView1<'_, f32>, k: usize)
        -> Result<Vec<SearchResult>, SearchError>;
}

/// Exact brute-force L2 search.
pub struct FlatIndex {
    vectors: Arc<Array2<f32>>,
}

impl FlatIndex {
    pub fn build(store: &EmbeddingStore) -> Self {
        Self {
            vectors: store.shared_vectors(),
        }
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    fn len(&self) -> usize {
        self.vectors.nrows()
    }

    fn search(
        &self,
        query: ArrayView1<'_, f32>,
        k: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension() {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension(),
                found: query.len(),
            });
        }

        let mut hits: Vec<SearchResult> = self
            .vectors
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(position, row)| SearchResult {
                position,
                distance: squared_euclidean(row, query),
            })
            .collect();

        let k = k.min(hits.len());
        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, compare_hits);
            hits.truncate(k);
        }
        hits.sort_by(compare_hits);

        for hit in &mut hits {
            hit.distance = hit.distance.sqrt();
        }
        Ok(hits)
    }
}

// Ties break on position so equal-distance results come back in store order.
fn compare_hits(left: &SearchResult, right: &SearchResult) -> Ordering {
    left.distance
        .total_cmp(&right.distance)
        .then(left.position.cmp(&right.position))
}
