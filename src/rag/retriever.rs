//! Retriever: encode -> normalize -> search -> map back to metadata.
//!
//! No distance threshold is applied. The `k` nearest places are always
//! returned, however poor the match.

use std::sync::Arc;

use ndarray::{Array1, ArrayView1};
use serde::Serialize;
use thiserror::Error;

use super::index::{SearchResult, VectorIndex};
use super::store::{EmbeddingStore, PlaceRecord};
use crate::core::errors::{EncodingError, SearchError};
use crate::llm::QueryEncoder;
use crate::vector_math;

/// A metadata record together with where and how close it matched.
#[derive(Debug, Clone, Serialize)]
pub struct RankedPlace {
    pub position: usize,
    pub distance: f32,
    pub record: PlaceRecord,
}

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Steps of one retrieval, reported to the caller's observer as each begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStep {
    Encoding,
    Searching,
    Mapping,
}

#[derive(Clone)]
pub struct Retriever {
    store: Arc<EmbeddingStore>,
    index: Arc<dyn VectorIndex>,
    encoder: Arc<dyn QueryEncoder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        store: Arc<EmbeddingStore>,
        index: Arc<dyn VectorIndex>,
        encoder: Arc<dyn QueryEncoder>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            index,
            encoder,
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Places matching `query`, best first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<PlaceRecord>, RetrieveError> {
        Ok(self
            .retrieve_ranked(query)
            .await?
            .into_iter()
            .map(|ranked| ranked.record)
            .collect())
    }

    pub async fn retrieve_ranked(&self, query: &str) -> Result<Vec<RankedPlace>, RetrieveError> {
        self.retrieve_observed(query, |_| {}).await
    }

    /// Runs the full retrieval, calling `on_step` as each step starts.
    ///
    /// An empty store returns no places and reports no steps; the encoder is
    /// never called.
    pub async fn retrieve_observed<F>(
        &self,
        query: &str,
        mut on_step: F,
    ) -> Result<Vec<RankedPlace>, RetrieveError>
    where
        F: FnMut(RetrievalStep) + Send,
    {
        if self.store.is_empty() {
            tracing::debug!("store is empty, skipping retrieval");
            return Ok(Vec::new());
        }

        on_step(RetrievalStep::Encoding);
        let vector = self.encode(query).await?;

        on_step(RetrievalStep::Searching);
        let hits = self.search(vector.view())?;

        on_step(RetrievalStep::Mapping);
        Ok(self.map(&hits)?)
    }

    /// Encodes and normalizes `query` with the same rule used for stored vectors.
    async fn encode(&self, query: &str) -> Result<Array1<f32>, EncodingError> {
        let raw = self.encoder.encode(query).await?;
        vector_math::normalize(ArrayView1::from(raw.as_slice()))
            .map_err(EncodingError::InvalidVector)
    }

    fn search(&self, query: ArrayView1<'_, f32>) -> Result<Vec<SearchResult>, SearchError> {
        self.index.search(query, self.top_k)
    }

    /// Looks up each hit in the store, preserving search order.
    fn map(&self, hits: &[SearchResult]) -> Result<Vec<RankedPlace>, SearchError> {
        hits.iter()
            .map(|hit| {
                let record =
                    self.store
                        .record(hit.position)
                        .ok_or(SearchError::PositionOutOfRange {
                            position: hit.position,
                            size: self.store.len(),
                        })?;
                Ok(RankedPlace {
                    position: hit.position,
                    distance: hit.distance,
                    record: record.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::core::errors::EncodingError;
    use crate::llm::QueryEncoder;

    /// Deterministic encoder: fixed vectors per query, a default otherwise.
    pub struct StubEncoder {
        pub vectors: HashMap<String, Vec<f32>>,
        pub fallback: Vec<f32>,
        pub calls: AtomicUsize,
    }

    impl StubEncoder {
        pub fn constant(vector: Vec<f32>) -> Self {
            Self {
                vectors: HashMap::new(),
                fallback: vector,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with(mut self, query: &str, vector: Vec<f32>) -> Self {
            self.vectors.insert(query.to_string(), vector);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QueryEncoder for StubEncoder {
        fn model(&self) -> &str {
            "stub"
        }

        async fn encode(&self, text: &str) -> Result<Vec<f32>, EncodingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone()))
        }
    }

    pub struct FailingEncoder;

    #[async_trait]
    impl QueryEncoder for FailingEncoder {
        fn model(&self) -> &str {
            "failing"
        }

        async fn encode(&self, _text: &str) -> Result<Vec<f32>, EncodingError> {
            Err(EncodingError::Api {
                status: 503,
                body: "model not loaded".to_string(),
            })
        }
    }
}
