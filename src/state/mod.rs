use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{AppConfig, AppPaths};
use crate::llm::{GeminiGenerator, Generator, OpenAiEmbeddingEncoder, QueryEncoder};
use crate::rag::{EmbeddingStore, FlatIndex, Retriever, VectorIndex};
use crate::recommend::Recommender;

pub mod error;

use error::InitializationError;

/// Shared, read-only state behind every route.
///
/// Everything here is built once at startup; request handlers only read it,
/// so concurrent requests never contend on a lock.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<EmbeddingStore>,
    pub recommender: Arc<Recommender>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Loads the embedding store, builds the index, and wires the external
    /// encoder and generator clients from configuration.
    pub async fn initialize(
        paths: &AppPaths,
        config: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let embeddings_path = config.embeddings_path(paths);
        let metadata_path = config.metadata_path(paths);
        let store = EmbeddingStore::load(&embeddings_path, &metadata_path)?;

        let encoder: Arc<dyn QueryEncoder> = Arc::new(OpenAiEmbeddingEncoder::new(
            &config.embedding.base_url,
            config.embedding.model.clone(),
        ));
        let generator: Arc<dyn Generator> = Arc::new(GeminiGenerator::new(
            config.api_key(),
            config.generation.base_url.as_deref(),
            config.generation.model.clone(),
        ));

        tracing::info!(
            places = store.len(),
            dimension = store.dimension(),
            encoder = encoder.model(),
            generator = generator.model(),
            "application state initialized"
        );

        Ok(Self::from_parts(config, store, encoder, generator))
    }

    /// Assembles state from already-built parts.
    pub fn from_parts(
        config: AppConfig,
        store: EmbeddingStore,
        encoder: Arc<dyn QueryEncoder>,
        generator: Arc<dyn Generator>,
    ) -> Arc<Self> {
        let store = Arc::new(store);
        let index: Arc<dyn VectorIndex> = Arc::new(FlatIndex::build(&store));
        let retriever = Retriever::new(store.clone(), index, encoder, config.retrieval.top_k);
        let recommender = Recommender::new(retriever, generator, config.request_timeout());

        Arc::new(AppState {
            config: Arc::new(config),
            store,
            recommender: Arc::new(recommender),
            started_at: Utc::now(),
        })
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }
}
