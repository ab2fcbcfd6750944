use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults::*;
use super::paths::AppPaths;

/// Typed, validated startup configuration. Built once; never reloaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub request: RequestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub embeddings_path: String,
    pub metadata_path: String,
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub timeout_secs: u64,
    pub max_query_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_allowed_origins: default_cors_origins(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embeddings_path: DEFAULT_EMBEDDINGS_PATH.to_string(),
            metadata_path: DEFAULT_METADATA_PATH.to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_GENERATION_MODEL.to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
        }
    }
}

impl AppConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn embeddings_path(&self, paths: &AppPaths) -> PathBuf {
        paths.resolve(&self.retrieval.embeddings_path)
    }

    pub fn metadata_path(&self, paths: &AppPaths) -> PathBuf {
        paths.resolve(&self.retrieval.metadata_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request.timeout_secs)
    }

    /// Generation API key; validation guarantees it is present.
    pub fn api_key(&self) -> &str {
        self.generation.api_key.as_deref().unwrap_or_default()
    }
}
