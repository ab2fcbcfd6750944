use async_trait::async_trait;
use reqwest::Client;

use super::provider::QueryEncoder;
use super::types::{EmbeddingRequest, EmbeddingResponse};
use crate::core::errors::EncodingError;

/// Query encoder backed by an OpenAI-compatible `/v1/embeddings` endpoint
/// (LM Studio, llama.cpp server, Ollama, text-embeddings-inference...).
#[derive(Clone)]
pub struct OpenAiEmbeddingEncoder {
    endpoint: String,
    model: String,
    client: Client,
}

impl OpenAiEmbeddingEncoder {
    pub fn new(base_url: &str, model: impl Into<String>) -> Self {
        Self::with_client(base_url, model, Client::new())
    }

    pub fn with_client(base_url: &str, model: impl Into<String>, client: Client) -> Self {
        let base = base_url.trim_end_matches('/');
        let endpoint = if base.ends_with("/v1") {
            format!("{}/embeddings", base)
        } else {
            format!("{}/v1/embeddings", base)
        };
        Self {
            endpoint,
            model: model.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QueryEncoder for OpenAiEmbeddingEncoder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EncodingError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: vec![text],
        };

        let res = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(EncodingError::Request)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(EncodingError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let bytes = res.bytes().await.map_err(EncodingError::Request)?;
        parse_single_embedding(&bytes)
    }
}

fn parse_single_embedding(bytes: &[u8]) -> Result<Vec<f32>, EncodingError> {
    let payload: EmbeddingResponse = serde_json::from_slice(bytes)
        .map_err(|e| EncodingError::MalformedResponse(e.to_string()))?;

    let mut data = payload.data;
    if data.len() != 1 {
        return Err(EncodingError::UnexpectedCount(data.len()));
    }
    let item = data.remove(0);
    if item.index.is_some_and(|index| index != 0) {
        return Err(EncodingError::MalformedResponse(format!(
            "unexpected embedding index {:?}",
            item.index
        )));
    }
    Ok(item.embedding)
}
