use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::provider::Generator;
use super::types::{GenerateContentRequest, GenerateContentResponse};
use crate::core::errors::GenerationError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>, model: impl Into<String>) -> Self {
        Self::with_client(api_key, base_url, model, Client::new())
    }

    pub fn with_client(
        api_key: impl Into<String>,
        base_url: Option<&str>,
        model: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or(DEFAULT_GEMINI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.into(),
        }
    }

    /// `models/gemini-2.5-flash` and `gemini-2.5-flash` resolve to the same URL.
    pub fn endpoint(&self) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateContentRequest::user_prompt(prompt);

        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::Network)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(classify_failure(status, text));
        }

        let bytes = res.bytes().await.map_err(GenerationError::Network)?;
        parse_answer(&bytes)
    }
}

fn classify_failure(status: StatusCode, body: String) -> GenerationError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::Authentication {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => GenerationError::Quota { body },
        // Gemini reports a bad key as 400 INVALID_ARGUMENT
        StatusCode::BAD_REQUEST if body.contains("API_KEY_INVALID") => {
            GenerationError::Authentication {
                status: status.as_u16(),
            }
        }
        _ => GenerationError::Api {
            status: status.as_u16(),
            body,
        },
    }
}

fn parse_answer(bytes: &[u8]) -> Result<String, GenerationError> {
    let payload: GenerateContentResponse = serde_json::from_slice(bytes)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    if let Some(text) = payload.answer_text() {
        return Ok(text);
    }

    let reason = payload
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
        .map(|reason| format!("prompt blocked: {}", reason))
        .or_else(|| {
            payload
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .map(|reason| format!("no text, finish reason {}", reason))
        })
        .unwrap_or_else(|| "response contained no text".to_string());
    Err(GenerationError::MalformedResponse(reason))
}
