use async_trait::async_trait;

use crate::core::errors::{EncodingError, GenerationError};

#[async_trait]
pub trait QueryEncoder: Send + Sync {
    /// model identifier, used for logging
    fn model(&self) -> &str;

    /// encode query text into exactly one raw (unnormalized) vector
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EncodingError>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// model identifier, used for logging
    fn model(&self) -> &str;

    /// single attempt, no retry
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
