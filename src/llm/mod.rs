//! External model collaborators: the query encoder and the answer generator.

pub mod embeddings;
pub mod gemini;
pub mod provider;
pub mod types;

pub use embeddings::OpenAiEmbeddingEncoder;
pub use gemini::GeminiGenerator;
pub use provider::{Generator, QueryEncoder};
