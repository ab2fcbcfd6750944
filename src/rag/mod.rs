//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `EmbeddingStore`: aligned place vectors and metadata, loaded once
//! - `FlatIndex`: exact nearest-neighbour search over the normalized vectors
//! - `Retriever`: query text to ranked places
//! - `PromptBuilder`: ranked places to a generation prompt

pub mod index;
mod npy;
pub mod prompt;
pub mod retriever;
pub mod store;

pub use index::{FlatIndex, SearchResult, VectorIndex};
pub use prompt::PromptBuilder;
pub use retriever::{RankedPlace, RetrievalStep, RetrieveError, Retriever};
pub use store::{EmbeddingStore, PlaceRecord, Rating};
