use thiserror::Error;

use crate::core::errors::{ConfigError, LoadError};

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load embedding store: {0}")]
    Store(#[from] LoadError),
}
