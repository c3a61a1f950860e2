//! Engine error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("structure build failed: {0}")]
    Structure(#[from] railgate_structure::StructureError),

    #[error("config rejected: {0}")]
    Config(#[from] railgate_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
