//! Error types for the structure snapshot builder.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StructureError {
    #[error("no local channel available: {0}")]
    NoLocalChannel(String),

    #[error("invalid rail input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, StructureError>;
