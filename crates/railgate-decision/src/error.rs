//! Decision engine error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

pub type Result<T> = std::result::Result<T, DecisionError>;
