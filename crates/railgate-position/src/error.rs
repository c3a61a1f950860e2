//! Position and ledger error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("no position is open")]
    NoOpenPosition,

    #[error("a position is already open: {0}")]
    AlreadyOpen(String),

    #[error("invalid position state: {0}")]
    InvalidState(String),
}

pub type PositionResult<T> = Result<T, PositionError>;
pub type Result<T> = std::result::Result<T, PositionError>;
