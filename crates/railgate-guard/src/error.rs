//! Guard layer error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("guard blocked: {gate} - {reason}")]
    Blocked { gate: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GuardError>;
