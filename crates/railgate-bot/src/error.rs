//! Driver-loop error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("runtime config error: {0}")]
    Runtime(String),

    #[error("trade config error: {0}")]
    Config(#[from] railgate_config::ConfigError),

    #[error("feed error: {0}")]
    Feed(#[from] railgate_feed::FeedError),

    #[error("persistence error: {0}")]
    Persistence(#[from] railgate_persistence::PersistenceError),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] railgate_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
