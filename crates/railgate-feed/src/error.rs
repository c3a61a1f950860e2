//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed exhausted: no further ticks")]
    Exhausted,

    #[error("invalid tick: {0}")]
    InvalidTick(#[from] railgate_core::CoreError),

    #[error("no fresh tick within staleness window ({0}ms elapsed)")]
    Stale(i64),
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;
pub type Result<T> = FeedResult<T>;
