//! The `MarketTick` transport boundary (§1 Non-goals, §5).
//!
//! This crate owns exactly one contract: something that can hand the
//! driver loop a `MarketTick` per evaluation. Real exchange websocket
//! plumbing is out of scope; [`replay::ReplayFeed`] is the deterministic
//! double the rest of the workspace tests and demos against.

pub mod error;
pub mod replay;
pub mod transport;

pub use error::{FeedError, FeedResult, Result};
pub use replay::{build_synthetic_walk, ReplayFeed, SyntheticWalkConfig};
pub use transport::MarketTickSource;
