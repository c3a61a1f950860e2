//! Driver binary for the perpetual-futures trading engine.
//!
//! Wires a `MarketTickSource` into `railgate_engine::update_engine`'s
//! per-tick fold and executes the `EngineEffect`s it returns: every
//! suspension point the spec permits outside the feed wait itself
//! (trade-log append, notification dispatch) lives here, not in the
//! pure engine crate.

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::RuntimeConfig;
pub use error::{AppError, AppResult};
