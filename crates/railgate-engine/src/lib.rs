//! The per-tick engine fold (§5): composes the structure, decision,
//! position, and guard crates into a single `EngineState` and the pure
//! `update_engine` function that advances it one tick at a time.
//!
//! This crate deliberately has no `tokio` dependency. `update_engine`
//! never awaits; every suspension point the spec permits (the feed's
//! `next_tick`, trade-log append, notification dispatch) lives in the
//! driver binary that calls this crate, not in it.

pub mod bar_tracker;
pub mod effects;
pub mod error;
pub mod state;
pub mod structure;
pub mod update;

pub use bar_tracker::{Bar1hTracker, Bar1hTrackerConfig};
pub use effects::{EffectsQueue, EngineEffect, NotificationEvent, NotificationLevel};
pub use error::{EngineError, Result};
pub use state::EngineState;
pub use structure::{ensure_structure, regime_side};
pub use update::update_engine;
