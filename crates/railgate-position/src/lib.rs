//! Position ledger and exit state machine (§4.3-4.4).
//!
//! A single [`Position`] is tracked at a time; the driver loop feeds it
//! fresh marks via [`position::Position::observe_mark`] and asks
//! [`exit::evaluate`] each tick whether any exit condition fires. Closed
//! fills are appended to a [`stats::Stats`] ledger that derives win/loss
//! counters and the trailing 7-day APR.

pub mod error;
pub mod exit;
pub mod position;
pub mod stats;

pub use error::{PositionError, PositionResult, Result};
pub use exit::{update_streaks, evaluate, trail_tp2, ExitConfig, ExitSignal};
pub use position::{AdaptiveStreaks, DepthExitState, EntryContext, Position};
pub use stats::{Stats, TradeRecord};
