//! B2 decision engine: turns a market tick plus structure snapshot into
//! an entry `Decision` (side, sizing, TP plan) or a `none` decision
//! carrying its blocking reason.

pub mod config;
pub mod decision;
pub mod error;
pub mod fee;
pub mod signal;

pub use config::DecisionConfig;
pub use decision::{decide_trade_b2, GateResult, SizingInputs};
pub use error::{DecisionError, Result};
pub use fee::{ExecutionMode, FeeSchedule};
pub use signal::{
    Decision, Diagnostics, EntryProfile, Firepower, MarketState, SizeFactors, TpLadder, TpPhase,
    TpSource,
};
