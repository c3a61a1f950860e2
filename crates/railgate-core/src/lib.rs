//! Core domain types shared across the structure, decision, position,
//! guard, and engine crates.
//!
//! - `Price`, `Size`: exact-decimal numeric newtypes.
//! - `MarketTick`: the single normalized market-observation contract.
//! - `Side`: position/decision direction.

pub mod decimal;
pub mod error;
pub mod market_tick;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use market_tick::{
    LadderLevel, MarketTick, Side, TradeFlowBucket, TradeFlowWindow,
};
