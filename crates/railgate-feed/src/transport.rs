//! The `MarketTick` transport boundary (§1 Non-goals, §5 suspension
//! points).
//!
//! Real exchange websocket plumbing is explicitly out of scope for this
//! workspace — only the contract a transport must satisfy lives here.
//! `next_tick` is the one feed-side suspension point the driver loop is
//! allowed to await on; everything downstream of it (structure build,
//! decision, position update) is synchronous.

use railgate_core::MarketTick;

use crate::error::Result;

/// Anything that can hand the driver loop a stream of normalized
/// `MarketTick`s, one at a time. A real implementation would wrap a
/// websocket client and a bar aggregator; this workspace ships only
/// [`crate::replay::ReplayFeed`], a deterministic test/demo double.
pub trait MarketTickSource: Send {
    /// Awaits and returns the next tick. Returns `Err(FeedError::Exhausted)`
    /// once the source has nothing further to deliver (a replay feed
    /// reaching the end of its fixture, for instance) — the driver loop
    /// treats this as a clean shutdown signal, not a crash.
    fn next_tick(&mut self) -> impl std::future::Future<Output = Result<MarketTick>> + Send;
}
