//! Deterministic `MarketTickSource` implementations (§1 Non-goals: no
//! real transport lives here, only the test/demo doubles the rest of
//! the workspace is exercised against).

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use rust_decimal::Decimal;

use railgate_core::{LadderLevel, MarketTick, Price, TradeFlowBucket, TradeFlowWindow};

use crate::error::{FeedError, Result};
use crate::transport::MarketTickSource;

/// Replays a fixed, pre-built sequence of ticks. `cadence_ms == 0`
/// yields every tick immediately (unit tests); a positive cadence
/// sleeps between ticks so a driven loop sees realistic timing.
pub struct ReplayFeed {
    ticks: VecDeque<MarketTick>,
    cadence_ms: u64,
}

impl ReplayFeed {
    #[must_use]
    pub fn new(ticks: Vec<MarketTick>) -> Self {
        Self {
            ticks: ticks.into(),
            cadence_ms: 0,
        }
    }

    #[must_use]
    pub fn with_cadence(ticks: Vec<MarketTick>, cadence_ms: u64) -> Self {
        Self {
            ticks: ticks.into(),
            cadence_ms,
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.ticks.len()
    }
}

impl MarketTickSource for ReplayFeed {
    async fn next_tick(&mut self) -> Result<MarketTick> {
        if self.cadence_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.cadence_ms)).await;
        }
        self.ticks.pop_front().ok_or(FeedError::Exhausted)
    }
}

/// A small, seeded xorshift64 generator. Not cryptographic — it exists
/// purely so a synthetic tick sequence is reproducible across runs from
/// the same seed, which matters for replaying a recorded scenario in a
/// test without a fixture file.
struct Xorshift64(u64);

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform-ish value in `[-1, 1]` as a `Decimal`, at 4 decimal
    /// places of resolution — plenty for a synthetic price walk.
    fn signed_unit(&mut self) -> Decimal {
        let raw = (self.next_u64() % 20_001) as i64 - 10_000;
        Decimal::new(raw, 4)
    }
}

/// Parameters for a synthetic, mean-reverting tick walk: useful for
/// driver-level integration tests that need many ticks without shipping
/// a recorded fixture.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticWalkConfig {
    pub seed: u64,
    pub start_mid: Price,
    pub tick_count: usize,
    pub step_usd: Decimal,
    pub spread_bps: Decimal,
    pub start_timestamp_ms: i64,
    pub tick_interval_ms: i64,
}

impl Default for SyntheticWalkConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_mid: Price::new(Decimal::from(100_000)),
            tick_count: 100,
            step_usd: Decimal::new(500, 2), // 5.00
            spread_bps: Decimal::new(5, 1), // 0.5 bps
            start_timestamp_ms: 0,
            tick_interval_ms: 250,
        }
    }
}

/// Builds a deterministic sequence of valid `MarketTick`s from
/// [`SyntheticWalkConfig`], each carrying a flat ladder and empty
/// trade-flow buckets for the three windows the core contract names.
#[must_use]
pub fn build_synthetic_walk(config: SyntheticWalkConfig) -> Vec<MarketTick> {
    let mut rng = Xorshift64::new(config.seed);
    let mut mid = config.start_mid.inner();
    let mut ticks = Vec::with_capacity(config.tick_count);

    for i in 0..config.tick_count {
        let drift = rng.signed_unit() * config.step_usd;
        mid += drift;
        if mid <= Decimal::ZERO {
            mid = config.step_usd;
        }

        let half_spread = mid * config.spread_bps / Decimal::from(10_000) / Decimal::TWO;
        let best_bid = Price::new(mid - half_spread);
        let best_ask = Price::new(mid + half_spread);

        let bid_ladder = vec![LadderLevel::new(
            Price::new(best_bid.inner() - config.step_usd),
            railgate_core::Size::new(Decimal::ONE),
        )];
        let ask_ladder = vec![LadderLevel::new(
            Price::new(best_ask.inner() + config.step_usd),
            railgate_core::Size::new(Decimal::ONE),
        )];

        let mut trade_flow = HashMap::new();
        for window in [
            TradeFlowWindow::Ms5000,
            TradeFlowWindow::Ms30000,
            TradeFlowWindow::Ms60000,
        ] {
            trade_flow.insert(
                window,
                TradeFlowBucket::from_volumes(
                    10,
                    Decimal::from(5_000),
                    Decimal::from(5_000),
                    Decimal::ZERO,
                    0,
                    Decimal::ONE,
                ),
            );
        }

        let velocity_bps = drift.bps_from_zero_safe(mid);
        let tick = MarketTick::try_normalize(
            Price::new(mid),
            best_bid,
            best_ask,
            bid_ladder,
            ask_ladder,
            velocity_bps,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::from(1_000_000),
            trade_flow,
            config.start_timestamp_ms + (i as i64) * config.tick_interval_ms,
            i as u64,
        )
        .expect("synthetic walk always produces a strictly positive, uncrossed tick");
        ticks.push(tick);
    }

    ticks
}

trait SafeBps {
    fn bps_from_zero_safe(self, base: Decimal) -> Decimal;
}

impl SafeBps for Decimal {
    fn bps_from_zero_safe(self, base: Decimal) -> Decimal {
        if base.is_zero() {
            Decimal::ZERO
        } else {
            self / base * Decimal::from(10_000)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replay_feed_yields_ticks_in_order_then_exhausts() {
        let walk = build_synthetic_walk(SyntheticWalkConfig {
            tick_count: 3,
            ..Default::default()
        });
        let first_ts = walk[0].timestamp_ms;
        let mut feed = ReplayFeed::new(walk);
        let t0 = feed.next_tick().await.unwrap();
        assert_eq!(t0.timestamp_ms, first_ts);
        feed.next_tick().await.unwrap();
        feed.next_tick().await.unwrap();
        assert!(matches!(feed.next_tick().await, Err(FeedError::Exhausted)));
    }

    #[test]
    fn synthetic_walk_is_deterministic_for_a_given_seed() {
        let a = build_synthetic_walk(SyntheticWalkConfig {
            seed: 7,
            tick_count: 20,
            ..Default::default()
        });
        let b = build_synthetic_walk(SyntheticWalkConfig {
            seed: 7,
            tick_count: 20,
            ..Default::default()
        });
        assert_eq!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn cadence_holds_next_tick_until_the_interval_elapses() {
        let walk = build_synthetic_walk(SyntheticWalkConfig {
            tick_count: 1,
            ..Default::default()
        });
        let mut feed = ReplayFeed::with_cadence(walk, 1_000);
        let mut task = tokio_test::task::spawn(feed.next_tick());
        tokio_test::assert_pending!(task.poll());
        tokio::time::advance(Duration::from_millis(1_000)).await;
        tokio_test::assert_ready!(task.poll()).unwrap();
    }

    #[test]
    fn synthetic_walk_mid_stays_strictly_positive() {
        let walk = build_synthetic_walk(SyntheticWalkConfig {
            seed: 1,
            tick_count: 500,
            step_usd: Decimal::new(50000, 2),
            start_mid: Price::new(Decimal::from(100)),
            ..Default::default()
        });
        assert!(walk.iter().all(|t| t.mid.is_positive()));
    }
}
