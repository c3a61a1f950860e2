//! Rolling 1h high/low tracker feeding `railgate_structure::build_rails`
//! (§4.1: rails are derived from "the active higher-timeframe range").
//! `MarketTick` itself carries no bar data, only the latest mid — this
//! is the accumulator that turns a stream of mids into the `BarRange`
//! the structure snapshot builder needs, the same rolling-window-plus-
//! eviction shape the performance guard's KPI window uses.

use std::collections::VecDeque;

use rust_decimal::Decimal;

use railgate_core::Price;
use railgate_structure::BarRange;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar1hTrackerConfig {
    /// Width of the rolling window, in milliseconds.
    pub window_ms: i64,
    /// How much history must have accumulated before the bar counts as
    /// ready. Usually equal to `window_ms`; kept separate so a shorter
    /// warmup can be configured for a fast-cadence replay/demo feed.
    pub min_ready_ms: i64,
}

impl Default for Bar1hTrackerConfig {
    fn default() -> Self {
        Self {
            window_ms: 60 * 60_000,
            min_ready_ms: 60 * 60_000,
        }
    }
}

/// Tracks the high/low of observed mids over a trailing window.
#[derive(Debug, Clone)]
pub struct Bar1hTracker {
    config: Bar1hTrackerConfig,
    samples: VecDeque<(i64, Decimal)>,
}

impl Bar1hTracker {
    #[must_use]
    pub fn new(config: Bar1hTrackerConfig) -> Self {
        Self {
            config,
            samples: VecDeque::new(),
        }
    }

    fn evict(&mut self, now_ms: i64) {
        let cutoff = now_ms - self.config.window_ms;
        while let Some((ts, _)) = self.samples.front() {
            if *ts < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records `mid` at `timestamp_ms` and returns the resulting bar
    /// range. Samples are expected to arrive in non-decreasing
    /// timestamp order, matching the driver loop's tick ordering (§5).
    pub fn observe(&mut self, timestamp_ms: i64, mid: Price) -> BarRange {
        self.samples.push_back((timestamp_ms, mid.inner()));
        self.evict(timestamp_ms);

        let high = self
            .samples
            .iter()
            .map(|(_, px)| *px)
            .fold(Decimal::MIN, Decimal::max);
        let low = self
            .samples
            .iter()
            .map(|(_, px)| *px)
            .fold(Decimal::MAX, Decimal::min);

        let span_ms = timestamp_ms - self.samples.front().map_or(timestamp_ms, |(ts, _)| *ts);
        let ready = span_ms >= self.config.min_ready_ms;

        BarRange {
            high: Price::new(high),
            low: Price::new(low),
            ready,
        }
    }
}
