//! The `MarketTick` contract: the single normalized shape a transport
//! must produce for the structure/decision/position engines to consume.
//!
//! Everything upstream of `MarketTick::try_normalize` (raw exchange
//! websocket frames, REST snapshots, replay files) is out of scope here —
//! only the post-normalization contract is specified.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Price, Size};
use crate::error::{CoreError, Result};

/// Side of a position or a directional decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// One level of a normalized order-book ladder: price, size, and the
/// USD notional at that level. Ladders are ordered monotonically outward
/// from the mid price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LadderLevel {
    pub price: Price,
    pub size: Size,
    pub notional_usd: Decimal,
}

impl LadderLevel {
    #[must_use]
    pub fn new(price: Price, size: Size) -> Self {
        let notional_usd = size.notional(price);
        Self {
            price,
            size,
            notional_usd,
        }
    }
}

/// Trade-flow aggregation window lengths, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeFlowWindow {
    Ms5000,
    Ms30000,
    Ms60000,
}

impl TradeFlowWindow {
    #[must_use]
    pub fn millis(self) -> u64 {
        match self {
            Self::Ms5000 => 5_000,
            Self::Ms30000 => 30_000,
            Self::Ms60000 => 60_000,
        }
    }
}

/// Aggregate trade-tape statistics over one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeFlowBucket {
    pub trade_count: u64,
    pub buy_usd: Decimal,
    pub sell_usd: Decimal,
    /// (buy_usd - sell_usd) / (buy_usd + sell_usd), clamped to [-1, 1].
    pub flow_pressure: Decimal,
    pub acceleration: Decimal,
    pub large_trade_count: u64,
    pub trade_rate: Decimal,
}

impl TradeFlowBucket {
    #[must_use]
    pub fn from_volumes(
        trade_count: u64,
        buy_usd: Decimal,
        sell_usd: Decimal,
        acceleration: Decimal,
        large_trade_count: u64,
        trade_rate: Decimal,
    ) -> Self {
        let total = buy_usd + sell_usd;
        let flow_pressure = if total.is_zero() {
            Decimal::ZERO
        } else {
            ((buy_usd - sell_usd) / total).clamp(Decimal::NEGATIVE_ONE, Decimal::ONE)
        };
        Self {
            trade_count,
            buy_usd,
            sell_usd,
            flow_pressure,
            acceleration,
            large_trade_count,
            trade_rate,
        }
    }
}

/// A fully normalized market observation for one tick.
///
/// This is the only contract the structure/decision/position/guard
/// engines depend on — how a transport produces it (websocket feed,
/// replay file, deterministic mock) is not part of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTick {
    pub mid: Price,
    pub best_bid: Price,
    pub best_ask: Price,
    pub bid_ladder: Vec<LadderLevel>,
    pub ask_ladder: Vec<LadderLevel>,
    pub spread_bps: Decimal,
    /// Signed price velocity in bps (positive = rising).
    pub price_velocity_bps: Decimal,
    /// Dimensionless shock magnitude.
    pub c_shock: Decimal,
    pub funding_rate: Decimal,
    pub mark_oracle_premium_bps: Decimal,
    pub open_interest: Decimal,
    pub trade_flow: HashMap<TradeFlowWindow, TradeFlowBucket>,
    pub timestamp_ms: i64,
    /// Monotonically increasing input epoch, used by the structure-snapshot
    /// cache to detect when a fresh rebuild is required even though the
    /// mid price has not drifted far enough to trip the drift check.
    pub epoch: u64,
}

impl MarketTick {
    /// The single admission point for raw transport data. Rejects a tick
    /// whose mid/bid/ask are not strictly positive or whose bid/ask are
    /// crossed — callers drive `SafetyStatus::Error` on failure rather
    /// than propagating a NaN/zero price into gating logic.
    pub fn try_normalize(
        mid: Price,
        best_bid: Price,
        best_ask: Price,
        bid_ladder: Vec<LadderLevel>,
        ask_ladder: Vec<LadderLevel>,
        price_velocity_bps: Decimal,
        c_shock: Decimal,
        funding_rate: Decimal,
        mark_oracle_premium_bps: Decimal,
        open_interest: Decimal,
        trade_flow: HashMap<TradeFlowWindow, TradeFlowBucket>,
        timestamp_ms: i64,
        epoch: u64,
    ) -> Result<Self> {
        if !mid.is_positive() || !best_bid.is_positive() || !best_ask.is_positive() {
            return Err(CoreError::InvalidTick(
                "mid/best_bid/best_ask must be strictly positive".into(),
            ));
        }
        if best_bid.inner() > best_ask.inner() {
            return Err(CoreError::InvalidTick("best_bid crossed best_ask".into()));
        }
        let spread_bps = best_ask.bps_from(best_bid);
        Ok(Self {
            mid,
            best_bid,
            best_ask,
            bid_ladder,
            ask_ladder,
            spread_bps,
            price_velocity_bps,
            c_shock,
            funding_rate,
            mark_oracle_premium_bps,
            open_interest,
            trade_flow,
            timestamp_ms,
            epoch,
        })
    }

    #[must_use]
    pub fn flow(&self, window: TradeFlowWindow) -> Option<&TradeFlowBucket> {
        self.trade_flow.get(&window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_tick(mid: Decimal, bid: Decimal, ask: Decimal) -> Result<MarketTick> {
        MarketTick::try_normalize(
            Price::new(mid),
            Price::new(bid),
            Price::new(ask),
            vec![],
            vec![],
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            HashMap::new(),
            1_000,
            1,
        )
    }

    #[test]
    fn rejects_non_positive_mid() {
        assert!(sample_tick(dec!(0), dec!(1), dec!(1)).is_err());
    }

    #[test]
    fn rejects_crossed_book() {
        assert!(sample_tick(dec!(100), dec!(101), dec!(100)).is_err());
    }

    #[test]
    fn accepts_valid_tick_and_computes_spread() {
        let tick = sample_tick(dec!(100), dec!(99.9), dec!(100.1)).unwrap();
        assert_eq!(tick.spread_bps, dec!(2.002002002002002002002002002));
    }

    #[test]
    fn flow_pressure_clamped_and_signed() {
        let bucket = TradeFlowBucket::from_volumes(
            10,
            dec!(900),
            dec!(100),
            Decimal::ZERO,
            0,
            dec!(1),
        );
        assert_eq!(bucket.flow_pressure, dec!(0.8));

        let all_buy = TradeFlowBucket::from_volumes(5, dec!(500), dec!(0), Decimal::ZERO, 0, dec!(1));
        assert_eq!(all_buy.flow_pressure, Decimal::ONE);
    }

    #[test]
    fn flow_pressure_zero_total_is_zero() {
        let bucket =
            TradeFlowBucket::from_volumes(0, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, 0, Decimal::ZERO);
        assert_eq!(bucket.flow_pressure, Decimal::ZERO);
    }
}
