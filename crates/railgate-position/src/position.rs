//! The position record itself: entry state, running extremes, and the
//! gross/net PnL formula (§3 P1-P7, §4.4).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use railgate_core::{Price, Side, Size};
use railgate_decision::{ExecutionMode, FeeSchedule};

/// Immutable snapshot of the conditions that justified the entry, kept
/// around for post-trade diagnostics. Never mutated after open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryContext {
    pub reason: String,
    pub structure_quality: Decimal,
    pub firepower: Decimal,
    pub entry_quality_score: Decimal,
    /// Map strength and structural-path stats at entry (§6 trade-log
    /// entry context), kept alongside the planned TP ladder so
    /// post-trade capture/regret metrics can be computed without
    /// re-deriving the structure snapshot that justified the entry.
    pub map_strength: Decimal,
    pub path_depth: u32,
    pub cluster_count: u32,
    pub structural_distance_usd: Decimal,
    pub planned_tp2_price: Option<Price>,
    pub planned_edge_price: Option<Price>,
}

/// Consecutive-tick counters backing the depth-aware adaptive exit
/// signals. Each field resets to zero the tick its condition stops
/// holding; a signal fires once its counter crosses a configured
/// streak length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveStreaks {
    pub flow_adverse_ticks: u32,
    pub burst_adverse_ticks: u32,
    pub environment_drift_ticks: u32,
}

/// Consecutive-tick counters backing the depth-aware adaptive exit
/// signals (shield collapse, wall-ahead, flow imbalance), plus the
/// label/timestamp of whichever depth signal last actually fired —
/// the `depthExitState` bundle §3 names on `Position`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthExitState {
    pub shield_collapse_ticks: u32,
    pub wall_ahead_ticks: u32,
    pub flow_imbalance_ticks: u32,
    pub last_signal: Option<String>,
    pub last_fired_at_ms: Option<i64>,
}

/// A single open position. Singleton per the driver loop (§5): there is
/// at most one live `Position` at a time, held directly by `EngineState`
/// rather than behind a shared handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub entry_price: Price,
    pub entry_timestamp_ms: i64,
    pub entry_execution_mode: ExecutionMode,
    pub entry_context: EntryContext,

    pub initial_size: Size,
    pub size: Size,

    pub tp1_done: bool,
    /// Gross PnL already realized by partial closes (TP1) on this
    /// position, carried forward so the final full-close trade-log
    /// record reflects the whole round trip rather than just the last
    /// slice.
    pub realized_partial_pnl_usd: Decimal,
    pub active_tp_price: Price,
    pub rail_tp_price: Price,
    pub stretch_tp_price: Option<Price>,
    pub stretch_ratio: Decimal,
    pub stretch_activated_at_ms: Option<i64>,

    pub tp2_trail_multiplier: Decimal,
    pub tp2_last_update_ms: i64,

    pub worst_px: Price,
    pub max_adverse_ratio: Decimal,
    pub hit_soft_at_ts: Option<i64>,

    pub streaks: AdaptiveStreaks,
    pub depth_exit: DepthExitState,

    /// Total resting notional on the position's near (entry) side of
    /// the book at the moment of entry — the baseline `shield_collapse`
    /// compares subsequent ticks' near-side depth against.
    pub entry_band_notional_usd: Decimal,
    /// Most recently computed `environment_drift_exit` weighted score
    /// (§4.3), cached so `evaluate` can gate the exit on `exitScore`
    /// without recomputing the regime/map/flow weighting inline.
    pub last_drift_score: Decimal,
}

impl Position {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        side: Side,
        entry_price: Price,
        entry_timestamp_ms: i64,
        size: Size,
        entry_execution_mode: ExecutionMode,
        entry_context: EntryContext,
        rail_tp_price: Price,
        entry_band_notional_usd: Decimal,
    ) -> Self {
        Self {
            side,
            entry_price,
            entry_timestamp_ms,
            entry_execution_mode,
            entry_context,
            initial_size: size,
            size,
            tp1_done: false,
            realized_partial_pnl_usd: Decimal::ZERO,
            active_tp_price: rail_tp_price,
            rail_tp_price,
            stretch_tp_price: None,
            stretch_ratio: Decimal::ONE,
            stretch_activated_at_ms: None,
            tp2_trail_multiplier: Decimal::ONE,
            tp2_last_update_ms: entry_timestamp_ms,
            worst_px: entry_price,
            max_adverse_ratio: Decimal::ZERO,
            hit_soft_at_ts: None,
            streaks: AdaptiveStreaks::default(),
            depth_exit: DepthExitState::default(),
            entry_band_notional_usd,
            last_drift_score: Decimal::ZERO,
        }
    }

    /// Holding time so far, in milliseconds, against a driver-supplied
    /// `now_ms` (the engine never reads a wall clock directly, §5).
    #[must_use]
    pub fn holding_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.entry_timestamp_ms).max(0)
    }

    /// Adverse excursion ratio at `mark`: how far price has moved against
    /// the position, as a fraction of the entry price. Zero or negative
    /// when price is favorable or flat.
    #[must_use]
    pub fn adverse_ratio(&self, mark: Price) -> Decimal {
        let entry = self.entry_price.inner();
        if entry.is_zero() {
            return Decimal::ZERO;
        }
        let diff = match self.side {
            Side::Buy => entry - mark.inner(),
            Side::Sell => mark.inner() - entry,
        };
        (diff / entry).max(Decimal::ZERO)
    }

    /// Rolls `worst_px`/`max_adverse_ratio` forward given a new mark.
    /// `max_adverse_ratio` is monotonic non-decreasing for the life of
    /// the position (§8 quantified invariant).
    pub fn observe_mark(&mut self, mark: Price) {
        let worse = match self.side {
            Side::Buy => mark.inner() < self.worst_px.inner(),
            Side::Sell => mark.inner() > self.worst_px.inner(),
        };
        if worse {
            self.worst_px = mark;
        }
        let ratio = self.adverse_ratio(mark);
        if ratio > self.max_adverse_ratio {
            self.max_adverse_ratio = ratio;
        }
    }

    /// Favorable progress toward the active TP target, as a fraction of
    /// the planned TP distance from entry; zero or negative when price
    /// has not moved in the position's favor at all.
    #[must_use]
    pub fn progress_ratio(&self, mark: Price) -> Decimal {
        let entry = self.entry_price.inner();
        let tp_distance = (self.rail_tp_price.inner() - entry).abs();
        if tp_distance.is_zero() {
            return Decimal::ZERO;
        }
        let favorable = match self.side {
            Side::Buy => mark.inner() - entry,
            Side::Sell => entry - mark.inner(),
        };
        (favorable / tp_distance).max(Decimal::ZERO)
    }

    /// Unrealized gross PnL in USD at `mark`, for the size still open.
    #[must_use]
    pub fn unrealized_pnl_usd(&self, mark: Price) -> Decimal {
        self.gross_pnl_usd(mark, self.size)
    }

    /// Unrealized PnL net of the exit fee a close at `mark` would incur
    /// right now — the "projected net PnL" depth-aware exits (§4.3) must
    /// clear before they're allowed to actually fire rather than stay
    /// diagnostic-only.
    #[must_use]
    pub fn projected_net_pnl_usd(&self, mark: Price, fees: &FeeSchedule, exit_mode: ExecutionMode) -> Decimal {
        let gross = self.unrealized_pnl_usd(mark);
        let notional = mark.inner() * self.size.inner();
        gross - fees.fee_usd(notional, exit_mode)
    }

    /// Gross PnL in USD at `exit_price` for `closed_size` (P6). Negative
    /// `closed_size` or non-positive prices are a caller bug, not a
    /// runtime condition this function tries to paper over.
    #[must_use]
    pub fn gross_pnl_usd(&self, exit_price: Price, closed_size: Size) -> Decimal {
        let diff = match self.side {
            Side::Buy => exit_price.inner() - self.entry_price.inner(),
            Side::Sell => self.entry_price.inner() - exit_price.inner(),
        };
        diff * closed_size.inner()
    }

    /// Net PnL after both entry and exit fees (P6:
    /// `net = gross - entryFee - exitFee`).
    #[must_use]
    pub fn net_pnl_usd(&self, gross: Decimal, entry_fee_usd: Decimal, exit_fee_usd: Decimal) -> Decimal {
        gross - entry_fee_usd - exit_fee_usd
    }

    #[must_use]
    pub fn is_fully_closed(&self) -> bool {
        self.size.inner().is_zero()
    }

    /// Reduces `size` by `amount`, clamping at zero. Returns the amount
    /// actually closed (less than `amount` if it would have gone
    /// negative).
    pub fn reduce(&mut self, amount: Size) -> Size {
        let closed = amount.inner().min(self.size.inner());
        self.size = Size::new(self.size.inner() - closed);
        Size::new(closed)
    }

    /// Closes `fraction` of the originally opened size at `mark` (TP1),
    /// folding the realized gross PnL into `realized_partial_pnl_usd`
    /// and marking `tp1_done`. Returns the amount actually closed and
    /// the gross PnL realized by this slice.
    pub fn apply_partial_close(&mut self, mark: Price, fraction: Decimal) -> (Size, Decimal) {
        let target = Size::new(self.initial_size.inner() * fraction);
        let closed = self.reduce(target);
        let gross = self.gross_pnl_usd(mark, closed);
        self.realized_partial_pnl_usd += gross;
        self.tp1_done = true;
        (closed, gross)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ctx() -> EntryContext {
        EntryContext {
            reason: "test".into(),
            structure_quality: dec!(0.8),
            firepower: dec!(1.0),
            entry_quality_score: dec!(0.7),
            map_strength: dec!(0.5),
            path_depth: 1,
            cluster_count: 1,
            structural_distance_usd: dec!(10),
            planned_tp2_price: None,
            planned_edge_price: None,
        }
    }

    #[test]
    fn adverse_ratio_zero_when_favorable() {
        let pos = Position::open(
            Side::Buy,
            Price::new(dec!(100)),
            0,
            Size::new(dec!(1)),
            ExecutionMode::Maker,
            ctx(),
            Price::new(dec!(105)),
            dec!(10_000),
        );
        assert_eq!(pos.adverse_ratio(Price::new(dec!(101))), Decimal::ZERO);
        assert_eq!(pos.adverse_ratio(Price::new(dec!(99))), dec!(0.01));
    }

    #[test]
    fn max_adverse_ratio_is_monotonic() {
        let mut pos = Position::open(
            Side::Buy,
            Price::new(dec!(100)),
            0,
            Size::new(dec!(1)),
            ExecutionMode::Maker,
            ctx(),
            Price::new(dec!(105)),
            dec!(10_000),
        );
        pos.observe_mark(Price::new(dec!(95)));
        let after_first = pos.max_adverse_ratio;
        pos.observe_mark(Price::new(dec!(98)));
        assert_eq!(pos.max_adverse_ratio, after_first);
        pos.observe_mark(Price::new(dec!(90)));
        assert!(pos.max_adverse_ratio > after_first);
    }

    #[test]
    fn gross_pnl_matches_side_sign() {
        let pos = Position::open(
            Side::Sell,
            Price::new(dec!(100)),
            0,
            Size::new(dec!(2)),
            ExecutionMode::Taker,
            ctx(),
            Price::new(dec!(95)),
            dec!(10_000),
        );
        let gross = pos.gross_pnl_usd(Price::new(dec!(90)), Size::new(dec!(2)));
        assert_eq!(gross, dec!(20));
    }

    #[test]
    fn reduce_clamps_at_zero() {
        let mut pos = Position::open(
            Side::Buy,
            Price::new(dec!(100)),
            0,
            Size::new(dec!(1)),
            ExecutionMode::Maker,
            ctx(),
            Price::new(dec!(105)),
            dec!(10_000),
        );
        let closed = pos.reduce(Size::new(dec!(5)));
        assert_eq!(closed, Size::new(dec!(1)));
        assert!(pos.is_fully_closed());
    }

    #[test]
    fn partial_close_folds_gross_pnl_and_marks_tp1() {
        let mut pos = Position::open(
            Side::Buy,
            Price::new(dec!(100)),
            0,
            Size::new(dec!(10)),
            ExecutionMode::Maker,
            ctx(),
            Price::new(dec!(105)),
            dec!(10_000),
        );
        let (closed, gross) = pos.apply_partial_close(Price::new(dec!(105)), dec!(0.5));
        assert_eq!(closed, Size::new(dec!(5)));
        assert_eq!(gross, dec!(25));
        assert_eq!(pos.realized_partial_pnl_usd, dec!(25));
        assert!(pos.tp1_done);
        assert_eq!(pos.size, Size::new(dec!(5)));
    }

    proptest::proptest! {
        /// §8's quantified invariant: `max_adverse_ratio` never decreases
        /// across an arbitrary sequence of marks, for either side.
        #[test]
        fn max_adverse_ratio_never_decreases_across_any_mark_sequence(
            side_is_buy in proptest::bool::ANY,
            mark_cents in proptest::collection::vec(1i64..20_000, 1..30),
        ) {
            let side = if side_is_buy { Side::Buy } else { Side::Sell };
            let mut pos = Position::open(
                side,
                Price::new(dec!(100)),
                0,
                Size::new(dec!(1)),
                ExecutionMode::Maker,
                ctx(),
                Price::new(dec!(105)),
                dec!(10_000),
            );
            let mut previous = Decimal::ZERO;
            for cents in mark_cents {
                pos.observe_mark(Price::new(Decimal::new(cents, 2)));
                proptest::prop_assert!(pos.max_adverse_ratio >= previous);
                previous = pos.max_adverse_ratio;
            }
        }
    }
}
