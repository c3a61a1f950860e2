//! The exit state machine (§4.3): continuous per-tick updates, dynamic
//! loss parameters, TP ladder crossing and trail, the adaptive exit
//! signals, and the stress/hard/soft/timeout priority ladder.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use railgate_core::{MarketTick, Price, Side, TradeFlowWindow};
use railgate_decision::{ExecutionMode, FeeSchedule};

use crate::position::Position;

/// Tunable parameters for the exit state machine. Ratios are expressed
/// as a fraction of entry price (e.g. `0.02` is a 2% move).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitConfig {
    pub base_timeout_ms: i64,
    pub base_soft_ratio: Decimal,
    pub base_hard_ratio: Decimal,
    /// Multiplies soft/hard ratios wider while the market is flagged as
    /// high-stress, so a normal adverse wiggle isn't mistaken for the
    /// regime-driven kind of move the hard stop exists to catch.
    pub stress_ratio_multiplier: Decimal,
    /// Multiplies soft/hard ratios by the caller-supplied regime
    /// severity (1.0 = neutral regime).
    pub regime_ratio_multiplier: Decimal,
    /// How close price must come to `active_tp_price` to count as a
    /// crossing, expressed as a fraction of the TP distance from entry.
    pub tp_cross_tolerance: Decimal,
    pub tp1_partial_fraction: Decimal,
    pub tp2_trail_step: Decimal,

    /// `flow_adaptive_take_profit`: minimum holding time and favorable
    /// progress before the signal is even considered.
    pub flow_tp_min_hold_ms: i64,
    pub flow_tp_min_progress_ratio: Decimal,
    pub flow_tp_min_profit_usd: Decimal,
    /// Hostile 5s trade-flow pressure magnitude, side-specific.
    pub flow_tp_hostile_ratio: Decimal,
    pub flow_tp_accel_min_progress: Decimal,
    pub flow_tp_decay_threshold: Decimal,
    pub flow_tp_accel_ratio_min: Decimal,
    pub flow_tp_streak: u32,

    /// `burst_adverse_exit`: 5s trade rate vs 60s trade rate.
    pub burst_min_rate_ratio: Decimal,
    pub burst_flow_pressure_threshold: Decimal,
    pub burst_adverse_streak: u32,

    /// `environment_drift_exit`: weighted score over regime shift, map
    /// strength decay, and hostile flow.
    pub drift_regime_weight: Decimal,
    pub drift_map_weight: Decimal,
    pub drift_flow_weight: Decimal,
    pub drift_map_drop_ratio: Decimal,
    pub drift_hostile_flow_threshold: Decimal,
    pub drift_tighten_score: Decimal,
    pub drift_exit_score: Decimal,
    pub drift_max_loss_usd: Decimal,
    pub environment_drift_streak: u32,

    /// `shield_collapse`: current near-band notional vs the baseline
    /// captured at entry.
    pub shield_collapse_ratio: Decimal,
    pub shield_collapse_streak: u32,

    /// `wall_ahead`: a single level ahead of mid, between `near_px_bps`
    /// and `far_px_bps`, with notional at or above `min_notional_usd`
    /// and `min_vs_near` times the near-ladder average.
    pub wall_ahead_near_px_bps: Decimal,
    pub wall_ahead_far_px_bps: Decimal,
    pub wall_ahead_min_notional_usd: Decimal,
    pub wall_ahead_min_vs_near: Decimal,
    pub wall_ahead_progress_from: Decimal,
    pub wall_ahead_progress_max: Decimal,
    pub wall_ahead_streak: u32,

    /// `flow_imbalance`: sustained hostile flow pressure over the 30s
    /// window.
    pub flow_imbalance_ratio: Decimal,
    pub flow_imbalance_streak: u32,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            base_timeout_ms: 5 * 60_000,
            base_soft_ratio: Decimal::new(6, 3),  // 0.006
            base_hard_ratio: Decimal::new(15, 3), // 0.015
            stress_ratio_multiplier: Decimal::new(15, 1), // 1.5
            regime_ratio_multiplier: Decimal::ONE,
            tp_cross_tolerance: Decimal::new(5, 3), // 0.5%
            tp1_partial_fraction: Decimal::new(5, 1), // 0.5
            tp2_trail_step: Decimal::new(2, 3),       // 0.002

            flow_tp_min_hold_ms: 60_000,
            flow_tp_min_progress_ratio: Decimal::new(2, 1), // 0.2
            flow_tp_min_profit_usd: Decimal::from(5),
            flow_tp_hostile_ratio: Decimal::new(3, 1), // 0.3
            flow_tp_accel_min_progress: Decimal::new(35, 2), // 0.35
            flow_tp_decay_threshold: Decimal::ZERO,
            flow_tp_accel_ratio_min: Decimal::new(2, 2), // 0.02
            flow_tp_streak: 2,

            burst_min_rate_ratio: Decimal::new(3, 1), // 30% of the 60s rate within 5s
            burst_flow_pressure_threshold: Decimal::new(4, 1), // 0.4
            burst_adverse_streak: 2,

            drift_regime_weight: Decimal::new(4, 1), // 0.4
            drift_map_weight: Decimal::new(3, 1),     // 0.3
            drift_flow_weight: Decimal::new(3, 1),     // 0.3
            drift_map_drop_ratio: Decimal::new(6, 1),  // 0.6
            drift_hostile_flow_threshold: Decimal::new(3, 1), // 0.3
            drift_tighten_score: Decimal::new(4, 1),   // 0.4
            drift_exit_score: Decimal::new(7, 1),      // 0.7
            drift_max_loss_usd: Decimal::from(50),
            environment_drift_streak: 5,

            shield_collapse_ratio: Decimal::new(35, 2), // 0.35
            shield_collapse_streak: 3,

            wall_ahead_near_px_bps: Decimal::from(5),
            wall_ahead_far_px_bps: Decimal::from(40),
            wall_ahead_min_notional_usd: Decimal::from(20_000),
            wall_ahead_min_vs_near: Decimal::new(3, 0), // 3x the near-ladder average
            wall_ahead_progress_from: Decimal::new(2, 1), // 0.2
            wall_ahead_progress_max: Decimal::new(9, 1),  // 0.9
            wall_ahead_streak: 2,

            flow_imbalance_ratio: Decimal::new(5, 1), // 0.5
            flow_imbalance_streak: 3,
        }
    }
}

impl ExitConfig {
    #[must_use]
    pub fn effective_soft_ratio(&self, stress_active: bool) -> Decimal {
        let mut ratio = self.base_soft_ratio * self.regime_ratio_multiplier;
        if stress_active {
            ratio *= self.stress_ratio_multiplier;
        }
        ratio
    }

    #[must_use]
    pub fn effective_hard_ratio(&self, stress_active: bool) -> Decimal {
        let mut ratio = self.base_hard_ratio * self.regime_ratio_multiplier;
        if stress_active {
            ratio *= self.stress_ratio_multiplier;
        }
        ratio
    }
}

/// Every condition the exit machine can raise in a single tick, in
/// descending priority: the first `Some` returned by `evaluate` wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitSignal {
    TpFull,
    TpPartial,
    FlowAdaptiveTakeProfit,
    BurstAdverseExit,
    EnvironmentDriftExit,
    ShieldCollapse,
    WallAhead,
    FlowImbalanceDepth,
    StressCutLoss,
    HardStopLoss,
    SoftStopLossTimeout,
    TimeoutLossOnly,
    ReverseSideClose,
}

fn hostile_flow_pressure(side: Side, flow_pressure: Decimal, threshold: Decimal) -> bool {
    match side {
        Side::Buy => flow_pressure <= -threshold,
        Side::Sell => flow_pressure >= threshold,
    }
}

/// Sums notional resting on the position's near (supporting) side of the
/// book: the bid ladder for a long, the ask ladder for a short.
fn near_band_notional(tick: &MarketTick, side: Side) -> Decimal {
    let ladder = match side {
        Side::Buy => &tick.bid_ladder,
        Side::Sell => &tick.ask_ladder,
    };
    ladder.iter().map(|l| l.notional_usd).sum()
}

/// Finds a single level in the ladder ahead of mid (the direction price
/// must still travel for the position to profit further) that sits
/// within `[near_bps, far_bps]` of mid and carries outsized notional
/// relative to the near-side average.
fn wall_ahead_notional(tick: &MarketTick, side: Side, config: &ExitConfig) -> Option<Decimal> {
    let ahead_ladder = match side {
        Side::Buy => &tick.ask_ladder,
        Side::Sell => &tick.bid_ladder,
    };
    let near_avg = {
        let near = near_band_notional(tick, side);
        let count = match side {
            Side::Buy => tick.bid_ladder.len(),
            Side::Sell => tick.ask_ladder.len(),
        };
        if count == 0 {
            return None;
        }
        near / Decimal::from(count as u64)
    };

    ahead_ladder
        .iter()
        .find(|level| {
            let bps = tick.mid.bps_from(level.price).abs();
            bps >= config.wall_ahead_near_px_bps
                && bps <= config.wall_ahead_far_px_bps
                && level.notional_usd >= config.wall_ahead_min_notional_usd
                && level.notional_usd >= near_avg * config.wall_ahead_min_vs_near
        })
        .map(|level| level.notional_usd)
}

/// Advances the position's adaptive and depth-aware streak counters
/// against the latest tick. Call once per tick before `evaluate`.
pub fn update_streaks(
    position: &mut Position,
    tick: &MarketTick,
    regime_shift: bool,
    map_ratio: Decimal,
    config: &ExitConfig,
) {
    let mark = tick.mid;
    let adverse_ratio = position.adverse_ratio(mark);
    let progress_ratio = position.progress_ratio(mark);
    let flow5 = tick.flow(TradeFlowWindow::Ms5000);
    let flow30 = tick.flow(TradeFlowWindow::Ms30000);
    let flow60 = tick.flow(TradeFlowWindow::Ms60000);

    // flow_adaptive_take_profit: hostile 5s flow once the position has
    // held long enough and made enough progress, or accelerated decay.
    let flow_tp_eligible = position.holding_ms(tick.timestamp_ms) >= config.flow_tp_min_hold_ms
        && progress_ratio >= config.flow_tp_min_progress_ratio
        && position.unrealized_pnl_usd(mark) >= config.flow_tp_min_profit_usd;
    let hostile_flow5 = flow5.is_some_and(|b| {
        hostile_flow_pressure(position.side, b.flow_pressure, config.flow_tp_hostile_ratio)
    });
    let accelerated_decay = progress_ratio >= config.flow_tp_accel_min_progress
        && flow5.is_some_and(|b| b.acceleration <= config.flow_tp_decay_threshold)
        && adverse_ratio >= config.flow_tp_accel_ratio_min;
    if flow_tp_eligible && (hostile_flow5 || accelerated_decay) {
        position.streaks.flow_adverse_ticks = position.streaks.flow_adverse_ticks.saturating_add(1);
    } else {
        position.streaks.flow_adverse_ticks = 0;
    }

    // burst_adverse_exit: 5s rate bursting ahead of the 60s baseline
    // while the 5s flow is hostile.
    let burst = match (flow5, flow60) {
        (Some(b5), Some(b60)) => {
            b5.trade_rate >= b60.trade_rate * config.burst_min_rate_ratio
                && hostile_flow_pressure(position.side, b5.flow_pressure, config.burst_flow_pressure_threshold)
        }
        _ => false,
    };
    if burst {
        position.streaks.burst_adverse_ticks = position.streaks.burst_adverse_ticks.saturating_add(1);
    } else {
        position.streaks.burst_adverse_ticks = 0;
    }

    // environment_drift_exit: weighted score over regime shift, map
    // strength decay, and sustained hostile flow.
    let hostile_flow30 = flow30.is_some_and(|b| {
        hostile_flow_pressure(position.side, b.flow_pressure, config.drift_hostile_flow_threshold)
    });
    let mut score = Decimal::ZERO;
    if regime_shift {
        score += config.drift_regime_weight;
    }
    if map_ratio <= config.drift_map_drop_ratio {
        score += config.drift_map_weight;
    }
    if hostile_flow30 {
        score += config.drift_flow_weight;
    }
    position.last_drift_score = score;
    if score >= config.drift_tighten_score {
        position.streaks.environment_drift_ticks =
            position.streaks.environment_drift_ticks.saturating_add(1);
    } else {
        position.streaks.environment_drift_ticks = 0;
    }

    // shield_collapse: near-band depth has thinned out relative to the
    // baseline captured at entry.
    let shield_collapsed = if position.entry_band_notional_usd.is_zero() {
        false
    } else {
        near_band_notional(tick, position.side)
            <= position.entry_band_notional_usd * config.shield_collapse_ratio
    };
    if shield_collapsed {
        position.depth_exit.shield_collapse_ticks =
            position.depth_exit.shield_collapse_ticks.saturating_add(1);
    } else {
        position.depth_exit.shield_collapse_ticks = 0;
    }

    // wall_ahead: a single outsized level blocking the path to target,
    // only relevant once progress has actually started building.
    let wall_present = progress_ratio >= config.wall_ahead_progress_from
        && progress_ratio <= config.wall_ahead_progress_max
        && wall_ahead_notional(tick, position.side, config).is_some();
    if wall_present {
        position.depth_exit.wall_ahead_ticks = position.depth_exit.wall_ahead_ticks.saturating_add(1);
    } else {
        position.depth_exit.wall_ahead_ticks = 0;
    }

    // flow_imbalance: sustained (30s) hostile flow pressure beyond the
    // burst threshold, independent of rate acceleration.
    let imbalanced = flow30.is_some_and(|b| {
        hostile_flow_pressure(position.side, b.flow_pressure, config.flow_imbalance_ratio)
    });
    if imbalanced {
        position.depth_exit.flow_imbalance_ticks =
            position.depth_exit.flow_imbalance_ticks.saturating_add(1);
    } else {
        position.depth_exit.flow_imbalance_ticks = 0;
    }
}

fn tp_crossed(position: &Position, mark: Price, target: Price, config: &ExitConfig) -> bool {
    let distance = (target.inner() - position.entry_price.inner()).abs();
    if distance.is_zero() {
        return false;
    }
    let tolerance = distance * config.tp_cross_tolerance;
    match position.side {
        Side::Buy => mark.inner() >= target.inner() - tolerance,
        Side::Sell => mark.inner() <= target.inner() + tolerance,
    }
}

/// A depth-aware signal only actually fires once it clears projected
/// net PnL; otherwise it's recorded as diagnostic-only and `evaluate`
/// keeps looking further down the ladder.
fn depth_aware_fires(
    position: &Position,
    mark: Price,
    fees: &FeeSchedule,
    exit_mode: ExecutionMode,
    label: &'static str,
) -> bool {
    let projected_net = position.projected_net_pnl_usd(mark, fees, exit_mode);
    if projected_net > Decimal::ZERO {
        true
    } else {
        tracing::debug!(signal = label, %projected_net, "depth-aware exit blocked by fee guard");
        false
    }
}

/// Evaluates the full priority ladder for one tick and returns the
/// single highest-priority signal that fires, if any. Does not mutate
/// `position`; the caller applies the resulting action (partial close,
/// full close, TP2 trail update) and persists it.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn evaluate(
    position: &Position,
    tick: &MarketTick,
    now_ms: i64,
    config: &ExitConfig,
    stress_active: bool,
    opposing_signal: Option<Side>,
    fees: &FeeSchedule,
    exit_mode: ExecutionMode,
) -> Option<ExitSignal> {
    let mark = tick.mid;
    let adverse_ratio = position.adverse_ratio(mark);
    let holding_ms = position.holding_ms(now_ms);

    if !position.tp1_done && tp_crossed(position, mark, position.active_tp_price, config) {
        return Some(ExitSignal::TpPartial);
    }
    if position.tp1_done {
        let target = position.stretch_tp_price.unwrap_or(position.active_tp_price);
        if tp_crossed(position, mark, target, config) {
            return Some(ExitSignal::TpFull);
        }
    }

    if position.streaks.flow_adverse_ticks >= config.flow_tp_streak {
        return Some(ExitSignal::FlowAdaptiveTakeProfit);
    }
    if position.streaks.burst_adverse_ticks >= config.burst_adverse_streak {
        return Some(ExitSignal::BurstAdverseExit);
    }
    if position.streaks.environment_drift_ticks >= config.environment_drift_streak
        && position.last_drift_score >= config.drift_exit_score
        && adverse_ratio * position.entry_price.inner() <= config.drift_max_loss_usd
    {
        return Some(ExitSignal::EnvironmentDriftExit);
    }
    if position.depth_exit.shield_collapse_ticks >= config.shield_collapse_streak
        && depth_aware_fires(position, mark, fees, exit_mode, "shield_collapse")
    {
        return Some(ExitSignal::ShieldCollapse);
    }
    if position.depth_exit.wall_ahead_ticks >= config.wall_ahead_streak
        && depth_aware_fires(position, mark, fees, exit_mode, "wall_ahead")
    {
        return Some(ExitSignal::WallAhead);
    }
    if position.depth_exit.flow_imbalance_ticks >= config.flow_imbalance_streak
        && depth_aware_fires(position, mark, fees, exit_mode, "flow_imbalance")
    {
        return Some(ExitSignal::FlowImbalanceDepth);
    }

    if adverse_ratio >= config.effective_hard_ratio(stress_active) {
        return Some(ExitSignal::HardStopLoss);
    }

    if stress_active && adverse_ratio >= config.effective_soft_ratio(true) {
        return Some(ExitSignal::StressCutLoss);
    }

    let soft_ratio = config.effective_soft_ratio(stress_active);
    if adverse_ratio >= soft_ratio {
        if let Some(hit_at) = position.hit_soft_at_ts {
            if now_ms - hit_at >= config.base_timeout_ms {
                return Some(ExitSignal::SoftStopLossTimeout);
            }
        } else {
            return Some(ExitSignal::SoftStopLossTimeout);
        }
    }

    if holding_ms >= config.base_timeout_ms && adverse_ratio > Decimal::ZERO {
        return Some(ExitSignal::TimeoutLossOnly);
    }

    if let Some(opposing) = opposing_signal {
        if opposing != position.side {
            return Some(ExitSignal::ReverseSideClose);
        }
    }

    None
}

/// Ratchets the TP2 trail price toward the current mark once TP1 has
/// been taken, never loosening it back toward entry.
pub fn trail_tp2(position: &mut Position, mark: Price, now_ms: i64, config: &ExitConfig) {
    if !position.tp1_done {
        return;
    }
    let step = match position.side {
        Side::Buy => mark.inner() - mark.inner() * config.tp2_trail_step,
        Side::Sell => mark.inner() + mark.inner() * config.tp2_trail_step,
    };
    let candidate = Price::new(step);
    let tighter = match position.side {
        Side::Buy => candidate.inner() > position.stretch_tp_price.map_or(Decimal::ZERO, |p| p.inner()),
        Side::Sell => {
            position
                .stretch_tp_price
                .map_or(true, |p| candidate.inner() < p.inner())
        }
    };
    if tighter {
        position.stretch_tp_price = Some(candidate);
        position.tp2_trail_multiplier += config.tp2_trail_step;
        position.tp2_last_update_ms = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::EntryContext;
    use railgate_core::{LadderLevel, Size, TradeFlowBucket};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn ctx() -> EntryContext {
        EntryContext {
            reason: "t".into(),
            structure_quality: dec!(0.8),
            firepower: dec!(1),
            entry_quality_score: dec!(0.7),
            map_strength: dec!(0.5),
            path_depth: 1,
            cluster_count: 1,
            structural_distance_usd: dec!(10),
            planned_tp2_price: None,
            planned_edge_price: None,
        }
    }

    fn long_position() -> Position {
        Position::open(
            Side::Buy,
            Price::new(dec!(100)),
            0,
            Size::new(dec!(1)),
            ExecutionMode::Maker,
            ctx(),
            Price::new(dec!(105)),
            dec!(10_000),
        )
    }

    fn flat_tick(mid: Decimal, ts: i64) -> MarketTick {
        MarketTick::try_normalize(
            Price::new(mid),
            Price::new(mid - dec!(0.5)),
            Price::new(mid + dec!(0.5)),
            vec![LadderLevel::new(Price::new(mid - dec!(0.5)), Size::new(dec!(100)))],
            vec![LadderLevel::new(Price::new(mid + dec!(0.5)), Size::new(dec!(100)))],
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            HashMap::new(),
            ts,
            1,
        )
        .unwrap()
    }

    #[test]
    fn hard_stop_takes_priority_over_soft() {
        let pos = long_position();
        let config = ExitConfig::default();
        let fees = FeeSchedule::default();
        let tick = flat_tick(dec!(98), 0);
        let signal = evaluate(&pos, &tick, 0, &config, false, None, &fees, ExecutionMode::Taker);
        assert_eq!(signal, Some(ExitSignal::HardStopLoss));
    }

    #[test]
    fn soft_stop_waits_for_timeout_once_hit() {
        let mut pos = long_position();
        let config = ExitConfig::default();
        let fees = FeeSchedule::default();
        // 0.008 adverse ratio: above soft (0.006), below hard (0.015)
        let tick = flat_tick(dec!(99.2), 0);
        let first = evaluate(&pos, &tick, 0, &config, false, None, &fees, ExecutionMode::Taker);
        assert_eq!(first, Some(ExitSignal::SoftStopLossTimeout));
        pos.hit_soft_at_ts = Some(0);
        let immediate = evaluate(&pos, &tick, 1_000, &config, false, None, &fees, ExecutionMode::Taker);
        assert_eq!(immediate, None);
        let after_timeout = evaluate(
            &pos,
            &tick,
            config.base_timeout_ms + 1,
            &config,
            false,
            None,
            &fees,
            ExecutionMode::Taker,
        );
        assert_eq!(after_timeout, Some(ExitSignal::SoftStopLossTimeout));
    }

    #[test]
    fn tp_partial_fires_on_crossing_active_target() {
        let pos = long_position();
        let config = ExitConfig::default();
        let fees = FeeSchedule::default();
        let tick = flat_tick(dec!(105.5), 0);
        let signal = evaluate(&pos, &tick, 0, &config, false, None, &fees, ExecutionMode::Taker);
        assert_eq!(signal, Some(ExitSignal::TpPartial));
    }

    #[test]
    fn burst_adverse_exit_fires_after_streak() {
        let mut pos = long_position();
        pos.streaks.burst_adverse_ticks = 2;
        let config = ExitConfig::default();
        let fees = FeeSchedule::default();
        let tick = flat_tick(dec!(100.1), 0);
        let signal = evaluate(&pos, &tick, 0, &config, false, None, &fees, ExecutionMode::Taker);
        assert_eq!(signal, Some(ExitSignal::BurstAdverseExit));
    }

    #[test]
    fn trail_tp2_only_tightens() {
        let mut pos = long_position();
        pos.tp1_done = true;
        let config = ExitConfig::default();
        trail_tp2(&mut pos, Price::new(dec!(110)), 10, &config);
        let first = pos.stretch_tp_price.unwrap();
        trail_tp2(&mut pos, Price::new(dec!(108)), 20, &config);
        assert_eq!(pos.stretch_tp_price.unwrap(), first);
    }

    fn tick_with_flow(mid: Decimal, ts: i64, buckets: Vec<(TradeFlowWindow, TradeFlowBucket)>) -> MarketTick {
        let mut flow = HashMap::new();
        for (window, bucket) in buckets {
            flow.insert(window, bucket);
        }
        MarketTick::try_normalize(
            Price::new(mid),
            Price::new(mid - dec!(0.5)),
            Price::new(mid + dec!(0.5)),
            vec![LadderLevel::new(Price::new(mid - dec!(0.5)), Size::new(dec!(100)))],
            vec![LadderLevel::new(Price::new(mid + dec!(0.5)), Size::new(dec!(100)))],
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            flow,
            ts,
            1,
        )
        .unwrap()
    }

    #[test]
    fn burst_streak_builds_from_real_trade_flow() {
        let mut pos = long_position();
        let config = ExitConfig::default();
        let hostile_bucket = TradeFlowBucket::from_volumes(50, dec!(10), dec!(200), Decimal::ZERO, 2, dec!(10));
        let calm_60s = TradeFlowBucket::from_volumes(60, dec!(500), dec!(500), Decimal::ZERO, 1, dec!(1));
        let tick = tick_with_flow(
            dec!(100),
            0,
            vec![(TradeFlowWindow::Ms5000, hostile_bucket), (TradeFlowWindow::Ms60000, calm_60s)],
        );
        update_streaks(&mut pos, &tick, false, Decimal::ONE, &config);
        assert_eq!(pos.streaks.burst_adverse_ticks, 1);
        update_streaks(&mut pos, &tick, false, Decimal::ONE, &config);
        assert_eq!(pos.streaks.burst_adverse_ticks, 2);

        let signal = evaluate(
            &pos,
            &tick,
            0,
            &config,
            false,
            None,
            &FeeSchedule::default(),
            ExecutionMode::Taker,
        );
        assert_eq!(signal, Some(ExitSignal::BurstAdverseExit));
    }

    #[test]
    fn shield_collapse_requires_streak_and_fee_guard() {
        let mut pos = long_position();
        let config = ExitConfig::default();
        pos.entry_band_notional_usd = dec!(10_000);
        // thinned near-side book: far below the collapse ratio of baseline,
        // priced short of the TP target so TP crossing doesn't pre-empt it
        let thin_tick = MarketTick::try_normalize(
            Price::new(dec!(102)),
            Price::new(dec!(101.5)),
            Price::new(dec!(102.5)),
            vec![LadderLevel::new(Price::new(dec!(101.5)), Size::new(dec!(1)))],
            vec![LadderLevel::new(Price::new(dec!(102.5)), Size::new(dec!(1)))],
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            HashMap::new(),
            0,
            1,
        )
        .unwrap();
        for _ in 0..config.shield_collapse_streak {
            update_streaks(&mut pos, &thin_tick, false, Decimal::ONE, &config);
        }
        assert_eq!(pos.depth_exit.shield_collapse_ticks, config.shield_collapse_streak);

        // priced well above entry so projected net PnL clears fees
        let signal = evaluate(
            &pos,
            &thin_tick,
            0,
            &config,
            false,
            None,
            &FeeSchedule::default(),
            ExecutionMode::Taker,
        );
        assert_eq!(signal, Some(ExitSignal::ShieldCollapse));
    }

    #[test]
    fn shield_collapse_stays_diagnostic_only_when_unprofitable() {
        let mut pos = long_position();
        let config = ExitConfig::default();
        pos.entry_band_notional_usd = dec!(10_000);
        // thinned near-side book but mark below entry: no net profit to protect
        let thin_tick = MarketTick::try_normalize(
            Price::new(dec!(99)),
            Price::new(dec!(98.5)),
            Price::new(dec!(99.5)),
            vec![LadderLevel::new(Price::new(dec!(98.5)), Size::new(dec!(1)))],
            vec![LadderLevel::new(Price::new(dec!(99.5)), Size::new(dec!(1)))],
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            HashMap::new(),
            0,
            1,
        )
        .unwrap();
        for _ in 0..config.shield_collapse_streak {
            update_streaks(&mut pos, &thin_tick, false, Decimal::ONE, &config);
        }
        let signal = evaluate(
            &pos,
            &thin_tick,
            0,
            &config,
            false,
            None,
            &FeeSchedule::default(),
            ExecutionMode::Taker,
        );
        assert_ne!(signal, Some(ExitSignal::ShieldCollapse));
    }
}
