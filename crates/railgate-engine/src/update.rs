//! `update_engine` (§5): the single pure fold the driver loop calls
//! once per tick. Everything upstream of it (feed wait) and downstream
//! of it (executing the returned effects) is IO; this function itself
//! never awaits and never touches the filesystem or network.

use rust_decimal::Decimal;

use railgate_core::{MarketTick, Side};
use railgate_config::TradeConfig;
use railgate_decision::{decide_trade_b2, ExecutionMode, FeeSchedule, SizingInputs};
use railgate_persistence::{
    CaptureMetrics, CounterfactualRegret, LogQuality, LogSide, LoggedEntryContext, TradeLogRecord,
    TradeResult, SCHEMA_VERSION,
};
use railgate_position::{evaluate, trail_tp2, update_streaks, EntryContext, ExitSignal, Position};
use railgate_structure::RawLevel;
use railgate_telemetry::Metrics;
use uuid::Uuid;

use crate::effects::{EffectsQueue, NotificationEvent};
use crate::state::EngineState;
use crate::structure::{ensure_structure, regime_side};

/// `c_shock` reading at or above which the exit machine treats the
/// market as stress-active (§4.3), widening the soft/hard stop ratios
/// rather than letting a regime shock read as an ordinary wiggle.
const STRESS_C_SHOCK_THRESHOLD: Decimal = Decimal::ONE;

/// Exit fills are modeled as reactive market orders; partial and full
/// exits are both charged the taker rate regardless of how the
/// position was entered.
const EXIT_EXECUTION_MODE: ExecutionMode = ExecutionMode::Taker;

fn exit_signal_name(signal: ExitSignal) -> &'static str {
    match signal {
        ExitSignal::HardStopLoss => "hard_stop_loss",
        ExitSignal::StressCutLoss => "stress_cut_loss",
        ExitSignal::SoftStopLossTimeout => "soft_stop_loss_timeout",
        ExitSignal::TimeoutLossOnly => "timeout_loss_only",
        ExitSignal::TpFull => "tp_full",
        ExitSignal::TpPartial => "tp_partial",
        ExitSignal::FlowAdaptiveTakeProfit => "flow_adaptive_take_profit",
        ExitSignal::BurstAdverseExit => "burst_adverse_exit",
        ExitSignal::EnvironmentDriftExit => "environment_drift_exit",
        ExitSignal::ShieldCollapse => "shield_collapse",
        ExitSignal::WallAhead => "wall_ahead",
        ExitSignal::FlowImbalanceDepth => "flow_imbalance",
        ExitSignal::ReverseSideClose => "reverse_side_close",
    }
}

fn is_depth_aware(signal: ExitSignal) -> bool {
    matches!(
        signal,
        ExitSignal::ShieldCollapse | ExitSignal::WallAhead | ExitSignal::FlowImbalanceDepth
    )
}

fn safety_state_code(state: railgate_guard::SafetyState) -> i64 {
    match state {
        railgate_guard::SafetyState::Normal => 0,
        railgate_guard::SafetyState::Degraded => 1,
        railgate_guard::SafetyState::Halted => 2,
        railgate_guard::SafetyState::Error => 3,
    }
}

/// Folds one tick into `state`, returning the IO effects the driver
/// owes as a result. `raw_levels` is this tick's candidate SR levels
/// (order-book/trade-history derived, out of this crate's scope);
/// `sizing` carries the upstream-scored regime/flow inputs §4.2 takes
/// as given.
pub fn update_engine(
    state: &mut EngineState,
    tick: &MarketTick,
    raw_levels: &[RawLevel],
    sizing: &SizingInputs,
    config: &TradeConfig,
    fees: &FeeSchedule,
) -> EffectsQueue {
    let now_ms = tick.timestamp_ms;
    let mut effects = EffectsQueue::new();

    // A tick reaching here already passed `MarketTick::try_normalize`,
    // so its arrival alone is evidence the feed is fresh again (§4.5
    // item 1's automatic DATA_STALE recovery).
    state.guard.safety.observe_fresh_tick(now_ms);

    let bar_range = state.bar_tracker.observe(now_ms, tick.mid);
    state.guard.performance.update(now_ms, sizing.equity_usd);

    if let Some(mut position) = state.position.take() {
        manage_open_position(state, &mut position, tick, now_ms, config, fees, &mut effects);
        if !position.is_fully_closed() {
            state.position = Some(position);
        }
    } else if state.guard.should_attempt_entries(now_ms) {
        try_enter(state, tick, bar_range, raw_levels, sizing, config, fees, &mut effects);
    }

    Metrics::safety_state(safety_state_code(state.guard.status(now_ms)));
    effects
}

#[allow(clippy::too_many_arguments)]
fn manage_open_position(
    state: &mut EngineState,
    position: &mut Position,
    tick: &MarketTick,
    now_ms: i64,
    config: &TradeConfig,
    fees: &FeeSchedule,
    effects: &mut EffectsQueue,
) {
    let opposing = state.structure_cache.snapshot.as_ref().and_then(|snapshot| {
        regime_side(
            snapshot.rails,
            tick.mid,
            config.decision.central_band_low,
            config.decision.central_band_high,
        )
    });
    let regime_shift = opposing == Some(position.side.opposite());
    let current_quality = state.structure_cache.snapshot.as_ref().map(|s| s.quality);
    let map_ratio = match current_quality {
        Some(q) if !position.entry_context.map_strength.is_zero() => {
            q / position.entry_context.map_strength
        }
        _ => Decimal::ONE,
    };
    update_streaks(position, tick, regime_shift, map_ratio, &config.exit);
    position.observe_mark(tick.mid);

    let stress_active = tick.c_shock >= STRESS_C_SHOCK_THRESHOLD;

    let signal = evaluate(
        position,
        tick,
        now_ms,
        &config.exit,
        stress_active,
        opposing,
        fees,
        EXIT_EXECUTION_MODE,
    );

    match signal {
        None => {
            trail_tp2(position, tick.mid, now_ms, &config.exit);
        }
        Some(ExitSignal::TpPartial) => {
            let (closed, gross) = position.apply_partial_close(tick.mid, config.exit.tp1_partial_fraction);
            effects.push_notification(NotificationEvent::info(
                format!(
                    "{:?} position tp1 partial close: {closed:?} @ {:?}, gross={gross}",
                    position.side, tick.mid
                ),
                now_ms,
            ));
        }
        Some(signal) => {
            if is_depth_aware(signal) {
                position.depth_exit.last_signal = Some(exit_signal_name(signal).to_string());
                position.depth_exit.last_fired_at_ms = Some(now_ms);
            }
            close_position(state, position, tick, now_ms, signal, fees, effects);
        }
    }
}

fn close_position(
    state: &mut EngineState,
    position: &mut Position,
    tick: &MarketTick,
    now_ms: i64,
    signal: ExitSignal,
    fees: &FeeSchedule,
    effects: &mut EffectsQueue,
) {
    let remaining = position.size;
    let final_gross = position.gross_pnl_usd(tick.mid, remaining);
    position.reduce(remaining);

    let gross_pnl_usd = position.realized_partial_pnl_usd + final_gross;

    let entry_notional = position.entry_price.inner() * position.initial_size.inner();
    let exit_notional = tick.mid.inner() * position.initial_size.inner();
    let entry_fee_usd = fees.fee_usd(entry_notional, position.entry_execution_mode);
    let exit_fee_usd = fees.fee_usd(exit_notional, EXIT_EXECUTION_MODE);
    let net_pnl_usd = gross_pnl_usd - entry_fee_usd - exit_fee_usd;

    let reason = exit_signal_name(signal);
    let was_timeout_loss = matches!(signal, ExitSignal::TimeoutLossOnly);

    state.stats.record_trade(
        railgate_position::TradeRecord {
            side: position.side,
            entry_price: position.entry_price,
            exit_price: tick.mid,
            size: position.initial_size,
            gross_pnl_usd,
            net_pnl_usd,
            entry_timestamp_ms: position.entry_timestamp_ms,
            exit_timestamp_ms: now_ms,
            exit_reason: reason.to_string(),
        },
        now_ms,
    );

    if matches!(signal, ExitSignal::HardStopLoss) {
        state.guard.risk.on_hard_stop(now_ms);
    }
    state.guard.risk.on_trade_closed(now_ms, net_pnl_usd, was_timeout_loss);
    state.guard.performance.record_realized_pnl(now_ms, net_pnl_usd);
    if state.guard.risk.timeout_loss_alert() {
        effects.push_notification(NotificationEvent::warning(
            format!("{:?} position: repeated timeout-loss exits, strategy may be holding too long", position.side),
            now_ms,
        ));
    }

    let holding_ms = position.holding_ms(now_ms);
    let pnl_bps = if entry_notional.is_zero() {
        Decimal::ZERO
    } else {
        net_pnl_usd / entry_notional * Decimal::from(10_000)
    };
    Metrics::trade_pnl(reason, decimal_to_f64(pnl_bps));
    Metrics::position_holding_time(reason, holding_ms as f64);

    let planned_move_usd = (position.rail_tp_price.inner() - position.entry_price.inner()).abs();
    let captured_move_usd = (tick.mid.inner() - position.entry_price.inner()).abs();
    let tp2_move_usd = position
        .entry_context
        .planned_tp2_price
        .map_or(Decimal::ZERO, |p| (p.inner() - position.entry_price.inner()).abs());
    let edge_move_usd = position
        .entry_context
        .planned_edge_price
        .map_or(Decimal::ZERO, |p| (p.inner() - position.entry_price.inner()).abs());

    let capture = CaptureMetrics::compute(planned_move_usd, captured_move_usd);
    let regret = CounterfactualRegret::compute(captured_move_usd, tp2_move_usd, edge_move_usd);

    let record = TradeLogRecord {
        trade_id: Uuid::new_v4(),
        entry_timestamp_ms: position.entry_timestamp_ms,
        exit_timestamp_ms: now_ms,
        hold_ms: holding_ms,
        side: LogSide::from(position.side),
        entry_price: position.entry_price,
        exit_price: tick.mid,
        size: position.initial_size,
        notional_usd: entry_notional,
        gross_pnl_usd,
        net_pnl_usd,
        entry_fee_usd,
        exit_fee_usd,
        entry_execution_mode: position.entry_execution_mode,
        exit_execution_mode: EXIT_EXECUTION_MODE,
        result: TradeResult::from_net_pnl(net_pnl_usd),
        exit_reason: reason.to_string(),
        exit_signal: Some(reason.to_string()),
        exit_detail: None,
        tp_px: Some(position.rail_tp_price),
        tp1_price: Some(position.rail_tp_price),
        tp2_price: position.entry_context.planned_tp2_price,
        stretch_ratio: position.stretch_ratio,
        max_adverse_ratio: position.max_adverse_ratio,
        worst_px: position.worst_px,
        capture,
        regret,
        entry_context: LoggedEntryContext {
            planned_tp_usd: planned_move_usd,
            map_strength: position.entry_context.map_strength,
            path_depth: position.entry_context.path_depth,
            cluster_count: position.entry_context.cluster_count,
            structural_distance_usd: position.entry_context.structural_distance_usd,
        },
        revision: state.next_trade_revision(),
        quality: LogQuality::Ok,
        schema_version: SCHEMA_VERSION,
    };
    effects.push_trade_log(record);

    effects.push_notification(NotificationEvent::info(
        format!("{:?} position closed: {reason} net_pnl={net_pnl_usd}", position.side),
        now_ms,
    ));
}

fn decimal_to_f64(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}

#[allow(clippy::too_many_arguments)]
fn try_enter(
    state: &mut EngineState,
    tick: &MarketTick,
    bar_range: railgate_structure::BarRange,
    raw_levels: &[RawLevel],
    sizing: &SizingInputs,
    config: &TradeConfig,
    fees: &FeeSchedule,
    effects: &mut EffectsQueue,
) {
    let guard_result = state.guard.check_entries(tick.timestamp_ms);
    if let railgate_guard::GuardResult::Blocked { gate, .. } = &guard_result {
        Metrics::gate_blocked(gate);
        return;
    }

    let Some((rails, sr_view, quality)) =
        ensure_structure(state, tick, bar_range, raw_levels, &config.structure)
    else {
        return;
    };
    Metrics::structure_quality(decimal_to_f64(quality));

    let recent_ratios = state.capture_ratios_slice();
    let decision = decide_trade_b2(
        tick,
        false,
        rails,
        quality,
        &sr_view,
        *sizing,
        &config.decision,
        fees,
        &recent_ratios,
    );

    let Some(side) = decision.side else {
        if let Some((gate, _)) = decision.diagnostics.entries.first() {
            Metrics::gate_blocked(gate);
        }
        return;
    };

    let guard_scalar = state.guard.size_scalar(tick.timestamp_ms);
    let scaled_size = railgate_core::Size::new(decision.size_coin.inner() * guard_scalar);
    let entry_profile = decision.entry_profile;
    let mode = entry_profile.map_or(ExecutionMode::Taker, |p| p.mode);

    let entry_context = EntryContext {
        reason: decision.reason.clone(),
        structure_quality: decision.structure_quality_at_entry,
        firepower: sizing.directional_firepower,
        entry_quality_score: entry_profile.map_or(Decimal::ZERO, |p| p.entry_quality_score),
        map_strength: quality,
        path_depth: sr_view.path_depth,
        cluster_count: sr_view.cluster_count,
        structural_distance_usd: decision.tp_distance_usd,
        planned_tp2_price: decision.tp_ladder.map(|l| l.tp2),
        planned_edge_price: decision.tp_ladder.map(|l| l.edge),
    };

    let Some(tp_px) = decision.tp_px else {
        return;
    };

    let entry_band_notional_usd: Decimal = match side {
        Side::Buy => tick.bid_ladder.iter().map(|l| l.notional_usd).sum(),
        Side::Sell => tick.ask_ladder.iter().map(|l| l.notional_usd).sum(),
    };
    let position = Position::open(
        side,
        tick.mid,
        tick.timestamp_ms,
        scaled_size,
        mode,
        entry_context,
        tp_px,
        entry_band_notional_usd,
    );

    let side_label = match side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    };
    Metrics::signal_triggered(side_label);
    Metrics::entry_edge(side_label, decimal_to_f64(decision.tp_distance_usd));

    effects.push_notification(NotificationEvent::info(
        format!("{side_label} entry opened @ {:?}, size={scaled_size:?}", tick.mid),
        tick.timestamp_ms,
    ));

    state.position = Some(position);
}

#[cfg(test)]
mod tests {
    use super::*;
    use railgate_config::TradeConfig;
    use railgate_core::{LadderLevel, Price, Size};
    use railgate_decision::SizeFactors;
    use railgate_structure::RawLevel;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn tick(mid: Decimal, ts: i64, epoch: u64) -> MarketTick {
        MarketTick::try_normalize(
            Price::new(mid),
            Price::new(mid - dec!(1)),
            Price::new(mid + dec!(1)),
            vec![LadderLevel::new(Price::new(mid - dec!(1)), Size::new(dec!(10)))],
            vec![LadderLevel::new(Price::new(mid + dec!(1)), Size::new(dec!(10)))],
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::from(1_000_000),
            HashMap::new(),
            ts,
            epoch,
        )
        .unwrap()
    }

    fn config() -> TradeConfig {
        let json = r#"{
            "min_band_distance_usd": "10",
            "min_expected_usd": "5",
            "capital_stage_bands": [
                {"min_equity_usd": "0", "max_equity_usd": "1000000", "size_scalar": "1"}
            ]
        }"#;
        let mut c: TradeConfig = serde_json::from_str(json).unwrap();
        c.startup.no_order_ms = 0;
        c.startup.window_ms = 0;
        c
    }

    fn sizing() -> SizingInputs {
        SizingInputs {
            equity_usd: dec!(10000),
            risk_ratio: dec!(0.02),
            trend_strength: dec!(0.8),
            directional_firepower: dec!(1),
            size_factors: SizeFactors {
                entry_quality: dec!(1),
                structure_quality: dec!(1),
                startup: dec!(1),
                flow: dec!(1),
                impact: dec!(1),
                acceleration: dec!(1),
                ctx_ws: dec!(1),
                ladder_attack: dec!(1),
            },
        }
    }

    fn raw_levels(support: Decimal) -> Vec<RawLevel> {
        vec![RawLevel {
            price: Price::new(support),
            notional_usd: dec!(10000),
        }]
    }

    #[test]
    fn stays_flat_while_bar_is_not_ready() {
        let config = config();
        let mut state = EngineState::new(&config, 0, sizing().equity_usd);
        let fees = FeeSchedule::default();
        let t = tick(dec!(100000), 0, 1);
        let effects = update_engine(&mut state, &t, &raw_levels(dec!(99000)), &sizing(), &config, &fees);
        assert!(!state.has_open_position());
        assert!(effects.into_vec().is_empty());
    }

    #[test]
    fn opens_a_position_once_bar_range_and_edge_conditions_are_met() {
        let config = config();
        let mut state = EngineState::new(&config, 0, sizing().equity_usd);
        let fees = FeeSchedule::default();

        // Warm the bar tracker up to a wide range first.
        update_engine(&mut state, &tick(dec!(100000), 0, 1), &raw_levels(dec!(101500)), &sizing(), &config, &fees);
        update_engine(
            &mut state,
            &tick(dec!(110000), 60 * 60_000, 1),
            &raw_levels(dec!(101500)),
            &sizing(),
            &config,
            &fees,
        );
        // Back near the lower rail: should trigger a long entry.
        update_engine(
            &mut state,
            &tick(dec!(100050), 60 * 60_000 + 1, 1),
            &raw_levels(dec!(101500)),
            &sizing(),
            &config,
            &fees,
        );

        assert!(state.has_open_position());
    }
}
