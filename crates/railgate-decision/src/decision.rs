//! The B2 decision engine (§4.2): `decide_trade_b2` turns a market tick
//! plus structure snapshot into a `Decision` packet.
//!
//! Gate composition follows the same "prerequisite gates return early,
//! side-effecting gates run only after prerequisites pass" ordering used
//! elsewhere in this workspace's risk-gate layer: each gate returns a
//! `GateResult` and the first block wins.

use rust_decimal::Decimal;

use railgate_core::{MarketTick, Price, Side, Size, TradeFlowWindow};
use railgate_structure::{Rails, SrClusterType, SrClusterView};

use crate::config::DecisionConfig;
use crate::fee::{ExecutionMode, FeeSchedule};
use crate::signal::{
    Decision, Diagnostics, EntryProfile, Firepower, MarketState, SizeFactors, TpLadder, TpPhase,
    TpSource,
};

/// Inputs to sizing that are computed upstream (regime alignment,
/// acceleration, flow quality) and passed in already-scored, since their
/// derivation spans subsystems outside this crate's scope.
#[derive(Debug, Clone, Copy)]
pub struct SizingInputs {
    pub equity_usd: Decimal,
    pub risk_ratio: Decimal,
    pub trend_strength: Decimal,
    pub directional_firepower: Decimal,
    pub size_factors: SizeFactors,
}

/// Result of a single entry gate check.
#[derive(Debug, Clone)]
pub enum GateResult {
    Pass,
    Blocked { gate: &'static str, reason: String },
}

impl GateResult {
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

fn sr_reference_cluster_gate(sr_view: &SrClusterView) -> GateResult {
    if sr_view.cluster_count == 0 {
        return GateResult::Blocked {
            gate: "sr_reference_cluster",
            reason: "no_near_sr".into(),
        };
    }
    GateResult::Pass
}

fn containment_gate(rails: &Rails, mid: Price) -> GateResult {
    let t = rails.channel_t(mid);
    if !(Decimal::ZERO..=Decimal::ONE).contains(&t) {
        return GateResult::Blocked {
            gate: "containment",
            reason: "mid_outside_channel".into(),
        };
    }
    GateResult::Pass
}

fn entry_flow_gate(tick: &MarketTick, side: Side) -> GateResult {
    let short = tick.flow(TradeFlowWindow::Ms5000);
    let long = tick.flow(TradeFlowWindow::Ms60000);
    if let (Some(short), Some(long)) = (short, long) {
        let hostile = match side {
            Side::Buy => short.flow_pressure < Decimal::ZERO && long.flow_pressure >= Decimal::ZERO,
            Side::Sell => short.flow_pressure > Decimal::ZERO && long.flow_pressure <= Decimal::ZERO,
        };
        if hostile {
            return GateResult::Blocked {
                gate: "entry_flow",
                reason: "flow_divergence".into(),
            };
        }
    }
    GateResult::Pass
}

/// Funding/premium micro-structure gate: blocks a side that would be
/// paying a hostile funding rate or entering against a large mark-oracle
/// premium, both signs the crowd is already leaning the other way.
fn ctx_micro_gate(tick: &MarketTick, side: Side, config: &DecisionConfig) -> GateResult {
    let hostile_funding = match side {
        Side::Buy => tick.funding_rate >= config.max_hostile_funding_rate,
        Side::Sell => tick.funding_rate <= -config.max_hostile_funding_rate,
    };
    if hostile_funding {
        return GateResult::Blocked {
            gate: "ctx_micro",
            reason: "hostile_funding".into(),
        };
    }
    let hostile_premium = match side {
        Side::Buy => tick.mark_oracle_premium_bps >= config.max_hostile_premium_bps,
        Side::Sell => tick.mark_oracle_premium_bps <= -config.max_hostile_premium_bps,
    };
    if hostile_premium {
        return GateResult::Blocked {
            gate: "ctx_micro",
            reason: "hostile_premium".into(),
        };
    }
    GateResult::Pass
}

/// Open-interest/price trap gate: OI building while price has stalled
/// is a classic trapped-crowd setup — block rather than join it.
fn oi_price_trap_gate(tick: &MarketTick, config: &DecisionConfig) -> GateResult {
    let stalled = tick.price_velocity_bps.abs() <= config.oi_trap_velocity_bps;
    if stalled && tick.open_interest >= config.oi_trap_min_oi {
        return GateResult::Blocked {
            gate: "oi_price_trap",
            reason: "oi_price_trap".into(),
        };
    }
    GateResult::Pass
}

fn thin_order_book_gate(tick: &MarketTick) -> GateResult {
    if tick.bid_ladder.is_empty() || tick.ask_ladder.is_empty() {
        return GateResult::Blocked {
            gate: "thin_order_book",
            reason: "missing_side".into(),
        };
    }
    GateResult::Pass
}

fn fee_edge_guard(
    notional: Decimal,
    size_coin: Decimal,
    tp_distance_usd: Decimal,
    mode: ExecutionMode,
    fees: &FeeSchedule,
    config: &DecisionConfig,
) -> GateResult {
    if tp_distance_usd.is_zero() {
        return GateResult::Blocked {
            gate: "fee_edge_guard",
            reason: "zero_tp_distance".into(),
        };
    }
    // §4.2 feeEdgeGuard: expected gross = tpDistance * size * expectancyRealizationFactor.
    let gross = tp_distance_usd * size_coin * config.expectancy_realization_factor;
    let fee = fees.fee_usd(notional, mode) * Decimal::TWO; // entry + exit
    let net = gross - fee;
    let per_100 = if notional.is_zero() {
        Decimal::ZERO
    } else {
        net / (notional / Decimal::from(100))
    };
    if net < config.min_net_usd || per_100 < config.min_net_per_100 {
        return GateResult::Blocked {
            gate: "fee_edge_guard",
            reason: "edge_negative".into(),
        };
    }
    GateResult::Pass
}

/// `edgeThresholdUsd = clamp(span * edgeBaseRatio, minThresholdUsd, maxThresholdUsd)`.
fn edge_threshold_usd(span: Decimal, config: &DecisionConfig) -> Decimal {
    (span * config.edge_base_ratio).clamp(config.min_threshold_usd, config.max_threshold_usd)
}

/// Dynamic cap on TP distance, derived from channel span and optionally
/// self-calibrated against the median capture ratio of recent trades.
fn tp_distance_cap(
    span: Decimal,
    recent_capture_ratios: &[Decimal],
    config: &DecisionConfig,
) -> Decimal {
    let mut cap = span * config.base_span_ratio;
    if !recent_capture_ratios.is_empty() {
        let mut sorted = recent_capture_ratios.to_vec();
        sorted.sort();
        let median = sorted[sorted.len() / 2];
        cap *= median.max(Decimal::new(1, 1));
    }
    let cap = cap.clamp(config.min_cap_usd, config.max_cap_usd);
    cap.max(config.min_structural_tp_distance)
}

/// Plans the TP ladder from clusters on the decided side, within the
/// dynamic cap, preferring the nearest surviving line past the arena-step
/// barrier.
fn plan_tp(
    rails: &Rails,
    mid: Price,
    side: Side,
    sr_view: &SrClusterView,
    config: &DecisionConfig,
    recent_capture_ratios: &[Decimal],
) -> Option<(Price, TpLadder, TpSource, TpPhase, Decimal)> {
    let span = rails.span();
    let step_usd = config
        .min_step_usd
        .max(span * config.arena_step_ratio);
    let cap = tp_distance_cap(span, recent_capture_ratios, config);
    let half_span = span / Decimal::TWO;

    let candidates: Vec<_> = sr_view
        .clusters
        .iter()
        .filter(|c| match side {
            Side::Buy => c.center_price.inner() > mid.inner(),
            Side::Sell => c.center_price.inner() < mid.inner(),
        })
        .filter(|c| matches!(c.cluster_type, SrClusterType::Support | SrClusterType::Resistance))
        .filter(|c| (c.center_price.inner() - mid.inner()).abs() >= step_usd)
        .filter(|c| {
            let channel_mid = (rails.upper.inner() + rails.lower.inner()) / Decimal::TWO;
            if half_span.is_zero() {
                return false;
            }
            let t = (c.center_price.inner() - channel_mid).abs() / half_span;
            t <= config.tp_normal_max_t
        })
        .collect();

    let nearest = candidates
        .iter()
        .min_by_key(|c| (c.center_price.inner() - mid.inner()).abs())?;

    let distance = (nearest.center_price.inner() - mid.inner()).abs().min(cap);
    let tp_px = match side {
        Side::Buy => Price::new(mid.inner() + distance),
        Side::Sell => Price::new(mid.inner() - distance),
    };

    let has_second_line = candidates.len() >= 2;
    let phase = if has_second_line
        && sr_view.map_strength >= config.min_map_strength_for_continuation
        && sr_view.path_depth >= config.min_path_depth_for_continuation
    {
        TpPhase::Continuation
    } else {
        TpPhase::Reaction
    };

    let edge_px = match side {
        Side::Buy => rails.upper,
        Side::Sell => rails.lower,
    };
    let tp2_distance = distance * Decimal::new(15, 1);
    let tp2_px = match side {
        Side::Buy => Price::new(mid.inner() + tp2_distance.min(cap)),
        Side::Sell => Price::new(mid.inner() - tp2_distance.min(cap)),
    };

    let ladder = TpLadder {
        tp1: tp_px,
        tp2: tp2_px,
        edge: edge_px,
    };

    Some((tp_px, ladder, TpSource::SrCluster, phase, distance))
}

/// Sizing per §4.2: raw notional from equity/risk/TP-distance, scaled by
/// firepower and the combined size-scalar, clamped to effective-equity
/// bands, with auto-boost toward the minimum-net-worthy notional.
/// Step 3 (`sizeCoin = notional / mid`) requires `mid` as an input — the
/// engine cannot size a position in coins without the price it trades at.
fn size_position(
    mid: Price,
    tp_distance_usd: Decimal,
    inputs: &SizingInputs,
    config: &DecisionConfig,
    fees: &FeeSchedule,
    mode: ExecutionMode,
) -> (Size, Decimal, bool) {
    let firepower = Firepower::from_trend_strength(inputs.trend_strength);
    let combined_scalar = inputs.size_factors.combined(config.max_size_scalar);

    let raw_notional = if tp_distance_usd.is_zero() {
        Decimal::ZERO
    } else {
        (inputs.equity_usd * inputs.risk_ratio / tp_distance_usd)
            * firepower.multiplier()
            * inputs.directional_firepower.max(Decimal::new(1, 1))
            * combined_scalar
    };

    let mut notional = raw_notional.clamp(config.min_notional, config.max_notional);

    // Gross edge per dollar of notional invested, independent of size:
    // `gross / notional = (tpDistance * (notional/mid)) / notional = tpDistance / mid`.
    let edge_per_usd_notional = if mid.inner().is_zero() {
        Decimal::ZERO
    } else {
        tp_distance_usd / mid.inner()
    };

    let estimated_net = notional * edge_per_usd_notional * config.expectancy_realization_factor
        - fees.fee_usd(notional, mode) * Decimal::TWO;

    let mut boosted = false;
    if estimated_net < config.min_net_usd && !edge_per_usd_notional.is_zero() {
        let required = config.min_net_usd / (edge_per_usd_notional * config.expectancy_realization_factor);
        let ceiling = if config.strict_min_net_floor {
            (notional * config.max_size_boost_mul).min(config.max_notional)
        } else {
            config.max_notional
        };
        let boosted_notional = required.clamp(notional, ceiling);
        if boosted_notional > notional {
            notional = boosted_notional;
            boosted = true;
        }
    }

    let size_coin = if mid.inner().is_zero() {
        Decimal::ZERO
    } else {
        notional / mid.inner()
    };

    (Size::new(size_coin), notional, boosted)
}

/// `decide_trade_b2`: the single entry point of the decision engine.
/// Returns a `Decision` — `side.is_none()` carries the blocking reason
/// in `reason`, never an `Err`, per §7 (gate failures are non-fatal).
#[allow(clippy::too_many_arguments)]
pub fn decide_trade_b2(
    tick: &MarketTick,
    has_open_position: bool,
    rails: Rails,
    structure_quality: Decimal,
    sr_view: &SrClusterView,
    sizing: SizingInputs,
    config: &DecisionConfig,
    fees: &FeeSchedule,
    recent_capture_ratios: &[Decimal],
) -> Decision {
    let mut diagnostics = Diagnostics::default();

    if has_open_position {
        return Decision::none(MarketState::Range, "holding_position", diagnostics);
    }

    let span = rails.span();
    if span <= Decimal::ZERO {
        return Decision::none(MarketState::Range, "no_local_channel", diagnostics);
    }

    let mid = tick.mid;
    let dist_to_upper = rails.upper.inner() - mid.inner();
    let dist_to_lower = mid.inner() - rails.lower.inner();
    if dist_to_upper <= Decimal::ZERO || dist_to_lower <= Decimal::ZERO {
        return Decision::none(MarketState::Range, "no_local_channel", diagnostics);
    }

    let threshold = edge_threshold_usd(span, config);
    let channel_t = rails.channel_t(mid);
    let near_edge = dist_to_upper.min(dist_to_lower) <= threshold
        && !(config.central_band_low..=config.central_band_high).contains(&channel_t);

    if !near_edge {
        return Decision::none(MarketState::Range, "B: mid position", diagnostics);
    }

    let (side, state) = if dist_to_lower < dist_to_upper {
        (Side::Buy, MarketState::Up)
    } else if dist_to_upper < dist_to_lower {
        (Side::Sell, MarketState::Down)
    } else {
        // exact tie: no regime fallback, shorter-distance rule is
        // undefined — default to the lower edge, matching "buy near
        // lower edge" precedence.
        (Side::Buy, MarketState::Up)
    };

    let Some((tp_px, ladder, tp_source, tp_phase, tp_distance)) =
        plan_tp(&rails, mid, side, sr_view, config, recent_capture_ratios)
    else {
        diagnostics.push("tp_plan", "no_structural_path");
        return Decision::none(state, "no_structural_path", diagnostics);
    };

    for gate in [
        sr_reference_cluster_gate(sr_view),
        containment_gate(&rails, mid),
        ctx_micro_gate(tick, side, config),
        oi_price_trap_gate(tick, config),
        entry_flow_gate(tick, side),
        thin_order_book_gate(tick),
    ] {
        if let GateResult::Blocked { gate, reason } = gate {
            diagnostics.push(gate, reason.clone());
            return Decision::none(state, format!("{gate}: {reason}"), diagnostics);
        }
    }

    let mode = ExecutionMode::Taker;
    let (size_coin, notional, fee_edge_boosted) =
        size_position(mid, tp_distance, &sizing, config, fees, mode);

    if let GateResult::Blocked { gate, reason } =
        fee_edge_guard(notional, size_coin.inner(), tp_distance, mode, fees, config)
    {
        diagnostics.push(gate, reason.clone());
        return Decision::none(state, reason, diagnostics);
    }

    let entry_profile = EntryProfile {
        mode,
        aggressiveness: Decimal::ONE,
        entry_quality_score: sizing.size_factors.entry_quality,
        higher_tf_alignment: sizing.directional_firepower,
        fee_edge_boosted,
    };

    Decision {
        state,
        side: Some(side),
        reason: "entry".into(),
        size_coin,
        notional,
        tp_px: Some(tp_px),
        stretch_price: None,
        stretch_ratio: Decimal::ONE,
        stretch_hold_delay_ms: 0,
        tp_distance_usd: tp_distance,
        entry_profile: Some(entry_profile),
        tp_ladder: Some(ladder),
        tp_source: Some(tp_source),
        tp_phase: Some(tp_phase),
        size_factors: Some(sizing.size_factors),
        diagnostics,
        structure_quality_at_entry: structure_quality,
    }
}
