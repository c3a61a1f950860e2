//! Decision output types: the `Decision` packet produced by
//! `decide_trade_b2` and its supporting enums (§4.2).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use railgate_core::{Price, Side, Size};

use crate::fee::ExecutionMode;

/// Coarse directional read of the market, independent of whether an
/// entry gate ultimately blocks the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketState {
    Up,
    Down,
    Range,
}

/// Trend-strength bucket feeding the sizing firepower multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Firepower {
    Weak,
    Normal,
    Strong,
}

impl Firepower {
    #[must_use]
    pub fn multiplier(self) -> Decimal {
        match self {
            Self::Weak => Decimal::new(6, 1),    // 0.6
            Self::Normal => Decimal::ONE,
            Self::Strong => Decimal::new(14, 1), // 1.4
        }
    }

    #[must_use]
    pub fn from_trend_strength(trend_strength: Decimal) -> Self {
        if trend_strength >= Decimal::new(7, 1) {
            Self::Strong
        } else if trend_strength >= Decimal::new(3, 1) {
            Self::Normal
        } else {
            Self::Weak
        }
    }
}

/// Whether the active TP line is a nearby reaction level or part of a
/// longer continuation path (§4.2 tpPhase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TpPhase {
    Continuation,
    Reaction,
}

/// Where the active TP target was sourced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TpSource {
    SrCluster,
    DynamicCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TpLadder {
    pub tp1: Price,
    pub tp2: Price,
    pub edge: Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryProfile {
    pub mode: ExecutionMode,
    pub aggressiveness: Decimal,
    pub entry_quality_score: Decimal,
    pub higher_tf_alignment: Decimal,
    pub fee_edge_boosted: bool,
}

/// Per-component size multipliers, each individually allowed below 1.0 —
/// only the combined product is clamped to `[1, configured_max]` (§9).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeFactors {
    pub entry_quality: Decimal,
    pub structure_quality: Decimal,
    pub startup: Decimal,
    pub flow: Decimal,
    pub impact: Decimal,
    pub acceleration: Decimal,
    pub ctx_ws: Decimal,
    pub ladder_attack: Decimal,
}

impl SizeFactors {
    #[must_use]
    pub fn combined(&self, max_scalar: Decimal) -> Decimal {
        let product = self.entry_quality
            * self.structure_quality
            * self.startup
            * self.flow
            * self.impact
            * self.acceleration
            * self.ctx_ws
            * self.ladder_attack;
        product.clamp(Decimal::ONE, max_scalar)
    }
}

/// Diagnostic record keyed by gate/stage name, carried alongside a
/// `Decision` rather than thrown as an error (§7 Gate-blocked: hold,
/// non-fatal, namespaced reasons).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub entries: Vec<(String, String)>,
}

impl Diagnostics {
    pub fn push(&mut self, gate: impl Into<String>, detail: impl Into<String>) {
        self.entries.push((gate.into(), detail.into()));
    }
}

/// The output of `decide_trade_b2`: either a side-bearing entry plan or
/// a `none` decision carrying the blocking reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub state: MarketState,
    pub side: Option<Side>,
    pub reason: String,
    pub size_coin: Size,
    pub notional: Decimal,
    pub tp_px: Option<Price>,
    pub stretch_price: Option<Price>,
    pub stretch_ratio: Decimal,
    pub stretch_hold_delay_ms: i64,
    pub tp_distance_usd: Decimal,
    pub entry_profile: Option<EntryProfile>,
    pub tp_ladder: Option<TpLadder>,
    pub tp_source: Option<TpSource>,
    pub tp_phase: Option<TpPhase>,
    pub size_factors: Option<SizeFactors>,
    pub diagnostics: Diagnostics,
    pub structure_quality_at_entry: Decimal,
}

impl Decision {
    #[must_use]
    pub fn none(state: MarketState, reason: impl Into<String>, diagnostics: Diagnostics) -> Self {
        Self {
            state,
            side: None,
            reason: reason.into(),
            size_coin: Size::ZERO,
            notional: Decimal::ZERO,
            tp_px: None,
            stretch_price: None,
            stretch_ratio: Decimal::ONE,
            stretch_hold_delay_ms: 0,
            tp_distance_usd: Decimal::ZERO,
            entry_profile: None,
            tp_ladder: None,
            tp_source: None,
            tp_phase: None,
            size_factors: None,
            diagnostics,
            structure_quality_at_entry: Decimal::ZERO,
        }
    }
}
