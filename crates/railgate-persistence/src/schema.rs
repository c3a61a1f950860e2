//! The full trade-log record (§6): every field a closed fill's JSONL
//! line carries, beyond the lightweight in-memory `TradeRecord` the
//! position ledger keeps for stats/APR. Built once, at the moment a
//! position closes, from the position's entry context plus whatever
//! capture/regret metrics the driver computed against the TP ladder.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use railgate_core::{Price, Side, Size};
use railgate_decision::ExecutionMode;

/// Schema version stamped on every record, bumped whenever a field is
/// added or removed so downstream readers can branch on it.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogSide {
    Long,
    Short,
}

impl From<Side> for LogSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => Self::Long,
            Side::Sell => Self::Short,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeResult {
    Win,
    Loss,
    Flat,
}

impl TradeResult {
    #[must_use]
    pub fn from_net_pnl(net_pnl_usd: Decimal) -> Self {
        if net_pnl_usd > Decimal::ZERO {
            Self::Win
        } else if net_pnl_usd < Decimal::ZERO {
            Self::Loss
        } else {
            Self::Flat
        }
    }
}

/// Whether every field this record could in principle carry was
/// actually available at close time (`Partial` when an upstream input —
/// e.g. a missing entry-context snapshot — forced a zeroed field rather
/// than an omitted one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogQuality {
    Ok,
    Partial,
}

/// Planned-vs-realized move metrics (§4.2 TP cap self-calibration
/// input): `captureRatio` is what the decision engine's dynamic TP-cap
/// self-calibration reads back from the trade log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetrics {
    pub planned_move_usd: Decimal,
    pub captured_move_usd: Decimal,
    pub capture_ratio: Decimal,
}

impl CaptureMetrics {
    #[must_use]
    pub fn compute(planned_move_usd: Decimal, captured_move_usd: Decimal) -> Self {
        let capture_ratio = if planned_move_usd.is_zero() {
            Decimal::ZERO
        } else {
            captured_move_usd / planned_move_usd
        };
        Self {
            planned_move_usd,
            captured_move_usd,
            capture_ratio,
        }
    }
}

/// Counterfactual regret against the ladder's untaken targets: how much
/// better the trade could have done had it held to tp2, to the channel
/// edge, or to whichever of the two was best.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualRegret {
    pub to_tp2_usd: Decimal,
    pub to_edge_usd: Decimal,
    pub max_usd: Decimal,
}

impl CounterfactualRegret {
    #[must_use]
    pub fn compute(captured_move_usd: Decimal, tp2_move_usd: Decimal, edge_move_usd: Decimal) -> Self {
        let to_tp2_usd = (tp2_move_usd - captured_move_usd).max(Decimal::ZERO);
        let to_edge_usd = (edge_move_usd - captured_move_usd).max(Decimal::ZERO);
        Self {
            to_tp2_usd,
            to_edge_usd,
            max_usd: to_tp2_usd.max(to_edge_usd),
        }
    }
}

/// Snapshot of the structural conditions that justified the entry,
/// carried through to the log record for post-hoc analysis (§6 "entry
/// context").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoggedEntryContext {
    pub planned_tp_usd: Decimal,
    pub map_strength: Decimal,
    pub path_depth: u32,
    pub cluster_count: u32,
    pub structural_distance_usd: Decimal,
}

/// One complete closed-trade record (§6). This is the shape that goes
/// to disk; `railgate-position::TradeRecord` is the lighter in-memory
/// shape the stats ledger keeps for win/loss/APR bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLogRecord {
    pub trade_id: Uuid,
    pub entry_timestamp_ms: i64,
    pub exit_timestamp_ms: i64,
    pub hold_ms: i64,

    pub side: LogSide,
    pub entry_price: Price,
    pub exit_price: Price,
    pub size: Size,
    pub notional_usd: Decimal,

    pub gross_pnl_usd: Decimal,
    pub net_pnl_usd: Decimal,
    pub entry_fee_usd: Decimal,
    pub exit_fee_usd: Decimal,
    pub entry_execution_mode: ExecutionMode,
    pub exit_execution_mode: ExecutionMode,
    pub result: TradeResult,

    pub exit_reason: String,
    pub exit_signal: Option<String>,
    pub exit_detail: Option<String>,

    pub tp_px: Option<Price>,
    pub tp1_price: Option<Price>,
    pub tp2_price: Option<Price>,
    pub stretch_ratio: Decimal,

    pub max_adverse_ratio: Decimal,
    pub worst_px: Price,

    pub capture: CaptureMetrics,
    pub regret: CounterfactualRegret,
    pub entry_context: LoggedEntryContext,

    pub revision: u32,
    pub quality: LogQuality,
    pub schema_version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn log_side_maps_from_core_side() {
        assert_eq!(LogSide::from(Side::Buy), LogSide::Long);
        assert_eq!(LogSide::from(Side::Sell), LogSide::Short);
    }

    #[test]
    fn trade_result_classifies_by_net_pnl_sign() {
        assert_eq!(TradeResult::from_net_pnl(dec!(1)), TradeResult::Win);
        assert_eq!(TradeResult::from_net_pnl(dec!(-1)), TradeResult::Loss);
        assert_eq!(TradeResult::from_net_pnl(dec!(0)), TradeResult::Flat);
    }

    #[test]
    fn capture_ratio_is_move_fraction() {
        let metrics = CaptureMetrics::compute(dec!(100), dec!(40));
        assert_eq!(metrics.capture_ratio, dec!(0.4));
    }

    #[test]
    fn regret_is_zero_when_capture_matches_or_beats_targets() {
        let regret = CounterfactualRegret::compute(dec!(100), dec!(80), dec!(60));
        assert_eq!(regret.to_tp2_usd, Decimal::ZERO);
        assert_eq!(regret.to_edge_usd, Decimal::ZERO);
        assert_eq!(regret.max_usd, Decimal::ZERO);
    }

    #[test]
    fn regret_tracks_the_larger_untaken_target() {
        let regret = CounterfactualRegret::compute(dec!(40), dec!(100), dec!(70));
        assert_eq!(regret.to_tp2_usd, dec!(60));
        assert_eq!(regret.to_edge_usd, dec!(30));
        assert_eq!(regret.max_usd, dec!(60));
    }
}
