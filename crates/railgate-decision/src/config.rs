//! Tunable thresholds for the B2 decision engine (§4.2). Composed into
//! the workspace-wide `TradeConfig` by the config crate; clamped to the
//! ranges documented here whenever that composition happens.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Edge threshold as a ratio of channel span.
    #[serde(default = "default_edge_base_ratio")]
    pub edge_base_ratio: Decimal,
    #[serde(default = "default_min_threshold_usd")]
    pub min_threshold_usd: Decimal,
    #[serde(default = "default_max_threshold_usd")]
    pub max_threshold_usd: Decimal,
    /// channelT band considered "central hold", symmetric around 0.5.
    #[serde(default = "default_central_band_low")]
    pub central_band_low: Decimal,
    #[serde(default = "default_central_band_high")]
    pub central_band_high: Decimal,
    #[serde(default = "default_min_step_usd")]
    pub min_step_usd: Decimal,
    #[serde(default = "default_arena_step_ratio")]
    pub arena_step_ratio: Decimal,
    #[serde(default = "default_tp_normal_max_t")]
    pub tp_normal_max_t: Decimal,
    #[serde(default = "default_min_map_strength_for_continuation")]
    pub min_map_strength_for_continuation: Decimal,
    #[serde(default = "default_min_path_depth_for_continuation")]
    pub min_path_depth_for_continuation: u32,
    #[serde(default = "default_base_span_ratio")]
    pub base_span_ratio: Decimal,
    #[serde(default = "default_min_cap_usd")]
    pub min_cap_usd: Decimal,
    #[serde(default = "default_max_cap_usd")]
    pub max_cap_usd: Decimal,
    #[serde(default = "default_min_structural_tp_distance")]
    pub min_structural_tp_distance: Decimal,
    #[serde(default = "default_min_notional")]
    pub min_notional: Decimal,
    #[serde(default = "default_max_notional")]
    pub max_notional: Decimal,
    #[serde(default = "default_effective_equity_cap_usd")]
    pub effective_equity_cap_usd: Decimal,
    #[serde(default = "default_max_size_boost_mul")]
    pub max_size_boost_mul: Decimal,
    #[serde(default = "default_strict_min_net_floor")]
    pub strict_min_net_floor: bool,
    #[serde(default = "default_min_net_usd")]
    pub min_net_usd: Decimal,
    #[serde(default = "default_min_net_per_100")]
    pub min_net_per_100: Decimal,
    #[serde(default = "default_max_size_scalar")]
    pub max_size_scalar: Decimal,
    /// Hostile funding rate magnitude above which `ctx_micro_gate` blocks
    /// entries on the side that would be paying into the crowd.
    #[serde(default = "default_max_hostile_funding_rate")]
    pub max_hostile_funding_rate: Decimal,
    /// Hostile mark-oracle premium magnitude (bps) above which
    /// `ctx_micro_gate` blocks entries in the direction of the premium.
    #[serde(default = "default_max_hostile_premium_bps")]
    pub max_hostile_premium_bps: Decimal,
    /// Open-interest trap: a velocity (bps) below which price is
    /// considered stalled while OI keeps building against the side.
    #[serde(default = "default_oi_trap_velocity_bps")]
    pub oi_trap_velocity_bps: Decimal,
    /// Open interest above which a stalled price is treated as a trap
    /// rather than ordinary quiet trading.
    #[serde(default = "default_oi_trap_min_oi")]
    pub oi_trap_min_oi: Decimal,
    /// Fraction of the planned TP distance a position is expected to
    /// actually realize, applied to the fee-edge guard's expected-gross
    /// estimate (§4.2 feeEdgeGuard).
    #[serde(default = "default_expectancy_realization_factor")]
    pub expectancy_realization_factor: Decimal,
}

fn default_edge_base_ratio() -> Decimal {
    Decimal::new(8, 2) // 0.08
}
fn default_min_threshold_usd() -> Decimal {
    Decimal::from(50)
}
fn default_max_threshold_usd() -> Decimal {
    Decimal::from(2000)
}
fn default_central_band_low() -> Decimal {
    Decimal::new(35, 2) // 0.35
}
fn default_central_band_high() -> Decimal {
    Decimal::new(65, 2) // 0.65
}
fn default_min_step_usd() -> Decimal {
    Decimal::from(30)
}
fn default_arena_step_ratio() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_tp_normal_max_t() -> Decimal {
    Decimal::new(8, 1) // 0.8
}
fn default_min_map_strength_for_continuation() -> Decimal {
    Decimal::new(65, 2) // 0.65
}
fn default_min_path_depth_for_continuation() -> u32 {
    2
}
fn default_base_span_ratio() -> Decimal {
    Decimal::new(6, 1) // 0.6
}
fn default_min_cap_usd() -> Decimal {
    Decimal::from(50)
}
fn default_max_cap_usd() -> Decimal {
    Decimal::from(5000)
}
fn default_min_structural_tp_distance() -> Decimal {
    Decimal::from(20)
}
fn default_min_notional() -> Decimal {
    Decimal::from(100)
}
fn default_max_notional() -> Decimal {
    Decimal::from(20000)
}
fn default_effective_equity_cap_usd() -> Decimal {
    Decimal::from(50000)
}
fn default_max_size_boost_mul() -> Decimal {
    Decimal::from(3)
}
fn default_strict_min_net_floor() -> bool {
    false
}
fn default_min_net_usd() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_min_net_per_100() -> Decimal {
    Decimal::new(1, 1) // 0.1
}
fn default_max_size_scalar() -> Decimal {
    Decimal::from(3)
}
fn default_max_hostile_funding_rate() -> Decimal {
    Decimal::new(1, 3) // 0.001 per funding interval
}
fn default_max_hostile_premium_bps() -> Decimal {
    Decimal::from(15)
}
fn default_oi_trap_velocity_bps() -> Decimal {
    Decimal::new(2, 1) // 0.2 bps: effectively stalled
}
fn default_oi_trap_min_oi() -> Decimal {
    Decimal::from(5_000_000)
}
fn default_expectancy_realization_factor() -> Decimal {
    Decimal::new(7, 1) // 0.7
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            edge_base_ratio: default_edge_base_ratio(),
            min_threshold_usd: default_min_threshold_usd(),
            max_threshold_usd: default_max_threshold_usd(),
            central_band_low: default_central_band_low(),
            central_band_high: default_central_band_high(),
            min_step_usd: default_min_step_usd(),
            arena_step_ratio: default_arena_step_ratio(),
            tp_normal_max_t: default_tp_normal_max_t(),
            min_map_strength_for_continuation: default_min_map_strength_for_continuation(),
            min_path_depth_for_continuation: default_min_path_depth_for_continuation(),
            base_span_ratio: default_base_span_ratio(),
            min_cap_usd: default_min_cap_usd(),
            max_cap_usd: default_max_cap_usd(),
            min_structural_tp_distance: default_min_structural_tp_distance(),
            min_notional: default_min_notional(),
            max_notional: default_max_notional(),
            effective_equity_cap_usd: default_effective_equity_cap_usd(),
            max_size_boost_mul: default_max_size_boost_mul(),
            strict_min_net_floor: default_strict_min_net_floor(),
            min_net_usd: default_min_net_usd(),
            min_net_per_100: default_min_net_per_100(),
            max_size_scalar: default_max_size_scalar(),
            max_hostile_funding_rate: default_max_hostile_funding_rate(),
            max_hostile_premium_bps: default_max_hostile_premium_bps(),
            oi_trap_velocity_bps: default_oi_trap_velocity_bps(),
            oi_trap_min_oi: default_oi_trap_min_oi(),
            expectancy_realization_factor: default_expectancy_realization_factor(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_ordering() {
        let c = DecisionConfig::default();
        assert!(c.min_threshold_usd < c.max_threshold_usd);
        assert!(c.central_band_low < c.central_band_high);
        assert!(c.min_cap_usd < c.max_cap_usd);
        assert!(c.min_notional < c.max_notional);
    }
}
