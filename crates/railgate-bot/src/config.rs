//! Driver-loop runtime configuration.
//!
//! Distinct from [`railgate_config::TradeConfig`], which is the engine's
//! own hot-reloaded document (§4.6, §6): this is the smaller set of
//! knobs the binary itself needs before it can even construct an
//! `EngineState` — where the trade config lives, where trade logs land,
//! the starting equity/fee schedule, and which feed to drive against.
//! JSON, loaded the same way the rest of this workspace loads config,
//! rather than the teacher's TOML — there is no other TOML consumer
//! left in this workspace to stay consistent with.

use railgate_decision::FeeSchedule;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Selects which `MarketTickSource` the driver loop constructs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FeedSourceConfig {
    /// A deterministic synthetic mean-reverting walk, generated at
    /// startup — useful for demos and integration tests that need many
    /// ticks without shipping a recorded fixture.
    SyntheticWalk {
        seed: u64,
        start_mid: Decimal,
        tick_count: usize,
        #[serde(default = "default_step_usd")]
        step_usd: Decimal,
        #[serde(default = "default_spread_bps")]
        spread_bps: Decimal,
        #[serde(default)]
        start_timestamp_ms: i64,
        #[serde(default = "default_tick_interval_ms")]
        tick_interval_ms: i64,
        /// Cadence to sleep between ticks once replayed, in milliseconds.
        /// `0` replays as fast as the loop can process them.
        #[serde(default)]
        cadence_ms: u64,
    },
    /// A fixed sequence of ticks recorded to a JSON file (one
    /// `MarketTick` array), replayed in order.
    Fixture {
        path: String,
        #[serde(default)]
        cadence_ms: u64,
    },
}

fn default_step_usd() -> Decimal {
    Decimal::new(500, 2)
}

fn default_spread_bps() -> Decimal {
    Decimal::new(5, 1)
}

fn default_tick_interval_ms() -> i64 {
    250
}

/// Everything the driver binary needs before it can start folding
/// ticks: where the engine's own config lives, where trades get
/// logged, the starting capital/fee assumptions, and the feed to run
/// against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Path to the [`railgate_config::TradeConfig`] JSON document,
    /// hot-reloaded via `ConfigWatcher` while the loop runs.
    pub trade_config_path: String,
    /// Directory the append-only trade log rotates files into.
    pub trade_log_dir: String,
    /// Starting equity, used to seed the guard layer's performance
    /// tracking and the capital-stage size scalar.
    pub starting_equity_usd: Decimal,
    /// Base risk ratio (fraction of equity at stake per entry) before
    /// the capital-stage scalar is applied.
    #[serde(default = "default_base_risk_ratio")]
    pub base_risk_ratio: Decimal,
    #[serde(default)]
    pub fee_schedule: FeeSchedule,
    pub feed: FeedSourceConfig,
    /// How often (ms of tick timestamp elapsed) to poll the trade
    /// config file for changes. `0` polls every tick.
    #[serde(default)]
    pub config_poll_interval_ms: i64,
}

fn default_base_risk_ratio() -> Decimal {
    Decimal::new(2, 2) // 0.02
}

impl RuntimeConfig {
    /// Loads from a JSON file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(AppError::from)
    }
}
