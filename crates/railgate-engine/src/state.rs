//! `EngineState` (§5): everything `update_engine` folds forward from one
//! tick to the next. A single instance lives for the life of the
//! driver loop — there is no per-tick allocation of fresh guard/cache
//! state, only mutation in place.

use std::collections::VecDeque;

use rust_decimal::Decimal;

use railgate_config::TradeConfig;
use railgate_guard::{GuardLayer, PerformanceGuard, RiskGuard, StartupGuard};
use railgate_position::{Position, Stats};
use railgate_structure::StructureCache;

use crate::bar_tracker::{Bar1hTracker, Bar1hTrackerConfig};

/// How many recent capture ratios are retained for the decision
/// engine's TP-distance self-calibration (`tp_distance_cap`'s median
/// read). Bounded so a long-running process doesn't grow this forever.
const CAPTURE_RATIO_HISTORY_CAP: usize = 50;

/// Everything the engine carries forward tick to tick: the one open
/// position (or none), the running stats ledger, the structure cache,
/// the rolling 1h bar tracker, the composed guard layer, and enough
/// bookkeeping to stamp trade-log revisions and feed the decision
/// engine's self-calibration input.
pub struct EngineState {
    pub position: Option<Position>,
    pub stats: Stats,
    pub structure_cache: StructureCache,
    pub bar_tracker: Bar1hTracker,
    pub guard: GuardLayer,
    pub recent_capture_ratios: VecDeque<Decimal>,
    pub trade_revision: u32,
    pub structure_version: u32,
}

impl EngineState {
    #[must_use]
    pub fn new(config: &TradeConfig, started_at_ms: i64, starting_equity_usd: Decimal) -> Self {
        Self {
            position: None,
            stats: Stats::default(),
            structure_cache: StructureCache::new(),
            bar_tracker: Bar1hTracker::new(Bar1hTrackerConfig::default()),
            guard: GuardLayer {
                startup: StartupGuard::new(config.startup, started_at_ms),
                performance: PerformanceGuard::new(config.performance, starting_equity_usd),
                risk: RiskGuard::new(config.risk),
                safety: railgate_guard::SafetyTracker::new(started_at_ms),
            },
            recent_capture_ratios: VecDeque::with_capacity(CAPTURE_RATIO_HISTORY_CAP),
            trade_revision: 0,
            structure_version: 0,
        }
    }

    pub fn next_structure_version(&mut self) -> u32 {
        self.structure_version += 1;
        self.structure_version
    }

    #[must_use]
    pub fn has_open_position(&self) -> bool {
        self.position.is_some()
    }

    /// Appends `ratio` to the self-calibration history, evicting the
    /// oldest entry once the cap is reached.
    pub fn record_capture_ratio(&mut self, ratio: Decimal) {
        if self.recent_capture_ratios.len() >= CAPTURE_RATIO_HISTORY_CAP {
            self.recent_capture_ratios.pop_front();
        }
        self.recent_capture_ratios.push_back(ratio);
    }

    /// Snapshot of recent capture ratios as a slice, for
    /// `decide_trade_b2`'s `recent_capture_ratios` parameter.
    #[must_use]
    pub fn capture_ratios_slice(&self) -> Vec<Decimal> {
        self.recent_capture_ratios.iter().copied().collect()
    }

    pub fn next_trade_revision(&mut self) -> u32 {
        self.trade_revision += 1;
        self.trade_revision
    }
}
