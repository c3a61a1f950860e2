//! The overall safety status (§4.5 item 1): a small state machine the
//! driver consults before routing any entry decision to sizing.
//! Driver-owned plain state, not a shared atomic — there is only one
//! tick loop (§5).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyState {
    /// Full-size entries permitted, subject to the usual gates.
    Normal,
    /// Entries permitted but scaled down (startup ramp, post-loss
    /// reduction, or a soft performance trigger), or no fresh tick has
    /// arrived within the staleness window.
    Degraded,
    /// New entries blocked; existing positions still manage their own
    /// exits. Recoverable once the triggering condition clears —
    /// `DATA_STALE` in particular clears itself the moment a fresh
    /// tick arrives, with no hysteresis.
    Halted,
    /// The feed handed the driver an invalid tick (non-positive or
    /// crossed book). Unrecoverable within this run; requires an
    /// external reset (a fresh `EngineState`/process restart) since
    /// there is no way to tell from here whether the upstream feed has
    /// actually healed.
    Error,
}

impl SafetyState {
    #[must_use]
    pub fn blocks_new_entries(self) -> bool {
        matches!(self, Self::Halted | Self::Error)
    }

    fn severity(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Degraded => 1,
            Self::Halted => 2,
            Self::Error => 3,
        }
    }

    /// The more severe of the two states — used to fold the
    /// feed-freshness reading and the guard-derived reading into one
    /// overall status for metrics/logging.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

/// Thresholds driving the feed-freshness half of the safety status.
/// The engine itself never reads a wall clock (§5); these compare
/// tick-carried timestamps and feed-reported elapsed gaps only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Gap (ms) since the last tick above which the driver is
    /// considered to be waiting on a slow feed rather than operating
    /// normally.
    pub degraded_staleness_ms: i64,
    /// Gap (ms) above which the feed is considered to be serving stale
    /// market data outright rather than merely running behind.
    pub halted_staleness_ms: i64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            degraded_staleness_ms: 5_000,
            halted_staleness_ms: 30_000,
        }
    }
}

/// Tracks the feed-freshness half of the safety status: invalid ticks
/// and staleness gaps the feed/driver layer observes, which
/// `update_engine` itself can never see directly since a `MarketTick`
/// is only ever constructed from already-valid data (§4.5 item 1).
///
/// `mark_invalid_tick`/`mark_stale` are called from the driver loop,
/// outside `update_engine`, the one place IO-layer feed failures are
/// visible. `observe_fresh_tick` is called from inside `update_engine`
/// every tick that does make it through the fold, and is what gives
/// `DATA_STALE` its automatic, hysteresis-free recovery back to
/// `NORMAL` once the market is fresh again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyTracker {
    pub status: SafetyState,
    pub reason: Option<String>,
    pub since_ms: i64,
}

impl SafetyTracker {
    #[must_use]
    pub fn new(now_ms: i64) -> Self {
        Self {
            status: SafetyState::Normal,
            reason: None,
            since_ms: now_ms,
        }
    }

    fn transition(&mut self, status: SafetyState, reason: &str, now_ms: i64) {
        if self.status != status {
            self.status = status;
            self.reason = Some(reason.to_string());
            self.since_ms = now_ms;
        }
    }

    /// A tick made it through normalization and reached the engine:
    /// clears any staleness-driven `Degraded`/`Halted` back to
    /// `Normal`. Never clears `Error` — that requires an external
    /// reset, per the variant's own contract.
    pub fn observe_fresh_tick(&mut self, now_ms: i64) {
        if self.status != SafetyState::Error {
            self.transition(SafetyState::Normal, "market fresh", now_ms);
        }
    }

    /// The feed rejected a tick outright (non-positive or crossed
    /// price). Latches `Error` for the remainder of this run.
    pub fn mark_invalid_tick(&mut self, reason: &str, now_ms: i64) {
        self.transition(SafetyState::Error, reason, now_ms);
    }

    /// The feed reported it could not produce a fresh tick within its
    /// own staleness window; `elapsed_ms` is how long it waited.
    pub fn mark_stale(&mut self, elapsed_ms: i64, now_ms: i64, config: &SafetyConfig) {
        if self.status == SafetyState::Error {
            return;
        }
        if elapsed_ms >= config.halted_staleness_ms {
            self.transition(SafetyState::Halted, "DATA_STALE", now_ms);
        } else if elapsed_ms >= config.degraded_staleness_ms {
            self.transition(SafetyState::Degraded, "no tick within staleness window", now_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_recovers_to_normal_once_fresh_tick_arrives() {
        let config = SafetyConfig::default();
        let mut tracker = SafetyTracker::new(0);
        tracker.mark_stale(config.halted_staleness_ms, 1_000, &config);
        assert_eq!(tracker.status, SafetyState::Halted);
        tracker.observe_fresh_tick(2_000);
        assert_eq!(tracker.status, SafetyState::Normal);
    }

    #[test]
    fn error_is_not_cleared_by_a_fresh_tick() {
        let mut tracker = SafetyTracker::new(0);
        tracker.mark_invalid_tick("crossed book", 500);
        assert_eq!(tracker.status, SafetyState::Error);
        tracker.observe_fresh_tick(1_000);
        assert_eq!(tracker.status, SafetyState::Error);
    }

    #[test]
    fn staleness_tiers_escalate_with_elapsed_gap() {
        let config = SafetyConfig::default();
        let mut tracker = SafetyTracker::new(0);
        tracker.mark_stale(config.degraded_staleness_ms, 1_000, &config);
        assert_eq!(tracker.status, SafetyState::Degraded);
        tracker.mark_stale(config.halted_staleness_ms, 2_000, &config);
        assert_eq!(tracker.status, SafetyState::Halted);
    }

    #[test]
    fn severity_max_picks_the_worse_state() {
        assert_eq!(SafetyState::Normal.max(SafetyState::Degraded), SafetyState::Degraded);
        assert_eq!(SafetyState::Halted.max(SafetyState::Error), SafetyState::Error);
        assert_eq!(SafetyState::Halted.max(SafetyState::Degraded), SafetyState::Halted);
    }
}
