//! Composes the startup, performance, and risk guards into a single
//! first-blocker-wins check plus a combined sizing scalar, the same
//! ordering discipline the entry gates in `railgate-decision` use:
//! prerequisite (blocking) checks run before the scalars that only
//! matter once entries are known to be permitted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::performance::PerformanceGuard;
use crate::risk::RiskGuard;
use crate::startup::StartupGuard;
use crate::status::{SafetyState, SafetyTracker};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardResult {
    Pass,
    Blocked { gate: &'static str, reason: String },
}

impl GuardResult {
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

pub struct GuardLayer {
    pub startup: StartupGuard,
    pub performance: PerformanceGuard,
    pub risk: RiskGuard,
    pub safety: SafetyTracker,
}

impl GuardLayer {
    /// Runs every blocking check in priority order and returns the
    /// first one that fires, or `Pass` if none do.
    #[must_use]
    pub fn check_entries(&self, now_ms: i64) -> GuardResult {
        if let Some(reason) = self.startup.blocks_entries(now_ms) {
            return GuardResult::Blocked {
                gate: "startup",
                reason: reason.to_string(),
            };
        }
        if let Some(reason) = self.risk.blocks_entries(now_ms) {
            return GuardResult::Blocked {
                gate: "risk",
                reason: reason.to_string(),
            };
        }
        if self.performance.is_blocked() {
            return GuardResult::Blocked {
                gate: "performance",
                reason: "performance guard is blocking new entries".to_string(),
            };
        }
        GuardResult::Pass
    }

    /// Combined size scalar once entries have passed `check_entries`:
    /// the most restrictive of the startup ramp and post-loss reduction.
    #[must_use]
    pub fn size_scalar(&self, now_ms: i64) -> Decimal {
        self.startup.size_scalar(now_ms).min(self.risk.size_scalar(now_ms))
    }

    /// `true` once a tick is safe to route through `try_enter` at all:
    /// the feed-freshness tracker must be `Normal` (§4.5 item 1 — any
    /// other status skips entries entirely, even `Degraded`) and the
    /// ordinary startup/risk/performance gates must clear.
    #[must_use]
    pub fn should_attempt_entries(&self, now_ms: i64) -> bool {
        self.safety.status == SafetyState::Normal && !self.check_entries(now_ms).is_blocked()
    }

    /// Overall safety status: the more severe of the feed-freshness
    /// tracker's reading and the guard-state-derived reading (the
    /// latter covers the startup ramp / post-loss / performance
    /// degradation this type already tracked before the feed-freshness
    /// half existed).
    #[must_use]
    pub fn status(&self, now_ms: i64) -> SafetyState {
        let guard_derived = if self.check_entries(now_ms).is_blocked() {
            SafetyState::Halted
        } else if self.size_scalar(now_ms) < Decimal::ONE {
            SafetyState::Degraded
        } else {
            SafetyState::Normal
        };
        self.safety.status.max(guard_derived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::PerformanceGuardConfig;
    use crate::risk::RiskGuardConfig;
    use crate::startup::StartupGuardConfig;
    use rust_decimal_macros::dec;

    fn layer() -> GuardLayer {
        GuardLayer {
            startup: StartupGuard::new(StartupGuardConfig::default(), 0),
            performance: PerformanceGuard::new(PerformanceGuardConfig::default(), dec!(1000)),
            risk: RiskGuard::new(RiskGuardConfig::default()),
            safety: SafetyTracker::new(0),
        }
    }

    #[test]
    fn startup_blocks_before_risk_or_performance() {
        let guard = layer();
        let result = guard.check_entries(1_000);
        assert_eq!(
            result,
            GuardResult::Blocked {
                gate: "startup",
                reason: "startup: no-order window active".to_string(),
            }
        );
    }

    #[test]
    fn passes_once_all_guards_clear() {
        let guard = layer();
        assert_eq!(guard.check_entries(20 * 60_000), GuardResult::Pass);
    }

    #[test]
    fn status_degraded_while_size_scalar_below_one() {
        let guard = layer();
        // past no-order window but still inside the startup size-ramp window
        assert_eq!(guard.status(65_000), SafetyState::Degraded);
    }

    #[test]
    fn stale_feed_blocks_entries_even_once_guards_clear() {
        let mut guard = layer();
        guard.safety.mark_stale(60_000, 20 * 60_000, &crate::status::SafetyConfig::default());
        assert!(!guard.should_attempt_entries(20 * 60_000));
        assert_eq!(guard.status(20 * 60_000), SafetyState::Halted);
    }

    #[test]
    fn invalid_tick_latches_error_status() {
        let mut guard = layer();
        guard.safety.mark_invalid_tick("crossed book", 20 * 60_000);
        assert!(!guard.should_attempt_entries(21 * 60_000));
        assert_eq!(guard.status(21 * 60_000), SafetyState::Error);
    }
}
