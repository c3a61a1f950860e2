//! Startup guard: restricts sizing and, briefly, entries entirely for a
//! fixed window after the engine comes up, so a cold structure/decision
//! cache doesn't drive full-size trades on stale inputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartupGuardConfig {
    /// How long after start the guard stays active at all.
    pub window_ms: i64,
    /// Within the window, how long no entries are permitted at all.
    pub no_order_ms: i64,
    /// Size scalar applied during the restricted (but order-permitting)
    /// part of the window.
    pub restricted_scalar: Decimal,
}

impl Default for StartupGuardConfig {
    fn default() -> Self {
        Self {
            window_ms: 10 * 60_000,
            no_order_ms: 60_000,
            restricted_scalar: Decimal::new(5, 1), // 0.5
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StartupGuard {
    config: StartupGuardConfig,
    started_at_ms: i64,
}

impl StartupGuard {
    #[must_use]
    pub fn new(config: StartupGuardConfig, started_at_ms: i64) -> Self {
        Self {
            config,
            started_at_ms,
        }
    }

    #[must_use]
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.started_at_ms).max(0)
    }

    /// `Some(reason)` if entries are entirely blocked right now.
    #[must_use]
    pub fn blocks_entries(&self, now_ms: i64) -> Option<&'static str> {
        if self.elapsed_ms(now_ms) < self.config.no_order_ms {
            Some("startup: no-order window active")
        } else {
            None
        }
    }

    /// Size scalar to apply (1.0 once the startup window has fully
    /// elapsed).
    #[must_use]
    pub fn size_scalar(&self, now_ms: i64) -> Decimal {
        if self.elapsed_ms(now_ms) < self.config.window_ms {
            self.config.restricted_scalar
        } else {
            Decimal::ONE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_entries_within_no_order_window() {
        let guard = StartupGuard::new(StartupGuardConfig::default(), 0);
        assert!(guard.blocks_entries(30_000).is_some());
        assert!(guard.blocks_entries(60_001).is_none());
    }

    #[test]
    fn size_scalar_restricted_then_full() {
        let guard = StartupGuard::new(StartupGuardConfig::default(), 0);
        assert_eq!(guard.size_scalar(60_001), Decimal::new(5, 1));
        assert_eq!(guard.size_scalar(10 * 60_000 + 1), Decimal::ONE);
    }
}
