//! Risk guard: a cooldown after a hard-stop exit, a temporary size
//! reduction after a realized loss, and an alert counter for
//! timeout-loss-only exits (a pattern that, repeated, suggests the
//! strategy is holding too long rather than getting stopped out).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskGuardConfig {
    pub post_hard_stop_cooldown_ms: i64,
    pub post_loss_size_reduction_ms: i64,
    pub post_loss_scalar: Decimal,
    pub timeout_loss_alert_threshold: u32,
}

impl Default for RiskGuardConfig {
    fn default() -> Self {
        Self {
            post_hard_stop_cooldown_ms: 15 * 60_000,
            post_loss_size_reduction_ms: 30 * 60_000,
            post_loss_scalar: Decimal::new(5, 1), // 0.5
            timeout_loss_alert_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskGuard {
    config_cooldown_ms: i64,
    config_reduction_ms: i64,
    config_scalar: Decimal,
    config_timeout_alert: u32,
    hard_stop_at_ms: Option<i64>,
    loss_at_ms: Option<i64>,
    consecutive_timeout_losses: u32,
}

impl RiskGuard {
    #[must_use]
    pub fn new(config: RiskGuardConfig) -> Self {
        Self {
            config_cooldown_ms: config.post_hard_stop_cooldown_ms,
            config_reduction_ms: config.post_loss_size_reduction_ms,
            config_scalar: config.post_loss_scalar,
            config_timeout_alert: config.timeout_loss_alert_threshold,
            hard_stop_at_ms: None,
            loss_at_ms: None,
            consecutive_timeout_losses: 0,
        }
    }

    pub fn on_hard_stop(&mut self, now_ms: i64) {
        self.hard_stop_at_ms = Some(now_ms);
    }

    pub fn on_trade_closed(&mut self, now_ms: i64, net_pnl_usd: Decimal, was_timeout_loss: bool) {
        if net_pnl_usd < Decimal::ZERO {
            self.loss_at_ms = Some(now_ms);
        }
        if was_timeout_loss {
            self.consecutive_timeout_losses += 1;
        } else {
            self.consecutive_timeout_losses = 0;
        }
    }

    #[must_use]
    pub fn blocks_entries(&self, now_ms: i64) -> Option<&'static str> {
        if let Some(ts) = self.hard_stop_at_ms {
            if now_ms - ts < self.config_cooldown_ms {
                return Some("risk: post-hard-stop cooldown active");
            }
        }
        None
    }

    #[must_use]
    pub fn size_scalar(&self, now_ms: i64) -> Decimal {
        if let Some(ts) = self.loss_at_ms {
            if now_ms - ts < self.config_reduction_ms {
                return self.config_scalar;
            }
        }
        Decimal::ONE
    }

    /// `true` once repeated timeout-loss exits cross the alert
    /// threshold; the driver surfaces this as a metric/log alert, it
    /// does not by itself block entries.
    #[must_use]
    pub fn timeout_loss_alert(&self) -> bool {
        self.consecutive_timeout_losses >= self.config_timeout_alert
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn hard_stop_cooldown_blocks_then_clears() {
        let mut guard = RiskGuard::new(RiskGuardConfig::default());
        guard.on_hard_stop(0);
        assert!(guard.blocks_entries(1_000).is_some());
        assert!(guard.blocks_entries(20 * 60_000).is_none());
    }

    #[test]
    fn post_loss_scalar_reduces_then_recovers() {
        let mut guard = RiskGuard::new(RiskGuardConfig::default());
        guard.on_trade_closed(0, dec!(-10), false);
        assert_eq!(guard.size_scalar(1_000), dec!(0.5));
        assert_eq!(guard.size_scalar(31 * 60_000), Decimal::ONE);
    }

    #[test]
    fn timeout_loss_alert_fires_after_threshold() {
        let mut guard = RiskGuard::new(RiskGuardConfig::default());
        for _ in 0..3 {
            guard.on_trade_closed(0, dec!(-1), true);
        }
        assert!(guard.timeout_loss_alert());
    }
}
