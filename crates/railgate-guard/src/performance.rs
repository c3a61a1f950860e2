//! Performance guard: tracks peak equity and a rolling KPI window,
//! blocking new entries once drawdown or a poor KPI window crosses a
//! configured trigger, and auto-resuming once equity recovers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceGuardConfig {
    /// Drawdown from peak equity (as a fraction) that blocks new entries.
    pub max_drawdown_ratio: Decimal,
    /// Drawdown fraction at which entries resume once recovered to.
    pub resume_drawdown_ratio: Decimal,
    /// Window over which realized PnL is summed for the KPI trigger.
    pub kpi_window_ms: i64,
    /// KPI-window net loss (as a fraction of peak equity) that blocks
    /// new entries.
    pub kpi_loss_ratio: Decimal,
}

impl Default for PerformanceGuardConfig {
    fn default() -> Self {
        Self {
            max_drawdown_ratio: Decimal::new(1, 1),       // 10%
            resume_drawdown_ratio: Decimal::new(5, 2),    // 5%
            kpi_window_ms: 24 * 60 * 60 * 1000,
            kpi_loss_ratio: Decimal::new(3, 2),           // 3%
        }
    }
}

#[derive(Debug, Clone)]
pub struct PerformanceGuard {
    config: PerformanceGuardConfig,
    peak_equity_usd: Decimal,
    blocked: bool,
    window_pnl_usd: Vec<(i64, Decimal)>,
}

impl PerformanceGuard {
    #[must_use]
    pub fn new(config: PerformanceGuardConfig, starting_equity_usd: Decimal) -> Self {
        Self {
            config,
            peak_equity_usd: starting_equity_usd,
            blocked: false,
            window_pnl_usd: Vec::new(),
        }
    }

    pub fn record_realized_pnl(&mut self, now_ms: i64, pnl_usd: Decimal) {
        self.window_pnl_usd.push((now_ms, pnl_usd));
        let cutoff = now_ms - self.config.kpi_window_ms;
        self.window_pnl_usd.retain(|(ts, _)| *ts > cutoff);
    }

    fn window_pnl(&self, now_ms: i64) -> Decimal {
        let cutoff = now_ms - self.config.kpi_window_ms;
        self.window_pnl_usd
            .iter()
            .filter(|(ts, _)| *ts > cutoff)
            .map(|(_, pnl)| *pnl)
            .sum()
    }

    /// Re-evaluates blocking state against current equity and returns
    /// `Some(reason)` if entries should be blocked after this update.
    pub fn update(&mut self, now_ms: i64, equity_usd: Decimal) -> Option<&'static str> {
        if equity_usd > self.peak_equity_usd {
            self.peak_equity_usd = equity_usd;
        }

        if self.peak_equity_usd.is_zero() {
            return None;
        }

        let drawdown = (self.peak_equity_usd - equity_usd) / self.peak_equity_usd;

        if self.blocked {
            if drawdown <= self.config.resume_drawdown_ratio {
                self.blocked = false;
            } else {
                return Some("performance: drawdown block active");
            }
        }

        if drawdown >= self.config.max_drawdown_ratio {
            self.blocked = true;
            return Some("performance: max drawdown exceeded");
        }

        let kpi_ratio = self.window_pnl(now_ms) / self.peak_equity_usd;
        if kpi_ratio <= -self.config.kpi_loss_ratio {
            self.blocked = true;
            return Some("performance: kpi window loss exceeded");
        }

        None
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }
}
