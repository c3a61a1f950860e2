//! Position ledger and running statistics (§4.4): closed-trade
//! bookkeeping, win/loss counters, the trailing 7-day window, and the
//! annualized 7-day return derived from it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use railgate_core::{Price, Side, Size};

const HISTORY_CAP: usize = 50;
const SEVEN_DAYS_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// One closed (or partially closed) fill, appended to the trailing
/// history once per realized exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: Side,
    pub entry_price: Price,
    pub exit_price: Price,
    pub size: Size,
    pub gross_pnl_usd: Decimal,
    pub net_pnl_usd: Decimal,
    pub entry_timestamp_ms: i64,
    pub exit_timestamp_ms: i64,
    pub exit_reason: String,
}

/// Running ledger statistics, derived entirely from appended
/// `TradeRecord`s plus the last two mid prices observed by the driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub realized_pnl_usd: Decimal,
    pub win_trades: u64,
    pub lose_trades: u64,
    pub total_trades: u64,
    pub long_trades: u64,
    pub long_wins: u64,
    pub short_trades: u64,
    pub short_wins: u64,
    pub history_7d: Vec<TradeRecord>,
    pub mid_px: Option<Price>,
    pub prev_mid_px: Option<Price>,
    pub open_interest: Decimal,
}

impl Stats {
    /// Appends a closed trade, updates the win/loss and realized-PnL
    /// counters, and trims `history_7d` to entries strictly newer than
    /// `now_ms - 7 days` (strict `>`, matching the boundary-exclusive
    /// window semantics).
    pub fn record_trade(&mut self, record: TradeRecord, now_ms: i64) {
        self.realized_pnl_usd += record.net_pnl_usd;
        self.total_trades += 1;

        let is_win = record.net_pnl_usd > Decimal::ZERO;
        if is_win {
            self.win_trades += 1;
        } else {
            self.lose_trades += 1;
        }

        match record.side {
            Side::Buy => {
                self.long_trades += 1;
                if is_win {
                    self.long_wins += 1;
                }
            }
            Side::Sell => {
                self.short_trades += 1;
                if is_win {
                    self.short_wins += 1;
                }
            }
        }

        self.history_7d.push(record);
        self.trim_history(now_ms);
        if self.history_7d.len() > HISTORY_CAP {
            let overflow = self.history_7d.len() - HISTORY_CAP;
            self.history_7d.drain(0..overflow);
        }
    }

    fn trim_history(&mut self, now_ms: i64) {
        let cutoff = now_ms - SEVEN_DAYS_MS;
        self.history_7d.retain(|r| r.exit_timestamp_ms > cutoff);
    }

    pub fn update_mid(&mut self, mid: Price) {
        self.prev_mid_px = self.mid_px;
        self.mid_px = Some(mid);
    }

    #[must_use]
    pub fn realized_pnl_pct(&self, equity_base_usd: Decimal) -> Decimal {
        if equity_base_usd.is_zero() {
            return Decimal::ZERO;
        }
        self.realized_pnl_usd / equity_base_usd * Decimal::ONE_HUNDRED
    }

    /// Annualized return implied by the realized PnL booked within the
    /// trailing 7-day window, projected against `equity_base_usd`.
    #[must_use]
    pub fn apr_7d(&self, now_ms: i64, equity_base_usd: Decimal) -> Decimal {
        if equity_base_usd.is_zero() {
            return Decimal::ZERO;
        }
        let cutoff = now_ms - SEVEN_DAYS_MS;
        let window_pnl: Decimal = self
            .history_7d
            .iter()
            .filter(|r| r.exit_timestamp_ms > cutoff)
            .map(|r| r.net_pnl_usd)
            .sum();
        let window_return = window_pnl / equity_base_usd;
        window_return * Decimal::new(365, 0) / Decimal::new(7, 0) * Decimal::ONE_HUNDRED
    }

    #[must_use]
    pub fn win_rate(&self) -> Decimal {
        if self.total_trades == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.win_trades) / Decimal::from(self.total_trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(net: Decimal, exit_ts: i64, side: Side) -> TradeRecord {
        TradeRecord {
            side,
            entry_price: Price::new(dec!(100)),
            exit_price: Price::new(dec!(101)),
            size: Size::new(dec!(1)),
            gross_pnl_usd: net,
            net_pnl_usd: net,
            entry_timestamp_ms: exit_ts - 1000,
            exit_timestamp_ms: exit_ts,
            exit_reason: "tp".into(),
        }
    }

    #[test]
    fn record_trade_updates_win_loss_counters() {
        let mut stats = Stats::default();
        stats.record_trade(record(dec!(10), 1_000, Side::Buy), 1_000);
        stats.record_trade(record(dec!(-5), 2_000, Side::Sell), 2_000);
        assert_eq!(stats.win_trades, 1);
        assert_eq!(stats.lose_trades, 1);
        assert_eq!(stats.long_trades, 1);
        assert_eq!(stats.long_wins, 1);
        assert_eq!(stats.short_trades, 1);
        assert_eq!(stats.short_wins, 0);
        assert_eq!(stats.realized_pnl_usd, dec!(5));
    }

    #[test]
    fn history_trims_strictly_older_than_seven_days() {
        let mut stats = Stats::default();
        stats.record_trade(record(dec!(1), 0, Side::Buy), 0);
        // exactly at the boundary is excluded (strict >), one ms inside survives
        stats.record_trade(record(dec!(1), SEVEN_DAYS_MS + 1_000, Side::Buy), SEVEN_DAYS_MS + 1_000);
        assert_eq!(stats.history_7d.len(), 1);
        assert_eq!(stats.history_7d[0].exit_timestamp_ms, SEVEN_DAYS_MS + 1_000);
    }

    #[test]
    fn history_caps_at_fifty_entries() {
        let mut stats = Stats::default();
        for i in 0..60 {
            stats.record_trade(record(dec!(1), i * 1000, Side::Buy), i * 1000);
        }
        assert_eq!(stats.history_7d.len(), HISTORY_CAP);
    }
}
