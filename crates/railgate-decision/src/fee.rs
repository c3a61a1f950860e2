//! Execution fee schedule and fee-edge accounting (§4.2 feeEdgeGuard, §3 P6).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Maker,
    Taker,
}

/// Fee schedule expressed in basis points of notional, per §3 P6's
/// `fees = notional * (mode_bps / 10000)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub maker_bps: Decimal,
    pub taker_bps: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            maker_bps: Decimal::new(2, 1),  // 0.2 bps
            taker_bps: Decimal::new(35, 1), // 3.5 bps
        }
    }
}

impl FeeSchedule {
    #[must_use]
    pub fn bps_for(&self, mode: ExecutionMode) -> Decimal {
        match mode {
            ExecutionMode::Maker => self.maker_bps,
            ExecutionMode::Taker => self.taker_bps,
        }
    }

    /// fee = notional * (mode_bps / 10000), per P6.
    #[must_use]
    pub fn fee_usd(&self, notional_usd: Decimal, mode: ExecutionMode) -> Decimal {
        notional_usd * self.bps_for(mode) / Decimal::from(10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fee_usd_matches_p6_formula() {
        let schedule = FeeSchedule {
            maker_bps: dec!(2),
            taker_bps: dec!(5),
        };
        assert_eq!(
            schedule.fee_usd(dec!(10000), ExecutionMode::Taker),
            dec!(5)
        );
        assert_eq!(
            schedule.fee_usd(dec!(10000), ExecutionMode::Maker),
            dec!(2)
        );
    }
}
