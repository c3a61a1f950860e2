//! Capital-stage sizing bands (§4.6): equity ranges that scale position
//! sizing as the account grows, so a bot that starts small doesn't size
//! as if it were already fully capitalized.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalStageBand {
    pub min_equity_usd: Decimal,
    pub max_equity_usd: Decimal,
    pub size_scalar: Decimal,
}

/// Finds the scalar for the band containing `equity_usd`. Bands must be
/// ordered ascending and non-overlapping (validated at load time); falls
/// back to the last band's scalar if equity exceeds every band's upper
/// bound, and the first band's scalar if equity falls below every
/// band's lower bound.
#[must_use]
pub fn scalar_for_equity(bands: &[CapitalStageBand], equity_usd: Decimal) -> Decimal {
    for band in bands {
        if equity_usd >= band.min_equity_usd && equity_usd < band.max_equity_usd {
            return band.size_scalar;
        }
    }
    match bands.last() {
        Some(band) if equity_usd >= band.max_equity_usd => band.size_scalar,
        _ => bands.first().map_or(Decimal::ONE, |b| b.size_scalar),
    }
}

/// Validates that bands are sorted ascending by `min_equity_usd` with no
/// gaps or overlaps.
pub fn validate_bands(bands: &[CapitalStageBand]) -> Result<()> {
    if bands.is_empty() {
        return Err(ConfigError::MissingField("capital_stage_bands".into()));
    }
    for pair in bands.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.max_equity_usd != b.min_equity_usd {
            return Err(ConfigError::Invalid(format!(
                "capital_stage_bands must be contiguous: {} then {}",
                a.max_equity_usd, b.min_equity_usd
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bands() -> Vec<CapitalStageBand> {
        vec![
            CapitalStageBand {
                min_equity_usd: dec!(0),
                max_equity_usd: dec!(1000),
                size_scalar: dec!(0.5),
            },
            CapitalStageBand {
                min_equity_usd: dec!(1000),
                max_equity_usd: dec!(10000),
                size_scalar: dec!(1.0),
            },
        ]
    }

    #[test]
    fn scalar_for_equity_picks_matching_band() {
        let bands = bands();
        assert_eq!(scalar_for_equity(&bands, dec!(500)), dec!(0.5));
        assert_eq!(scalar_for_equity(&bands, dec!(5000)), dec!(1.0));
        assert_eq!(scalar_for_equity(&bands, dec!(50000)), dec!(1.0));
    }

    #[test]
    fn validate_bands_rejects_gaps() {
        let mut bands = bands();
        bands[1].min_equity_usd = dec!(2000);
        assert!(validate_bands(&bands).is_err());
    }
}
