//! `TradeConfig` (§4.6): the single JSON document aggregating every
//! sub-module's configuration, plus the two fields spec'd as fatal to
//! omit (`min_band_distance_usd`, `min_expected_usd`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use railgate_decision::DecisionConfig;
use railgate_guard::{PerformanceGuardConfig, RiskGuardConfig, SafetyConfig, StartupGuardConfig};
use railgate_position::ExitConfig;
use railgate_structure::StructureConfig;

use crate::error::{ConfigError, Result};
use crate::stage::{validate_bands, CapitalStageBand};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeConfig {
    /// No default: a config file that omits this is rejected outright
    /// rather than silently falling back to a guessed distance.
    pub min_band_distance_usd: Decimal,
    /// No default, same reasoning as `min_band_distance_usd`.
    pub min_expected_usd: Decimal,

    pub capital_stage_bands: Vec<CapitalStageBand>,

    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub exit: ExitConfig,
    #[serde(default)]
    pub structure: StructureConfig,
    #[serde(default)]
    pub startup: StartupGuardConfig,
    #[serde(default)]
    pub performance: PerformanceGuardConfig,
    #[serde(default)]
    pub risk: RiskGuardConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
}

impl TradeConfig {
    /// Clamps every numeric field known to have a sane operating range.
    /// Idempotent: calling twice leaves the config unchanged (§8).
    pub fn clamp(&mut self) {
        self.min_band_distance_usd = self.min_band_distance_usd.max(Decimal::ZERO);
        self.min_expected_usd = self.min_expected_usd.max(Decimal::ZERO);
        self.decision.max_size_scalar = self.decision.max_size_scalar.max(Decimal::ONE);
        self.exit.base_soft_ratio = self.exit.base_soft_ratio.clamp(Decimal::new(1, 4), self.exit.base_hard_ratio);
    }

    /// Rejects configs missing the fields this workspace treats as
    /// fatal, or with internally inconsistent capital-stage bands.
    pub fn validate(&self) -> Result<()> {
        if self.min_band_distance_usd <= Decimal::ZERO {
            return Err(ConfigError::MissingField("min_band_distance_usd".into()));
        }
        if self.min_expected_usd <= Decimal::ZERO {
            return Err(ConfigError::MissingField("min_expected_usd".into()));
        }
        validate_bands(&self.capital_stage_bands)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn minimal_json() -> &'static str {
        r#"{
            "min_band_distance_usd": "10",
            "min_expected_usd": "5",
            "capital_stage_bands": [
                {"min_equity_usd": "0", "max_equity_usd": "1000000", "size_scalar": "1"}
            ]
        }"#
    }

    #[test]
    fn deserializes_with_defaults_for_submodules() {
        let config: TradeConfig = serde_json::from_str(minimal_json()).unwrap();
        assert_eq!(config.min_band_distance_usd, dec!(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_required_field_is_fatal() {
        let json = r#"{"capital_stage_bands": []}"#;
        let result: std::result::Result<TradeConfig, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn clamp_is_idempotent() {
        let mut config: TradeConfig = serde_json::from_str(minimal_json()).unwrap();
        config.clamp();
        let once = config.clone();
        config.clamp();
        assert_eq!(serde_json::to_string(&once).unwrap(), serde_json::to_string(&config).unwrap());
    }

    proptest::proptest! {
        /// §8: `clamp()` is idempotent regardless of how far out of range
        /// the raw document's numeric fields start out.
        #[test]
        fn clamp_converges_and_stays_put_from_any_raw_input(
            min_band_distance in -1_000i64..1_000,
            min_expected in -1_000i64..1_000,
            max_size_scalar in -10i64..10,
            base_soft_ratio in -100i64..1_000,
            base_hard_ratio in 1i64..1_000,
        ) {
            let mut config: TradeConfig = serde_json::from_str(minimal_json()).unwrap();
            config.min_band_distance_usd = Decimal::new(min_band_distance, 0);
            config.min_expected_usd = Decimal::new(min_expected, 0);
            config.decision.max_size_scalar = Decimal::new(max_size_scalar, 0);
            config.exit.base_soft_ratio = Decimal::new(base_soft_ratio, 4);
            config.exit.base_hard_ratio = Decimal::new(base_hard_ratio, 4);
            config.clamp();
            let once = config.clone();
            config.clamp();
            proptest::prop_assert_eq!(
                serde_json::to_string(&once).unwrap(),
                serde_json::to_string(&config).unwrap()
            );
            proptest::prop_assert!(config.min_band_distance_usd >= Decimal::ZERO);
            proptest::prop_assert!(config.min_expected_usd >= Decimal::ZERO);
            proptest::prop_assert!(config.decision.max_size_scalar >= Decimal::ONE);
            proptest::prop_assert!(config.exit.base_soft_ratio <= config.exit.base_hard_ratio);
        }
    }
}
