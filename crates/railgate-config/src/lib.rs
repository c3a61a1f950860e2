//! `TradeConfig` aggregation, clamping, and hot-reload (§4.6).
//!
//! Config is a single JSON document; every sub-module config is
//! `#[serde(default)]` except `min_band_distance_usd` and
//! `min_expected_usd`, which are fatal to omit.

pub mod config;
pub mod error;
pub mod loader;
pub mod stage;

pub use config::TradeConfig;
pub use error::{ConfigError, Result};
pub use loader::{load, ConfigWatcher};
pub use stage::{scalar_for_equity, validate_bands, CapitalStageBand};
