//! Prometheus metrics and structured logging.
//!
//! - [`metrics::Metrics`]: feed latency, entry edge, gate blocks,
//!   structure quality, safety state, trade PnL/holding-time, APR7d.
//! - [`logging::init_logging`]: JSON logging in production, pretty
//!   logging otherwise, driven by `RUST_ENV`.
//! - [`daily_stats::DailyStatsReporter`]: periodic human-readable rollup.

pub mod daily_stats;
pub mod error;
pub mod logging;
pub mod metrics;

pub use daily_stats::{DailyStatsReporter, DailySummary};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
