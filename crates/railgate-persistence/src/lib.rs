//! Append-only trade-log persistence (§6).
//!
//! JSON Lines format: each line is a complete JSON object, so a write
//! interrupted mid-append only ever corrupts the last line.

pub mod error;
pub mod schema;
pub mod writer;

pub use error::{PersistenceError, PersistenceResult};
pub use schema::{
    CaptureMetrics, CounterfactualRegret, LogQuality, LogSide, LoggedEntryContext, TradeLogRecord,
    TradeResult, SCHEMA_VERSION,
};
pub use writer::TradeLogWriter;
