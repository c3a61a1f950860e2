//! Prometheus metrics.
//!
//! Single-market engine, so none of these carry a `market_key` label —
//! everything here is scoped to the one symbol a running instance
//! trades.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration
//! fails it indicates a fatal configuration error (duplicate metric
//! names) that should crash at startup rather than fail silently.
//! These panics only occur during static initialization, never at
//! runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, register_int_gauge, CounterVec,
    Gauge, HistogramVec, IntGauge,
};

/// Feed tick-to-tick latency in milliseconds.
pub static FEED_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "railgate_feed_latency_ms",
        "Feed tick latency in milliseconds",
        &["channel"],
        vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0]
    )
    .unwrap()
});

/// Total entry decisions triggered (non-`none`), by side.
pub static TRIGGERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "railgate_triggers_total",
        "Total entry decisions triggered",
        &["side"]
    )
    .unwrap()
});

/// Entry edge in basis points at decision time.
pub static ENTRY_EDGE_BPS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "railgate_entry_edge_bps",
        "Entry edge in basis points at decision time",
        &["side"],
        vec![5.0, 10.0, 15.0, 20.0, 30.0, 40.0, 50.0, 75.0, 100.0, 150.0, 200.0]
    )
    .unwrap()
});

/// Total entry-gate blocks, by gate name.
pub static GATE_BLOCKED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "railgate_gate_blocked_total",
        "Total entry gate blocks",
        &["gate"]
    )
    .unwrap()
});

/// Current structure map strength (0-1).
pub static STRUCTURE_QUALITY: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "railgate_structure_quality",
        "Current structure snapshot quality score (0-1)"
    )
    .unwrap()
});

/// Current safety state (0=Normal,1=Degraded,2=Halted,3=Error).
pub static SAFETY_STATE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "railgate_safety_state",
        "Current safety state (0=Normal,1=Degraded,2=Halted,3=Error)"
    )
    .unwrap()
});

/// Trade PnL in basis points per closed fill, by exit reason.
pub static TRADE_PNL_BPS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "railgate_trade_pnl_bps",
        "Trade PnL in basis points per closed fill",
        &["exit_reason"],
        vec![
            -100.0, -50.0, -30.0, -20.0, -10.0, -5.0, 0.0, 5.0, 10.0, 20.0, 30.0, 50.0, 100.0,
            200.0,
        ]
    )
    .unwrap()
});

/// Position holding time in milliseconds, by exit reason.
pub static POSITION_HOLDING_TIME_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "railgate_position_holding_time_ms",
        "Position holding time in milliseconds",
        &["exit_reason"],
        vec![100.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 15000.0, 30000.0, 60000.0, 300_000.0]
    )
    .unwrap()
});

/// Trailing 7-day annualized return.
pub static APR_7D: Lazy<Gauge> =
    Lazy::new(|| register_gauge!("railgate_apr_7d", "Trailing 7-day annualized return").unwrap());

/// Metrics facade for easy call-site access.
pub struct Metrics;

impl Metrics {
    pub fn feed_latency(channel: &str, latency_ms: f64) {
        FEED_LATENCY_MS.with_label_values(&[channel]).observe(latency_ms);
    }

    pub fn signal_triggered(side: &str) {
        TRIGGERS_TOTAL.with_label_values(&[side]).inc();
    }

    pub fn entry_edge(side: &str, edge_bps: f64) {
        ENTRY_EDGE_BPS.with_label_values(&[side]).observe(edge_bps);
    }

    pub fn gate_blocked(gate: &str) {
        GATE_BLOCKED_TOTAL.with_label_values(&[gate]).inc();
    }

    pub fn structure_quality(quality: f64) {
        STRUCTURE_QUALITY.set(quality);
    }

    pub fn safety_state(state_code: i64) {
        SAFETY_STATE.set(state_code);
    }

    pub fn trade_pnl(exit_reason: &str, pnl_bps: f64) {
        TRADE_PNL_BPS.with_label_values(&[exit_reason]).observe(pnl_bps);
    }

    pub fn position_holding_time(exit_reason: &str, holding_ms: f64) {
        POSITION_HOLDING_TIME_MS
            .with_label_values(&[exit_reason])
            .observe(holding_ms);
    }

    pub fn apr_7d(value: f64) {
        APR_7D.set(value);
    }
}
