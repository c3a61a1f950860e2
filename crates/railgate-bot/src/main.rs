//! Driver binary entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use railgate_bot::{Application, RuntimeConfig};
use railgate_bot::config::FeedSourceConfig;
use railgate_feed::{build_synthetic_walk, ReplayFeed, SyntheticWalkConfig};

/// Driver loop for the perpetual-futures trading engine.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Runtime configuration file path (can also be set via
    /// RAILGATE_CONFIG env var).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    railgate_telemetry::init_logging()?;

    info!("starting railgate-bot v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(|| std::env::var("RAILGATE_CONFIG").ok())
        .unwrap_or_else(|| "config/runtime.json".to_string());

    info!(config_path = %config_path, "loading runtime configuration");
    let runtime = RuntimeConfig::from_file(&config_path)?;

    let feed = match &runtime.feed {
        FeedSourceConfig::SyntheticWalk {
            seed,
            start_mid,
            tick_count,
            step_usd,
            spread_bps,
            start_timestamp_ms,
            tick_interval_ms,
            cadence_ms,
        } => {
            let ticks = build_synthetic_walk(SyntheticWalkConfig {
                seed: *seed,
                start_mid: railgate_core::Price::new(*start_mid),
                tick_count: *tick_count,
                step_usd: *step_usd,
                spread_bps: *spread_bps,
                start_timestamp_ms: *start_timestamp_ms,
                tick_interval_ms: *tick_interval_ms,
            });
            info!(tick_count = ticks.len(), "built synthetic tick walk");
            ReplayFeed::with_cadence(ticks, *cadence_ms)
        }
        FeedSourceConfig::Fixture { path, cadence_ms } => {
            let content = std::fs::read_to_string(path)?;
            let ticks: Vec<railgate_core::MarketTick> = serde_json::from_str(&content)?;
            info!(path = %path, tick_count = ticks.len(), "loaded tick fixture");
            ReplayFeed::with_cadence(ticks, *cadence_ms)
        }
    };

    let app = Application::new(&runtime, feed)?;
    app.run().await?;

    Ok(())
}
