//! The driver loop (§5, §6): wires a `MarketTickSource` into
//! `update_engine`'s per-tick fold and executes the effects it returns.
//! `MarketTickSource::next_tick` returns `impl Future`, so it isn't
//! object-safe — `Application` is generic over the feed rather than
//! boxing it.

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use railgate_config::ConfigWatcher;
use railgate_core::{MarketTick, TradeFlowWindow};
use railgate_decision::{FeeSchedule, SizeFactors, SizingInputs};
use railgate_engine::{update_engine, EffectsQueue, EngineEffect, EngineState, NotificationLevel};
use railgate_feed::{FeedError, MarketTickSource};
use railgate_persistence::TradeLogWriter;
use railgate_structure::RawLevel;

use crate::config::RuntimeConfig;
use crate::error::AppResult;

/// Scope (bps) at which the heuristic trend-strength read saturates to
/// `1.0`. A stand-in for the original multi-window regime-alignment
/// formula (A/B band alignment, A-center damping, 15m/1h angle boosts,
/// cluster-wall boost) those upstream subsystems aren't present here;
/// see DESIGN.md.
const TREND_STRENGTH_SCOPE_BPS: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Reads `tick.price_velocity_bps` into the `[0, 1]` trend-strength
/// input `Firepower::from_trend_strength` expects.
fn trend_strength(tick: &MarketTick) -> Decimal {
    (tick.price_velocity_bps.abs() / TREND_STRENGTH_SCOPE_BPS).min(Decimal::ONE)
}

/// Directional firepower read from the medium trade-flow window's
/// signed flow pressure. Magnitude only — `decide_trade_b2` applies its
/// own directional gating against the tick's actual side.
fn directional_firepower(tick: &MarketTick) -> Decimal {
    tick.flow(TradeFlowWindow::Ms30000)
        .map_or(Decimal::ZERO, |bucket| bucket.flow_pressure.abs())
}

/// Per-tick size factors. Only `flow` and `acceleration` move with the
/// tick; the rest sit at the neutral `1.0` `decide_trade_b2` itself
/// would apply once `entry_quality`/`structure_quality` are scored
/// downstream of this call.
fn size_factors(tick: &MarketTick) -> SizeFactors {
    let flow = tick.flow(TradeFlowWindow::Ms30000).map_or(Decimal::ONE, |bucket| {
        Decimal::ONE + bucket.flow_pressure.abs() * Decimal::new(2, 1)
    });
    let acceleration = tick.flow(TradeFlowWindow::Ms5000).map_or(Decimal::ONE, |bucket| {
        Decimal::ONE + bucket.acceleration.abs().min(Decimal::ONE) * Decimal::new(1, 1)
    });
    SizeFactors {
        entry_quality: Decimal::ONE,
        structure_quality: Decimal::ONE,
        startup: Decimal::ONE,
        flow,
        impact: Decimal::ONE,
        acceleration,
        ctx_ws: Decimal::ONE,
        ladder_attack: Decimal::ONE,
    }
}

/// This tick's candidate SR levels, taken directly from the normalized
/// ladder — `RawLevel` and `LadderLevel` share a price/notional shape.
fn raw_levels(tick: &MarketTick) -> Vec<RawLevel> {
    tick.bid_ladder
        .iter()
        .chain(tick.ask_ladder.iter())
        .map(|level| RawLevel {
            price: level.price,
            notional_usd: level.notional_usd,
        })
        .collect()
}

/// Drives one `MarketTickSource` through the engine fold until the feed
/// reports [`FeedError::Exhausted`], executing each tick's returned
/// effects (trade-log append, notification dispatch) in order.
pub struct Application<F: MarketTickSource> {
    feed: F,
    engine: Option<EngineState>,
    config_watcher: ConfigWatcher,
    writer: TradeLogWriter,
    fees: FeeSchedule,
    base_risk_ratio: Decimal,
    starting_equity_usd: Decimal,
    equity_usd: Decimal,
    config_poll_interval_ms: i64,
    last_config_poll_ms: i64,
    /// Timestamp of the last tick that actually reached the engine,
    /// used as the `now_ms` basis for feed-error safety transitions
    /// (invalid tick / staleness) that arrive with no tick of their own.
    last_tick_ms: i64,
}

impl<F: MarketTickSource> Application<F> {
    pub fn new(runtime: &RuntimeConfig, feed: F) -> AppResult<Self> {
        let config_watcher = ConfigWatcher::new(&runtime.trade_config_path)?;
        let writer = TradeLogWriter::new(&runtime.trade_log_dir);
        Ok(Self {
            feed,
            engine: None,
            config_watcher,
            writer,
            fees: runtime.fee_schedule,
            base_risk_ratio: runtime.base_risk_ratio,
            starting_equity_usd: runtime.starting_equity_usd,
            equity_usd: runtime.starting_equity_usd,
            config_poll_interval_ms: runtime.config_poll_interval_ms,
            last_config_poll_ms: 0,
            last_tick_ms: 0,
        })
    }

    /// Runs until the feed is exhausted, folding each tick through
    /// `update_engine` and executing the effects it returns.
    pub async fn run(mut self) -> AppResult<()> {
        loop {
            let tick = match self.feed.next_tick().await {
                Ok(tick) => tick,
                Err(FeedError::Exhausted) => {
                    info!("feed exhausted, shutting down");
                    break;
                }
                Err(FeedError::InvalidTick(source)) => {
                    error!(error = %source, "feed produced an invalid tick, safety status -> ERROR");
                    if let Some(engine) = self.engine.as_mut() {
                        engine
                            .guard
                            .safety
                            .mark_invalid_tick(&source.to_string(), self.last_tick_ms);
                    }
                    continue;
                }
                Err(FeedError::Stale(elapsed_ms)) => {
                    warn!(elapsed_ms, "feed stalled past its staleness window");
                    if let Some(engine) = self.engine.as_mut() {
                        engine.guard.safety.mark_stale(
                            elapsed_ms,
                            self.last_tick_ms,
                            &self.config_watcher.current().safety,
                        );
                    }
                    continue;
                }
            };
            self.last_tick_ms = tick.timestamp_ms;

            if self.engine.is_none() {
                let engine = EngineState::new(
                    self.config_watcher.current(),
                    tick.timestamp_ms,
                    self.starting_equity_usd,
                );
                self.engine = Some(engine);
                self.last_config_poll_ms = tick.timestamp_ms;
            }
            let engine = self.engine.as_mut().expect("initialized above");

            if tick.timestamp_ms - self.last_config_poll_ms >= self.config_poll_interval_ms {
                self.config_watcher.poll();
                self.last_config_poll_ms = tick.timestamp_ms;
            }

            let sizing = SizingInputs {
                equity_usd: self.equity_usd,
                risk_ratio: self.base_risk_ratio
                    * railgate_config::scalar_for_equity(
                        &self.config_watcher.current().capital_stage_bands,
                        self.equity_usd,
                    ),
                trend_strength: trend_strength(&tick),
                directional_firepower: directional_firepower(&tick),
                size_factors: size_factors(&tick),
            };
            let levels = raw_levels(&tick);

            let effects = update_engine(
                engine,
                &tick,
                &levels,
                &sizing,
                self.config_watcher.current(),
                &self.fees,
            );

            self.execute_effects(effects, tick.timestamp_ms)?;
        }

        self.writer.close();
        Ok(())
    }

    fn execute_effects(&mut self, effects: EffectsQueue, now_ms: i64) -> AppResult<()> {
        for effect in effects.into_vec() {
            match effect {
                EngineEffect::AppendTradeLog(record) => {
                    self.equity_usd += record.net_pnl_usd;
                    self.writer.append(&record, now_ms)?;
                }
                EngineEffect::DispatchNotification(event) => match event.level {
                    NotificationLevel::Info => info!(ts = event.timestamp_ms, "{}", event.message),
                    NotificationLevel::Warning => warn!(ts = event.timestamp_ms, "{}", event.message),
                    NotificationLevel::Critical => {
                        error!(ts = event.timestamp_ms, "{}", event.message);
                    }
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use railgate_core::Price;
    use railgate_feed::{build_synthetic_walk, ReplayFeed, SyntheticWalkConfig};
    use rust_decimal_macros::dec;

    use super::*;

    /// Writes a minimal valid `TradeConfig` document to a fresh path
    /// under the OS temp dir so `Application::new` has something real
    /// to load — this workspace carries no file-fixture crate, so a
    /// plain `std::fs` write is the whole setup.
    fn write_trade_config() -> std::path::PathBuf {
        static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "railgate-app-test-{}-{}.json",
            std::process::id(),
            n
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{
                "min_band_distance_usd": "10",
                "min_expected_usd": "5",
                "capital_stage_bands": [
                    {{"min_equity_usd": "0", "max_equity_usd": "1000000", "size_scalar": "1"}}
                ]
            }}"#
        )
        .unwrap();
        path
    }

    fn runtime_config(trade_config_path: &std::path::Path) -> RuntimeConfig {
        RuntimeConfig {
            trade_config_path: trade_config_path.display().to_string(),
            trade_log_dir: std::env::temp_dir().display().to_string(),
            starting_equity_usd: dec!(10_000),
            base_risk_ratio: dec!(0.02),
            fee_schedule: FeeSchedule::default(),
            feed: crate::config::FeedSourceConfig::SyntheticWalk {
                seed: 1,
                start_mid: dec!(100_000),
                tick_count: 1,
                step_usd: dec!(5),
                spread_bps: dec!(0.5),
                start_timestamp_ms: 0,
                tick_interval_ms: 250,
                cadence_ms: 0,
            },
            config_poll_interval_ms: 0,
        }
    }

    #[tokio::test]
    async fn runs_to_completion_against_an_exhausting_feed() {
        let config_path = write_trade_config();
        let runtime = runtime_config(&config_path);
        let walk = build_synthetic_walk(SyntheticWalkConfig {
            tick_count: 5,
            start_mid: Price::new(dec!(100_000)),
            ..Default::default()
        });
        let feed = ReplayFeed::new(walk);
        let app = Application::new(&runtime, feed).unwrap();
        let result = app.run().await;
        std::fs::remove_file(&config_path).ok();
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn run_suspends_on_the_feed_until_cadence_elapses() {
        let config_path = write_trade_config();
        let runtime = runtime_config(&config_path);
        let walk = build_synthetic_walk(SyntheticWalkConfig {
            tick_count: 2,
            start_mid: Price::new(dec!(100_000)),
            ..Default::default()
        });
        let feed = ReplayFeed::with_cadence(walk, 1_000);
        let app = Application::new(&runtime, feed).unwrap();

        let mut task = tokio_test::task::spawn(app.run());
        tokio_test::assert_pending!(task.poll());
        tokio::time::advance(std::time::Duration::from_millis(1_000)).await;
        tokio_test::assert_pending!(task.poll());
        tokio::time::advance(std::time::Duration::from_millis(1_000)).await;
        let result = tokio_test::assert_ready!(task.poll());
        std::fs::remove_file(&config_path).ok();
        assert!(result.is_ok());
    }
}
