//! Daily statistics summary: periodic human-readable rollup of the
//! trade PnL and holding-time histograms, logged rather than pushed
//! anywhere (this workspace has no dashboard, §9).

use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use tracing::info;

use crate::metrics::{POSITION_HOLDING_TIME_MS, TRADE_PNL_BPS};

#[derive(Debug, Clone, Default)]
pub struct DailySummary {
    pub trade_count: u64,
    pub pnl_bps_p50: f64,
    pub pnl_bps_p95: f64,
    pub holding_ms_p50: f64,
    pub holding_ms_p95: f64,
}

pub struct DailyStatsReporter {
    start_time: DateTime<Utc>,
}

impl Default for DailyStatsReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DailyStatsReporter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Utc::now(),
        }
    }

    #[must_use]
    pub fn summary(&self) -> DailySummary {
        let (pnl_count, pnl_p50, pnl_p95) = Self::histogram_percentiles(&TRADE_PNL_BPS);
        let (_, hold_p50, hold_p95) = Self::histogram_percentiles(&POSITION_HOLDING_TIME_MS);
        DailySummary {
            trade_count: pnl_count,
            pnl_bps_p50: pnl_p50,
            pnl_bps_p95: pnl_p95,
            holding_ms_p50: hold_p50,
            holding_ms_p95: hold_p95,
        }
    }

    fn histogram_percentiles(histogram: &prometheus::HistogramVec) -> (u64, f64, f64) {
        let mut total_count = 0u64;
        let mut buckets_acc: Vec<(f64, u64)> = Vec::new();

        for mf in histogram.collect() {
            for m in mf.get_metric() {
                let h = m.get_histogram();
                total_count += h.get_sample_count();
                for bucket in h.get_bucket() {
                    buckets_acc.push((bucket.get_upper_bound(), bucket.get_cumulative_count()));
                }
            }
        }

        if total_count == 0 {
            return (0, 0.0, 0.0);
        }

        buckets_acc.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        let p50 = Self::percentile_from_buckets(&buckets_acc, total_count, 0.50);
        let p95 = Self::percentile_from_buckets(&buckets_acc, total_count, 0.95);
        (total_count, p50, p95)
    }

    fn percentile_from_buckets(buckets: &[(f64, u64)], total_count: u64, percentile: f64) -> f64 {
        let target = (total_count as f64 * percentile) as u64;
        let mut prev_bound = 0.0;
        let mut prev_count = 0u64;

        for (upper_bound, cumulative_count) in buckets {
            if *cumulative_count >= target {
                let bucket_count = cumulative_count - prev_count;
                if bucket_count == 0 {
                    return *upper_bound;
                }
                let position = (target - prev_count) as f64 / bucket_count as f64;
                return prev_bound + position * (upper_bound - prev_bound);
            }
            prev_bound = *upper_bound;
            prev_count = *cumulative_count;
        }

        buckets.last().map(|b| b.0).unwrap_or(0.0)
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        let duration = Utc::now() - self.start_time;
        info!(
            period_start = %self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            hours = duration.num_hours(),
            trade_count = summary.trade_count,
            pnl_bps_p50 = summary.pnl_bps_p50,
            pnl_bps_p95 = summary.pnl_bps_p95,
            holding_ms_p50 = summary.holding_ms_p50,
            holding_ms_p95 = summary.holding_ms_p95,
            "daily statistics summary"
        );
    }
}
