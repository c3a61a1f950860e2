//! Append-only JSON Lines trade log (§6).
//!
//! Each line is a complete JSON object — partial file corruption from an
//! interrupted write only ever affects the last line. A small
//! TTL-bounded dedup cache keyed on the closing fill's identity guards
//! against appending the same trade twice if the driver retries a
//! write after an earlier one that actually succeeded.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::PersistenceResult;
use crate::schema::{LogSide, TradeLogRecord};

/// Identity used to detect a duplicate append: the semantic fields of
/// the closed fill itself, not the freshly-generated `trade_id` — a
/// retried write after an earlier success carries a new UUID but the
/// same underlying trade, and must still be recognized as a duplicate.
type TradeKey = (LogSide, i64, i64, Decimal, Decimal, Decimal);

fn trade_key(record: &TradeLogRecord) -> TradeKey {
    (
        record.side,
        record.entry_timestamp_ms,
        record.exit_timestamp_ms,
        record.entry_price.inner(),
        record.exit_price.inner(),
        record.size.inner(),
    )
}

struct ActiveWriter {
    writer: BufWriter<File>,
    date: String,
    records_written: usize,
}

/// A bounded recency window of recently-appended trade keys, evicted
/// both by count and by age so the dedup check stays O(1)-ish without
/// growing unbounded over a long-running process.
struct DedupWindow {
    entries: VecDeque<(TradeKey, i64)>,
    ttl_ms: i64,
    max_entries: usize,
}

impl DedupWindow {
    fn new(ttl_ms: i64, max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            ttl_ms,
            max_entries,
        }
    }

    fn evict(&mut self, now_ms: i64) {
        while let Some((_, ts)) = self.entries.front() {
            if now_ms - ts > self.ttl_ms {
                self.entries.pop_front();
            } else {
                break;
            }
        }
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    fn contains(&self, key: &TradeKey) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    fn insert(&mut self, key: TradeKey, now_ms: i64) {
        self.evict(now_ms);
        self.entries.push_back((key, now_ms));
    }
}

/// JSON Lines writer for closed trades, rotating to a new file each
/// UTC day.
pub struct TradeLogWriter {
    base_dir: String,
    active_writer: Option<ActiveWriter>,
    dedup: DedupWindow,
}

impl TradeLogWriter {
    pub fn new(base_dir: &str) -> Self {
        if let Err(e) = std::fs::create_dir_all(base_dir) {
            warn!(?e, dir = base_dir, "failed to create trade log directory");
        }
        Self {
            base_dir: base_dir.to_string(),
            active_writer: None,
            dedup: DedupWindow::new(60_000, 1024),
        }
    }

    fn create_new_writer(&mut self, date: &str) -> PersistenceResult<()> {
        let filename = format!("{}/trades_{}.jsonl", self.base_dir, date);
        info!(filename = %filename, "opening trade log writer (append mode)");
        let file = OpenOptions::new().create(true).append(true).open(&filename)?;
        self.active_writer = Some(ActiveWriter {
            writer: BufWriter::new(file),
            date: date.to_string(),
            records_written: 0,
        });
        Ok(())
    }

    fn close_active_writer(&mut self) {
        if let Some(mut active) = self.active_writer.take() {
            if let Err(e) = active.writer.flush() {
                warn!(?e, "failed to flush trade log writer on close");
            }
            info!(date = %active.date, records = active.records_written, "closed trade log writer");
        }
    }

    /// Appends `record` unless an equivalent record was appended within
    /// the dedup window. Returns `true` if it was actually written.
    pub fn append(&mut self, record: &TradeLogRecord, now_ms: i64) -> PersistenceResult<bool> {
        let key = trade_key(record);
        if self.dedup.contains(&key) {
            debug!(?key, "trade log: skipping duplicate append");
            return Ok(false);
        }

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let needs_rotation = self.active_writer.as_ref().map(|w| w.date != today).unwrap_or(false);
        if needs_rotation {
            self.close_active_writer();
        }
        if self.active_writer.is_none() {
            self.create_new_writer(&today)?;
        }

        let json = serde_json::to_string(record)?;
        let active = self.active_writer.as_mut().expect("active_writer should exist");
        writeln!(active.writer, "{json}")?;
        active.writer.flush()?;
        active.records_written += 1;

        self.dedup.insert(key, now_ms);
        Ok(true)
    }

    pub fn close(&mut self) {
        self.close_active_writer();
    }
}

impl Drop for TradeLogWriter {
    fn drop(&mut self) {
        self.close_active_writer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CaptureMetrics, CounterfactualRegret, LogQuality, LoggedEntryContext, TradeResult, SCHEMA_VERSION};
    use railgate_core::{Price, Size};
    use railgate_decision::ExecutionMode;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn record(exit_ts: i64) -> TradeLogRecord {
        TradeLogRecord {
            trade_id: Uuid::new_v4(),
            entry_timestamp_ms: 0,
            exit_timestamp_ms: exit_ts,
            hold_ms: exit_ts,
            side: LogSide::Long,
            entry_price: Price::new(dec!(100)),
            exit_price: Price::new(dec!(101)),
            size: Size::new(dec!(1)),
            notional_usd: dec!(100),
            gross_pnl_usd: dec!(1),
            net_pnl_usd: dec!(1),
            entry_fee_usd: dec!(0),
            exit_fee_usd: dec!(0),
            entry_execution_mode: ExecutionMode::Taker,
            exit_execution_mode: ExecutionMode::Taker,
            result: TradeResult::Win,
            exit_reason: "tp".into(),
            exit_signal: None,
            exit_detail: None,
            tp_px: None,
            tp1_price: None,
            tp2_price: None,
            stretch_ratio: dec!(0),
            max_adverse_ratio: dec!(0),
            worst_px: Price::new(dec!(100)),
            capture: CaptureMetrics::compute(dec!(1), dec!(1)),
            regret: CounterfactualRegret::compute(dec!(1), dec!(1), dec!(1)),
            entry_context: LoggedEntryContext {
                planned_tp_usd: dec!(1),
                map_strength: dec!(0),
                path_depth: 0,
                cluster_count: 0,
                structural_distance_usd: dec!(0),
            },
            revision: 1,
            quality: LogQuality::Ok,
            schema_version: SCHEMA_VERSION,
        }
    }

    #[test]
    fn append_writes_and_skips_duplicate() {
        let dir = std::env::temp_dir().join(format!("railgate-trades-{:?}", std::thread::current().id()));
        let mut writer = TradeLogWriter::new(dir.to_str().unwrap());
        let record = record(1000);
        assert!(writer.append(&record, 0).unwrap());
        assert!(!writer.append(&record, 10).unwrap());
        writer.close();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn append_distinguishes_by_semantic_key_not_trade_id() {
        let dir = std::env::temp_dir().join(format!("railgate-trades-distinct-{:?}", std::thread::current().id()));
        let mut writer = TradeLogWriter::new(dir.to_str().unwrap());
        let a = record(1000);
        let mut b = record(1000);
        b.trade_id = Uuid::new_v4();
        assert!(writer.append(&a, 0).unwrap());
        // Same semantic key, different trade_id: still a duplicate.
        assert!(!writer.append(&b, 10).unwrap());
        writer.close();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn dedup_window_evicts_after_ttl() {
        let mut window = DedupWindow::new(100, 10);
        let key = (LogSide::Long, 0, 1000, dec!(100), dec!(101), dec!(1));
        window.insert(key, 0);
        assert!(window.contains(&key));
        window.evict(200);
        assert!(!window.contains(&key));
    }
}
