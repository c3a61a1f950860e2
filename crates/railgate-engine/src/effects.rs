//! The effects queue (§5, §9 redesign flag): `update_engine` is a pure
//! fold over `EngineState`. It never performs IO itself — instead it
//! returns the IO the driver loop owes the outside world (trade-log
//! append, notification dispatch) as a list of [`EngineEffect`] values,
//! which the driver executes at the two async suspension points the
//! loop is permitted outside of the feed wait.

use railgate_persistence::TradeLogRecord;

/// Severity used to pick a notification channel/urgency at dispatch
/// time; the engine only classifies, it never sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub level: NotificationLevel,
    pub message: String,
    pub timestamp_ms: i64,
}

impl NotificationEvent {
    #[must_use]
    pub fn info(message: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
            timestamp_ms,
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
            timestamp_ms,
        }
    }

    #[must_use]
    pub fn critical(message: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            level: NotificationLevel::Critical,
            message: message.into(),
            timestamp_ms,
        }
    }
}

/// One unit of IO the driver loop owes the outside world after folding
/// a tick. Order in the returned `Vec` is the order effects should be
/// executed in.
#[derive(Debug, Clone)]
pub enum EngineEffect {
    AppendTradeLog(Box<TradeLogRecord>),
    DispatchNotification(NotificationEvent),
}

#[derive(Debug, Clone, Default)]
pub struct EffectsQueue(Vec<EngineEffect>);

impl EffectsQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, effect: EngineEffect) {
        self.0.push(effect);
    }

    pub fn push_trade_log(&mut self, record: TradeLogRecord) {
        self.push(EngineEffect::AppendTradeLog(Box::new(record)));
    }

    pub fn push_notification(&mut self, event: NotificationEvent) {
        self.push(EngineEffect::DispatchNotification(event));
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<EngineEffect> {
        self.0
    }
}
