use crate::obs::sink::{ExecKind, MetricsEvent, MetricsSink};
use std::sync::Mutex;

///
/// RecordingSink
///
/// Keeps every event it receives, with borrowed table names copied out.
///

#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<Recorded>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Recorded {
    Start(ExecKind, String),
    Finish(ExecKind, String, u64),
    CacheHit,
    CacheMiss,
    CacheEvict,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<Recorded> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl MetricsSink for RecordingSink {
    fn record(&self, event: MetricsEvent<'_>) {
        let event = match event {
            MetricsEvent::ExecStart { kind, table } => Recorded::Start(kind, table.to_string()),
            MetricsEvent::ExecFinish { kind, table, rows } => {
                Recorded::Finish(kind, table.to_string(), rows)
            }
            MetricsEvent::CacheHit => Recorded::CacheHit,
            MetricsEvent::CacheMiss => Recorded::CacheMiss,
            MetricsEvent::CacheEvict => Recorded::CacheEvict,
        };
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}
