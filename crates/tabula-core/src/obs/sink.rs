//! Metrics sink boundary.
//!
//! Handlers and the statement cache never aggregate metrics themselves.
//! All instrumentation flows through MetricsEvent into an injected
//! MetricsSink; with no sink installed events are dropped.

use std::sync::Arc;

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Read,
    ReadByKey,
    Count,
    Insert,
    Update,
    Delete,
    Reference,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent<'a> {
    ExecStart { kind: ExecKind, table: &'a str },
    ExecFinish { kind: ExecKind, table: &'a str, rows: u64 },
    CacheHit,
    CacheMiss,
    CacheEvict,
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent<'_>);
}

/// Shared handle as stored by handlers and caches.
pub type SharedSink = Arc<dyn MetricsSink>;

///
/// TracingSink
/// Forwards every event to `tracing` at trace level.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn record(&self, event: MetricsEvent<'_>) {
        tracing::trace!(?event, "tabula metrics event");
    }
}

/// Deliver `event` to `sink`, if one is installed.
pub(crate) fn emit(sink: Option<&SharedSink>, event: MetricsEvent<'_>) {
    if let Some(sink) = sink {
        sink.record(event);
    }
}
