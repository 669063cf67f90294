use crate::{
    driver::{CqlColumn, CqlResult, CqlSession, CqlTable, CqlType, DriverError, PreparedCql},
    value::NativeValue,
};
use std::{
    collections::VecDeque,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
};

///
/// RecordingSession
///
/// Scripted column-family session. Every statement (prepared or not) is
/// logged with its values; `prepares` counts compilations so statement
/// cache reuse is observable.
///

#[derive(Debug, Default)]
pub(crate) struct RecordingSession {
    tables: Vec<CqlTable>,
    next_id: AtomicU64,
    pub(crate) prepares: AtomicU64,
    inner: Mutex<Recorded>,
}

#[derive(Debug, Default)]
pub(crate) struct Recorded {
    pub log: Vec<(String, Vec<NativeValue>)>,
    pub results: VecDeque<CqlResult>,
}

impl RecordingSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_table(mut self, name: &str, columns: &[(&str, CqlType)], key: &[&str]) -> Self {
        self.tables.push(CqlTable {
            name: name.to_string(),
            columns: columns
                .iter()
                .map(|(n, t)| CqlColumn::new(*n, *t))
                .collect(),
            primary_key: key.iter().map(ToString::to_string).collect(),
        });
        self
    }

    pub(crate) fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn push_rows(&self, columns: &[(&str, CqlType)], rows: Vec<Vec<NativeValue>>) {
        self.recorded().results.push_back(CqlResult {
            columns: columns.iter().map(|(n, t)| CqlColumn::new(*n, *t)).collect(),
            rows,
            applied: true,
        });
    }

    pub(crate) fn push_applied(&self, applied: bool) {
        self.recorded().results.push_back(CqlResult {
            applied,
            ..CqlResult::default()
        });
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        self.recorded().log.iter().map(|(s, _)| s.clone()).collect()
    }

    pub(crate) fn last_values(&self) -> Vec<NativeValue> {
        self.recorded()
            .log
            .last()
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    fn run(&self, cql: &str, values: &[NativeValue]) -> CqlResult {
        let mut recorded = self.recorded();
        recorded.log.push((cql.to_string(), values.to_vec()));
        recorded.results.pop_front().unwrap_or_else(|| CqlResult {
            applied: true,
            ..CqlResult::default()
        })
    }
}

impl CqlSession for RecordingSession {
    fn tables(&self, _keyspace: &str) -> Result<Vec<CqlTable>, DriverError> {
        Ok(self.tables.clone())
    }

    fn prepare(&self, cql: &str) -> Result<PreparedCql, DriverError> {
        self.prepares.fetch_add(1, Ordering::Relaxed);
        Ok(PreparedCql {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            text: cql.to_string(),
        })
    }

    fn execute(&self, cql: &str, values: &[NativeValue]) -> Result<CqlResult, DriverError> {
        Ok(self.run(cql, values))
    }

    fn execute_prepared(
        &self,
        prepared: &PreparedCql,
        values: &[NativeValue],
    ) -> Result<CqlResult, DriverError> {
        Ok(self.run(&prepared.text, values))
    }
}
