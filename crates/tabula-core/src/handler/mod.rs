//! Module: handler
//!
//! The handler facade. One [`DataHandler`] value is built per configured
//! data source and dispatches every operation to the backend family chosen
//! at construction.

mod cql;
mod rdbms;
mod reference;

#[cfg(test)]
mod tests;

pub use cql::CqlHandler;
pub use rdbms::RdbmsHandler;

use crate::{
    driver::{ConnectionSource, CqlSession},
    error::InternalError,
    model::{Catalog, DataColumn, NavigationEdge, PrimaryKeySet, TableMetadata},
    obs::sink::SharedSink,
    query::{QueryOptions, Statement},
    record::Record,
    txn::TxContext,
    value::{self, NativeValue},
};
use indexmap::IndexMap;
use std::sync::Arc;
use tabula_config::HandlerConfig;

///
/// DataHandler
///
/// Backend-agnostic operation contract consumed by the protocol layer.
///

pub enum DataHandler {
    Rdbms(RdbmsHandler),
    ColumnFamily(CqlHandler),
}

macro_rules! dispatch {
    ($self:expr, $handler:ident => $call:expr) => {
        match $self {
            DataHandler::Rdbms($handler) => $call,
            DataHandler::ColumnFamily($handler) => $call,
        }
    };
}

impl DataHandler {
    /// Relational handler over a connection pool. Introspects the catalog
    /// before returning.
    pub fn rdbms(
        config: HandlerConfig,
        source: Arc<dyn ConnectionSource>,
    ) -> Result<Self, InternalError> {
        RdbmsHandler::new(config, source).map(Self::Rdbms)
    }

    /// Column-family handler over a shared session. `config.keyspace` is
    /// required.
    pub fn column_family(
        config: HandlerConfig,
        session: Arc<dyn CqlSession>,
    ) -> Result<Self, InternalError> {
        CqlHandler::new(config, session).map(Self::ColumnFamily)
    }

    /// Install a metrics sink on the handler and its statement cache.
    #[must_use]
    pub fn with_sink(self, sink: SharedSink) -> Self {
        match self {
            Self::Rdbms(h) => Self::Rdbms(h.with_sink(sink)),
            Self::ColumnFamily(h) => Self::ColumnFamily(h.with_sink(sink)),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        dispatch!(self, h => h.catalog())
    }

    #[must_use]
    pub fn config(&self) -> &HandlerConfig {
        dispatch!(self, h => h.config())
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    #[must_use]
    pub fn table_list(&self) -> Vec<String> {
        self.catalog().table_names()
    }

    #[must_use]
    pub fn table_metadata(&self) -> &IndexMap<String, TableMetadata> {
        self.catalog().tables()
    }

    #[must_use]
    pub fn primary_keys(&self) -> &PrimaryKeySet {
        self.catalog().primary_keys()
    }

    /// Foreign-key navigation edges; always empty for column-family stores.
    #[must_use]
    pub fn navigation_properties(&self) -> &[NavigationEdge] {
        self.catalog().navigation()
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    pub fn read(
        &self,
        tx: &mut TxContext,
        table: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Record>, InternalError> {
        dispatch!(self, h => h.read(tx, table, options))
    }

    pub fn read_by_key(
        &self,
        tx: &mut TxContext,
        table: &str,
        keys: &Record,
    ) -> Result<Vec<Record>, InternalError> {
        dispatch!(self, h => h.read_by_key(tx, table, keys))
    }

    pub fn insert(
        &self,
        tx: &mut TxContext,
        table: &str,
        record: &Record,
    ) -> Result<Record, InternalError> {
        dispatch!(self, h => h.insert(tx, table, record))
    }

    pub fn update(
        &self,
        tx: &mut TxContext,
        table: &str,
        record: &Record,
    ) -> Result<bool, InternalError> {
        dispatch!(self, h => h.update(tx, table, record))
    }

    /// Update guarded by the values in `old`: the write only applies when
    /// the stored row still matches them.
    pub fn update_if(
        &self,
        tx: &mut TxContext,
        table: &str,
        old: &Record,
        new: &Record,
    ) -> Result<bool, InternalError> {
        dispatch!(self, h => h.update_if(tx, table, old, new))
    }

    pub fn delete(
        &self,
        tx: &mut TxContext,
        table: &str,
        record: &Record,
    ) -> Result<bool, InternalError> {
        dispatch!(self, h => h.delete(tx, table, record))
    }

    pub fn count(
        &self,
        tx: &mut TxContext,
        table: &str,
        options: &QueryOptions,
    ) -> Result<u64, InternalError> {
        dispatch!(self, h => h.count(tx, table, options))
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    pub fn open_transaction(&self, tx: &mut TxContext) -> Result<(), InternalError> {
        dispatch!(self, h => h.open_transaction(tx))
    }

    pub fn commit_transaction(&self, tx: &mut TxContext) -> Result<(), InternalError> {
        dispatch!(self, h => h.commit_transaction(tx))
    }

    pub fn rollback_transaction(&self, tx: &mut TxContext) -> Result<(), InternalError> {
        dispatch!(self, h => h.rollback_transaction(tx))
    }

    // ------------------------------------------------------------------
    // References
    // ------------------------------------------------------------------

    pub fn update_reference(
        &self,
        tx: &mut TxContext,
        root_table: &str,
        root_keys: &Record,
        other_table: &str,
        other_keys: &Record,
    ) -> Result<(), InternalError> {
        dispatch!(self, h => h.update_reference(tx, root_table, root_keys, other_table, other_keys))
    }

    pub fn delete_reference(
        &self,
        tx: &mut TxContext,
        root_table: &str,
        root_keys: &Record,
        other_table: &str,
        other_keys: &Record,
    ) -> Result<(), InternalError> {
        dispatch!(self, h => h.delete_reference(tx, root_table, root_keys, other_table, other_keys))
    }
}

// ----------------------------------------------------------------------
// Shared helpers
// ----------------------------------------------------------------------

fn log_statement(table: &str, statement: &Statement) {
    tracing::debug!(
        table,
        statement = %statement.text,
        params = ?statement.params,
        "executing statement"
    );
}

/// Convert result rows into stamped records. Result columns are matched to
/// table columns exactly, then case-insensitively; unknown result columns
/// are ignored.
fn rows_to_records(
    config_id: &str,
    table: &TableMetadata,
    columns: &[String],
    rows: Vec<Vec<NativeValue>>,
) -> Result<Vec<Record>, InternalError> {
    let resolved: Vec<Option<&DataColumn>> = columns
        .iter()
        .map(|name| {
            table.column(name).or_else(|| {
                table
                    .columns
                    .values()
                    .find(|c| c.name.eq_ignore_ascii_case(name))
            })
        })
        .collect();

    rows.into_iter()
        .map(|row| {
            let mut record = Record::new();
            for (column, native) in resolved.iter().zip(&row) {
                if let Some(column) = column {
                    let value = value::from_column(column, native)?;
                    record.insert(column.name.clone(), value);
                }
            }
            record.stamp(config_id, &table.name);

            Ok(record)
        })
        .collect()
}

/// First value of the first row as a count.
fn count_from(rows: &[Vec<NativeValue>]) -> Result<u64, InternalError> {
    let Some(native) = rows.first().and_then(|row| row.first()) else {
        return Ok(0);
    };

    let count = match native {
        NativeValue::Decimal(d) => i64::try_from(*d).ok(),
        NativeValue::Text(s) => s.trim().parse().ok(),
        other => other.as_i64(),
    };

    count
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| {
            InternalError::binding(format!(
                "count returned a non-integral {} value",
                native.kind()
            ))
        })
}
