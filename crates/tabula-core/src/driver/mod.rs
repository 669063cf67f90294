//! Module: driver
//!
//! Backend seams. Everything above this module talks to databases only
//! through [`ConnectionSource`]/[`SqlConnection`] (relational) and
//! [`CqlSession`] (column-family), exchanging [`NativeValue`] rows.

mod cql;
mod sql;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cql::{CqlColumn, CqlResult, CqlSession, CqlTable, CqlType, PreparedCql};
pub use sql::{
    ColumnInfo, ConnectionSource, ExportedKey, IsolationLevel, SqlConnection, SqlType, TableRef,
};

use crate::value::NativeValue;
use thiserror::Error as ThisError;

///
/// DriverError
///
/// Opaque failure reported by a driver implementation.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DriverError {
    fn from(err: rusqlite::Error) -> Self {
        Self::new(err.to_string())
    }
}

///
/// RowSet
///
/// Fully materialized query result. Cursors are drained by the driver
/// before the statement is released.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<NativeValue>>,
}

impl RowSet {
    #[must_use]
    pub const fn new(columns: Vec<String>, rows: Vec<Vec<NativeValue>>) -> Self {
        Self { columns, rows }
    }

    /// Position of `column`, matched exactly first and then case-insensitively.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(column))
            })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

///
/// TESTS
///
