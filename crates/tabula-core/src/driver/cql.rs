use super::DriverError;
use crate::value::NativeValue;

///
/// CqlType
///
/// Native column-family column type.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CqlType {
    Ascii,
    BigInt,
    Blob,
    Boolean,
    Counter,
    Custom,
    Date,
    Decimal,
    Double,
    Float,
    Inet,
    Int,
    List,
    Map,
    Set,
    SmallInt,
    Text,
    Time,
    TimeUuid,
    Timestamp,
    TinyInt,
    Tuple,
    Udt,
    Uuid,
    Varchar,
    Varint,
}

///
/// CqlColumn
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CqlColumn {
    pub name: String,
    pub cql_type: CqlType,
}

impl CqlColumn {
    pub fn new(name: impl Into<String>, cql_type: CqlType) -> Self {
        Self {
            name: name.into(),
            cql_type,
        }
    }
}

///
/// CqlTable
/// Keyspace metadata for one table.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CqlTable {
    pub name: String,
    pub columns: Vec<CqlColumn>,

    /// Partition key columns followed by clustering columns.
    pub primary_key: Vec<String>,
}

///
/// PreparedCql
///
/// Session-wide prepared statement handle.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PreparedCql {
    pub id: u64,
    pub text: String,
}

///
/// CqlResult
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CqlResult {
    pub columns: Vec<CqlColumn>,
    pub rows: Vec<Vec<NativeValue>>,

    /// Lightweight-transaction outcome; `true` for unconditional statements.
    pub applied: bool,
}

impl CqlResult {
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }
}

///
/// CqlSession
///
/// Shared, thread-safe session against one cluster.
///

pub trait CqlSession: Send + Sync {
    fn tables(&self, keyspace: &str) -> Result<Vec<CqlTable>, DriverError>;

    fn prepare(&self, cql: &str) -> Result<PreparedCql, DriverError>;

    fn execute(&self, cql: &str, values: &[NativeValue]) -> Result<CqlResult, DriverError>;

    fn execute_prepared(
        &self,
        prepared: &PreparedCql,
        values: &[NativeValue],
    ) -> Result<CqlResult, DriverError>;
}
