use super::{DriverError, RowSet};
use crate::value::NativeValue;
use std::fmt;

///
/// SqlType
///
/// Native column type as reported by relational catalog introspection.
/// Variants mirror the standard JDBC type codes.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    NChar,
    NVarchar,
    LongNVarchar,
    Clob,
    NClob,
    SqlXml,
    Boolean,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    LongVarBinary,
    Blob,
    Other(i32),
}

impl SqlType {
    /// Decode a JDBC `java.sql.Types` code.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            -7 => Self::Bit,
            -6 => Self::TinyInt,
            5 => Self::SmallInt,
            4 => Self::Integer,
            -5 => Self::BigInt,
            6 => Self::Float,
            7 => Self::Real,
            8 => Self::Double,
            2 => Self::Numeric,
            3 => Self::Decimal,
            1 => Self::Char,
            12 => Self::Varchar,
            -1 => Self::LongVarchar,
            -15 => Self::NChar,
            -9 => Self::NVarchar,
            -16 => Self::LongNVarchar,
            2005 => Self::Clob,
            2011 => Self::NClob,
            2009 => Self::SqlXml,
            16 => Self::Boolean,
            91 => Self::Date,
            92 => Self::Time,
            93 => Self::Timestamp,
            -2 => Self::Binary,
            -3 => Self::VarBinary,
            -4 => Self::LongVarBinary,
            2004 => Self::Blob,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Bit => -7,
            Self::TinyInt => -6,
            Self::SmallInt => 5,
            Self::Integer => 4,
            Self::BigInt => -5,
            Self::Float => 6,
            Self::Real => 7,
            Self::Double => 8,
            Self::Numeric => 2,
            Self::Decimal => 3,
            Self::Char => 1,
            Self::Varchar => 12,
            Self::LongVarchar => -1,
            Self::NChar => -15,
            Self::NVarchar => -9,
            Self::LongNVarchar => -16,
            Self::Clob => 2005,
            Self::NClob => 2011,
            Self::SqlXml => 2009,
            Self::Boolean => 16,
            Self::Date => 91,
            Self::Time => 92,
            Self::Timestamp => 93,
            Self::Binary => -2,
            Self::VarBinary => -3,
            Self::LongVarBinary => -4,
            Self::Blob => 2004,
            Self::Other(code) => code,
        }
    }
}

///
/// IsolationLevel
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IsolationLevel {
    None,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "NONE",
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        };
        f.write_str(label)
    }
}

///
/// TableRef
/// One discovered table and the schema that owns it, if any.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }
}

///
/// ColumnInfo
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub sql_type: SqlType,
    pub size: u32,
    pub decimal_digits: u32,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub auto_increment: bool,
}

///
/// ExportedKey
///
/// One foreign-key column pair referencing the introspected table.
/// `pk_column` lives on the exporting table, `fk_column` on `fk_table`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExportedKey {
    pub pk_column: String,
    pub fk_table: String,
    pub fk_column: String,
}

///
/// SqlConnection
///
/// One live relational connection. Dropping the box releases it (back to
/// the pool, or closed).
///

pub trait SqlConnection: Send {
    fn product_name(&mut self) -> Result<String, DriverError>;

    fn user_name(&mut self) -> Result<Option<String>, DriverError>;

    fn catalog_name(&mut self) -> Result<Option<String>, DriverError>;

    /// Tables visible to this connection, optionally restricted to `schema`.
    fn tables(&mut self, schema: Option<&str>) -> Result<Vec<TableRef>, DriverError>;

    fn columns(&mut self, table: &TableRef) -> Result<Vec<ColumnInfo>, DriverError>;

    /// Primary-key columns in key-sequence order.
    fn primary_keys(&mut self, table: &TableRef) -> Result<Vec<String>, DriverError>;

    fn exported_keys(&mut self, table: &TableRef) -> Result<Vec<ExportedKey>, DriverError>;

    fn query(&mut self, sql: &str, params: &[NativeValue]) -> Result<RowSet, DriverError>;

    /// Execute a write and return the affected row count.
    fn execute(&mut self, sql: &str, params: &[NativeValue]) -> Result<u64, DriverError>;

    /// Execute an insert and return the generated keys for `generated`
    /// (one row per inserted row, columns in the requested order).
    fn execute_insert(
        &mut self,
        sql: &str,
        params: &[NativeValue],
        generated: &[&str],
    ) -> Result<RowSet, DriverError>;

    fn auto_commit(&mut self) -> Result<bool, DriverError>;

    fn set_auto_commit(&mut self, enabled: bool) -> Result<(), DriverError>;

    fn isolation(&mut self) -> Result<IsolationLevel, DriverError>;

    fn set_isolation(&mut self, level: IsolationLevel) -> Result<(), DriverError>;

    fn commit(&mut self) -> Result<(), DriverError>;

    fn rollback(&mut self) -> Result<(), DriverError>;
}

///
/// ConnectionSource
/// Connection pool seam shared by every relational handler operation.
///

pub trait ConnectionSource: Send + Sync {
    fn connection(&self) -> Result<Box<dyn SqlConnection>, DriverError>;
}

///
/// TESTS
///
