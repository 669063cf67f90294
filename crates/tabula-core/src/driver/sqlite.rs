//! Module: driver::sqlite
//!
//! Embedded relational backend over `rusqlite`. Each call to
//! [`SqliteSource::connection`] opens a fresh connection to the same
//! database; in-memory databases use a named shared cache held open by
//! the source for its whole lifetime.

use super::{
    ColumnInfo, ConnectionSource, DriverError, ExportedKey, IsolationLevel, RowSet, SqlConnection,
    SqlType, TableRef,
};
use crate::value::{self, NativeValue};
use rusqlite::{
    Connection, OpenFlags, params_from_iter,
    types::{Value, ValueRef},
};
use std::{path::Path, sync::Mutex};

const PRODUCT_NAME: &str = "SQLite";

///
/// SqliteSource
///

#[derive(Debug)]
pub struct SqliteSource {
    target: String,
    keeper: Option<Mutex<Connection>>,
}

impl SqliteSource {
    /// Database file at `path`, created when missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let target = path.as_ref().to_string_lossy().into_owned();
        open_connection(&target)?;

        Ok(Self {
            target,
            keeper: None,
        })
    }

    /// Named in-memory database shared by every connection of this source.
    /// The data lives until the source is dropped.
    pub fn memory(name: &str) -> Result<Self, DriverError> {
        let target = format!("file:{name}?mode=memory&cache=shared");
        let keeper = open_connection(&target)?;

        Ok(Self {
            target,
            keeper: Some(Mutex::new(keeper)),
        })
    }

    /// Run a batch of statements on a fresh auto-commit connection.
    pub fn execute_batch(&self, sql: &str) -> Result<(), DriverError> {
        open_connection(&self.target)?.execute_batch(sql)?;

        Ok(())
    }

    #[must_use]
    pub const fn is_memory(&self) -> bool {
        self.keeper.is_some()
    }
}

impl ConnectionSource for SqliteSource {
    fn connection(&self) -> Result<Box<dyn SqlConnection>, DriverError> {
        let conn = open_connection(&self.target)?;

        Ok(Box::new(SqliteConnection {
            conn,
            auto_commit: true,
        }))
    }
}

fn open_connection(target: &str) -> Result<Connection, DriverError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(target, flags)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    Ok(conn)
}

///
/// SqliteConnection
///
/// With auto-commit off, a transaction is begun lazily before the first
/// statement and ended by `commit`/`rollback`. SQLite only offers
/// serializable isolation.
///

struct SqliteConnection {
    conn: Connection,
    auto_commit: bool,
}

impl SqliteConnection {
    fn begin_if_manual(&mut self) -> Result<(), DriverError> {
        if !self.auto_commit && self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }

        Ok(())
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn table_names(&self) -> Result<Vec<String>, DriverError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(names)
    }
}

impl SqlConnection for SqliteConnection {
    fn product_name(&mut self) -> Result<String, DriverError> {
        Ok(PRODUCT_NAME.to_string())
    }

    fn user_name(&mut self) -> Result<Option<String>, DriverError> {
        Ok(None)
    }

    fn catalog_name(&mut self) -> Result<Option<String>, DriverError> {
        Ok(Some("main".to_string()))
    }

    fn tables(&mut self, _schema: Option<&str>) -> Result<Vec<TableRef>, DriverError> {
        Ok(self
            .table_names()?
            .into_iter()
            .map(|name| TableRef::new(None, name))
            .collect())
    }

    fn columns(&mut self, table: &TableRef) -> Result<Vec<ColumnInfo>, DriverError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let rows = stmt
            .query_map([&table.name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // A lone INTEGER primary key aliases the rowid.
        let key_count = rows.iter().filter(|row| row.4 > 0).count();

        Ok(rows
            .into_iter()
            .map(|(name, declared, not_null, default_value, pk)| {
                let (size, decimal_digits) = type_size(&declared);
                let rowid_alias =
                    pk > 0 && key_count == 1 && declared.trim().eq_ignore_ascii_case("INTEGER");

                ColumnInfo {
                    name,
                    sql_type: column_type(&declared),
                    size,
                    decimal_digits,
                    nullable: !not_null && pk == 0,
                    default_value,
                    auto_increment: rowid_alias,
                }
            })
            .collect())
    }

    fn primary_keys(&mut self, table: &TableRef) -> Result<Vec<String>, DriverError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk")?;
        let keys = stmt
            .query_map([&table.name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(keys)
    }

    fn exported_keys(&mut self, table: &TableRef) -> Result<Vec<ExportedKey>, DriverError> {
        let parent_keys = self.primary_keys(table)?;
        let mut exported = Vec::new();

        for child in self.table_names()? {
            let mut stmt = self.conn.prepare(
                "SELECT seq, \"from\", \"to\" FROM pragma_foreign_key_list(?1) \
                 WHERE \"table\" = ?2 COLLATE NOCASE ORDER BY id, seq",
            )?;
            let pairs = stmt
                .query_map([&child, &table.name], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            for (seq, from, to) in pairs {
                // An omitted parent column list references the primary key.
                let pk_column = to.or_else(|| {
                    usize::try_from(seq)
                        .ok()
                        .and_then(|i| parent_keys.get(i).cloned())
                });
                let Some(pk_column) = pk_column else {
                    continue;
                };

                exported.push(ExportedKey {
                    pk_column,
                    fk_table: child.clone(),
                    fk_column: from,
                });
            }
        }

        Ok(exported)
    }

    fn query(&mut self, sql: &str, params: &[NativeValue]) -> Result<RowSet, DriverError> {
        self.begin_if_manual()?;
        let values = bind_all(params)?;

        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(values))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut row_values = Vec::with_capacity(width);
            for i in 0..width {
                row_values.push(native(row.get_ref(i)?));
            }
            out.push(row_values);
        }

        Ok(RowSet::new(columns, out))
    }

    fn execute(&mut self, sql: &str, params: &[NativeValue]) -> Result<u64, DriverError> {
        self.begin_if_manual()?;
        let values = bind_all(params)?;
        let affected = self.conn.execute(sql, params_from_iter(values))?;

        Ok(u64::try_from(affected).unwrap_or(u64::MAX))
    }

    /// Only the rowid is generated; it is reported for the first requested
    /// column.
    fn execute_insert(
        &mut self,
        sql: &str,
        params: &[NativeValue],
        generated: &[&str],
    ) -> Result<RowSet, DriverError> {
        self.execute(sql, params)?;

        let Some(first) = generated.first() else {
            return Ok(RowSet::default());
        };
        let rowid = self.conn.last_insert_rowid();

        Ok(RowSet::new(
            vec![(*first).to_string()],
            vec![vec![NativeValue::Int64(rowid)]],
        ))
    }

    fn auto_commit(&mut self) -> Result<bool, DriverError> {
        Ok(self.auto_commit)
    }

    fn set_auto_commit(&mut self, enabled: bool) -> Result<(), DriverError> {
        if enabled && self.in_transaction() {
            self.conn.execute_batch("COMMIT")?;
        }
        self.auto_commit = enabled;

        Ok(())
    }

    fn isolation(&mut self) -> Result<IsolationLevel, DriverError> {
        Ok(IsolationLevel::Serializable)
    }

    fn set_isolation(&mut self, level: IsolationLevel) -> Result<(), DriverError> {
        match level {
            IsolationLevel::Serializable => Ok(()),
            other => Err(DriverError::new(format!(
                "{PRODUCT_NAME} does not support {other} isolation"
            ))),
        }
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        if self.in_transaction() {
            self.conn.execute_batch("COMMIT")?;
        }

        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        if self.in_transaction() {
            self.conn.execute_batch("ROLLBACK")?;
        }

        Ok(())
    }
}

// ----------------------------------------------------------------------
// Values
// ----------------------------------------------------------------------

fn bind_all(params: &[NativeValue]) -> Result<Vec<Value>, DriverError> {
    params.iter().map(bind).collect()
}

fn bind(value: &NativeValue) -> Result<Value, DriverError> {
    let bound = match value {
        NativeValue::Null => Value::Null,
        NativeValue::Bool(b) => Value::Integer(i64::from(*b)),
        NativeValue::Int16(i) => Value::Integer(i64::from(*i)),
        NativeValue::Int32(i) => Value::Integer(i64::from(*i)),
        NativeValue::Int64(i) => Value::Integer(*i),
        NativeValue::Single(f) => Value::Real(f64::from(*f)),
        NativeValue::Double(d) => Value::Real(*d),
        NativeValue::Text(s) => Value::Text(s.clone()),
        NativeValue::Binary(bytes) => Value::Blob(bytes.clone()),
        NativeValue::Decimal(_)
        | NativeValue::Date(_)
        | NativeValue::Time(_)
        | NativeValue::Timestamp(_)
        | NativeValue::Guid(_) => {
            let text = value::render_native(value)
                .map_err(|err| DriverError::new(err.to_string()))?;
            text.map_or(Value::Null, Value::Text)
        }
    };

    Ok(bound)
}

fn native(value: ValueRef<'_>) -> NativeValue {
    match value {
        ValueRef::Null => NativeValue::Null,
        ValueRef::Integer(i) => NativeValue::Int64(i),
        ValueRef::Real(f) => NativeValue::Double(f),
        ValueRef::Text(bytes) => NativeValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => NativeValue::Binary(bytes.to_vec()),
    }
}

// ----------------------------------------------------------------------
// Declared types
// ----------------------------------------------------------------------

// Declared type names follow the SQLite affinity rules, with the common
// date, time and boolean spellings recognized first.
fn column_type(declared: &str) -> SqlType {
    let upper = declared.to_ascii_uppercase();
    let base = upper.split('(').next().unwrap_or_default().trim();

    match base {
        "" | "BLOB" => SqlType::Blob,
        "BOOLEAN" | "BOOL" => SqlType::Boolean,
        "DATE" => SqlType::Date,
        "TIME" => SqlType::Time,
        "DATETIME" | "TIMESTAMP" => SqlType::Timestamp,
        "DECIMAL" | "NUMERIC" => SqlType::Decimal,
        "BIGINT" => SqlType::BigInt,
        "SMALLINT" => SqlType::SmallInt,
        "TINYINT" => SqlType::TinyInt,
        "UUID" | "GUID" => SqlType::Char,
        b if b.contains("INT") => SqlType::Integer,
        b if b.contains("CHAR") || b.contains("CLOB") || b.contains("TEXT") => SqlType::Varchar,
        b if b.contains("REAL") || b.contains("FLOA") || b.contains("DOUB") => SqlType::Double,
        _ => SqlType::Numeric,
    }
}

// `(size)` or `(precision, scale)` from a declared type; zero when absent.
fn type_size(declared: &str) -> (u32, u32) {
    let Some(args) = declared
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(args, _)| args)
    else {
        return (0, 0);
    };

    let mut parts = args.split(',').map(|p| p.trim().parse::<u32>().unwrap_or(0));
    let size = parts.next().unwrap_or(0);
    let digits = parts.next().unwrap_or(0);

    (size, digits)
}

///
/// TESTS
///
