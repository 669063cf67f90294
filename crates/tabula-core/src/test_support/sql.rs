use crate::{
    driver::{
        ColumnInfo, ConnectionSource, DriverError, ExportedKey, IsolationLevel, RowSet,
        SqlConnection, SqlType, TableRef,
    },
    value::NativeValue,
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

///
/// FakeTable
///

#[derive(Clone, Debug)]
pub(crate) struct FakeTable {
    pub table_ref: TableRef,
    pub columns: Vec<ColumnInfo>,
    pub keys: Vec<String>,
    pub exported: Vec<ExportedKey>,
}

impl FakeTable {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            table_ref: TableRef::new(None, name),
            columns: Vec::new(),
            keys: Vec::new(),
            exported: Vec::new(),
        }
    }

    pub(crate) fn in_schema(mut self, schema: &str) -> Self {
        self.table_ref.schema = Some(schema.to_string());
        self
    }

    pub(crate) fn column(mut self, name: &str, sql_type: SqlType) -> Self {
        self.columns.push(ColumnInfo {
            name: name.to_string(),
            sql_type,
            size: 10,
            decimal_digits: 0,
            nullable: true,
            default_value: None,
            auto_increment: false,
        });
        self
    }

    pub(crate) fn decimal(mut self, name: &str, size: u32, digits: u32) -> Self {
        self.columns.push(ColumnInfo {
            name: name.to_string(),
            sql_type: SqlType::Decimal,
            size,
            decimal_digits: digits,
            nullable: true,
            default_value: None,
            auto_increment: false,
        });
        self
    }

    pub(crate) fn serial_key(mut self, name: &str) -> Self {
        self.columns.push(ColumnInfo {
            name: name.to_string(),
            sql_type: SqlType::Integer,
            size: 10,
            decimal_digits: 0,
            nullable: false,
            default_value: None,
            auto_increment: true,
        });
        self.keys.push(name.to_string());
        self
    }

    pub(crate) fn key(mut self, name: &str) -> Self {
        self.keys.push(name.to_string());
        self
    }

    pub(crate) fn exports(mut self, pk_column: &str, fk_table: &str, fk_column: &str) -> Self {
        self.exported.push(ExportedKey {
            pk_column: pk_column.to_string(),
            fk_table: fk_table.to_string(),
            fk_column: fk_column.to_string(),
        });
        self
    }
}

///
/// FakeState
///
/// Everything the fake database knows and everything it was asked to do.
///

#[derive(Debug)]
pub(crate) struct FakeState {
    pub product: String,
    pub user: Option<String>,
    pub tables: Vec<FakeTable>,

    /// Statements and connection calls, in order.
    pub log: Vec<String>,
    pub params: Vec<Vec<NativeValue>>,

    /// Scripted results; when empty, queries return no rows and writes
    /// report one affected row.
    pub query_results: VecDeque<Result<RowSet, DriverError>>,
    pub execute_results: VecDeque<Result<u64, DriverError>>,
    pub insert_results: VecDeque<Result<RowSet, DriverError>>,

    pub reject_repeatable_read: bool,
    pub fail_commit: bool,
    pub fail_tables: bool,
    pub open_connections: usize,
    pub acquired: usize,
    pub scoped_owner: Option<Option<String>>,
}

impl FakeState {
    fn new(product: &str) -> Self {
        Self {
            product: product.to_string(),
            user: Some("SCOTT".to_string()),
            tables: Vec::new(),
            log: Vec::new(),
            params: Vec::new(),
            query_results: VecDeque::new(),
            execute_results: VecDeque::new(),
            insert_results: VecDeque::new(),
            reject_repeatable_read: false,
            fail_commit: false,
            fail_tables: false,
            open_connections: 0,
            acquired: 0,
            scoped_owner: None,
        }
    }

    /// Statement texts only, skipping connection-level calls.
    pub(crate) fn statements(&self) -> Vec<String> {
        self.log
            .iter()
            .filter(|l| !l.starts_with('@'))
            .cloned()
            .collect()
    }
}

///
/// FakeSource
///

#[derive(Clone, Debug)]
pub(crate) struct FakeSource {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSource {
    pub(crate) fn new(product: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::new(product))),
        }
    }

    pub(crate) fn with_table(self, table: FakeTable) -> Self {
        self.state().tables.push(table);
        self
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn push_rows(&self, columns: &[&str], rows: Vec<Vec<NativeValue>>) {
        let columns = columns.iter().map(ToString::to_string).collect();
        self.state()
            .query_results
            .push_back(Ok(RowSet::new(columns, rows)));
    }
}

impl ConnectionSource for FakeSource {
    fn connection(&self) -> Result<Box<dyn SqlConnection>, DriverError> {
        let mut state = self.state();
        state.open_connections += 1;
        state.acquired += 1;

        Ok(Box::new(FakeConnection {
            state: Arc::clone(&self.state),
            auto_commit: true,
            isolation: IsolationLevel::ReadCommitted,
        }))
    }
}

///
/// FakeConnection
///

struct FakeConnection {
    state: Arc<Mutex<FakeState>>,
    auto_commit: bool,
    isolation: IsolationLevel,
}

impl FakeConnection {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn table(&self, table: &TableRef) -> Result<FakeTable, DriverError> {
        self.state()
            .tables
            .iter()
            .find(|t| t.table_ref.name == table.name)
            .cloned()
            .ok_or_else(|| DriverError::new(format!("no such table: {}", table.name)))
    }

    fn record(&self, sql: &str, params: &[NativeValue]) {
        let mut state = self.state();
        state.log.push(sql.to_string());
        state.params.push(params.to_vec());
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.state().open_connections -= 1;
    }
}

impl SqlConnection for FakeConnection {
    fn product_name(&mut self) -> Result<String, DriverError> {
        Ok(self.state().product.clone())
    }

    fn user_name(&mut self) -> Result<Option<String>, DriverError> {
        Ok(self.state().user.clone())
    }

    fn catalog_name(&mut self) -> Result<Option<String>, DriverError> {
        Ok(None)
    }

    fn tables(&mut self, schema: Option<&str>) -> Result<Vec<TableRef>, DriverError> {
        let mut state = self.state();
        if state.fail_tables {
            return Err(DriverError::new("catalog unavailable"));
        }
        state.scoped_owner = Some(schema.map(ToString::to_string));

        Ok(state.tables.iter().map(|t| t.table_ref.clone()).collect())
    }

    fn columns(&mut self, table: &TableRef) -> Result<Vec<ColumnInfo>, DriverError> {
        Ok(self.table(table)?.columns)
    }

    fn primary_keys(&mut self, table: &TableRef) -> Result<Vec<String>, DriverError> {
        Ok(self.table(table)?.keys)
    }

    fn exported_keys(&mut self, table: &TableRef) -> Result<Vec<ExportedKey>, DriverError> {
        Ok(self.table(table)?.exported)
    }

    fn query(&mut self, sql: &str, params: &[NativeValue]) -> Result<RowSet, DriverError> {
        self.record(sql, params);
        self.state()
            .query_results
            .pop_front()
            .unwrap_or_else(|| Ok(RowSet::default()))
    }

    fn execute(&mut self, sql: &str, params: &[NativeValue]) -> Result<u64, DriverError> {
        self.record(sql, params);
        self.state().execute_results.pop_front().unwrap_or(Ok(1))
    }

    fn execute_insert(
        &mut self,
        sql: &str,
        params: &[NativeValue],
        generated: &[&str],
    ) -> Result<RowSet, DriverError> {
        self.record(sql, params);
        let columns = generated.iter().map(ToString::to_string).collect();
        self.state()
            .insert_results
            .pop_front()
            .unwrap_or_else(|| Ok(RowSet::new(columns, Vec::new())))
    }

    fn auto_commit(&mut self) -> Result<bool, DriverError> {
        Ok(self.auto_commit)
    }

    fn set_auto_commit(&mut self, enabled: bool) -> Result<(), DriverError> {
        self.state().log.push(format!("@auto_commit={enabled}"));
        self.auto_commit = enabled;
        Ok(())
    }

    fn isolation(&mut self) -> Result<IsolationLevel, DriverError> {
        Ok(self.isolation)
    }

    fn set_isolation(&mut self, level: IsolationLevel) -> Result<(), DriverError> {
        if level == IsolationLevel::RepeatableRead && self.state().reject_repeatable_read {
            return Err(DriverError::new("isolation level not supported"));
        }
        self.state().log.push(format!("@isolation={level}"));
        self.isolation = level;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        let mut state = self.state();
        state.log.push("@commit".to_string());
        if state.fail_commit {
            return Err(DriverError::new("commit failed"));
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.state().log.push("@rollback".to_string());
        Ok(())
    }
}
