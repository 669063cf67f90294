use super::{count_from, log_statement, rows_to_records};
use crate::{
    catalog::build_rdbms_catalog,
    driver::{ConnectionSource, DriverError, RowSet, SqlConnection},
    error::{ErrorOrigin, InternalError},
    model::{Catalog, TableMetadata},
    obs::sink::{self, ExecKind, MetricsEvent, SharedSink},
    query::{Dialect, QueryOptions, QueryTranslator, Statement},
    record::Record,
    txn::TxContext,
    value,
};
use std::sync::Arc;
use tabula_config::HandlerConfig;

///
/// RdbmsHandler
///
/// Relational backend family. Every call runs on the transaction's pinned
/// connection when one is open, otherwise on a pooled connection that is
/// released before the call returns. Statements are connection-scoped and
/// are not cached across calls.
///

pub struct RdbmsHandler {
    config: HandlerConfig,
    source: Arc<dyn ConnectionSource>,
    dialect: Dialect,
    catalog: Catalog,
    sink: Option<SharedSink>,
}

impl RdbmsHandler {
    pub fn new(
        config: HandlerConfig,
        source: Arc<dyn ConnectionSource>,
    ) -> Result<Self, InternalError> {
        config.validate()?;

        let mut conn = source.connection().map_err(|cause| {
            InternalError::connectivity(ErrorOrigin::Catalog, "acquiring a connection failed", cause)
        })?;
        let product = conn.product_name().map_err(|cause| {
            InternalError::catalog("catalog introspection failed while reading the product name", cause)
        })?;
        let dialect = Dialect::detect(&product)?;
        let catalog = build_rdbms_catalog(conn.as_mut(), dialect, &config)?;
        drop(conn);

        Ok(Self {
            config,
            source,
            dialect,
            catalog,
            sink: None,
        })
    }

    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub(super) fn translator<'a>(
        &'a self,
        table: &'a TableMetadata,
    ) -> QueryTranslator<'a> {
        QueryTranslator::new(self.dialect, table, self.catalog.keys_of(&table.name))
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn read(
        &self,
        tx: &mut TxContext,
        table: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Record>, InternalError> {
        let meta = self.catalog.table(table)?;
        let plan = self
            .translator(meta)
            .select(options, self.config.max_page_size)?;

        let rows = self.run(tx, ExecKind::Read, table, false, |conn| {
            query(conn, table, &plan.statement)
        })?;

        self.records(meta, rows)
    }

    pub fn read_by_key(
        &self,
        tx: &mut TxContext,
        table: &str,
        keys: &Record,
    ) -> Result<Vec<Record>, InternalError> {
        let meta = self.catalog.table(table)?;
        let statement = self.translator(meta).select_by_key(keys)?;

        let rows = self.run(tx, ExecKind::ReadByKey, table, false, |conn| {
            query(conn, table, &statement)
        })?;

        self.records(meta, rows)
    }

    /// Row count for the filter in `options`. Returns 0 without touching
    /// the database unless the count flag is explicitly set.
    pub fn count(
        &self,
        tx: &mut TxContext,
        table: &str,
        options: &QueryOptions,
    ) -> Result<u64, InternalError> {
        let meta = self.catalog.table(table)?;
        if !options.count_requested() {
            return Ok(0);
        }
        let statement = self.translator(meta).count(options)?;

        let rows = self.run(tx, ExecKind::Count, table, false, |conn| {
            query(conn, table, &statement)
        })?;

        count_from(&rows.rows)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Insert `record` and return it with any backend-generated key values
    /// folded in and its concurrency token computed over the result.
    pub fn insert(
        &self,
        tx: &mut TxContext,
        table: &str,
        record: &Record,
    ) -> Result<Record, InternalError> {
        let meta = self.catalog.table(table)?;
        let statement = self.translator(meta).insert(record)?;
        let generated: Vec<&str> = meta.auto_generated().map(|c| c.name.as_str()).collect();

        let keys = self.run(tx, ExecKind::Insert, table, true, |conn| {
            log_statement(table, &statement);
            if generated.is_empty() {
                conn.execute(&statement.text, &statement.params)?;
                Ok(RowSet::default())
            } else {
                conn.execute_insert(&statement.text, &statement.params, &generated)
            }
        })?;

        let mut inserted = Record::new();
        for (name, raw) in record.iter() {
            let value = match meta.column(name) {
                Some(column) => value::canonicalize(column, raw)?,
                None => raw.map(str::to_string),
            };
            inserted.insert(name, value);
        }
        if let Some(row) = keys.rows.first() {
            for (i, name) in generated.iter().enumerate() {
                let position = keys.column_index(name).unwrap_or(i);
                let (Some(native), Some(column)) = (row.get(position), meta.column(name)) else {
                    continue;
                };
                inserted.insert(*name, value::from_column(column, native)?);
            }
        }
        inserted.stamp(&self.config.config_id, table);

        Ok(inserted)
    }

    /// Update every supplied non-key column; true when a row was changed.
    pub fn update(
        &self,
        tx: &mut TxContext,
        table: &str,
        record: &Record,
    ) -> Result<bool, InternalError> {
        let meta = self.catalog.table(table)?;
        let statement = self.translator(meta).update(record, None)?;

        self.write(tx, ExecKind::Update, table, &statement)
    }

    /// Update keyed by `old`, applied only while the stored row still holds
    /// the non-key values of `old`.
    pub fn update_if(
        &self,
        tx: &mut TxContext,
        table: &str,
        old: &Record,
        new: &Record,
    ) -> Result<bool, InternalError> {
        let meta = self.catalog.table(table)?;
        let statement = self.translator(meta).update(new, Some(old))?;

        self.write(tx, ExecKind::Update, table, &statement)
    }

    /// Delete by primary key; true when a row was removed.
    pub fn delete(
        &self,
        tx: &mut TxContext,
        table: &str,
        record: &Record,
    ) -> Result<bool, InternalError> {
        let meta = self.catalog.table(table)?;
        let statement = self.translator(meta).delete(record, None)?;

        self.write(tx, ExecKind::Delete, table, &statement)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    pub fn open_transaction(&self, tx: &mut TxContext) -> Result<(), InternalError> {
        tx.open_pinned(self.source.as_ref())
    }

    pub fn commit_transaction(&self, tx: &mut TxContext) -> Result<(), InternalError> {
        tx.ensure_not_conditional()?;
        tx.commit()
    }

    pub fn rollback_transaction(&self, tx: &mut TxContext) -> Result<(), InternalError> {
        tx.ensure_not_conditional()?;
        tx.rollback()
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    fn write(
        &self,
        tx: &mut TxContext,
        kind: ExecKind,
        table: &str,
        statement: &Statement,
    ) -> Result<bool, InternalError> {
        let affected = self.run(tx, kind, table, true, |conn| {
            log_statement(table, statement);
            conn.execute(&statement.text, statement.params.as_slice())
        })?;

        Ok(affected > 0)
    }

    fn records(&self, meta: &TableMetadata, rows: RowSet) -> Result<Vec<Record>, InternalError> {
        rows_to_records(&self.config.config_id, meta, &rows.columns, rows.rows)
    }

    /// Run `op` on the pinned connection, or on a pooled connection that is
    /// released on every exit path. Writes outside a transaction are
    /// committed when the pooled connection is not in auto-commit mode.
    pub(super) fn run<T>(
        &self,
        tx: &mut TxContext,
        kind: ExecKind,
        table: &str,
        write: bool,
        op: impl FnOnce(&mut dyn SqlConnection) -> Result<T, DriverError>,
    ) -> Result<T, InternalError>
    where
        T: Rows,
    {
        let sink = self.sink.as_ref();
        let failed = |cause: DriverError| {
            InternalError::connectivity(
                ErrorOrigin::Handler,
                format!("{} on '{table}' failed", kind_label(kind)),
                cause,
            )
        };

        sink::emit(sink, MetricsEvent::ExecStart { kind, table });

        let out = if let Some(conn) = tx.pinned()? {
            op(conn).map_err(failed)?
        } else {
            let mut conn = self.source.connection().map_err(|cause| {
                InternalError::connectivity(
                    ErrorOrigin::Handler,
                    "acquiring a connection failed",
                    cause,
                )
            })?;
            let out = op(conn.as_mut()).map_err(failed)?;
            if write && !conn.auto_commit().map_err(failed)? {
                conn.commit().map_err(failed)?;
            }

            out
        };

        sink::emit(
            sink,
            MetricsEvent::ExecFinish {
                kind,
                table,
                rows: out.rows(),
            },
        );

        Ok(out)
    }
}

fn query(
    conn: &mut dyn SqlConnection,
    table: &str,
    statement: &Statement,
) -> Result<RowSet, DriverError> {
    log_statement(table, statement);
    conn.query(&statement.text, &statement.params)
}

const fn kind_label(kind: ExecKind) -> &'static str {
    match kind {
        ExecKind::Read => "read",
        ExecKind::ReadByKey => "read by key",
        ExecKind::Count => "count",
        ExecKind::Insert => "insert",
        ExecKind::Update => "update",
        ExecKind::Delete => "delete",
        ExecKind::Reference => "reference update",
    }
}

///
/// Rows
/// Row count reported to the metrics sink for an execution result.
///

pub(super) trait Rows {
    fn rows(&self) -> u64;
}

impl Rows for RowSet {
    fn rows(&self) -> u64 {
        u64::try_from(self.len()).unwrap_or(u64::MAX)
    }
}

impl Rows for u64 {
    fn rows(&self) -> u64 {
        *self
    }
}

impl Rows for () {
    fn rows(&self) -> u64 {
        0
    }
}
