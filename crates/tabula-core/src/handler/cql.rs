use super::{count_from, log_statement, rows_to_records};
use crate::{
    cache::{CacheStats, StatementCache},
    catalog::build_cql_catalog,
    driver::{CqlColumn, CqlResult, CqlSession, PreparedCql},
    error::{ErrorOrigin, InternalError},
    model::{Catalog, TableMetadata},
    obs::sink::{self, ExecKind, MetricsEvent, SharedSink},
    query::{Dialect, QueryOptions, QueryTranslator, Statement},
    record::Record,
    txn::TxContext,
    value::NativeValue,
};
use std::sync::Arc;
use tabula_config::HandlerConfig;
use tabula_primitives::DataType;
use uuid::Uuid;

///
/// CqlHandler
///
/// Column-family backend family. Statements are prepared once per distinct
/// text and reused through the shared statement cache. There are no
/// multi-statement transactions: an open transaction only switches update
/// and delete to their conditional single-statement form.
///

pub struct CqlHandler {
    config: HandlerConfig,
    keyspace: String,
    session: Arc<dyn CqlSession>,
    catalog: Catalog,
    cache: StatementCache<PreparedCql>,
    sink: Option<SharedSink>,
}

impl CqlHandler {
    pub fn new(config: HandlerConfig, session: Arc<dyn CqlSession>) -> Result<Self, InternalError> {
        config.validate()?;
        let keyspace = config.keyspace.clone().ok_or_else(|| {
            InternalError::invariant(
                ErrorOrigin::Config,
                "a keyspace is required for the column-family backend",
            )
        })?;

        let catalog = build_cql_catalog(session.as_ref(), &keyspace, &config)?;
        let cache = StatementCache::new(config.statement_cache_capacity);

        Ok(Self {
            config,
            keyspace,
            session,
            catalog,
            cache,
            sink: None,
        })
    }

    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.cache = self.cache.with_sink(Some(Arc::clone(&sink)));
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &HandlerConfig {
        &self.config
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn translator<'a>(&'a self, table: &'a TableMetadata) -> QueryTranslator<'a> {
        QueryTranslator::new(Dialect::Cql, table, self.catalog.keys_of(&table.name))
            .with_keyspace(Some(self.keyspace.as_str()))
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
        tx.ensure_not_pinned()?;
        let meta = self.catalog.table(table)?;
        let plan = self
            .translator(meta)
            .select(options, self.config.max_page_size)?;

        let result = self.execute(ExecKind::Read, table, &plan.statement)?;
        let skip = usize::try_from(plan.skip_locally).unwrap_or(usize::MAX);
        let rows = result.rows.into_iter().skip(skip).collect();

        self.records(meta, &result.columns, rows)
    }

    pub fn read_by_key(
        &self,
        tx: &mut TxContext,
        table: &str,
        keys: &Record,
    ) -> Result<Vec<Record>, InternalError> {
        tx.ensure_not_pinned()?;
        let meta = self.catalog.table(table)?;
        let statement = self.translator(meta).select_by_key(keys)?;

        let result = self.execute(ExecKind::ReadByKey, table, &statement)?;

        self.records(meta, &result.columns, result.rows)
    }

    /// Row count for the filter in `options`. Returns 0 without touching
    /// the session unless the count flag is explicitly set.
    pub fn count(
        &self,
        tx: &mut TxContext,
        table: &str,
        options: &QueryOptions,
    ) -> Result<u64, InternalError> {
        tx.ensure_not_pinned()?;
        let meta = self.catalog.table(table)?;
        if !options.count_requested() {
            return Ok(0);
        }
        let statement = self.translator(meta).count(options)?;

        let result = self.execute(ExecKind::Count, table, &statement)?;

        count_from(&result.rows)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Insert `record`. Unset GUID key columns are filled with fresh
    /// identifiers, which are returned in the inserted record.
    pub fn insert(
        &self,
        tx: &mut TxContext,
        table: &str,
        record: &Record,
    ) -> Result<Record, InternalError> {
        tx.ensure_not_pinned()?;
        let meta = self.catalog.table(table)?;

        let mut inserted = record.clone();
        for key in self.catalog.keys_of(table) {
            let is_guid = meta
                .column(key)
                .is_some_and(|c| c.data_type == DataType::Guid);
            if is_guid && inserted.value(key).is_none() {
                let id = Uuid::from(ulid::Ulid::new());
                inserted.insert(key.clone(), Some(id.hyphenated().to_string()));
            }
        }

        let statement = self.translator(meta).insert(&inserted)?;
        self.execute(ExecKind::Insert, table, &statement)?;
        inserted.stamp(&self.config.config_id, table);

        Ok(inserted)
    }

    /// Unconditional update of every supplied non-key column.
    pub fn update(
        &self,
        tx: &mut TxContext,
        table: &str,
        record: &Record,
    ) -> Result<bool, InternalError> {
        tx.ensure_not_pinned()?;
        let meta = self.catalog.table(table)?;
        let statement = self.translator(meta).update(record, None)?;

        Ok(self.execute(ExecKind::Update, table, &statement)?.applied)
    }

    /// Lightweight-transaction update: keyed by `old`, applied only while
    /// the stored non-key values still equal those in `old`.
    pub fn update_if(
        &self,
        tx: &mut TxContext,
        table: &str,
        old: &Record,
        new: &Record,
    ) -> Result<bool, InternalError> {
        tx.ensure_not_pinned()?;
        let meta = self.catalog.table(table)?;
        let statement = self.translator(meta).update(new, Some(old))?;

        Ok(self.execute(ExecKind::Update, table, &statement)?.applied)
    }

    /// Delete by primary key. While a transaction is open the delete is
    /// conditional on the record's supplied non-key values.
    pub fn delete(
        &self,
        tx: &mut TxContext,
        table: &str,
        record: &Record,
    ) -> Result<bool, InternalError> {
        tx.ensure_not_pinned()?;
        let meta = self.catalog.table(table)?;
        let precondition = tx.is_conditional().then_some(record);
        let statement = self.translator(meta).delete(record, precondition)?;

        Ok(self.execute(ExecKind::Delete, table, &statement)?.applied)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    pub fn open_transaction(&self, tx: &mut TxContext) -> Result<(), InternalError> {
        tx.open_conditional()
    }

    pub fn commit_transaction(&self, tx: &mut TxContext) -> Result<(), InternalError> {
        tx.ensure_not_pinned()?;
        tx.commit()
    }

    pub fn rollback_transaction(&self, tx: &mut TxContext) -> Result<(), InternalError> {
        tx.ensure_not_pinned()?;
        tx.rollback()
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    fn execute(
        &self,
        kind: ExecKind,
        table: &str,
        statement: &Statement,
    ) -> Result<CqlResult, InternalError> {
        let sink = self.sink.as_ref();
        sink::emit(sink, MetricsEvent::ExecStart { kind, table });

        let prepared = self
            .cache
            .get_or_prepare(&statement.text, |text| self.session.prepare(text))
            .map_err(|cause| {
                InternalError::connectivity(
                    ErrorOrigin::Cache,
                    format!("preparing a statement for '{table}' failed"),
                    cause,
                )
            })?;

        log_statement(table, statement);
        let result = self
            .session
            .execute_prepared(&prepared, &statement.params)
            .map_err(|cause| {
                InternalError::connectivity(
                    ErrorOrigin::Handler,
                    format!("executing a statement on '{table}' failed"),
                    cause,
                )
            })?;

        sink::emit(
            sink,
            MetricsEvent::ExecFinish {
                kind,
                table,
                rows: u64::try_from(result.rows.len()).unwrap_or(u64::MAX),
            },
        );

        Ok(result)
    }

    fn records(
        &self,
        meta: &TableMetadata,
        columns: &[CqlColumn],
        rows: Vec<Vec<NativeValue>>,
    ) -> Result<Vec<Record>, InternalError> {
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

        rows_to_records(&self.config.config_id, meta, &names, rows)
    }
}
