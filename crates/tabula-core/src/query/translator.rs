use super::{
    Statement,
    dialect::Dialect,
    options::QueryOptions,
    render::PredicateRenderer,
};
use crate::{
    error::{ErrorOrigin, InternalError},
    model::{DataColumn, TableMetadata},
    record::Record,
    value::{self, NativeValue},
};

///
/// SelectPlan
///
/// A read statement plus the number of leading rows the caller must drop
/// locally (column-family paging pushes `top + skip` down as the limit).
///

#[derive(Clone, Debug, PartialEq)]
pub struct SelectPlan {
    pub statement: Statement,
    pub skip_locally: u64,
}

///
/// QueryTranslator
///
/// Builds dialect-correct statements for one table. Holds no state beyond
/// borrowed metadata, so it is constructed per call.
///

#[derive(Clone, Copy, Debug)]
pub struct QueryTranslator<'a> {
    pub(super) dialect: Dialect,
    pub(super) table: &'a TableMetadata,
    pub(super) keys: &'a [String],
    pub(super) keyspace: Option<&'a str>,
}

impl<'a> QueryTranslator<'a> {
    #[must_use]
    pub const fn new(dialect: Dialect, table: &'a TableMetadata, keys: &'a [String]) -> Self {
        Self {
            dialect,
            table,
            keys,
            keyspace: None,
        }
    }

    /// Keyspace prefix for column-family table references.
    #[must_use]
    pub const fn with_keyspace(mut self, keyspace: Option<&'a str>) -> Self {
        self.keyspace = keyspace;
        self
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Table reference as written after `FROM` / `INTO` / `UPDATE`.
    #[must_use]
    pub fn table_ref(&self) -> String {
        if self.dialect.is_cql() {
            let table = self.dialect.quote(&self.table.name);
            match self.keyspace {
                Some(keyspace) => format!("{keyspace}.{table}"),
                None => table.into_owned(),
            }
        } else {
            self.table.qualified_name()
        }
    }

    pub(super) fn renderer(&self) -> PredicateRenderer<'a> {
        PredicateRenderer::new(self.dialect, self.table)
    }

    pub(super) fn is_key(&self, column: &str) -> bool {
        self.keys.iter().any(|k| k == column)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Build the read statement for `options`. `max_page_size` is the limit
    /// applied when the caller gave no `$top`.
    pub fn select(
        &self,
        options: &QueryOptions,
        max_page_size: u32,
    ) -> Result<SelectPlan, InternalError> {
        reject_expand(options)?;

        let columns = self.projection(options.select.as_deref())?;
        let renderer = self.renderer();
        let mut params = Vec::new();

        let mut text = format!("SELECT {} FROM {}", self.column_list(&columns), self.table_ref());

        if let Some(filter) = &options.filter {
            text.push_str(" WHERE ");
            text.push_str(&renderer.render(filter, &mut params)?);
        }

        let has_order = !options.order_by.is_empty();
        if has_order {
            text.push_str(" ORDER BY ");
            text.push_str(&renderer.render_order(&options.order_by)?);
        }

        let skip = options.skip_or_zero();
        let skip_locally = if self.dialect.is_cql() {
            let limit = cql_limit(options, max_page_size)?;
            self.dialect.paginate(&mut text, has_order, limit, 0);
            if options.filter.is_some() {
                text.push_str(" ALLOW FILTERING");
            }

            skip
        } else {
            let limit = options.top.unwrap_or_else(|| u64::from(max_page_size));
            self.dialect.paginate(&mut text, has_order, limit, skip);

            0
        };

        Ok(SelectPlan {
            statement: Statement::new(text, params),
            skip_locally,
        })
    }

    /// `COUNT(*)` over the same filter a read would apply.
    pub fn count(&self, options: &QueryOptions) -> Result<Statement, InternalError> {
        reject_expand(options)?;

        let mut params = Vec::new();
        let mut text = if self.dialect.is_cql() {
            format!("SELECT COUNT(*) FROM {}", self.table_ref())
        } else {
            format!("SELECT COUNT(*) AS total FROM {}", self.table_ref())
        };

        if let Some(filter) = &options.filter {
            text.push_str(" WHERE ");
            text.push_str(&self.renderer().render(filter, &mut params)?);
            if self.dialect.is_cql() {
                text.push_str(" ALLOW FILTERING");
            }
        }

        Ok(Statement::new(text, params))
    }

    /// Equality read over the supplied columns that are declared key
    /// columns. Non-key columns in `keys` are ignored.
    pub fn select_by_key(&self, keys: &Record) -> Result<Statement, InternalError> {
        let mut params = Vec::new();
        let mut terms = Vec::new();

        for key in self.keys {
            let Some(value) = keys.get(key) else {
                continue;
            };
            let column = self.renderer().column(key)?;
            terms.push(self.bind_key(column, value, &mut params)?);
        }

        if terms.is_empty() {
            return Err(InternalError::query_generation(format!(
                "no key columns of table '{}' were supplied",
                self.table.name
            )));
        }

        let columns: Vec<&DataColumn> = self.table.columns.values().collect();
        let text = format!(
            "SELECT {} FROM {} WHERE {}",
            self.column_list(&columns),
            self.table_ref(),
            terms.join(" AND ")
        );

        Ok(Statement::new(text, params))
    }

    /// Resolve `$select` into the projected columns: key columns first,
    /// then requested columns, de-duplicated. `*` selects every column.
    pub fn projection(
        &self,
        select: Option<&[String]>,
    ) -> Result<Vec<&'a DataColumn>, InternalError> {
        let Some(requested) = select else {
            return Ok(self.table.columns.values().collect());
        };
        if requested.iter().any(|c| c.trim() == "*") {
            return Ok(self.table.columns.values().collect());
        }
        if requested.is_empty() {
            return Err(InternalError::query_generation(
                "no columns specified in the $select option",
            ));
        }

        let renderer = self.renderer();
        let mut columns: Vec<&DataColumn> = Vec::with_capacity(self.keys.len() + requested.len());
        for name in self.keys.iter().chain(requested) {
            let column = renderer.column(name.trim())?;
            if !columns.iter().any(|c| c.name == column.name) {
                columns.push(column);
            }
        }

        Ok(columns)
    }

    pub(super) fn column_list(&self, columns: &[&DataColumn]) -> String {
        columns
            .iter()
            .map(|c| self.dialect.quote(&c.name).into_owned())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `key = ?` with the key value bound. Null keys never match, so they
    /// are rejected up front.
    pub(super) fn bind_key(
        &self,
        column: &DataColumn,
        value: Option<&str>,
        params: &mut Vec<NativeValue>,
    ) -> Result<String, InternalError> {
        if value.is_none() {
            return Err(InternalError::query_generation(format!(
                "key column '{}' must not be null",
                column.name
            )));
        }
        params.push(value::to_native(column.data_type, value)?);

        Ok(format!("{} = ?", self.dialect.quote(&column.name)))
    }
}

fn reject_expand(options: &QueryOptions) -> Result<(), InternalError> {
    if options.expand.is_some() {
        return Err(InternalError::unsupported(
            ErrorOrigin::Query,
            "the $expand query option is not supported",
        ));
    }

    Ok(())
}

// Column-family reads cannot limit after ordering or counting, so `$top`
// together with either is refused. Without `$top` the page-size bound is
// pushed down unless ordering or counting is requested.
fn cql_limit(options: &QueryOptions, max_page_size: u32) -> Result<u64, InternalError> {
    let ordered_or_counted = !options.order_by.is_empty() || options.count.is_some();
    let skip = options.skip_or_zero();

    match options.top {
        Some(_) if ordered_or_counted => Err(InternalError::unsupported(
            ErrorOrigin::Query,
            "$top is not supported together with $orderby or $count on this backend",
        )),
        Some(0) => Ok(0),
        Some(top) => Ok(top.saturating_add(skip)),
        None if ordered_or_counted => Ok(0),
        None => Ok(u64::from(max_page_size).saturating_add(skip)),
    }
}
