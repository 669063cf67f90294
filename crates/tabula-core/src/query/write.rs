//! Write statements: insert, update, delete, and the two statements the
//! reference manager composes (key lookup on the exporting table, column
//! assignment on the importing table).
//!
//! Conditional writes share one precondition renderer: relational
//! dialects append extra `WHERE` terms, the column-family dialect renders
//! a lightweight-transaction `IF` clause.

use super::{Statement, translator::QueryTranslator};
use crate::{
    error::InternalError,
    model::DataColumn,
    record::Record,
    value::{self, NativeValue},
};

impl QueryTranslator<'_> {
    /// `INSERT` over every non-null supplied column known to the table,
    /// in table column order.
    pub fn insert(&self, record: &Record) -> Result<Statement, InternalError> {
        let mut names = Vec::new();
        let mut params = Vec::new();

        for column in self.table.columns.values() {
            let Some(Some(raw)) = record.get(&column.name) else {
                continue;
            };
            names.push(self.dialect.quote(&column.name).into_owned());
            params.push(value::to_native(column.data_type, Some(raw))?);
        }

        if names.is_empty() {
            return Err(InternalError::query_generation(format!(
                "no known columns supplied for insert into '{}'",
                self.table.name
            )));
        }

        let text = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_ref(),
            names.join(", "),
            vec!["?"; names.len()].join(", ")
        );

        Ok(Statement::new(text, params))
    }

    /// `UPDATE` setting every non-key column present in `new`, keyed by the
    /// primary key. With `old`, keys are taken from `old` and its non-key
    /// values become an optimistic precondition.
    pub fn update(&self, new: &Record, old: Option<&Record>) -> Result<Statement, InternalError> {
        let mut params = Vec::new();
        let mut assignments = Vec::new();

        for column in self.table.columns.values() {
            if self.is_key(&column.name) {
                continue;
            }
            let Some(raw) = new.get(&column.name) else {
                continue;
            };
            assignments.push(format!("{} = ?", self.dialect.quote(&column.name)));
            params.push(value::to_native(column.data_type, raw)?);
        }

        if assignments.is_empty() {
            return Err(InternalError::query_generation(format!(
                "no non-key columns supplied for update of '{}'",
                self.table.name
            )));
        }

        let key_source = old.unwrap_or(new);
        let mut text = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table_ref(),
            assignments.join(", "),
            self.key_predicate(key_source, &mut params)?
        );
        if let Some(old) = old {
            text.push_str(&self.precondition(old, &mut params)?);
        }

        Ok(Statement::new(text, params))
    }

    /// `DELETE` keyed by the primary key, optionally guarded by the
    /// non-key values of `precondition`.
    pub fn delete(
        &self,
        record: &Record,
        precondition: Option<&Record>,
    ) -> Result<Statement, InternalError> {
        let mut params = Vec::new();
        let mut text = format!(
            "DELETE FROM {} WHERE {}",
            self.table_ref(),
            self.key_predicate(record, &mut params)?
        );
        if let Some(expected) = precondition {
            text.push_str(&self.precondition(expected, &mut params)?);
        }

        Ok(Statement::new(text, params))
    }

    /// `SELECT columns FROM table WHERE ...` over the supplied non-null
    /// columns of `keys` that the table knows. Used to resolve referenced
    /// key values on the exporting side of a navigation edge.
    pub fn select_columns_by(
        &self,
        columns: &[&str],
        keys: &Record,
    ) -> Result<Statement, InternalError> {
        let renderer = self.renderer();
        let projected = columns
            .iter()
            .map(|name| renderer.column(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut params = Vec::new();
        let mut terms = Vec::new();
        for column in self.table.columns.values() {
            if let Some(Some(raw)) = keys.get(&column.name) {
                terms.push(format!("{} = ?", self.dialect.quote(&column.name)));
                params.push(value::to_native(column.data_type, Some(raw))?);
            }
        }

        if terms.is_empty() {
            return Err(InternalError::query_generation(format!(
                "no key values supplied for table '{}'",
                self.table.name
            )));
        }

        let text = format!(
            "SELECT {} FROM {} WHERE {}",
            self.column_list(&projected),
            self.table_ref(),
            terms.join(" AND ")
        );

        Ok(Statement::new(text, params))
    }

    /// `UPDATE table SET c = ?, ... WHERE <primary key>`. A null assignment
    /// binds SQL `NULL`.
    pub fn update_columns(
        &self,
        assignments: &Record,
        keys: &Record,
    ) -> Result<Statement, InternalError> {
        let renderer = self.renderer();
        let mut params = Vec::new();
        let mut sets = Vec::with_capacity(assignments.len());

        for (name, raw) in assignments.iter() {
            let column = renderer.column(name)?;
            sets.push(format!("{} = ?", self.dialect.quote(&column.name)));
            params.push(value::to_native(column.data_type, raw)?);
        }

        if sets.is_empty() {
            return Err(InternalError::query_generation(format!(
                "no columns to assign on table '{}'",
                self.table.name
            )));
        }

        let text = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table_ref(),
            sets.join(", "),
            self.key_predicate(keys, &mut params)?
        );

        Ok(Statement::new(text, params))
    }

    // Every primary-key column must be supplied and non-null.
    fn key_predicate(
        &self,
        record: &Record,
        params: &mut Vec<NativeValue>,
    ) -> Result<String, InternalError> {
        if self.keys.is_empty() {
            return Err(InternalError::query_generation(format!(
                "table '{}' has no primary key",
                self.table.name
            )));
        }

        let renderer = self.renderer();
        let mut terms = Vec::with_capacity(self.keys.len());
        for key in self.keys {
            let column = renderer.column(key)?;
            let value = record.get(key).ok_or_else(|| {
                InternalError::query_generation(format!(
                    "key column '{key}' of table '{}' was not supplied",
                    self.table.name
                ))
            })?;
            terms.push(self.bind_key(column, value, params)?);
        }

        Ok(terms.join(" AND "))
    }

    /// Optimistic precondition over the non-key columns of `expected`.
    fn precondition(
        &self,
        expected: &Record,
        params: &mut Vec<NativeValue>,
    ) -> Result<String, InternalError> {
        let guarded: Vec<(&DataColumn, Option<&str>)> = self
            .table
            .columns
            .values()
            .filter(|c| !self.is_key(&c.name))
            .filter_map(|c| expected.get(&c.name).map(|raw| (c, raw)))
            .collect();

        if self.dialect.is_cql() {
            if guarded.is_empty() {
                return Ok(" IF EXISTS".to_string());
            }
            let mut terms = Vec::with_capacity(guarded.len());
            for (column, raw) in guarded {
                terms.push(format!("{} = ?", self.dialect.quote(&column.name)));
                params.push(value::to_native(column.data_type, raw)?);
            }

            return Ok(format!(" IF {}", terms.join(" AND ")));
        }

        let mut out = String::new();
        for (column, raw) in guarded {
            if raw.is_none() {
                out.push_str(&format!(" AND {} IS NULL", column.name));
            } else {
                out.push_str(&format!(" AND {} = ?", column.name));
                params.push(value::to_native(column.data_type, raw)?);
            }
        }

        Ok(out)
    }
}
