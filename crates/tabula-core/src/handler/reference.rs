//! Reference manager: association add/remove emulated through foreign-key
//! columns of the importing table.

use super::{CqlHandler, RdbmsHandler, log_statement};
use crate::{
    error::{ErrorOrigin, InternalError},
    model::NavigationEdge,
    obs::sink::ExecKind,
    record::Record,
    txn::TxContext,
    value,
};

impl RdbmsHandler {
    /// Point the importing side of the `root_table`/`other_table` edge at
    /// the exporting row identified by the caller's keys. The caller may
    /// name either side first.
    pub fn update_reference(
        &self,
        tx: &mut TxContext,
        root_table: &str,
        root_keys: &Record,
        other_table: &str,
        other_keys: &Record,
    ) -> Result<(), InternalError> {
        let (edge, exporter_keys, importer_keys) =
            self.orient(root_table, root_keys, other_table, other_keys)?;

        let exporter = self.catalog().table(&edge.exporting)?;
        let importer = self.catalog().table(&edge.importing)?;

        let referenced: Vec<&str> = edge.keys.iter().map(|k| k.referenced.as_str()).collect();
        let lookup = self
            .translator(exporter)
            .select_columns_by(&referenced, exporter_keys)?;

        let rows = self.run(tx, ExecKind::Reference, &edge.exporting, false, |conn| {
            log_statement(&edge.exporting, &lookup);
            conn.query(&lookup.text, &lookup.params)
        })?;
        let row = rows.rows.first().ok_or_else(|| {
            InternalError::not_found(
                ErrorOrigin::Reference,
                format!("no row of '{}' matches the supplied keys", edge.exporting),
            )
        })?;

        let mut assignments = Record::new();
        for (i, pair) in edge.keys.iter().enumerate() {
            let position = rows.column_index(&pair.referenced).unwrap_or(i);
            let column = exporter.column(&pair.referenced);
            let (Some(native), Some(column)) = (row.get(position), column) else {
                continue;
            };
            assignments.insert(
                pair.referencing.clone(),
                value::from_column(column, native)?,
            );
        }

        let update = self
            .translator(importer)
            .update_columns(&assignments, importer_keys)?;
        self.run(tx, ExecKind::Reference, &edge.importing, true, |conn| {
            log_statement(&edge.importing, &update);
            conn.execute(&update.text, &update.params)
        })?;

        Ok(())
    }

    /// Null every foreign-key column of the edge on the identified
    /// importing row. Unrelated columns are left untouched.
    pub fn delete_reference(
        &self,
        tx: &mut TxContext,
        root_table: &str,
        root_keys: &Record,
        other_table: &str,
        other_keys: &Record,
    ) -> Result<(), InternalError> {
        let (edge, _, importer_keys) =
            self.orient(root_table, root_keys, other_table, other_keys)?;
        let importer = self.catalog().table(&edge.importing)?;

        let assignments: Record = edge
            .keys
            .iter()
            .map(|pair| (pair.referencing.as_str(), None))
            .collect();
        let update = self
            .translator(importer)
            .update_columns(&assignments, importer_keys)?;

        self.run(tx, ExecKind::Reference, &edge.importing, true, |conn| {
            log_statement(&edge.importing, &update);
            conn.execute(&update.text, &update.params)
        })?;

        Ok(())
    }

    // The edge joining the two tables, with the caller's key records
    // reordered as (exporting side, importing side).
    fn orient<'a>(
        &'a self,
        root_table: &str,
        root_keys: &'a Record,
        other_table: &str,
        other_keys: &'a Record,
    ) -> Result<(&'a NavigationEdge, &'a Record, &'a Record), InternalError> {
        let edge = self
            .catalog()
            .edge_between(root_table, other_table)
            .ok_or_else(|| {
                InternalError::not_found(
                    ErrorOrigin::Reference,
                    format!("no navigation between '{root_table}' and '{other_table}'"),
                )
            })?;

        if edge.exporting == root_table {
            Ok((edge, root_keys, other_keys))
        } else {
            Ok((edge, other_keys, root_keys))
        }
    }
}

impl CqlHandler {
    pub fn update_reference(
        &self,
        _tx: &mut TxContext,
        _root_table: &str,
        _root_keys: &Record,
        _other_table: &str,
        _other_keys: &Record,
    ) -> Result<(), InternalError> {
        Err(no_references())
    }

    pub fn delete_reference(
        &self,
        _tx: &mut TxContext,
        _root_table: &str,
        _root_keys: &Record,
        _other_table: &str,
        _other_keys: &Record,
    ) -> Result<(), InternalError> {
        Err(no_references())
    }
}

fn no_references() -> InternalError {
    InternalError::unsupported(
        ErrorOrigin::Reference,
        "references are not supported by the column-family backend",
    )
}
