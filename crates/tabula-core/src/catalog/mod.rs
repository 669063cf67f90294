//! Module: catalog
//!
//! One-shot catalog introspection. Each builder walks a backend's catalog
//! once, applies the configured allow-list and column projection, and
//! returns a complete [`Catalog`]; any introspection failure aborts the
//! whole build so partial metadata is never observed.

mod cql;
mod rdbms;


pub(crate) use cql::build_cql_catalog;
pub(crate) use rdbms::build_rdbms_catalog;

use crate::{
    error::{ErrorOrigin, InternalError},
    model::DataColumn,
};
use tabula_config::TableConfig;

/// Apply a table's column projection: when the configuration lists
/// columns, only those (and the key columns) survive, and listed columns
/// take the configured type. Ordinals are renumbered from 1 over the
/// surviving columns. A key column cannot be overridden to a type that
/// cannot identify a row.
fn project_columns(
    columns: Vec<DataColumn>,
    keys: &[String],
    config: Option<&TableConfig>,
) -> Result<Vec<DataColumn>, InternalError> {
    let Some(config) = config.filter(|c| !c.columns.is_empty()) else {
        return Ok(columns);
    };

    let mut projected = Vec::new();
    for mut column in columns {
        let is_key = keys.contains(&column.name);
        match config.column_override(&column.name) {
            Some(data_type) if is_key && !data_type.is_keyable() => {
                return Err(InternalError::invariant(
                    ErrorOrigin::Config,
                    format!(
                        "key column '{}.{}' cannot be exposed as {data_type}",
                        config.name, column.name
                    ),
                ));
            }
            Some(data_type) => column.data_type = data_type,
            None if is_key => {}
            None => continue,
        }
        column.ordinal = projected.len() + 1;
        projected.push(column);
    }

    Ok(projected)
}
