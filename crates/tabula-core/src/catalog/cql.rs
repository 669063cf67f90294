use super::project_columns;
use crate::{
    driver::{CqlSession, CqlType},
    error::InternalError,
    model::{Catalog, DataColumn, PrimaryKeySet, TableMetadata},
};
use indexmap::IndexMap;
use tabula_config::HandlerConfig;
use tabula_primitives::DataType;

/// Build the column-family catalog from keyspace metadata. There is no
/// foreign-key concept, so the navigation set is always empty.
pub(crate) fn build_cql_catalog(
    session: &dyn CqlSession,
    keyspace: &str,
    config: &HandlerConfig,
) -> Result<Catalog, InternalError> {
    let discovered = session.tables(keyspace).map_err(|cause| {
        InternalError::catalog(
            format!("catalog introspection failed while reading keyspace '{keyspace}'"),
            cause,
        )
    })?;

    let mut tables = IndexMap::new();
    let mut primary_keys = PrimaryKeySet::new();

    for table in discovered {
        if !config.exposes(&table.name) {
            continue;
        }

        let columns = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                DataColumn::new(&column.name, cql_data_type(column.cql_type), i + 1)
                    .with_nullable(!table.primary_key.contains(&column.name))
            })
            .collect();

        let mut metadata = TableMetadata::new(&table.name, None);
        for column in project_columns(columns, &table.primary_key, config.table(&table.name))? {
            metadata.push_column(column);
        }

        primary_keys.insert(&table.name, table.primary_key);
        tables.insert(table.name, metadata);
    }

    tracing::info!(keyspace, tables = tables.len(), "column-family catalog built");

    Ok(Catalog::new(tables, primary_keys, Vec::new()))
}

/// Normalized type for a column-family column type. Collection, network
/// and composite types are exposed as their text rendering.
pub(crate) const fn cql_data_type(cql_type: CqlType) -> DataType {
    match cql_type {
        CqlType::Ascii
        | CqlType::Text
        | CqlType::Varchar
        | CqlType::TimeUuid
        | CqlType::Inet
        | CqlType::List
        | CqlType::Map
        | CqlType::Set
        | CqlType::Tuple
        | CqlType::Udt => DataType::String,
        CqlType::Uuid => DataType::Guid,
        CqlType::BigInt | CqlType::Varint | CqlType::Counter => DataType::Int64,
        CqlType::Int => DataType::Int32,
        CqlType::SmallInt | CqlType::TinyInt => DataType::Int16,
        CqlType::Blob | CqlType::Custom => DataType::Binary,
        CqlType::Boolean => DataType::Boolean,
        CqlType::Decimal => DataType::Decimal,
        CqlType::Float => DataType::Single,
        CqlType::Double => DataType::Double,
        CqlType::Timestamp => DataType::DateTimeOffset,
        CqlType::Time => DataType::Time,
        CqlType::Date => DataType::Date,
    }
}
