use super::project_columns;
use crate::{
    driver::{ColumnInfo, DriverError, SqlConnection, SqlType, TableRef},
    error::InternalError,
    model::{Catalog, DataColumn, KeyPair, NavigationEdge, PrimaryKeySet, TableMetadata},
    query::Dialect,
};
use indexmap::IndexMap;
use tabula_config::HandlerConfig;
use tabula_primitives::DataType;

const DEFAULT_DECIMAL_SCALE: u32 = 5;

/// Build the relational catalog through one connection.
///
/// Oracle has no separate schema concept here: discovery is scoped to the
/// connected user and every table is addressed unqualified.
pub(crate) fn build_rdbms_catalog(
    conn: &mut dyn SqlConnection,
    dialect: Dialect,
    config: &HandlerConfig,
) -> Result<Catalog, InternalError> {
    let owner = if dialect == Dialect::Oracle {
        conn.user_name().map_err(fault("reading the connected user"))?
    } else {
        None
    };

    let discovered = conn
        .tables(owner.as_deref())
        .map_err(fault("listing tables"))?;

    let mut refs = Vec::new();
    let mut tables = IndexMap::new();
    let mut primary_keys = PrimaryKeySet::new();

    for table_ref in discovered {
        if !config.exposes(&table_ref.name) || tables.contains_key(&table_ref.name) {
            continue;
        }
        let table_config = config.table(&table_ref.name);

        let keys = conn
            .primary_keys(&table_ref)
            .map_err(fault(format!("reading primary keys of '{}'", table_ref.name)))?;
        let infos = conn
            .columns(&table_ref)
            .map_err(fault(format!("reading columns of '{}'", table_ref.name)))?;

        let columns = infos
            .into_iter()
            .enumerate()
            .map(|(i, info)| column_from_info(info, i + 1))
            .collect();

        let schema = if dialect == Dialect::Oracle {
            None
        } else {
            table_config.and_then(|t| t.schema.clone())
        };

        let mut table = TableMetadata::new(table_ref.name.clone(), schema);
        for column in project_columns(columns, &keys, table_config)? {
            table.push_column(column);
        }

        primary_keys.insert(table_ref.name.clone(), keys);
        tables.insert(table_ref.name.clone(), table);
        refs.push(table_ref);
    }

    let navigation = read_navigation(conn, &refs, &tables)?;

    tracing::info!(
        tables = tables.len(),
        edges = navigation.len(),
        dialect = %dialect,
        "relational catalog built"
    );

    Ok(Catalog::new(tables, primary_keys, navigation))
}

// One edge per (exporting, importing) pair, key pairs in catalog order.
// Edges to tables outside the allow-list are dropped.
fn read_navigation(
    conn: &mut dyn SqlConnection,
    refs: &[TableRef],
    tables: &IndexMap<String, TableMetadata>,
) -> Result<Vec<NavigationEdge>, InternalError> {
    let mut edges: Vec<NavigationEdge> = Vec::new();

    for table_ref in refs {
        let exported = conn
            .exported_keys(table_ref)
            .map_err(fault(format!("reading exported keys of '{}'", table_ref.name)))?;

        for key in exported {
            if !tables.contains_key(&key.fk_table) {
                continue;
            }
            let pair = KeyPair::new(key.pk_column, key.fk_column);
            if let Some(edge) = edges
                .iter_mut()
                .find(|e| e.exporting == table_ref.name && e.importing == key.fk_table)
            {
                edge.keys.push(pair);
            } else {
                let mut edge = NavigationEdge::new(&table_ref.name, &key.fk_table);
                edge.keys.push(pair);
                edges.push(edge);
            }
        }
    }

    Ok(edges)
}

fn column_from_info(info: ColumnInfo, ordinal: usize) -> DataColumn {
    let column = DataColumn::new(info.name, sql_data_type(info.sql_type), ordinal)
        .with_nullable(info.nullable)
        .with_size(info.size)
        .with_auto_generated(info.auto_increment)
        .with_default_value(info.default_value);

    if is_fractional(info.sql_type) {
        let scale = if info.decimal_digits == 0 {
            DEFAULT_DECIMAL_SCALE
        } else {
            info.decimal_digits
        };
        column.with_precision(info.size, scale)
    } else {
        column
    }
}

/// Normalized type for a relational column type code.
pub(crate) const fn sql_data_type(sql_type: SqlType) -> DataType {
    match sql_type {
        SqlType::Integer => DataType::Int32,
        SqlType::TinyInt | SqlType::SmallInt => DataType::Int16,
        SqlType::BigInt => DataType::Int64,
        SqlType::Double => DataType::Double,
        SqlType::Float | SqlType::Real => DataType::Single,
        SqlType::Decimal | SqlType::Numeric => DataType::Decimal,
        SqlType::Boolean | SqlType::Bit => DataType::Boolean,
        SqlType::Blob | SqlType::Binary | SqlType::VarBinary | SqlType::LongVarBinary => {
            DataType::Binary
        }
        SqlType::Date => DataType::Date,
        SqlType::Time => DataType::Time,
        SqlType::Timestamp => DataType::DateTimeOffset,
        SqlType::Char
        | SqlType::Varchar
        | SqlType::LongVarchar
        | SqlType::Clob
        | SqlType::NChar
        | SqlType::NVarchar
        | SqlType::LongNVarchar
        | SqlType::NClob
        | SqlType::SqlXml
        | SqlType::Other(_) => DataType::String,
    }
}

const fn is_fractional(sql_type: SqlType) -> bool {
    matches!(
        sql_type,
        SqlType::Double | SqlType::Float | SqlType::Decimal | SqlType::Numeric | SqlType::Real
    )
}

fn fault(context: impl Into<String>) -> impl FnOnce(DriverError) -> InternalError {
    let context = context.into();
    move |cause| InternalError::catalog(format!("catalog introspection failed while {context}"), cause)
}
