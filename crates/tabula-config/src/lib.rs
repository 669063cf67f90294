//! Handler configuration document.
//!
//! A handler is constructed from one `HandlerConfig`, normally loaded from a
//! TOML file shipped next to the service descriptor:
//!
//! ```toml
//! config_id = "orders"
//! max_page_size = 500
//!
//! [[tables]]
//! name = "ORDERS"
//! schema = "SALES"
//!
//! [[tables.columns]]
//! name = "ID"
//! type = "INT64"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tabula_primitives::DataType;
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

/// Page size applied when a read carries no explicit `$top`.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1000;

/// Upper bound on cached prepared statements per handler.
pub const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 10_000;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config_id must not be empty")]
    EmptyConfigId,

    #[error("max_page_size must be greater than zero")]
    ZeroPageSize,

    #[error("statement_cache_capacity must be greater than zero")]
    ZeroCacheCapacity,

    #[error("table '{table}' is configured more than once")]
    DuplicateTable { table: String },

    #[error("column '{column}' is configured more than once on table '{table}'")]
    DuplicateColumn { table: String, column: String },
}

///
/// HandlerConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerConfig {
    pub config_id: String,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    #[serde(default = "default_statement_cache_capacity")]
    pub statement_cache_capacity: usize,

    /// Column-family keyspace; ignored by relational handlers.
    #[serde(default)]
    pub keyspace: Option<String>,

    /// Table allow-list. Empty exposes every discovered table.
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

impl HandlerConfig {
    /// Minimal configuration exposing every table with default limits.
    #[must_use]
    pub fn new(config_id: impl Into<String>) -> Self {
        Self {
            config_id: config_id.into(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
            keyspace: None,
            tables: Vec::new(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    #[must_use]
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    #[must_use]
    pub const fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    #[must_use]
    pub const fn with_statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_table(mut self, table: TableConfig) -> Self {
        self.tables.push(table);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.config_id.trim().is_empty() {
            return Err(ConfigError::EmptyConfigId);
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.statement_cache_capacity == 0 {
            return Err(ConfigError::ZeroCacheCapacity);
        }

        let mut seen = BTreeSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(ConfigError::DuplicateTable {
                    table: table.name.clone(),
                });
            }

            let mut columns = BTreeSet::new();
            for column in &table.columns {
                if !columns.insert(column.name.as_str()) {
                    return Err(ConfigError::DuplicateColumn {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Table entry by exact name, if the table is configured.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// True when `name` passes the allow-list.
    #[must_use]
    pub fn exposes(&self, name: &str) -> bool {
        self.tables.is_empty() || self.table(name).is_some()
    }
}

const fn default_max_page_size() -> u32 {
    DEFAULT_MAX_PAGE_SIZE
}

const fn default_statement_cache_capacity() -> usize {
    DEFAULT_STATEMENT_CACHE_CAPACITY
}

///
/// TableConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub name: String,

    /// Owning schema. Absent means the table is addressed unqualified.
    #[serde(default)]
    pub schema: Option<String>,

    /// Column projection with type overrides. Empty exposes all columns.
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

impl TableConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(ColumnConfig {
            name: name.into(),
            data_type,
        });
        self
    }

    /// Type override for `column`, if the projection lists it.
    #[must_use]
    pub fn column_override(&self, column: &str) -> Option<DataType> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.data_type)
    }
}

///
/// ColumnConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: DataType,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
config_id = "orders"
max_page_size = 50

[[tables]]
name = "ORDERS"
schema = "SALES"

[[tables.columns]]
name = "ID"
type = "INT64"

[[tables.columns]]
name = "PLACED_AT"
type = "DATE_TIMEOFFSET"

[[tables]]
name = "customers"
"#;

    #[test]
    fn parses_full_document() {
        let config = HandlerConfig::from_toml_str(DOCUMENT).unwrap();

        assert_eq!(config.config_id, "orders");
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.statement_cache_capacity, DEFAULT_STATEMENT_CACHE_CAPACITY);
        assert_eq!(config.tables.len(), 2);

        let orders = config.table("ORDERS").unwrap();
        assert_eq!(orders.schema.as_deref(), Some("SALES"));
        assert_eq!(orders.column_override("ID"), Some(DataType::Int64));
        assert_eq!(orders.column_override("TOTAL"), None);
        assert_eq!(config.table("customers").unwrap().schema, None);
    }

    #[test]
    fn empty_allow_list_exposes_everything() {
        let config = HandlerConfig::new("any");
        assert!(config.exposes("whatever"));

        let config = config.with_table(TableConfig::new("only"));
        assert!(config.exposes("only"));
        assert!(!config.exposes("whatever"));
    }

    #[test]
    fn rejects_zero_page_size() {
        let err = HandlerConfig::from_toml_str("config_id = \"x\"\nmax_page_size = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroPageSize));
    }

    #[test]
    fn rejects_duplicate_tables() {
        let config = HandlerConfig::new("dup")
            .with_table(TableConfig::new("a"))
            .with_table(TableConfig::new("a"));

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateTable { table }) if table == "a"
        ));
    }

    #[test]
    fn rejects_unknown_column_type() {
        let doc = "config_id = \"x\"\n[[tables]]\nname = \"t\"\n[[tables.columns]]\nname = \"c\"\ntype = \"VARCHAR2\"\n";
        let err = HandlerConfig::from_toml_str(doc).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("VARCHAR2"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = HandlerConfig::from_toml_str("config_id = \"x\"\nmaxLimit = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn serializes_column_type_by_config_name() {
        let table = TableConfig::new("t").with_column("c", DataType::Time);
        let json = serde_json::to_value(&table).unwrap();

        assert_eq!(json["columns"][0]["type"], "TIMEOFDAY");
    }
}
