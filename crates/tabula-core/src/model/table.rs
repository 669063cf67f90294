use super::DataColumn;
use indexmap::IndexMap;
use serde::Serialize;

///
/// TableMetadata
///
/// One exposed table: its columns in catalog order, plus the schema that
/// owns it when the backend addresses tables by schema.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TableMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub columns: IndexMap<String, DataColumn>,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>, schema: Option<String>) -> Self {
        Self {
            name: name.into(),
            schema,
            columns: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: DataColumn) -> Self {
        self.push_column(column);
        self
    }

    pub fn push_column(&mut self, column: DataColumn) {
        self.columns.insert(column.name.clone(), column);
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&DataColumn> {
        self.columns.get(name)
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Columns whose values are generated by the backend on insert.
    pub fn auto_generated(&self) -> impl Iterator<Item = &DataColumn> {
        self.columns.values().filter(|c| c.auto_generated)
    }

    /// Table reference as written in statement text: `schema.name` when the
    /// table is schema-scoped, otherwise the bare name.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }
}
