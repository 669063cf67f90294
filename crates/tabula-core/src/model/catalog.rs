use super::{NavigationEdge, TableMetadata};
use crate::error::{ErrorOrigin, InternalError};
use derive_more::Deref;
use indexmap::IndexMap;
use serde::Serialize;

///
/// PrimaryKeySet
///
/// Table name to ordered key column names.
///

#[derive(Clone, Debug, Default, Deref, Eq, PartialEq, Serialize)]
pub struct PrimaryKeySet(IndexMap<String, Vec<String>>);

impl PrimaryKeySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: impl Into<String>, keys: Vec<String>) {
        self.0.insert(table.into(), keys);
    }

    /// Key columns of `table`; empty when the table is unknown or keyless.
    #[must_use]
    pub fn keys_of(&self, table: &str) -> &[String] {
        self.0.get(table).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn is_key(&self, table: &str, column: &str) -> bool {
        self.keys_of(table).iter().any(|k| k == column)
    }
}

///
/// Catalog
///
/// Immutable metadata snapshot for one handler instance. Never refreshed:
/// schema changes after construction are not observed.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Catalog {
    tables: IndexMap<String, TableMetadata>,
    primary_keys: PrimaryKeySet,
    navigation: Vec<NavigationEdge>,
}

impl Catalog {
    #[must_use]
    pub const fn new(
        tables: IndexMap<String, TableMetadata>,
        primary_keys: PrimaryKeySet,
        navigation: Vec<NavigationEdge>,
    ) -> Self {
        Self {
            tables,
            primary_keys,
            navigation,
        }
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    #[must_use]
    pub const fn tables(&self) -> &IndexMap<String, TableMetadata> {
        &self.tables
    }

    /// Metadata for `name`, or a NotFound fault naming the table.
    pub fn table(&self, name: &str) -> Result<&TableMetadata, InternalError> {
        self.tables.get(name).ok_or_else(|| {
            InternalError::not_found(ErrorOrigin::Catalog, format!("table '{name}' is not exposed"))
        })
    }

    #[must_use]
    pub const fn primary_keys(&self) -> &PrimaryKeySet {
        &self.primary_keys
    }

    #[must_use]
    pub fn keys_of(&self, table: &str) -> &[String] {
        self.primary_keys.keys_of(table)
    }

    #[must_use]
    pub fn navigation(&self) -> &[NavigationEdge] {
        &self.navigation
    }

    /// Edge joining `root` and `other`. When both directions exist the edge
    /// exported by `root` wins.
    #[must_use]
    pub fn edge_between(&self, root: &str, other: &str) -> Option<&NavigationEdge> {
        self.navigation
            .iter()
            .find(|e| e.exporting == root && e.importing == other)
            .or_else(|| {
                self.navigation
                    .iter()
                    .find(|e| e.exporting == other && e.importing == root)
            })
    }
}

///
/// TESTS
///
