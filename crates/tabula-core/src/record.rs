//! Module: record
//!
//! Normalized records and their concurrency tokens.

use derive_more::{Deref, Display, IntoIterator};
use indexmap::IndexMap;
use serde::Serialize;
use sha2::{Digest, Sha256};

///
/// Record
///
/// Ordered column name to string-encoded value mapping for one row.
/// `None` is a null value; an absent column was not supplied at all.
///

#[derive(Clone, Debug, Default, Eq, IntoIterator, PartialEq, Serialize)]
pub struct Record {
    #[into_iterator(owned, ref)]
    columns: IndexMap<String, Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<ETag>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Record::insert`] for a non-null value.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, Some(value.into()));
        self
    }

    #[must_use]
    pub fn with_null(mut self, column: impl Into<String>) -> Self {
        self.insert(column, None);
        self
    }

    /// Set a column, keeping its original position when it already exists.
    pub fn insert(&mut self, column: impl Into<String>, value: Option<String>) {
        self.columns.insert(column.into(), value);
    }

    /// Value of `column`; `None` when absent or null.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&str> {
        self.columns.get(column).and_then(Option::as_deref)
    }

    /// Raw entry for `column`: `None` when absent, `Some(None)` when null.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<Option<&str>> {
        self.columns.get(column).map(Option::as_deref)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub const fn etag(&self) -> Option<&ETag> {
        self.etag.as_ref()
    }

    pub fn set_etag(&mut self, etag: ETag) {
        self.etag = Some(etag);
    }

    /// Compute and attach the concurrency token for this record's values.
    pub(crate) fn stamp(&mut self, config_id: &str, table: &str) {
        self.etag = Some(ETag::compute(config_id, table, self));
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            etag: None,
        }
    }
}

///
/// ETag
///
/// Concurrency token: lowercase hex SHA-256 over the handler configuration
/// id, the table name and the record's (column, value) pairs sorted by
/// column. Never persisted.
///

#[derive(Clone, Debug, Deref, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ETag(String);

impl ETag {
    #[must_use]
    pub fn compute(config_id: &str, table: &str, record: &Record) -> Self {
        let mut hasher = Sha256::new();
        write_str(&mut hasher, config_id);
        write_str(&mut hasher, table);

        let mut pairs: Vec<_> = record.iter().collect();
        pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));

        hasher.update((pairs.len() as u64).to_be_bytes());
        for (column, value) in pairs {
            write_str(&mut hasher, column);
            match value {
                Some(value) => {
                    hasher.update([1u8]);
                    write_str(&mut hasher, value);
                }
                None => hasher.update([0u8]),
            }
        }

        let digest = hasher.finalize();
        Self(hex(&digest))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn write_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

///
/// TESTS
///
