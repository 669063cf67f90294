//! Normalized scalar vocabulary shared by every tabula backend.
//!
//! Backends map their native column types onto [`DataType`]; everything above
//! the driver seam reasons only in terms of this enumeration.

#[macro_use]
mod macros;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

///
/// DataType
///
/// Normalized column type. Every record value is carried as text encoded
/// according to its column's `DataType`.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum DataType {
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    String,
    Boolean,
    Binary,
    Date,
    Time,
    DateTimeOffset,
    Guid,
}

impl DataType {
    /// Return the full metadata descriptor for this type.
    #[must_use]
    pub const fn metadata(self) -> DataTypeMetadata {
        data_type_registry!(metadata_from_registry, self)
    }

    #[must_use]
    pub const fn family(self) -> DataTypeFamily {
        self.metadata().family
    }

    /// Canonical configuration name (`INT32`, `DATE_TIMEOFFSET`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.metadata().name
    }

    /// Entity data model name (`Edm.Int32`, ...).
    #[must_use]
    pub const fn edm_name(self) -> &'static str {
        self.metadata().edm_name
    }

    #[must_use]
    pub const fn supports_ordering(self) -> bool {
        self.metadata().supports_ordering
    }

    #[must_use]
    pub const fn is_keyable(self) -> bool {
        self.metadata().is_keyable
    }

    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self.family(), DataTypeFamily::Textual)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();

        ALL_DATA_TYPES
            .iter()
            .copied()
            .find(|ty| ty.name().eq_ignore_ascii_case(wanted) || ty.edm_name() == wanted)
            .ok_or_else(|| UnknownDataType {
                name: wanted.to_string(),
            })
    }
}

impl TryFrom<String> for DataType {
    type Error = UnknownDataType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for &'static str {
    fn from(ty: DataType) -> Self {
        ty.name()
    }
}

///
/// UnknownDataType
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("unknown data type '{name}'")]
pub struct UnknownDataType {
    pub name: String,
}

///
/// DataTypeMetadata
///
/// Capability metadata for one normalized type.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DataTypeMetadata {
    pub family: DataTypeFamily,
    pub name: &'static str,
    pub edm_name: &'static str,
    pub supports_ordering: bool,
    pub is_keyable: bool,
}

///
/// DataTypeFamily
///
/// Coarse routing family used by marshalling and predicate rendering.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DataTypeFamily {
    Numeric,
    Textual,
    Bool,
    Binary,
    Temporal,
    Identifier,
}

/// Every normalized type in registry order.
pub const ALL_DATA_TYPES: [DataType; 13] = data_type_registry!(all_from_registry);

///
/// TESTS
///
