//! Module: value
//!
//! Native value model exchanged with drivers, and the marshaller that maps
//! it to and from the normalized string encoding carried by records.

mod marshal;


pub use marshal::{canonicalize, from_column, from_native, render_native, to_native};

use rust_decimal::Decimal;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

///
/// NativeValue
///
/// Backend-native scalar as bound to, or read from, a driver.
///

#[derive(Clone, Debug, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    Text(String),
    Binary(Vec<u8>),
    Date(Date),
    Time(Time),
    Timestamp(OffsetDateTime),
    Guid(Uuid),
}

impl NativeValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short variant label used in fault messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int16(_) => "int16",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Single(_) => "single",
            Self::Double(_) => "double",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Binary(_) => "binary",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::Guid(_) => "guid",
        }
    }

    /// Widen any integral variant to `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int16(v) => Some(i64::from(*v)),
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for NativeValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}
