//! Bidirectional conversion between [`NativeValue`] and the normalized
//! string encoding, dispatched by [`DataType`].
//!
//! Canonical encodings:
//! - integers, floats and decimals: Rust `Display` (decimal scale preserved)
//! - boolean: `true` / `false` (`1` / `0` accepted on input)
//! - binary: standard base64 with padding
//! - date: `YYYY-MM-DD`
//! - time: `HH:MM:SS[.fraction]`
//! - datetime-with-offset: RFC 3339
//! - guid: lowercase hyphenated
//!
//! Reads are lenient about the native variant a driver hands back (SQLite
//! returns integers for booleans and text for temporal columns); writes
//! always produce the native variant that matches the declared type.

use super::NativeValue;
use crate::{error::InternalError, model::DataColumn};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rust_decimal::Decimal;
use std::{fmt::Display, str::FromStr};
use tabula_primitives::DataType;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};
use uuid::Uuid;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");
const TIME_FRACTION_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second].[subsecond]");
const SQL_TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Convert a normalized value into the native value bound for `data_type`.
pub fn to_native(data_type: DataType, value: Option<&str>) -> Result<NativeValue, InternalError> {
    let Some(text) = value else {
        return Ok(NativeValue::Null);
    };

    let native = match data_type {
        DataType::Int16 => NativeValue::Int16(parse_text(data_type, text)?),
        DataType::Int32 => NativeValue::Int32(parse_text(data_type, text)?),
        DataType::Int64 => NativeValue::Int64(parse_text(data_type, text)?),
        DataType::Single => NativeValue::Single(parse_text(data_type, text)?),
        DataType::Double => NativeValue::Double(parse_text(data_type, text)?),
        DataType::Decimal => NativeValue::Decimal(parse_text(data_type, text)?),
        DataType::String => NativeValue::Text(text.to_string()),
        DataType::Boolean => NativeValue::Bool(parse_bool(text)?),
        DataType::Binary => NativeValue::Binary(decode_binary(text)?),
        DataType::Date => NativeValue::Date(parse_date(text)?),
        DataType::Time => NativeValue::Time(parse_time(text)?),
        DataType::DateTimeOffset => NativeValue::Timestamp(parse_timestamp(text)?),
        DataType::Guid => NativeValue::Guid(parse_guid(text)?),
    };

    Ok(native)
}

/// Convert a native value read from a driver into its normalized encoding.
/// A native null yields `None`.
pub fn from_native(
    data_type: DataType,
    value: &NativeValue,
) -> Result<Option<String>, InternalError> {
    if value.is_null() {
        return Ok(None);
    }

    let text = match data_type {
        DataType::Int16 => integer::<i16>(data_type, value)?.to_string(),
        DataType::Int32 => integer::<i32>(data_type, value)?.to_string(),
        DataType::Int64 => integer::<i64>(data_type, value)?.to_string(),
        DataType::Single => single(value)?.to_string(),
        DataType::Double => double(value)?.to_string(),
        DataType::Decimal => decimal(value)?.to_string(),
        DataType::String => match value {
            NativeValue::Text(s) => s.clone(),
            other => render_native(other)?.unwrap_or_default(),
        },
        DataType::Boolean => boolean(value)?.to_string(),
        DataType::Binary => match value {
            NativeValue::Binary(bytes) => STANDARD.encode(bytes),
            NativeValue::Text(s) => STANDARD.encode(s.as_bytes()),
            NativeValue::Guid(uuid) => STANDARD.encode(uuid.as_bytes()),
            other => return Err(mismatch(data_type, other)),
        },
        DataType::Date => format_date(date(value)?)?,
        DataType::Time => format_time(time_of_day(value)?)?,
        DataType::DateTimeOffset => format_timestamp(timestamp(value)?)?,
        DataType::Guid => guid(value)?.hyphenated().to_string(),
    };

    Ok(Some(text))
}

/// Convert a native value read from `column`. Decimals are rescaled to the
/// declared scale whenever the column carries a precision, since drivers may
/// hand back a float or an integer for an exact numeric.
pub fn from_column(
    column: &DataColumn,
    value: &NativeValue,
) -> Result<Option<String>, InternalError> {
    if column.data_type != DataType::Decimal || column.precision == 0 || value.is_null() {
        return from_native(column.data_type, value);
    }

    let mut exact = decimal(value)?;
    exact.rescale(column.scale);

    Ok(Some(exact.to_string()))
}

/// Normalized text exactly as it reads back from `column`.
pub fn canonicalize(
    column: &DataColumn,
    text: Option<&str>,
) -> Result<Option<String>, InternalError> {
    from_column(column, &to_native(column.data_type, text)?)
}

/// Render a native value in the canonical encoding of its own variant.
/// Used for values that carry no declared column type, such as aggregates.
pub fn render_native(value: &NativeValue) -> Result<Option<String>, InternalError> {
    let data_type = match value {
        NativeValue::Null => return Ok(None),
        NativeValue::Bool(_) => DataType::Boolean,
        NativeValue::Int16(_) => DataType::Int16,
        NativeValue::Int32(_) => DataType::Int32,
        NativeValue::Int64(_) => DataType::Int64,
        NativeValue::Single(_) => DataType::Single,
        NativeValue::Double(_) => DataType::Double,
        NativeValue::Decimal(_) => DataType::Decimal,
        NativeValue::Text(s) => return Ok(Some(s.clone())),
        NativeValue::Binary(_) => DataType::Binary,
        NativeValue::Date(_) => DataType::Date,
        NativeValue::Time(_) => DataType::Time,
        NativeValue::Timestamp(_) => DataType::DateTimeOffset,
        NativeValue::Guid(_) => DataType::Guid,
    };

    from_native(data_type, value)
}

// ---------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------

fn integer<T>(data_type: DataType, value: &NativeValue) -> Result<T, InternalError>
where
    T: TryFrom<i64> + FromStr,
{
    let wide = match value {
        NativeValue::Bool(b) => i64::from(*b),
        NativeValue::Text(s) => return parse_text(data_type, s),
        NativeValue::Decimal(d) if d.fract().is_zero() => {
            i64::try_from(*d).map_err(|_| out_of_range(data_type, value))?
        }
        other => other.as_i64().ok_or_else(|| mismatch(data_type, other))?,
    };

    T::try_from(wide).map_err(|_| out_of_range(data_type, value))
}

#[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn single(value: &NativeValue) -> Result<f32, InternalError> {
    match value {
        NativeValue::Single(f) => Ok(*f),
        NativeValue::Double(d) => Ok(*d as f32),
        NativeValue::Text(s) => parse_text(DataType::Single, s),
        NativeValue::Decimal(d) => parse_text(DataType::Single, &d.to_string()),
        other => other
            .as_i64()
            .map(|i| i as f32)
            .ok_or_else(|| mismatch(DataType::Single, other)),
    }
}

#[expect(clippy::cast_precision_loss)]
fn double(value: &NativeValue) -> Result<f64, InternalError> {
    match value {
        NativeValue::Double(d) => Ok(*d),
        NativeValue::Single(f) => Ok(f64::from(*f)),
        NativeValue::Text(s) => parse_text(DataType::Double, s),
        NativeValue::Decimal(d) => parse_text(DataType::Double, &d.to_string()),
        other => other
            .as_i64()
            .map(|i| i as f64)
            .ok_or_else(|| mismatch(DataType::Double, other)),
    }
}

fn decimal(value: &NativeValue) -> Result<Decimal, InternalError> {
    match value {
        NativeValue::Decimal(d) => Ok(*d),
        NativeValue::Text(s) => parse_text(DataType::Decimal, s),
        NativeValue::Double(d) => {
            Decimal::try_from(*d).map_err(|_| out_of_range(DataType::Decimal, value))
        }
        NativeValue::Single(f) => {
            Decimal::try_from(*f).map_err(|_| out_of_range(DataType::Decimal, value))
        }
        other => other
            .as_i64()
            .map(Decimal::from)
            .ok_or_else(|| mismatch(DataType::Decimal, other)),
    }
}

fn boolean(value: &NativeValue) -> Result<bool, InternalError> {
    match value {
        NativeValue::Bool(b) => Ok(*b),
        NativeValue::Text(s) => parse_bool(s),
        other => other
            .as_i64()
            .map(|i| i != 0)
            .ok_or_else(|| mismatch(DataType::Boolean, other)),
    }
}

fn date(value: &NativeValue) -> Result<Date, InternalError> {
    match value {
        NativeValue::Date(d) => Ok(*d),
        NativeValue::Timestamp(ts) => Ok(ts.date()),
        NativeValue::Text(s) => parse_date(s).or_else(|_| parse_timestamp(s).map(|ts| ts.date())),
        other => Err(mismatch(DataType::Date, other)),
    }
}

fn time_of_day(value: &NativeValue) -> Result<Time, InternalError> {
    match value {
        NativeValue::Time(t) => Ok(*t),
        NativeValue::Timestamp(ts) => Ok(ts.time()),
        NativeValue::Text(s) => parse_time(s),
        other => Err(mismatch(DataType::Time, other)),
    }
}

fn timestamp(value: &NativeValue) -> Result<OffsetDateTime, InternalError> {
    match value {
        NativeValue::Timestamp(ts) => Ok(*ts),
        NativeValue::Date(d) => Ok(d.midnight().assume_utc()),
        NativeValue::Text(s) => parse_timestamp(s),
        NativeValue::Int64(secs) => OffsetDateTime::from_unix_timestamp(*secs)
            .map_err(|_| out_of_range(DataType::DateTimeOffset, value)),
        other => Err(mismatch(DataType::DateTimeOffset, other)),
    }
}

fn guid(value: &NativeValue) -> Result<Uuid, InternalError> {
    match value {
        NativeValue::Guid(uuid) => Ok(*uuid),
        NativeValue::Text(s) => parse_guid(s),
        NativeValue::Binary(bytes) => {
            Uuid::from_slice(bytes).map_err(|_| out_of_range(DataType::Guid, value))
        }
        other => Err(mismatch(DataType::Guid, other)),
    }
}

// ---------------------------------------------------------------------
// Text codecs
// ---------------------------------------------------------------------

fn parse_text<T: FromStr>(data_type: DataType, text: &str) -> Result<T, InternalError> {
    text.trim()
        .parse::<T>()
        .map_err(|_| InternalError::binding(format!("cannot bind '{text}' as {data_type}")))
}

fn parse_bool(text: &str) -> Result<bool, InternalError> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        Ok(false)
    } else {
        Err(InternalError::binding(format!(
            "cannot bind '{text}' as {}",
            DataType::Boolean
        )))
    }
}

fn decode_binary(text: &str) -> Result<Vec<u8>, InternalError> {
    STANDARD
        .decode(text.trim())
        .map_err(|err| InternalError::binding(format!("invalid base64 value: {err}")))
}

fn parse_date(text: &str) -> Result<Date, InternalError> {
    Date::parse(text.trim(), DATE_FORMAT).map_err(|err| temporal_fault(DataType::Date, text, err))
}

fn parse_time(text: &str) -> Result<Time, InternalError> {
    let text = text.trim();
    let format = if text.contains('.') {
        TIME_FRACTION_FORMAT
    } else {
        TIME_FORMAT
    };

    Time::parse(text, format).map_err(|err| temporal_fault(DataType::Time, text, err))
}

fn parse_timestamp(text: &str) -> Result<OffsetDateTime, InternalError> {
    let text = text.trim();

    OffsetDateTime::parse(text, &Rfc3339)
        .or_else(|_| PrimitiveDateTime::parse(text, SQL_TIMESTAMP_FORMAT).map(|dt| dt.assume_utc()))
        .map_err(|err| temporal_fault(DataType::DateTimeOffset, text, err))
}

fn parse_guid(text: &str) -> Result<Uuid, InternalError> {
    Uuid::parse_str(text.trim())
        .map_err(|err| InternalError::binding(format!("cannot bind '{text}' as GUID: {err}")))
}

fn format_date(date: Date) -> Result<String, InternalError> {
    date.format(DATE_FORMAT)
        .map_err(|err| InternalError::binding(format!("cannot format date: {err}")))
}

fn format_time(time: Time) -> Result<String, InternalError> {
    let format = if time.nanosecond() == 0 {
        TIME_FORMAT
    } else {
        TIME_FRACTION_FORMAT
    };

    time.format(format)
        .map_err(|err| InternalError::binding(format!("cannot format time: {err}")))
}

fn format_timestamp(ts: OffsetDateTime) -> Result<String, InternalError> {
    ts.format(&Rfc3339)
        .map_err(|err| InternalError::binding(format!("cannot format timestamp: {err}")))
}

// ---------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------

fn temporal_fault(data_type: DataType, text: &str, err: impl Display) -> InternalError {
    InternalError::binding(format!("cannot bind '{text}' as {data_type}: {err}"))
}

fn mismatch(data_type: DataType, value: &NativeValue) -> InternalError {
    InternalError::binding(format!(
        "cannot read native {} value as {data_type}",
        value.kind()
    ))
}

fn out_of_range(data_type: DataType, value: &NativeValue) -> InternalError {
    InternalError::binding(format!(
        "native {} value is out of range for {data_type}",
        value.kind()
    ))
}
