//! Column normalization applied after catalog queries.
//!
//! The SQLite dataset stores timestamps as text while the network backends
//! return native date-time values. Both end up as [`Value::Timestamp`];
//! anything that cannot be read as a date-time becomes [`Value::Null`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::db::{Table, Value};

/// Data type recorded for normalized timestamp columns.
pub const TIMESTAMP_TYPE: &str = "TIMESTAMP";

/// Data type recorded for coerced text columns.
pub const TEXT_TYPE: &str = "TEXT";

/// Name of the column appended to metadata results.
pub const SENSOR_NAME_COLUMN: &str = "sensor_name";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parses a timestamp string in any of the accepted layouts.
///
/// RFC 3339 input with an offset is converted to UTC. A bare date means
/// midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

/// Converts one cell to a timestamp, or null when that is not possible.
pub fn to_timestamp(value: Value) -> Value {
    match value {
        Value::Timestamp(ts) => Value::Timestamp(ts),
        Value::String(text) => parse_timestamp(&text)
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Converts one cell to text. Nulls stay null.
pub fn to_text(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(text) => Value::String(text),
        other => Value::String(other.to_display_string()),
    }
}

/// Parses every cell of the named column into a timestamp.
///
/// Returns false when the column does not exist.
pub fn normalize_timestamp_column(table: &mut Table, name: &str) -> bool {
    table.map_column(name, TIMESTAMP_TYPE, to_timestamp)
}

/// Coerces every cell of the named column to text.
pub fn coerce_text_column(table: &mut Table, name: &str) -> bool {
    table.map_column(name, TEXT_TYPE, to_text)
}

/// Appends the constant `sensor_name` column.
pub fn tag_sensor_name(table: &mut Table, source_name: &str) {
    table.push_constant_column(SENSOR_NAME_COLUMN, TEXT_TYPE, Value::from(source_name));
}
