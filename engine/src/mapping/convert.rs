//! Value Converter - raw cell text to typed values.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{ConvertError, ConvertResult};
use crate::schema::{CellValue, FieldDescriptor, FieldKind};

/// Date/time layouts tried, in order, after the field's own format and RFC 3339.
pub const DEFAULT_LAYOUTS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M",
];

const TRUE_WORDS: &[&str] = &["1", "true", "t", "yes", "y", "on"];
const FALSE_WORDS: &[&str] = &["0", "false", "f", "no", "n", "off"];

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Convert raw cell text into a value of `kind`.
///
/// Text passes through untouched; every other kind trims surrounding
/// whitespace first. `format` is an optional chrono layout for date-times.
pub fn convert(raw: &str, kind: FieldKind, format: Option<&str>) -> ConvertResult<CellValue> {
    match kind {
        FieldKind::Text => Ok(CellValue::Text(raw.to_string())),
        FieldKind::Int => {
            let text = raw.trim();
            text.parse::<i64>().map(CellValue::Int).map_err(|e| {
                use std::num::IntErrorKind::*;
                match e.kind() {
                    PosOverflow | NegOverflow => ConvertError::IntOutOfRange {
                        value: text.to_string(),
                        target: "i64",
                    },
                    _ => ConvertError::InvalidInt(raw.to_string()),
                }
            })
        }
        FieldKind::UInt => {
            let text = raw.trim();
            text.parse::<u64>().map(CellValue::UInt).map_err(|e| {
                use std::num::IntErrorKind::*;
                match e.kind() {
                    PosOverflow => ConvertError::IntOutOfRange {
                        value: text.to_string(),
                        target: "u64",
                    },
                    _ => ConvertError::InvalidInt(raw.to_string()),
                }
            })
        }
        FieldKind::Float => raw
            .trim()
            .parse::<f64>()
            .map(CellValue::Float)
            .map_err(|_| ConvertError::InvalidFloat(raw.to_string())),
        FieldKind::Bool => parse_bool(raw).map(CellValue::Bool),
        FieldKind::DateTime => parse_datetime(raw, format).map(CellValue::DateTime),
    }
}

/// Convert raw text for a specific field.
///
/// Optional fields turn blank (whitespace-only) text into
/// [`CellValue::Absent`] instead of failing.
pub fn convert_field<R>(raw: &str, field: &FieldDescriptor<R>) -> ConvertResult<CellValue> {
    if field.is_optional() && raw.trim().is_empty() {
        return Ok(CellValue::Absent);
    }
    convert(raw, field.kind(), field.date_format())
}

/// Parse the accepted boolean spellings, case-insensitively.
pub fn parse_bool(raw: &str) -> ConvertResult<bool> {
    let word = raw.trim().to_lowercase();
    if TRUE_WORDS.contains(&word.as_str()) {
        Ok(true)
    } else if FALSE_WORDS.contains(&word.as_str()) {
        Ok(false)
    } else {
        Err(ConvertError::InvalidBool(raw.to_string()))
    }
}

/// Parse a date/time cell.
///
/// Tried in order: the custom `format`, RFC 3339 (normalised to UTC), the
/// [`DEFAULT_LAYOUTS`], and finally a spreadsheet serial day number.
pub fn parse_datetime(raw: &str, format: Option<&str>) -> ConvertResult<NaiveDateTime> {
    let text = raw.trim();

    if let Some(layout) = format.filter(|f| !f.is_empty()) {
        if let Some(dt) = parse_with_layout(text, layout) {
            return Ok(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_utc());
    }

    if let Some(dt) = DEFAULT_LAYOUTS
        .iter()
        .find_map(|layout| parse_with_layout(text, layout))
    {
        return Ok(dt);
    }

    text.parse::<f64>()
        .ok()
        .and_then(serial_to_datetime)
        .ok_or_else(|| ConvertError::InvalidDateTime(raw.to_string()))
}

/// A layout may describe a zoned timestamp, a naive timestamp or a bare date.
fn parse_with_layout(text: &str, layout: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_str(text, layout) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, layout) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, layout)
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Convert a spreadsheet serial day number (1900 date system) to a timestamp.
///
/// Day 0 is 1899-12-30. The fractional part is the time of day, rounded to
/// the nearest second. Serials that are not strictly positive are rejected.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial <= 0.0 {
        return None;
    }

    let days = serial.trunc();
    if days > u32::MAX as f64 {
        return None;
    }
    let seconds = ((serial - days) * SECONDS_PER_DAY + 0.5).floor() as i64;

    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    base.checked_add_days(Days::new(days as u64))?
        .checked_add_signed(Duration::seconds(seconds))
}
