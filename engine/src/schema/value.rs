//! Typed cell values and the Rust types that can receive them.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::error::{ConvertError, ConvertResult};

/// Semantic type a field expects its cell text to convert into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Int,
    UInt,
    Float,
    Bool,
    DateTime,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Int => "int",
            FieldKind::UInt => "uint",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::DateTime => "datetime",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A converted cell value.
///
/// `Absent` is produced only for optional fields whose cell is blank.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Absent,
}

impl CellValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }

    /// Numeric view used by comparison rules.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::UInt(u) => Some(*u as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::UInt(u) => write!(f, "{}", u),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            CellValue::Absent => Ok(()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::UInt(u) => serializer.serialize_u64(*u),
            CellValue::Float(x) => serializer.serialize_f64(*x),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::DateTime(_) => serializer.collect_str(self),
            CellValue::Absent => serializer.serialize_none(),
        }
    }
}

fn mismatch(kind: FieldKind, value: &CellValue) -> ConvertError {
    ConvertError::Unsupported {
        kind: kind.to_string(),
        value: value.to_string(),
    }
}

// =============================================================================
// Field Types
// =============================================================================

/// A Rust type that a record field can have.
///
/// `KIND` tells the converter what to parse; `OPTIONAL` enables blank-to-absent
/// wrapping. `Option<T>` is implemented for every supported `T`.
pub trait FieldType: Sized + 'static {
    const KIND: FieldKind;
    const OPTIONAL: bool = false;

    fn from_cell(value: CellValue) -> ConvertResult<Self>;
    fn to_cell(&self) -> CellValue;
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn from_cell(value: CellValue) -> ConvertResult<Self> {
        match value {
            CellValue::Text(s) => Ok(s),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn to_cell(&self) -> CellValue {
        CellValue::Text(self.clone())
    }
}

macro_rules! signed_field_type {
    ($($ty:ty),*) => {$(
        impl FieldType for $ty {
            const KIND: FieldKind = FieldKind::Int;

            fn from_cell(value: CellValue) -> ConvertResult<Self> {
                match value {
                    CellValue::Int(i) => <$ty>::try_from(i).map_err(|_| ConvertError::IntOutOfRange {
                        value: i.to_string(),
                        target: stringify!($ty),
                    }),
                    other => Err(mismatch(Self::KIND, &other)),
                }
            }

            fn to_cell(&self) -> CellValue {
                CellValue::Int(*self as i64)
            }
        }
    )*};
}

macro_rules! unsigned_field_type {
    ($($ty:ty),*) => {$(
        impl FieldType for $ty {
            const KIND: FieldKind = FieldKind::UInt;

            fn from_cell(value: CellValue) -> ConvertResult<Self> {
                match value {
                    CellValue::UInt(u) => <$ty>::try_from(u).map_err(|_| ConvertError::IntOutOfRange {
                        value: u.to_string(),
                        target: stringify!($ty),
                    }),
                    other => Err(mismatch(Self::KIND, &other)),
                }
            }

            fn to_cell(&self) -> CellValue {
                CellValue::UInt(*self as u64)
            }
        }
    )*};
}

signed_field_type!(i8, i16, i32, i64, isize);
unsigned_field_type!(u8, u16, u32, u64, usize);

impl FieldType for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn from_cell(value: CellValue) -> ConvertResult<Self> {
        match value {
            CellValue::Float(x) => Ok(x),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn to_cell(&self) -> CellValue {
        CellValue::Float(*self)
    }
}

impl FieldType for f32 {
    const KIND: FieldKind = FieldKind::Float;

    fn from_cell(value: CellValue) -> ConvertResult<Self> {
        match value {
            CellValue::Float(x) => {
                let narrowed = x as f32;
                if x.is_finite() && !narrowed.is_finite() {
                    return Err(ConvertError::FloatOutOfRange {
                        value: x.to_string(),
                        target: "f32",
                    });
                }
                Ok(narrowed)
            }
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn to_cell(&self) -> CellValue {
        CellValue::Float(f64::from(*self))
    }
}

impl FieldType for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn from_cell(value: CellValue) -> ConvertResult<Self> {
        match value {
            CellValue::Bool(b) => Ok(b),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn to_cell(&self) -> CellValue {
        CellValue::Bool(*self)
    }
}

impl FieldType for NaiveDateTime {
    const KIND: FieldKind = FieldKind::DateTime;

    fn from_cell(value: CellValue) -> ConvertResult<Self> {
        match value {
            CellValue::DateTime(dt) => Ok(dt),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn to_cell(&self) -> CellValue {
        CellValue::DateTime(*self)
    }
}

impl FieldType for NaiveDate {
    const KIND: FieldKind = FieldKind::DateTime;

    fn from_cell(value: CellValue) -> ConvertResult<Self> {
        NaiveDateTime::from_cell(value).map(|dt| dt.date())
    }

    fn to_cell(&self) -> CellValue {
        CellValue::DateTime(self.and_time(chrono::NaiveTime::MIN))
    }
}

impl FieldType for DateTime<Utc> {
    const KIND: FieldKind = FieldKind::DateTime;

    fn from_cell(value: CellValue) -> ConvertResult<Self> {
        NaiveDateTime::from_cell(value).map(|dt| dt.and_utc())
    }

    fn to_cell(&self) -> CellValue {
        CellValue::DateTime(self.naive_utc())
    }
}

impl FieldType for DateTime<FixedOffset> {
    const KIND: FieldKind = FieldKind::DateTime;

    fn from_cell(value: CellValue) -> ConvertResult<Self> {
        NaiveDateTime::from_cell(value).map(|dt| dt.and_utc().fixed_offset())
    }

    fn to_cell(&self) -> CellValue {
        CellValue::DateTime(self.naive_utc())
    }
}

impl<T: FieldType> FieldType for Option<T> {
    const KIND: FieldKind = T::KIND;
    const OPTIONAL: bool = true;

    fn from_cell(value: CellValue) -> ConvertResult<Self> {
        match value {
            CellValue::Absent => Ok(None),
            other => T::from_cell(other).map(Some),
        }
    }

    fn to_cell(&self) -> CellValue {
        match self {
            Some(v) => v.to_cell(),
            None => CellValue::Absent,
        }
    }
}
