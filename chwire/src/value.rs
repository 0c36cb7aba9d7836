//! Column values.
use std::{
    fmt,
    net::{Ipv4Addr, Ipv6Addr},
};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{common::FmtExt, types::Decimal};

/// A single column value.
///
/// Which variant a column holds is decided by its [`DataType`][crate::types::DataType].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Only valid in `Nullable` columns.
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    /// Raw bytes of a `FixedString(n)`, zero padded.
    FixedString(Vec<u8>),
    Date(Date),
    /// `DateTime` and `DateTime64`, always in UTC.
    DateTime(OffsetDateTime),
    Uuid(Uuid),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Enum8(i8),
    Enum16(i16),
    Decimal(Decimal),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, for error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Int8(_) => "Int8",
            Value::Int16(_) => "Int16",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::UInt8(_) => "UInt8",
            Value::UInt16(_) => "UInt16",
            Value::UInt32(_) => "UInt32",
            Value::UInt64(_) => "UInt64",
            Value::Float32(_) => "Float32",
            Value::Float64(_) => "Float64",
            Value::String(_) => "String",
            Value::FixedString(_) => "FixedString",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::Uuid(_) => "Uuid",
            Value::Ipv4(_) => "Ipv4",
            Value::Ipv6(_) => "Ipv6",
            Value::Enum8(_) => "Enum8",
            Value::Enum16(_) => "Enum16",
            Value::Decimal(_) => "Decimal",
            Value::Array(_) => "Array",
            Value::Tuple(_) => "Tuple",
        }
    }

    /// Integer value of any integer variant, enums included.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::Int8(v) | Value::Enum8(v) => Some(v.into()),
            Value::Int16(v) | Value::Enum16(v) => Some(v.into()),
            Value::Int32(v) => Some(v.into()),
            Value::Int64(v) => Some(v.into()),
            Value::UInt8(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::UInt64(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Floating point value of any numeric variant.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float32(v) => Some(v.into()),
            Value::Float64(v) => Some(v),
            _ => self.as_i128().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

from! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    &str => String,
    Date => Date,
    OffsetDateTime => DateTime,
    Uuid => Uuid,
    Ipv4Addr => Ipv4,
    Ipv6Addr => Ipv6,
    Decimal => Decimal,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

/// Format as a text literal, which [`DataType::parse_text`][1] accepts back.
///
/// [1]: crate::types::DataType::parse_text
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int8(v) | Value::Enum8(v) => fmt::Display::fmt(v, f),
            Value::Int16(v) | Value::Enum16(v) => fmt::Display::fmt(v, f),
            Value::Int32(v) => fmt::Display::fmt(v, f),
            Value::Int64(v) => fmt::Display::fmt(v, f),
            Value::UInt8(v) => fmt::Display::fmt(v, f),
            Value::UInt16(v) => fmt::Display::fmt(v, f),
            Value::UInt32(v) => fmt::Display::fmt(v, f),
            Value::UInt64(v) => fmt::Display::fmt(v, f),
            Value::Float32(v) => fmt::Display::fmt(v, f),
            Value::Float64(v) => fmt::Display::fmt(v, f),
            Value::String(v) => write_quoted(f, v.as_bytes()),
            Value::FixedString(v) => write_quoted(f, v),
            Value::Date(v) => write!(f, "'{v}'"),
            Value::DateTime(v) => {
                let text = crate::types::format_datetime(*v).map_err(|_| fmt::Error)?;
                write!(f, "'{text}'")
            },
            Value::Uuid(v) => write!(f, "'{v}'"),
            Value::Ipv4(v) => write!(f, "'{v}'"),
            Value::Ipv6(v) => write!(f, "'{v}'"),
            Value::Decimal(v) => fmt::Display::fmt(v, f),
            Value::Array(values) => {
                f.write_str("[")?;
                write_list(f, values)?;
                f.write_str("]")
            },
            Value::Tuple(values) => {
                f.write_str("(")?;
                write_list(f, values)?;
                f.write_str(")")
            },
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i != 0 {
            f.write_str(", ")?;
        }
        fmt::Display::fmt(value, f)?;
    }
    Ok(())
}

fn write_quoted(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("'")?;
    match std::str::from_utf8(bytes) {
        Ok(s) => {
            for c in s.chars() {
                match c {
                    '\'' => f.write_str("\\'")?,
                    '\\' => f.write_str("\\\\")?,
                    '\n' => f.write_str("\\n")?,
                    '\t' => f.write_str("\\t")?,
                    '\0' => f.write_str("\\0")?,
                    c => write!(f, "{c}")?,
                }
            }
        },
        Err(_) => write!(f, "{}", bytes.lossy())?,
    }
    f.write_str("'")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_literals() {
        let value = Value::Tuple(vec![
            Value::Int32(-1),
            Value::String("it's".into()),
            Value::Array(vec![Value::Null, Value::UInt8(3)]),
        ]);
        assert_eq!(value.to_string(), "(-1, 'it\\'s', [NULL, 3])");
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from(Some(5i32)), Value::Int32(5));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(vec![1u8, 2]), Value::Array(vec![Value::UInt8(1), Value::UInt8(2)]));
        assert_eq!(Value::UInt64(7).as_i128(), Some(7));
        assert_eq!(Value::String("x".into()).as_i128(), None);
    }
}
