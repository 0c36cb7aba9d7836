//! Column types.
//!
//! Every column carries a [`DataType`], parsed from the type name the server sends
//! by [`TypeRegistry`]. The data type knows how to encode and decode [`Value`]s of
//! its column, one at a time or as a whole column:
//!
//! | type                    | wire format                                      | value                  |
//! | ----------------------- | ------------------------------------------------ | ---------------------- |
//! | `Int8` .. `UInt64`      | little endian integer                            | [`Value::Int8`] ..     |
//! | `Float32`, `Float64`    | IEEE-754 little endian                           | [`Value::Float32`] ..  |
//! | `String`                | varint length and bytes                          | [`Value::String`]      |
//! | `FixedString(n)`        | `n` bytes, zero padded                           | [`Value::FixedString`] |
//! | `Date`                  | `u16` days since 1970-01-01                      | [`Value::Date`]        |
//! | `DateTime`              | `u32` seconds since epoch                        | [`Value::DateTime`]    |
//! | `DateTime64(p)`         | `i64` ticks of `10^-p` seconds since epoch       | [`Value::DateTime`]    |
//! | `UUID`                  | two `u64`, high half first                       | [`Value::Uuid`]        |
//! | `IPv4`, `IPv6`          | `u32`, 16 bytes in network order                 | [`Value::Ipv4`] ..     |
//! | `Enum8`, `Enum16`       | `i8`, `i16`                                      | [`Value::Enum8`] ..    |
//! | `Decimal(p, s)`         | `i32`, `i64` or `i128` by precision              | [`Value::Decimal`]     |
//! | `Nullable(T)`           | null map of `u8` per row, then column of `T`     | [`Value::Null`] or `T` |
//! | `Array(T)`              | varint element count per row, then all elements  | [`Value::Array`]       |
//! | `Tuple(T, ..)`          | whole column of each component in order          | [`Value::Tuple`]       |
use std::{
    fmt,
    net::{Ipv4Addr, Ipv6Addr},
};
use time::{Date, OffsetDateTime};

use crate::value::Value;

mod lexer;
mod decimal;
mod registry;
mod codec;
mod text;

pub use lexer::Lexer;
pub use decimal::{Decimal, MAX_PRECISION, ParseDecimalError};
pub use registry::TypeRegistry;
pub(crate) use text::format_datetime;

/// Julian day of 1970-01-01.
pub(crate) const UNIX_EPOCH_JULIAN_DAY: i32 = 2_440_588;

/// Maximum `DateTime64` precision.
pub const MAX_DATETIME64_PRECISION: u8 = 9;

/// Column data type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    FixedString(usize),
    Date,
    /// With optional timezone parameter.
    DateTime(Option<String>),
    /// Precision and optional timezone parameter.
    DateTime64(u8, Option<String>),
    Uuid,
    Ipv4,
    Ipv6,
    Enum8(EnumMap),
    Enum16(EnumMap),
    Decimal {
        precision: u8,
        scale: u8,
    },
    Nullable(Box<DataType>),
    Array(Box<DataType>),
    Tuple(Vec<DataType>),
}

impl DataType {
    /// Value written in place of a missing one, including the null slots of a `Nullable`.
    pub fn default_value(&self) -> Value {
        match self {
            DataType::Int8 => Value::Int8(0),
            DataType::Int16 => Value::Int16(0),
            DataType::Int32 => Value::Int32(0),
            DataType::Int64 => Value::Int64(0),
            DataType::UInt8 => Value::UInt8(0),
            DataType::UInt16 => Value::UInt16(0),
            DataType::UInt32 => Value::UInt32(0),
            DataType::UInt64 => Value::UInt64(0),
            DataType::Float32 => Value::Float32(0.0),
            DataType::Float64 => Value::Float64(0.0),
            DataType::String => Value::String(String::new()),
            DataType::FixedString(n) => Value::FixedString(vec![0; *n]),
            DataType::Date => Value::Date(unix_epoch_date()),
            DataType::DateTime(_) | DataType::DateTime64(..) => Value::DateTime(OffsetDateTime::UNIX_EPOCH),
            DataType::Uuid => Value::Uuid(uuid::Uuid::nil()),
            DataType::Ipv4 => Value::Ipv4(Ipv4Addr::UNSPECIFIED),
            DataType::Ipv6 => Value::Ipv6(Ipv6Addr::UNSPECIFIED),
            DataType::Enum8(map) => Value::Enum8(map.first_value() as i8),
            DataType::Enum16(map) => Value::Enum16(map.first_value()),
            DataType::Decimal { scale, .. } => Value::Decimal(Decimal::new(0, *scale)),
            DataType::Nullable(_) => Value::Null,
            DataType::Array(_) => Value::Array(Vec::new()),
            DataType::Tuple(types) => Value::Tuple(types.iter().map(DataType::default_value).collect()),
        }
    }

    /// Name of the [`Value`] variant this type decodes into.
    pub fn value_name(&self) -> &'static str {
        match self {
            DataType::Nullable(inner) => inner.value_name(),
            DataType::DateTime64(..) => "DateTime",
            _ => self.default_value().variant_name(),
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, DataType::Nullable(_))
    }

    /// Nested type of `Nullable` and `Array`.
    pub fn inner(&self) -> Option<&DataType> {
        match self {
            DataType::Nullable(inner) | DataType::Array(inner) => Some(inner),
            _ => None,
        }
    }

    pub(crate) fn mismatch(&self, value: &Value) -> TypeError {
        TypeError::Mismatch {
            ty: self.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn literal_error(&self, literal: impl Into<String>) -> TypeError {
        TypeError::Literal {
            ty: self.to_string(),
            literal: literal.into(),
        }
    }
}

pub(crate) fn unix_epoch_date() -> Date {
    OffsetDateTime::UNIX_EPOCH.date()
}

/// Canonical type name, as the server spells it.
impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int8 => f.write_str("Int8"),
            DataType::Int16 => f.write_str("Int16"),
            DataType::Int32 => f.write_str("Int32"),
            DataType::Int64 => f.write_str("Int64"),
            DataType::UInt8 => f.write_str("UInt8"),
            DataType::UInt16 => f.write_str("UInt16"),
            DataType::UInt32 => f.write_str("UInt32"),
            DataType::UInt64 => f.write_str("UInt64"),
            DataType::Float32 => f.write_str("Float32"),
            DataType::Float64 => f.write_str("Float64"),
            DataType::String => f.write_str("String"),
            DataType::FixedString(n) => write!(f, "FixedString({n})"),
            DataType::Date => f.write_str("Date"),
            DataType::DateTime(None) => f.write_str("DateTime"),
            DataType::DateTime(Some(tz)) => write!(f, "DateTime({})", Quoted(tz)),
            DataType::DateTime64(p, None) => write!(f, "DateTime64({p})"),
            DataType::DateTime64(p, Some(tz)) => write!(f, "DateTime64({p}, {})", Quoted(tz)),
            DataType::Uuid => f.write_str("UUID"),
            DataType::Ipv4 => f.write_str("IPv4"),
            DataType::Ipv6 => f.write_str("IPv6"),
            DataType::Enum8(map) => write!(f, "Enum8({map})"),
            DataType::Enum16(map) => write!(f, "Enum16({map})"),
            DataType::Decimal { precision, scale } => write!(f, "Decimal({precision}, {scale})"),
            DataType::Nullable(inner) => write!(f, "Nullable({inner})"),
            DataType::Array(inner) => write!(f, "Array({inner})"),
            DataType::Tuple(types) => {
                f.write_str("Tuple(")?;
                for (i, ty) in types.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str(")")
            },
        }
    }
}

struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("'")?;
        for c in self.0.chars() {
            match c {
                '\'' | '\\' => write!(f, "\\{c}")?,
                c => write!(f, "{c}")?,
            }
        }
        f.write_str("'")
    }
}

/// Bidirectional mapping between enum labels and values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumMap {
    entries: Vec<(String, i16)>,
}

impl EnumMap {
    /// Create mapping, fails on duplicate label or value.
    pub fn new(entries: Vec<(String, i16)>) -> Result<Self, String> {
        for (i, (label, value)) in entries.iter().enumerate() {
            if let Some((l, v)) = entries[..i].iter().find(|(l, v)| l == label || v == value) {
                return Err(format!("duplicate enum entry `{l}` = {v}"));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(String, i16)] {
        &self.entries
    }

    pub fn value(&self, label: &str) -> Option<i16> {
        self.entries.iter().find(|(l, _)| l == label).map(|(_, v)| *v)
    }

    pub fn label(&self, value: i16) -> Option<&str> {
        self.entries.iter().find(|(_, v)| *v == value).map(|(l, _)| l.as_str())
    }

    fn first_value(&self) -> i16 {
        self.entries.first().map_or(0, |(_, v)| *v)
    }
}

impl fmt::Display for EnumMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, value)) in self.entries.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {value}", Quoted(label))?;
        }
        Ok(())
    }
}

/// An error from resolving a type or converting a value for it.
pub enum TypeError {
    /// Type name not known by the registry.
    Unknown(String),
    /// Type name or literal does not follow the expected syntax.
    Malformed {
        input: String,
        pos: usize,
        reason: String,
    },
    /// Value cannot be represented by the column type.
    Mismatch {
        ty: String,
        value: String,
    },
    /// Text literal is well formed but invalid for the type.
    Literal {
        ty: String,
        literal: String,
    },
    /// Row or column holds the wrong number of values.
    Length {
        expect: usize,
        found: usize,
    },
}

impl std::error::Error for TypeError { }

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(name) => write!(f, "unknown type `{name}`"),
            Self::Malformed { input, pos, reason } => {
                write!(f, "malformed input `{input}` at {pos}: {reason}")
            },
            Self::Mismatch { ty, value } => write!(f, "value {value} cannot be stored as {ty}"),
            Self::Literal { ty, literal } => write!(f, "invalid {ty} literal `{literal}`"),
            Self::Length { expect, found } => write!(f, "expected {expect} values, found {found}"),
        }
    }
}

impl fmt::Debug for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
