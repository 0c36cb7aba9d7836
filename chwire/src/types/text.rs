use time::{
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};
use uuid::Uuid;

use super::{DataType, Lexer, TypeError};
use crate::value::Value;

const DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

const DATETIME: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

const DATETIME_SUBSECOND: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");

/// Format as `YYYY-MM-DD hh:mm:ss[.fraction]` in UTC.
pub(crate) fn format_datetime(datetime: OffsetDateTime) -> Result<String, time::error::Format> {
    let datetime = datetime.to_offset(UtcOffset::UTC);
    match datetime.nanosecond() {
        0 => datetime.format(DATETIME),
        _ => datetime.format(DATETIME_SUBSECOND),
    }
}

/// Parse `YYYY-MM-DD hh:mm:ss[.fraction]` or `YYYY-MM-DD`, as UTC.
fn parse_datetime(input: &str) -> Option<OffsetDateTime> {
    let format = match input.contains('.') {
        true => DATETIME_SUBSECOND,
        false => DATETIME,
    };
    if let Ok(datetime) = PrimitiveDateTime::parse(input, format) {
        return Some(datetime.assume_utc());
    }
    Date::parse(input, DATE).ok().map(|date| date.midnight().assume_utc())
}

impl DataType {
    /// Parse a whole text literal, such as `[1, NULL, 3]` or `'2024-01-05'`.
    pub fn parse_literal(&self, input: &str) -> Result<Value, TypeError> {
        let mut lexer = Lexer::new(input);
        let value = self.parse_text(&mut lexer)?;
        lexer.expect_eof()?;
        Ok(value)
    }

    /// Parse one text literal from `lexer`.
    ///
    /// Strings, dates, datetimes, UUIDs and IP addresses are single quoted. Enums
    /// take a quoted label or a number, datetimes also take a unix timestamp.
    pub fn parse_text(&self, lexer: &mut Lexer) -> Result<Value, TypeError> {
        match self {
            DataType::Nullable(inner) => match lexer.keyword("NULL") {
                true => Ok(Value::Null),
                false => inner.parse_text(lexer),
            },
            DataType::Array(inner) => {
                lexer.character('[')?;
                let mut items = Vec::new();
                if !lexer.is_character(']') {
                    loop {
                        items.push(inner.parse_text(lexer)?);
                        if lexer.is_character(']') {
                            break;
                        }
                        lexer.character(',')?;
                    }
                }
                Ok(Value::Array(items))
            },
            DataType::Tuple(types) => {
                lexer.character('(')?;
                let mut items = Vec::with_capacity(types.len());
                for (i, ty) in types.iter().enumerate() {
                    if i != 0 {
                        lexer.character(',')?;
                    }
                    items.push(ty.parse_text(lexer)?);
                }
                lexer.character(')')?;
                Ok(Value::Tuple(items))
            },
            DataType::Float32 | DataType::Float64 => {
                let literal = if lexer.keyword("nan") {
                    "NaN"
                } else if lexer.keyword("inf") {
                    "inf"
                } else {
                    lexer.number_literal()?
                };
                self.parse_bare(literal)
            },
            DataType::Enum8(_) | DataType::Enum16(_) | DataType::DateTime(_) | DataType::DateTime64(..)
                if lexer.peek() != Some('\'') =>
            {
                self.parse_bare(lexer.number_literal()?)
            },
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Decimal { .. } => self.parse_bare(lexer.number_literal()?),
            _ => self.parse_bare(&lexer.string_literal()?),
        }
    }

    /// Parse unquoted literal content, checked against this type.
    pub(crate) fn parse_bare(&self, input: &str) -> Result<Value, TypeError> {
        let err = || self.literal_error(input);
        let value = match self {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => {
                let int: i128 = input.parse().map_err(|_| err())?;
                match i64::try_from(int) {
                    Ok(v) => Value::Int64(v),
                    Err(_) => Value::UInt64(u64::try_from(int).map_err(|_| err())?),
                }
            },
            DataType::Float32 | DataType::Float64 => Value::Float64(input.parse().map_err(|_| err())?),
            DataType::String | DataType::FixedString(_) => Value::String(input.to_owned()),
            DataType::Date => Value::Date(Date::parse(input, DATE).map_err(|_| err())?),
            DataType::DateTime(_) | DataType::DateTime64(..) => match input.parse::<i64>() {
                Ok(secs) => Value::DateTime(OffsetDateTime::from_unix_timestamp(secs).map_err(|_| err())?),
                Err(_) => Value::DateTime(parse_datetime(input).ok_or_else(err)?),
            },
            DataType::Uuid => Value::Uuid(Uuid::parse_str(input).map_err(|_| err())?),
            DataType::Ipv4 => Value::Ipv4(input.parse().map_err(|_| err())?),
            DataType::Ipv6 => Value::Ipv6(input.parse().map_err(|_| err())?),
            DataType::Enum8(map) | DataType::Enum16(map) => {
                let value = map.value(input).or_else(|| input.parse().ok());
                Value::Int16(value.ok_or_else(err)?)
            },
            DataType::Decimal { .. } => Value::Decimal(input.parse().map_err(|_| err())?),
            DataType::Nullable(_) | DataType::Array(_) | DataType::Tuple(_) => {
                return self.parse_literal(input);
            },
        };
        self.coerce(value).map_err(|_| err())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{Decimal, EnumMap};
    use time::macros::{date, datetime};

    #[test]
    fn scalars() {
        assert_eq!(DataType::Int8.parse_literal("-12").unwrap(), Value::Int8(-12));
        assert!(matches!(DataType::Int8.parse_literal("300"), Err(TypeError::Literal { .. })));
        assert_eq!(
            DataType::UInt64.parse_literal("18446744073709551615").unwrap(),
            Value::UInt64(u64::MAX)
        );
        assert_eq!(DataType::Float32.parse_literal("1.5e1").unwrap(), Value::Float32(15.0));
        assert_eq!(
            DataType::String.parse_literal(r"'it\'s'").unwrap(),
            Value::String("it's".into())
        );
        assert_eq!(
            DataType::Decimal { precision: 9, scale: 3 }.parse_literal("-1.5").unwrap(),
            Value::Decimal(Decimal::new(-1500, 3))
        );
        assert_eq!(
            DataType::Ipv4.parse_literal("'10.0.0.1'").unwrap(),
            Value::Ipv4("10.0.0.1".parse().unwrap())
        );
        assert!(DataType::String.parse_literal("'a' 'b'").is_err());
    }

    #[test]
    fn temporal() {
        assert_eq!(
            DataType::Date.parse_literal("'2024-01-05'").unwrap(),
            Value::Date(date!(2024 - 01 - 05))
        );
        assert_eq!(
            DataType::DateTime(None).parse_literal("'2024-01-05 10:20:30'").unwrap(),
            Value::DateTime(datetime!(2024-01-05 10:20:30 UTC))
        );
        assert_eq!(
            DataType::DateTime64(3, None).parse_literal("'2024-01-05 10:20:30.125'").unwrap(),
            Value::DateTime(datetime!(2024-01-05 10:20:30.125 UTC))
        );
        assert_eq!(
            DataType::DateTime(None).parse_literal("0").unwrap(),
            Value::DateTime(OffsetDateTime::UNIX_EPOCH)
        );
        assert_eq!(format_datetime(datetime!(2024-01-05 10:20:30 UTC)).unwrap(), "2024-01-05 10:20:30");
        assert_eq!(format_datetime(datetime!(2024-01-05 10:20:30.125 UTC)).unwrap(), "2024-01-05 10:20:30.125");
    }

    #[test]
    fn enums() {
        let ty = DataType::Enum16(EnumMap::new(vec![("on".into(), 1), ("off".into(), 0)]).unwrap());
        assert_eq!(ty.parse_literal("'off'").unwrap(), Value::Enum16(0));
        assert_eq!(ty.parse_literal("1").unwrap(), Value::Enum16(1));
        assert!(ty.parse_literal("'dim'").is_err());
    }

    #[test]
    fn composites() {
        let ty = DataType::Array(Box::new(DataType::Nullable(Box::new(DataType::Int32))));
        assert_eq!(
            ty.parse_literal("[1, NULL, 3]").unwrap(),
            Value::Array(vec![Value::Int32(1), Value::Null, Value::Int32(3)])
        );
        assert_eq!(ty.parse_literal("[]").unwrap(), Value::Array(vec![]));
        assert!(ty.parse_literal("[1,").is_err());

        let ty = DataType::Tuple(vec![DataType::String, DataType::Array(Box::new(DataType::UInt8))]);
        assert_eq!(
            ty.parse_literal("('a', [1, 2])").unwrap(),
            Value::Tuple(vec![
                Value::String("a".into()),
                Value::Array(vec![Value::UInt8(1), Value::UInt8(2)]),
            ])
        );
    }

    #[test]
    fn display_parses_back() {
        let ty = DataType::Tuple(vec![
            DataType::Nullable(Box::new(DataType::String)),
            DataType::DateTime64(6, None),
            DataType::Uuid,
        ]);
        let value = Value::Tuple(vec![
            Value::String("x'y\\z".into()),
            Value::DateTime(datetime!(2001-02-03 04:05:06.000789 UTC)),
            Value::Uuid(Uuid::from_u64_pair(3, 4)),
        ]);
        assert_eq!(ty.parse_literal(&value.to_string()).unwrap(), value);
    }
}
