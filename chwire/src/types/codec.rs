use std::net::{Ipv4Addr, Ipv6Addr};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::{DataType, Decimal, MAX_DATETIME64_PRECISION, TypeError, UNIX_EPOCH_JULIAN_DAY, decimal::pow10};
use crate::{
    binary::{DecodeError, Deserializer, Serializer},
    value::Value,
};

/// Upper bound of capacity reserved from a length read off the wire.
const PREALLOC_LIMIT: usize = 64 * 1024;

impl DataType {
    /// Write a single value.
    ///
    /// `Nullable` is prefixed by a null flag byte, `Array` by its varint length.
    pub fn serialize(&self, value: &Value, ser: &mut Serializer) -> Result<(), TypeError> {
        match self {
            DataType::Nullable(inner) => {
                ser.write_u8(value.is_null() as u8);
                match value.is_null() {
                    true => Ok(()),
                    false => inner.serialize(value, ser),
                }
            },
            DataType::Array(inner) => {
                let Value::Array(items) = value else {
                    return Err(self.mismatch(value));
                };
                ser.write_var_uint(items.len() as u64);
                items.iter().try_for_each(|item| inner.serialize(item, ser))
            },
            DataType::Tuple(types) => {
                let items = self.tuple_items(value)?;
                types.iter().zip(items).try_for_each(|(ty, item)| ty.serialize(item, ser))
            },
            _ => self.write_scalar(value, ser, false),
        }
    }

    /// Read a single value written by [`serialize`][DataType::serialize].
    pub fn deserialize(&self, de: &mut Deserializer) -> Result<Value, DecodeError> {
        match self {
            DataType::Nullable(inner) => match de.read_u8()? {
                0 => inner.deserialize(de),
                _ => Ok(Value::Null),
            },
            DataType::Array(inner) => {
                let len = read_len(de)?;
                let mut items = Vec::with_capacity(len.min(PREALLOC_LIMIT));
                for _ in 0..len {
                    items.push(inner.deserialize(de)?);
                }
                Ok(Value::Array(items))
            },
            DataType::Tuple(types) => types
                .iter()
                .map(|ty| ty.deserialize(de))
                .collect::<Result<_, _>>()
                .map(Value::Tuple),
            _ => self.read_scalar(de),
        }
    }

    /// Write a whole column, values back to back in row order.
    pub fn serialize_bulk(&self, values: &[Value], ser: &mut Serializer) -> Result<(), TypeError> {
        let values: Vec<&Value> = values.iter().collect();
        self.write_column(&values, ser)
    }

    /// Read a whole column of `rows` values.
    pub fn deserialize_bulk(&self, rows: usize, de: &mut Deserializer) -> Result<Vec<Value>, DecodeError> {
        match self {
            DataType::Nullable(inner) => {
                let mut nulls = Vec::with_capacity(rows.min(PREALLOC_LIMIT));
                for _ in 0..rows {
                    nulls.push(de.read_u8()? != 0);
                }
                let nested = inner.deserialize_bulk(rows, de)?;
                Ok(nested
                    .into_iter()
                    .zip(nulls)
                    .map(|(value, null)| if null { Value::Null } else { value })
                    .collect())
            },
            DataType::Array(inner) => {
                let mut counts = Vec::with_capacity(rows.min(PREALLOC_LIMIT));
                let mut total = 0usize;
                for _ in 0..rows {
                    let len = read_len(de)?;
                    total = total
                        .checked_add(len)
                        .ok_or_else(|| DecodeError::invalid("array length overflow"))?;
                    counts.push(len);
                }
                let mut flat = inner.deserialize_bulk(total, de)?.into_iter();
                Ok(counts
                    .into_iter()
                    .map(|len| Value::Array(flat.by_ref().take(len).collect()))
                    .collect())
            },
            DataType::Tuple(types) => {
                let mut columns = types
                    .iter()
                    .map(|ty| ty.deserialize_bulk(rows, de).map(Vec::into_iter))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((0..rows)
                    .map(|_| Value::Tuple(columns.iter_mut().filter_map(Iterator::next).collect()))
                    .collect())
            },
            _ => {
                let mut values = Vec::with_capacity(rows.min(PREALLOC_LIMIT));
                for _ in 0..rows {
                    values.push(self.read_scalar(de)?);
                }
                Ok(values)
            },
        }
    }

    /// Convert a value into the variant this type stores, checking it fits.
    ///
    /// Integers convert between widths when in range, enums accept their labels,
    /// decimals accept integers and floats, and textual types accept strings.
    pub fn coerce(&self, value: Value) -> Result<Value, TypeError> {
        match (self, value) {
            (DataType::Nullable(_), Value::Null) => Ok(Value::Null),
            (DataType::Nullable(inner), value) => inner.coerce(value),
            (DataType::Array(inner), Value::Array(items)) => items
                .into_iter()
                .map(|item| inner.coerce(item))
                .collect::<Result<_, _>>()
                .map(Value::Array),
            (DataType::Tuple(types), Value::Tuple(items)) if items.len() == types.len() => types
                .iter()
                .zip(items)
                .map(|(ty, item)| ty.coerce(item))
                .collect::<Result<_, _>>()
                .map(Value::Tuple),
            (_, value) => match self.coerce_scalar(&value) {
                Some(coerced) => Ok(coerced),
                None => Err(self.mismatch(&value)),
            },
        }
    }

    fn tuple_items<'v>(&self, value: &'v Value) -> Result<&'v [Value], TypeError> {
        match (self, value) {
            (DataType::Tuple(types), Value::Tuple(items)) if items.len() == types.len() => Ok(items),
            _ => Err(self.mismatch(value)),
        }
    }

    fn write_column(&self, values: &[&Value], ser: &mut Serializer) -> Result<(), TypeError> {
        match self {
            DataType::Nullable(inner) => {
                for value in values {
                    ser.write_u8(value.is_null() as u8);
                }
                let default = inner.default_value();
                let nested: Vec<&Value> = values
                    .iter()
                    .map(|&value| if value.is_null() { &default } else { value })
                    .collect();
                inner.write_column(&nested, ser)
            },
            DataType::Array(inner) => {
                let mut flat = Vec::new();
                for &value in values {
                    let Value::Array(items) = value else {
                        return Err(self.mismatch(value));
                    };
                    ser.write_var_uint(items.len() as u64);
                    flat.extend(items);
                }
                inner.write_column(&flat, ser)
            },
            DataType::Tuple(types) => {
                let rows = values
                    .iter()
                    .map(|value| self.tuple_items(value))
                    .collect::<Result<Vec<_>, _>>()?;
                for (i, ty) in types.iter().enumerate() {
                    let column: Vec<&Value> = rows.iter().map(|items| &items[i]).collect();
                    ty.write_column(&column, ser)?;
                }
                Ok(())
            },
            _ => values.iter().try_for_each(|value| self.write_scalar(value, ser, false)),
        }
    }

    fn write_scalar(&self, value: &Value, ser: &mut Serializer, coerced: bool) -> Result<(), TypeError> {
        let out_of_range = || self.mismatch(value);
        match (self, value) {
            (DataType::Int8, Value::Int8(v)) => ser.write_i8(*v),
            (DataType::Int16, Value::Int16(v)) => ser.write_i16(*v),
            (DataType::Int32, Value::Int32(v)) => ser.write_i32(*v),
            (DataType::Int64, Value::Int64(v)) => ser.write_i64(*v),
            (DataType::UInt8, Value::UInt8(v)) => ser.write_u8(*v),
            (DataType::UInt16, Value::UInt16(v)) => ser.write_u16(*v),
            (DataType::UInt32, Value::UInt32(v)) => ser.write_u32(*v),
            (DataType::UInt64, Value::UInt64(v)) => ser.write_u64(*v),
            (DataType::Float32, Value::Float32(v)) => ser.write_f32(*v),
            (DataType::Float64, Value::Float64(v)) => ser.write_f64(*v),
            (DataType::String, Value::String(v)) => ser.write_string(v),
            (DataType::FixedString(n), Value::FixedString(v)) if v.len() == *n => ser.write_bytes(v),
            (DataType::Date, Value::Date(v)) => ser.write_u16(date_days(*v).ok_or_else(out_of_range)?),
            (DataType::DateTime(_), Value::DateTime(v)) => {
                ser.write_u32(datetime_secs(*v).ok_or_else(out_of_range)?)
            },
            (DataType::DateTime64(precision, _), Value::DateTime(v)) => {
                ser.write_i64(datetime_ticks(*v, *precision).ok_or_else(out_of_range)?)
            },
            (DataType::Uuid, Value::Uuid(v)) => {
                let (high, low) = v.as_u64_pair();
                ser.write_u64(high);
                ser.write_u64(low);
            },
            (DataType::Ipv4, Value::Ipv4(v)) => ser.write_u32(u32::from(*v)),
            (DataType::Ipv6, Value::Ipv6(v)) => ser.write_bytes(&v.octets()),
            (DataType::Enum8(map), Value::Enum8(v)) if map.label((*v).into()).is_some() => ser.write_i8(*v),
            (DataType::Enum16(map), Value::Enum16(v)) if map.label(*v).is_some() => ser.write_i16(*v),
            (DataType::Decimal { precision, scale }, Value::Decimal(v)) => {
                let mantissa = decimal_mantissa(*v, *precision, *scale).ok_or_else(out_of_range)?;
                // digits are bounded by precision, so the narrowing casts are lossless
                match decimal_width(*precision) {
                    4 => ser.write_i32(mantissa as i32),
                    8 => ser.write_i64(mantissa as i64),
                    _ => ser.write_i128(mantissa),
                }
            },
            _ if !coerced => return self.write_scalar(&self.coerce(value.clone())?, ser, true),
            _ => return Err(self.mismatch(value)),
        }
        Ok(())
    }

    fn read_scalar(&self, de: &mut Deserializer) -> Result<Value, DecodeError> {
        let value = match self {
            DataType::Int8 => Value::Int8(de.read_i8()?),
            DataType::Int16 => Value::Int16(de.read_i16()?),
            DataType::Int32 => Value::Int32(de.read_i32()?),
            DataType::Int64 => Value::Int64(de.read_i64()?),
            DataType::UInt8 => Value::UInt8(de.read_u8()?),
            DataType::UInt16 => Value::UInt16(de.read_u16()?),
            DataType::UInt32 => Value::UInt32(de.read_u32()?),
            DataType::UInt64 => Value::UInt64(de.read_u64()?),
            DataType::Float32 => Value::Float32(de.read_f32()?),
            DataType::Float64 => Value::Float64(de.read_f64()?),
            DataType::String => Value::String(de.read_string()?),
            DataType::FixedString(n) => Value::FixedString(de.read_exact(*n)?),
            DataType::Date => {
                let days = de.read_u16()?;
                Value::Date(Date::from_julian_day(UNIX_EPOCH_JULIAN_DAY + i32::from(days)).map_err(out_of_range)?)
            },
            DataType::DateTime(_) => {
                let secs = de.read_u32()?;
                Value::DateTime(OffsetDateTime::from_unix_timestamp(secs.into()).map_err(out_of_range)?)
            },
            DataType::DateTime64(precision, _) => {
                let ticks = de.read_i64()?;
                let nanos = i128::from(ticks) * tick_nanos(*precision);
                Value::DateTime(OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(out_of_range)?)
            },
            DataType::Uuid => {
                let high = de.read_u64()?;
                let low = de.read_u64()?;
                Value::Uuid(Uuid::from_u64_pair(high, low))
            },
            DataType::Ipv4 => Value::Ipv4(Ipv4Addr::from(de.read_u32()?)),
            DataType::Ipv6 => {
                let mut octets = [0u8; 16];
                de.read_into(&mut octets)?;
                Value::Ipv6(Ipv6Addr::from(octets))
            },
            DataType::Enum8(_) => Value::Enum8(de.read_i8()?),
            DataType::Enum16(_) => Value::Enum16(de.read_i16()?),
            DataType::Decimal { precision, scale } => {
                let mantissa = match decimal_width(*precision) {
                    4 => de.read_i32()?.into(),
                    8 => de.read_i64()?.into(),
                    _ => de.read_i128()?,
                };
                Value::Decimal(Decimal::new(mantissa, *scale))
            },
            DataType::Nullable(_) | DataType::Array(_) | DataType::Tuple(_) => return self.deserialize(de),
        };
        Ok(value)
    }

    fn coerce_scalar(&self, value: &Value) -> Option<Value> {
        let int = || value.as_i128();
        let float = || match value {
            Value::Decimal(d) => Some(d.to_f64()),
            v => v.as_f64(),
        };

        let coerced = match self {
            DataType::Int8 => Value::Int8(int()?.try_into().ok()?),
            DataType::Int16 => Value::Int16(int()?.try_into().ok()?),
            DataType::Int32 => Value::Int32(int()?.try_into().ok()?),
            DataType::Int64 => Value::Int64(int()?.try_into().ok()?),
            DataType::UInt8 => Value::UInt8(int()?.try_into().ok()?),
            DataType::UInt16 => Value::UInt16(int()?.try_into().ok()?),
            DataType::UInt32 => Value::UInt32(int()?.try_into().ok()?),
            DataType::UInt64 => Value::UInt64(int()?.try_into().ok()?),
            DataType::Float32 => Value::Float32(float()? as f32),
            DataType::Float64 => Value::Float64(float()?),
            DataType::String => match value {
                Value::String(s) => Value::String(s.clone()),
                Value::FixedString(b) => Value::String(String::from_utf8(b.clone()).ok()?),
                _ => return None,
            },
            DataType::FixedString(n) => {
                let bytes = match value {
                    Value::String(s) => s.as_bytes(),
                    Value::FixedString(b) => b.as_slice(),
                    _ => return None,
                };
                if bytes.len() > *n {
                    return None;
                }
                let mut bytes = bytes.to_vec();
                bytes.resize(*n, 0);
                Value::FixedString(bytes)
            },
            DataType::Date => match value {
                Value::Date(d) => Value::Date(*d),
                Value::DateTime(dt) => Value::Date(dt.date()),
                Value::String(s) => self.parse_bare(s).ok()?,
                _ => return None,
            },
            DataType::DateTime(_) | DataType::DateTime64(..) => match value {
                Value::DateTime(dt) => Value::DateTime(*dt),
                Value::Date(d) => Value::DateTime(d.midnight().assume_utc()),
                Value::String(s) => self.parse_bare(s).ok()?,
                v => Value::DateTime(OffsetDateTime::from_unix_timestamp(v.as_i128()?.try_into().ok()?).ok()?),
            },
            DataType::Uuid => match value {
                Value::Uuid(u) => Value::Uuid(*u),
                Value::String(s) => self.parse_bare(s).ok()?,
                _ => return None,
            },
            DataType::Ipv4 => match value {
                Value::Ipv4(a) => Value::Ipv4(*a),
                Value::UInt32(v) => Value::Ipv4(Ipv4Addr::from(*v)),
                Value::String(s) => self.parse_bare(s).ok()?,
                _ => return None,
            },
            DataType::Ipv6 => match value {
                Value::Ipv6(a) => Value::Ipv6(*a),
                Value::Ipv4(a) => Value::Ipv6(a.to_ipv6_mapped()),
                Value::String(s) => self.parse_bare(s).ok()?,
                _ => return None,
            },
            DataType::Enum8(map) => {
                let v = match value {
                    Value::String(label) => map.value(label)?,
                    _ => int()?.try_into().ok()?,
                };
                map.label(v)?;
                Value::Enum8(v.try_into().ok()?)
            },
            DataType::Enum16(map) => {
                let v = match value {
                    Value::String(label) => map.value(label)?,
                    _ => int()?.try_into().ok()?,
                };
                map.label(v)?;
                Value::Enum16(v)
            },
            DataType::Decimal { precision, scale } => {
                let d = match value {
                    Value::Decimal(d) => *d,
                    Value::String(s) => s.parse().ok()?,
                    Value::Float32(_) | Value::Float64(_) => Decimal::from_f64(float()?, *scale)?,
                    _ => Decimal::new(int()?, 0),
                };
                Value::Decimal(Decimal::new(decimal_mantissa(d, *precision, *scale)?, *scale))
            },
            DataType::Nullable(_) | DataType::Array(_) | DataType::Tuple(_) => return None,
        };

        let in_range = match (self, &coerced) {
            (DataType::Date, Value::Date(d)) => date_days(*d).is_some(),
            (DataType::DateTime(_), Value::DateTime(dt)) => datetime_secs(*dt).is_some(),
            (DataType::DateTime64(p, _), Value::DateTime(dt)) => datetime_ticks(*dt, *p).is_some(),
            _ => true,
        };
        in_range.then_some(coerced)
    }
}

fn read_len(de: &mut Deserializer) -> Result<usize, DecodeError> {
    usize::try_from(de.read_var_uint()?).map_err(|_| DecodeError::invalid("length overflow"))
}

fn out_of_range(err: time::error::ComponentRange) -> DecodeError {
    DecodeError::invalid(err.to_string())
}

/// Size in bytes of the integer holding a decimal of `precision` digits.
pub(crate) fn decimal_width(precision: u8) -> usize {
    match precision {
        ..=9 => 4,
        ..=18 => 8,
        _ => 16,
    }
}

fn decimal_mantissa(value: Decimal, precision: u8, scale: u8) -> Option<i128> {
    let value = value.rescale(scale)?;
    (value.digits() <= precision).then_some(value.mantissa())
}

fn date_days(date: Date) -> Option<u16> {
    u16::try_from(date.to_julian_day() - UNIX_EPOCH_JULIAN_DAY).ok()
}

fn datetime_secs(datetime: OffsetDateTime) -> Option<u32> {
    u32::try_from(datetime.unix_timestamp()).ok()
}

fn tick_nanos(precision: u8) -> i128 {
    pow10(MAX_DATETIME64_PRECISION.saturating_sub(precision)).unwrap_or(1)
}

fn datetime_ticks(datetime: OffsetDateTime, precision: u8) -> Option<i64> {
    i64::try_from(datetime.unix_timestamp_nanos().div_euclid(tick_nanos(precision))).ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::EnumMap;
    use time::macros::datetime;

    fn encode(ty: &DataType, values: &[Value]) -> Vec<u8> {
        let mut ser = Serializer::new(None);
        ty.serialize_bulk(values, &mut ser).unwrap();
        ser.output().to_vec()
    }

    fn decode(ty: &DataType, rows: usize, raw: &[u8]) -> Vec<Value> {
        let mut de = Deserializer::new(raw, false);
        let values = ty.deserialize_bulk(rows, &mut de).unwrap();
        assert_eq!(de.consumed(), raw.len());
        values
    }

    fn i32_bytes(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn scalar_round_trip() {
        let cases = [
            (DataType::Int32, Value::Int32(-123_456)),
            (DataType::Float64, Value::Float64(1.5)),
            (DataType::UInt64, Value::UInt64(u64::MAX)),
            (DataType::String, Value::String("héllo".into())),
            (DataType::Date, Value::Date(time::macros::date!(2024 - 02 - 29))),
            (DataType::DateTime(None), Value::DateTime(datetime!(2021-03-04 05:06:07 UTC))),
            (DataType::DateTime64(3, None), Value::DateTime(datetime!(1969-12-31 23:59:59.250 UTC))),
            (DataType::Ipv6, Value::Ipv6("2001:db8::1".parse().unwrap())),
            (DataType::Decimal { precision: 20, scale: 4 }, Value::Decimal(Decimal::new(-123_456_789, 4))),
        ];
        for (ty, value) in cases {
            let mut ser = Serializer::new(None);
            ty.serialize(&value, &mut ser).unwrap();
            let raw = ser.output().to_vec();
            let mut de = Deserializer::new(&raw, false);
            assert_eq!(ty.deserialize(&mut de).unwrap(), value, "{ty}");
            assert_eq!(de.consumed(), raw.len(), "{ty}");
        }
    }

    #[test]
    fn nullable_column() {
        let ty = DataType::Nullable(Box::new(DataType::Int32));
        let values = [
            Value::Int32(1),
            Value::Null,
            Value::Int32(3),
            Value::Null,
            Value::Int32(5),
        ];
        let raw = encode(&ty, &values);
        assert_eq!(&raw[..5], &[0, 1, 0, 1, 0]);
        assert_eq!(&raw[5..], &i32_bytes(&[1, 0, 3, 0, 5])[..]);
        assert_eq!(decode(&ty, 5, &raw), values);
    }

    #[test]
    fn array_column() {
        let ty = DataType::Array(Box::new(DataType::Int32));
        let values = [
            Value::Array(vec![Value::Int32(1), Value::Int32(2)]),
            Value::Array(vec![Value::Int32(3)]),
            Value::Array(vec![]),
        ];
        let raw = encode(&ty, &values);
        assert_eq!(&raw[..3], &[2, 1, 0]);
        assert_eq!(&raw[3..], &i32_bytes(&[1, 2, 3])[..]);
        assert_eq!(decode(&ty, 3, &raw), values);
    }

    #[test]
    fn tuple_column_is_not_interleaved() {
        let ty = DataType::Tuple(vec![DataType::UInt8, DataType::String]);
        let values = [
            Value::Tuple(vec![Value::UInt8(1), Value::String("a".into())]),
            Value::Tuple(vec![Value::UInt8(2), Value::String("bc".into())]),
        ];
        let raw = encode(&ty, &values);
        assert_eq!(raw, [1, 2, 1, b'a', 2, b'b', b'c']);
        assert_eq!(decode(&ty, 2, &raw), values);
    }

    #[test]
    fn uuid_high_half_first() {
        let uuid = Uuid::from_u64_pair(1, 2);
        let raw = encode(&DataType::Uuid, &[Value::Uuid(uuid)]);
        assert_eq!(&raw[..8], &1u64.to_le_bytes());
        assert_eq!(&raw[8..], &2u64.to_le_bytes());
    }

    #[test]
    fn decimal_width_by_precision() {
        let value = [Value::Decimal(Decimal::new(12345, 2))];
        assert_eq!(encode(&DataType::Decimal { precision: 9, scale: 2 }, &value).len(), 4);
        assert_eq!(encode(&DataType::Decimal { precision: 18, scale: 2 }, &value).len(), 8);
        assert_eq!(encode(&DataType::Decimal { precision: 38, scale: 2 }, &value).len(), 16);

        let mut ser = Serializer::new(None);
        let narrow = DataType::Decimal { precision: 4, scale: 2 };
        assert!(matches!(narrow.serialize(&value[0], &mut ser), Err(TypeError::Mismatch { .. })));
    }

    #[test]
    fn coercion() {
        let enum8 = DataType::Enum8(EnumMap::new(vec![("a".into(), 1), ("b".into(), 2)]).unwrap());
        assert_eq!(enum8.coerce(Value::String("b".into())).unwrap(), Value::Enum8(2));
        assert!(enum8.coerce(Value::Int32(3)).is_err());

        assert_eq!(DataType::UInt8.coerce(Value::Int64(200)).unwrap(), Value::UInt8(200));
        assert!(DataType::UInt8.coerce(Value::Int64(-1)).is_err());
        assert!(DataType::Int32.coerce(Value::Null).is_err());

        assert_eq!(
            DataType::FixedString(4).coerce(Value::String("ab".into())).unwrap(),
            Value::FixedString(vec![b'a', b'b', 0, 0])
        );
        assert!(DataType::FixedString(1).coerce(Value::String("ab".into())).is_err());

        assert_eq!(
            DataType::Decimal { precision: 10, scale: 2 }.coerce(Value::Int32(3)).unwrap(),
            Value::Decimal(Decimal::new(300, 2))
        );
        assert_eq!(
            DataType::Uuid.coerce(Value::String("00000000-0000-0001-0000-000000000002".into())).unwrap(),
            Value::Uuid(Uuid::from_u64_pair(1, 2))
        );
        assert!(DataType::Date.coerce(Value::Date(time::macros::date!(1969 - 12 - 31))).is_err());
    }

    #[test]
    fn serialize_coerces_compatible_values() {
        let raw = encode(&DataType::Int64, &[Value::Int8(-1), Value::UInt32(7)]);
        assert_eq!(&raw[..8], &(-1i64).to_le_bytes());
        assert_eq!(&raw[8..], &7i64.to_le_bytes());

        let mut ser = Serializer::new(None);
        assert!(DataType::Int32.serialize(&Value::String("x".into()), &mut ser).is_err());
    }

    #[test]
    fn truncated_column_is_incomplete() {
        let raw = encode(&DataType::Int64, &[Value::Int64(1), Value::Int64(2)]);
        let mut de = Deserializer::new(&raw[..12], false);
        assert!(matches!(
            DataType::Int64.deserialize_bulk(2, &mut de),
            Err(DecodeError::Incomplete { expect: 16 })
        ));
    }
}
