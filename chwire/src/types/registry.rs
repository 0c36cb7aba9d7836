use std::collections::HashMap;

use super::{DataType, EnumMap, Lexer, MAX_DATETIME64_PRECISION, MAX_PRECISION, TypeError};

/// Resolve type names into [`DataType`].
///
/// Parameterless types are looked up in a table built once on construction,
/// parameterized ones are parsed recursively.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    scalars: HashMap<&'static str, DataType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let scalars = [
            DataType::Int8,
            DataType::Int16,
            DataType::Int32,
            DataType::Int64,
            DataType::UInt8,
            DataType::UInt16,
            DataType::UInt32,
            DataType::UInt64,
            DataType::Float32,
            DataType::Float64,
            DataType::String,
            DataType::Uuid,
            DataType::Ipv4,
            DataType::Ipv6,
        ];
        let scalars = scalars
            .into_iter()
            .map(|ty| (scalar_name(&ty), ty))
            .collect();
        Self { scalars }
    }

    /// Resolve a complete type name, such as `Nullable(Array(String))`.
    pub fn get(&self, name: &str) -> Result<DataType, TypeError> {
        let mut lexer = Lexer::new(name);
        let ty = self.resolve(&mut lexer)?;
        lexer.expect_eof()?;
        Ok(ty)
    }

    /// Resolve one type from `lexer`, leaving any trailing input.
    pub fn resolve(&self, lexer: &mut Lexer) -> Result<DataType, TypeError> {
        let name = lexer.bare_word()?;
        match name {
            "Date" => Ok(DataType::Date),
            "DateTime" => self.datetime(lexer),
            "DateTime64" => self.datetime64(lexer),
            "Nullable" => self.nullable(lexer),
            "Array" => {
                lexer.character('(')?;
                let inner = self.resolve(lexer)?;
                lexer.character(')')?;
                Ok(DataType::Array(Box::new(inner)))
            },
            "Tuple" => self.tuple(lexer),
            "Enum8" => Ok(DataType::Enum8(self.enum_map(lexer, i8::MIN.into(), i8::MAX.into())?)),
            "Enum16" => Ok(DataType::Enum16(self.enum_map(lexer, i16::MIN, i16::MAX)?)),
            "FixedString" => {
                lexer.character('(')?;
                let n = number(lexer)?;
                lexer.character(')')?;
                if n == 0 {
                    return Err(lexer.error("FixedString length must be positive"));
                }
                Ok(DataType::FixedString(n))
            },
            "Decimal" => {
                lexer.character('(')?;
                let precision = number(lexer)?;
                lexer.character(',')?;
                let scale = number(lexer)?;
                lexer.character(')')?;
                decimal(lexer, precision, scale)
            },
            "Decimal32" | "Decimal64" | "Decimal128" => {
                let precision = match name {
                    "Decimal32" => 9,
                    "Decimal64" => 18,
                    _ => MAX_PRECISION,
                };
                lexer.character('(')?;
                let scale = number(lexer)?;
                lexer.character(')')?;
                decimal(lexer, precision, scale)
            },
            _ => self.scalars.get(name).cloned().ok_or_else(|| TypeError::Unknown(name.to_owned())),
        }
    }

    fn datetime(&self, lexer: &mut Lexer) -> Result<DataType, TypeError> {
        if !lexer.is_character('(') {
            return Ok(DataType::DateTime(None));
        }
        let tz = lexer.string_literal()?;
        lexer.character(')')?;
        Ok(DataType::DateTime(Some(tz)))
    }

    fn datetime64(&self, lexer: &mut Lexer) -> Result<DataType, TypeError> {
        lexer.character('(')?;
        let precision = number(lexer)?;
        if precision > MAX_DATETIME64_PRECISION {
            return Err(lexer.error(format!("DateTime64 precision must be at most {MAX_DATETIME64_PRECISION}")));
        }
        let tz = match lexer.is_character(',') {
            true => Some(lexer.string_literal()?),
            false => None,
        };
        lexer.character(')')?;
        Ok(DataType::DateTime64(precision, tz))
    }

    fn nullable(&self, lexer: &mut Lexer) -> Result<DataType, TypeError> {
        lexer.character('(')?;
        let inner = self.resolve(lexer)?;
        if inner.is_nullable() {
            return Err(lexer.error("Nullable cannot be nested"));
        }
        lexer.character(')')?;
        Ok(DataType::Nullable(Box::new(inner)))
    }

    fn tuple(&self, lexer: &mut Lexer) -> Result<DataType, TypeError> {
        lexer.character('(')?;
        let mut types = vec![self.resolve(lexer)?];
        while lexer.is_character(',') {
            types.push(self.resolve(lexer)?);
        }
        lexer.character(')')?;
        Ok(DataType::Tuple(types))
    }

    fn enum_map(&self, lexer: &mut Lexer, min: i16, max: i16) -> Result<EnumMap, TypeError> {
        lexer.character('(')?;
        let mut entries = Vec::new();
        loop {
            let label = lexer.string_literal()?;
            lexer.character('=')?;
            let value: i16 = number(lexer)?;
            if !(min..=max).contains(&value) {
                return Err(lexer.error(format!("enum value {value} out of range")));
            }
            entries.push((label, value));
            if !lexer.is_character(',') {
                break;
            }
        }
        lexer.character(')')?;
        EnumMap::new(entries).map_err(|reason| lexer.error(reason))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn scalar_name(ty: &DataType) -> &'static str {
    match ty {
        DataType::Int8 => "Int8",
        DataType::Int16 => "Int16",
        DataType::Int32 => "Int32",
        DataType::Int64 => "Int64",
        DataType::UInt8 => "UInt8",
        DataType::UInt16 => "UInt16",
        DataType::UInt32 => "UInt32",
        DataType::UInt64 => "UInt64",
        DataType::Float32 => "Float32",
        DataType::Float64 => "Float64",
        DataType::String => "String",
        DataType::Uuid => "UUID",
        DataType::Ipv4 => "IPv4",
        DataType::Ipv6 => "IPv6",
        _ => "",
    }
}

fn number<T: std::str::FromStr>(lexer: &mut Lexer) -> Result<T, TypeError> {
    let literal = lexer.number_literal()?;
    literal
        .parse()
        .map_err(|_| lexer.error(format!("invalid number `{literal}`")))
}

fn decimal(lexer: &Lexer, precision: u8, scale: u8) -> Result<DataType, TypeError> {
    if !(1..=MAX_PRECISION).contains(&precision) || scale > precision {
        return Err(lexer.error(format!("invalid Decimal precision {precision} and scale {scale}")));
    }
    Ok(DataType::Decimal { precision, scale })
}
