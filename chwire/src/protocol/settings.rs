use std::{fmt, time::Duration};

use crate::binary::Serializer;

/// Value of a server setting.
///
/// The wire format depends on the setting type, so the variant must match the
/// type the server declares for the setting.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    /// Written as varint.
    UInt(u64),
    /// Written as zig-zag varint.
    Int(i64),
    /// Written as varint.
    Bool(bool),
    /// Written as string.
    Float(f64),
    String(String),
    /// Written as varint of whole seconds.
    Seconds(Duration),
    /// Written as varint of whole milliseconds.
    Milliseconds(Duration),
}

impl SettingValue {
    /// Guess the type of an untyped value, such as a url query parameter.
    pub fn infer(value: &str) -> SettingValue {
        if let Ok(v) = value.parse() {
            return SettingValue::UInt(v);
        }
        if let Ok(v) = value.parse() {
            return SettingValue::Int(v);
        }
        match value {
            "true" => return SettingValue::Bool(true),
            "false" => return SettingValue::Bool(false),
            _ => {},
        }
        match value.parse() {
            Ok(v) => SettingValue::Float(v),
            Err(_) => SettingValue::String(value.to_owned()),
        }
    }

    fn serialize(&self, ser: &mut Serializer) {
        match self {
            SettingValue::UInt(v) => ser.write_var_uint(*v),
            SettingValue::Int(v) => ser.write_var_int(*v),
            SettingValue::Bool(v) => ser.write_bool(*v),
            SettingValue::Float(v) => ser.write_string(&v.to_string()),
            SettingValue::String(v) => ser.write_string(v),
            SettingValue::Seconds(v) => ser.write_var_uint(v.as_secs()),
            SettingValue::Milliseconds(v) => ser.write_var_uint(v.as_millis().try_into().unwrap_or(u64::MAX)),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::UInt(v) => v.fmt(f),
            SettingValue::Int(v) => v.fmt(f),
            SettingValue::Bool(v) => (*v as u8).fmt(f),
            SettingValue::Float(v) => v.fmt(f),
            SettingValue::String(v) => v.fmt(f),
            SettingValue::Seconds(v) => v.as_secs().fmt(f),
            SettingValue::Milliseconds(v) => v.as_millis().fmt(f),
        }
    }
}

macro_rules! from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SettingValue {
                fn from(value: $ty) -> Self {
                    SettingValue::$variant(value.into())
                }
            }
        )*
    };
}

from! {
    u64 => UInt,
    u32 => UInt,
    i64 => Int,
    i32 => Int,
    bool => Bool,
    f64 => Float,
    String => String,
    &str => String,
}

/// Ordered collection of server settings sent with a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    entries: Vec<(String, SettingValue)>,
}

impl Settings {
    pub fn new() -> Settings {
        Settings::default()
    }

    /// Set a setting, replacing the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<SettingValue>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Builder style [`set`][Settings::set].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Settings of `self` overridden by `other`.
    pub fn merged(&self, other: &Settings) -> Settings {
        let mut merged = self.clone();
        for (name, value) in &other.entries {
            merged.set(name.clone(), value.clone());
        }
        merged
    }

    /// Write every setting as name and value, terminated by an empty name.
    pub(crate) fn serialize(&self, ser: &mut Serializer) {
        for (name, value) in &self.entries {
            ser.write_string(name);
            value.serialize(ser);
        }
        ser.write_string("");
    }
}
