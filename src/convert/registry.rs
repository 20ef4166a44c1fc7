//! Type registry
//!
//! Default converters keyed by native scan kind, plus the generic string
//! fallback. A registry is built once and shared read-only between pipeline
//! invocations.
//!
//! | Native kind | Field type | Conversion          |
//! |-------------|------------|---------------------|
//! | temporal    | time       | [`to_time`]         |
//! | integer     | int64      | [`to_int64`]        |
//! | floating    | float64    | [`to_float64`]      |
//! | text        | string     | [`to_string_value`] |
//! | bytes       | string     | [`to_string_value`] |
//! | boolean     | bool       | [`to_bool`]         |
//! | other       | string     | [`to_string_value`] |

use std::collections::HashMap;

use crate::frame::{FieldType, FieldValue};
use crate::source::{parse_timestamp, NativeKind, NativeValue};

use super::converter::Converter;

/// Immutable table of default converters
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    defaults: HashMap<NativeKind, Converter>,
    fallback: Option<Converter>,
}

impl TypeRegistry {
    /// Registry with the standard defaults and string fallback
    pub fn new() -> Self {
        let mut defaults = HashMap::new();
        for &kind in NativeKind::all() {
            let field_type = match kind {
                NativeKind::Temporal => FieldType::Time,
                NativeKind::Integer => FieldType::Int64,
                NativeKind::Floating => FieldType::Float64,
                NativeKind::Boolean => FieldType::Bool,
                NativeKind::Text | NativeKind::Bytes | NativeKind::Other => FieldType::String,
            };
            let converter = Self::converter_for(field_type)
                .named(format!("default {}", kind))
                .scan(kind);
            defaults.insert(kind, converter);
        }

        Self {
            defaults,
            fallback: Some(Self::converter_for(FieldType::String).named("string fallback")),
        }
    }

    /// Registry with no defaults and no fallback
    pub fn empty() -> Self {
        Self {
            defaults: HashMap::new(),
            fallback: None,
        }
    }

    /// Builder: replace the default converter for a native kind
    pub fn with_default(mut self, kind: NativeKind, converter: Converter) -> Self {
        self.defaults.insert(kind, converter);
        self
    }

    /// Builder: replace (or remove) the fallback converter
    pub fn with_fallback(mut self, fallback: Option<Converter>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn default_for(&self, kind: NativeKind) -> Option<&Converter> {
        self.defaults.get(&kind)
    }

    pub fn fallback(&self) -> Option<&Converter> {
        self.fallback.as_ref()
    }

    /// An unconditional nullable converter producing `field_type`
    pub fn converter_for(field_type: FieldType) -> Converter {
        match field_type {
            FieldType::Time => Converter::new(field_type, to_time),
            FieldType::Int64 => Converter::new(field_type, to_int64),
            FieldType::Float64 => Converter::new(field_type, to_float64),
            FieldType::Bool => Converter::new(field_type, to_bool),
            FieldType::String => Converter::new(field_type, to_string_value),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn unconvertible(value: &NativeValue, target: FieldType) -> String {
    format!("cannot convert {} value '{}' to {}", value.kind(), value, target)
}

/// Temporal values, timestamp text, and integer epoch seconds
pub fn to_time(value: NativeValue) -> Result<FieldValue, String> {
    let converted = match &value {
        NativeValue::Temporal(t) => Some(*t),
        NativeValue::Text(s) | NativeValue::Other(s) => parse_timestamp(s),
        NativeValue::Integer(secs) => chrono::DateTime::<chrono::Utc>::from_timestamp(*secs, 0),
        _ => None,
    };
    converted
        .map(FieldValue::Time)
        .ok_or_else(|| unconvertible(&value, FieldType::Time))
}

/// `f` lies in [-2^63, 2^63), so `as i64` is exact
fn in_i64_range(f: f64) -> bool {
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    (-BOUND..BOUND).contains(&f)
}

pub fn to_int64(value: NativeValue) -> Result<FieldValue, String> {
    let converted = match &value {
        NativeValue::Integer(v) => Some(*v),
        NativeValue::Boolean(b) => Some(i64::from(*b)),
        NativeValue::Floating(f) if f.fract() == 0.0 && in_i64_range(*f) => Some(*f as i64),
        NativeValue::Text(s) | NativeValue::Other(s) => s.trim().parse().ok(),
        _ => None,
    };
    converted
        .map(FieldValue::Int64)
        .ok_or_else(|| unconvertible(&value, FieldType::Int64))
}

pub fn to_float64(value: NativeValue) -> Result<FieldValue, String> {
    let converted = match &value {
        NativeValue::Floating(f) => Some(*f),
        NativeValue::Integer(v) => Some(*v as f64),
        NativeValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        NativeValue::Text(s) | NativeValue::Other(s) => s.trim().parse().ok(),
        _ => None,
    };
    converted
        .map(FieldValue::Float64)
        .ok_or_else(|| unconvertible(&value, FieldType::Float64))
}

pub fn to_bool(value: NativeValue) -> Result<FieldValue, String> {
    let converted = match &value {
        NativeValue::Boolean(b) => Some(*b),
        NativeValue::Integer(v) => Some(*v != 0),
        NativeValue::Text(s) | NativeValue::Other(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Some(true),
            "false" | "f" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    };
    converted
        .map(FieldValue::Bool)
        .ok_or_else(|| unconvertible(&value, FieldType::Bool))
}

/// Any value, via its text rendering (bytes are decoded lossily)
pub fn to_string_value(value: NativeValue) -> Result<FieldValue, String> {
    Ok(FieldValue::String(match value {
        NativeValue::Text(s) | NativeValue::Other(s) => s,
        other => other.to_string(),
    }))
}
