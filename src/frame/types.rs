//! Core value types for frames
//!
//! - `FieldType`: the closed set of column types a frame can hold
//! - `FieldValue`: one typed, non-null cell
//! - `TimeRange`: a closed time interval used by macros and the resampler
//! - `Notice`: informational messages attached to frame metadata

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Column type of a frame field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 64-bit signed integer
    Int64,
    /// 64-bit float
    Float64,
    /// Boolean
    Bool,
    /// UTF-8 text
    String,
    /// UTC timestamp
    Time,
}

impl FieldType {
    /// The value stored for a null cell in a non-nullable field
    pub fn default_value(&self) -> FieldValue {
        match self {
            FieldType::Int64 => FieldValue::Int64(0),
            FieldType::Float64 => FieldValue::Float64(0.0),
            FieldType::Bool => FieldValue::Bool(false),
            FieldType::String => FieldValue::String(String::new()),
            FieldType::Time => FieldValue::Time(DateTime::<Utc>::default()),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Int64 => write!(f, "int64"),
            FieldType::Float64 => write!(f, "float64"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::String => write!(f, "string"),
            FieldType::Time => write!(f, "time"),
        }
    }
}

/// A single non-null frame value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Int64(i64),
    Float64(f64),
    Bool(bool),
    String(String),
    Time(DateTime<Utc>),
}

impl FieldValue {
    /// Get the type of this value
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Int64(_) => FieldType::Int64,
            FieldValue::Float64(_) => FieldType::Float64,
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::String(_) => FieldType::String,
            FieldValue::Time(_) => FieldType::Time,
        }
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int64(v) => Some(*v as f64),
            FieldValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Timestamp view of the value, if it is a time
    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Time(t) => Some(*t),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Int64(v) => write!(f, "{}", v),
            FieldValue::Float64(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::String(v) => write!(f, "{}", v),
            FieldValue::Time(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

/// Time range for queries (closed interval: [from, to])
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    /// Start of the range (inclusive)
    pub from: DateTime<Utc>,
    /// End of the range (inclusive)
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Create a new time range
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Create a time range, returning None if `from` is after `to`
    pub fn try_new(from: DateTime<Utc>, to: DateTime<Utc>) -> Option<Self> {
        if from <= to {
            Some(Self { from, to })
        } else {
            None
        }
    }

    /// Create a range from Unix millisecond timestamps
    pub fn from_millis(from: i64, to: i64) -> Option<Self> {
        let from = Utc.timestamp_millis_opt(from).single()?;
        let to = Utc.timestamp_millis_opt(to).single()?;
        Self::try_new(from, to)
    }

    /// Create a range ending now and spanning `duration`.
    ///
    /// Returns None if the start falls outside the representable dates.
    pub fn last(duration: Duration) -> Option<Self> {
        let to = Utc::now();
        let from = to.checked_sub_signed(duration)?;
        Self::try_new(from, to)
    }
}

/// Severity of a frame notice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    Info,
    Warning,
    Error,
}

/// A message attached to a frame for the consumer to display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub text: String,
}

impl Notice {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Warning,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(FieldType::Int64.default_value(), FieldValue::Int64(0));
        assert_eq!(
            FieldType::String.default_value(),
            FieldValue::String(String::new())
        );
        assert_eq!(
            FieldType::Time.default_value().as_time().map(|t| t.timestamp()),
            Some(0)
        );
    }

    #[test]
    fn test_time_range_rejects_inverted() {
        assert!(TimeRange::from_millis(2000, 1000).is_none());
        assert!(TimeRange::from_millis(1000, 1000).is_some());
    }

    #[test]
    fn test_time_range_last() {
        let range = TimeRange::last(Duration::hours(6)).unwrap();
        assert_eq!(range.to - range.from, Duration::hours(6));

        assert!(TimeRange::last(Duration::days(100_000_000)).is_none());
        assert!(TimeRange::last(Duration::hours(-1)).is_none());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(FieldValue::Float64(1.5).to_string(), "1.5");
        assert_eq!(FieldValue::Bool(true).to_string(), "true");
        let t = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(FieldValue::Time(t).to_string(), "1970-01-01T00:00:00+00:00");
    }
}
