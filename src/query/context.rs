//! Query context
//!
//! The per-request record macros are evaluated against. It is created once per
//! incoming query and never mutated afterwards: interpolation produces a copy
//! via [`QueryContext::with_sql`] so the original text stays available for
//! error reporting.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::frame::TimeRange;
use crate::resample::FillMode;

/// Shape the caller wants the result in
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FormatMode {
    #[default]
    #[serde(alias = "timeseries", alias = "time-series")]
    TimeSeries,
    Table,
    Logs,
    Trace,
    Multi,
}

impl FormatMode {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "time_series" | "timeseries" | "time-series" => Some(Self::TimeSeries),
            "table" => Some(Self::Table),
            "logs" => Some(Self::Logs),
            "trace" => Some(Self::Trace),
            "multi" => Some(Self::Multi),
            _ => None,
        }
    }
}

impl std::fmt::Display for FormatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeSeries => write!(f, "time_series"),
            Self::Table => write!(f, "table"),
            Self::Logs => write!(f, "logs"),
            Self::Trace => write!(f, "trace"),
            Self::Multi => write!(f, "multi"),
        }
    }
}

/// Everything known about one query execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    /// SQL text, possibly containing macros
    pub raw_sql: String,
    /// Requested result shape
    #[serde(default)]
    pub format: FormatMode,
    /// Driver-specific connection arguments, passed through untouched
    #[serde(default)]
    pub connection_args: serde_json::Value,
    /// Caller's reference id for this query (names the resulting frames)
    #[serde(default)]
    pub ref_id: String,
    /// Suggested grouping interval; zero when unset
    #[serde(default = "Duration::zero", rename = "intervalMs", with = "interval_ms")]
    pub interval: Duration,
    /// Time range of the request
    pub time_range: TimeRange,
    /// Row cap for this query; zero or negative defers to the pipeline default
    #[serde(default)]
    pub max_rows: i64,
    /// Resample time-series results onto the interval grid when set
    #[serde(default)]
    pub fill_mode: Option<FillMode>,
    /// Schema name for macros
    #[serde(default)]
    pub schema: String,
    /// Table name for `$__table`
    #[serde(default)]
    pub table: String,
    /// Column name for `$__column`
    #[serde(default)]
    pub column: String,
}

impl QueryContext {
    /// Create a context for a SQL text and time range
    pub fn new(raw_sql: impl Into<String>, time_range: TimeRange) -> Self {
        Self {
            raw_sql: raw_sql.into(),
            format: FormatMode::default(),
            connection_args: serde_json::Value::Null,
            ref_id: String::new(),
            interval: Duration::zero(),
            time_range,
            max_rows: 0,
            fill_mode: None,
            schema: String::new(),
            table: String::new(),
            column: String::new(),
        }
    }

    /// Parse a context from its JSON request form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Copy of this context with only the SQL text replaced
    pub fn with_sql(&self, sql: impl Into<String>) -> Self {
        Self {
            raw_sql: sql.into(),
            ..self.clone()
        }
    }

    /// Builder: set the reference id
    pub fn ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = ref_id.into();
        self
    }

    /// Builder: set the result format
    pub fn format(mut self, format: FormatMode) -> Self {
        self.format = format;
        self
    }

    /// Builder: set the interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Builder: set the row cap
    pub fn max_rows(mut self, max_rows: i64) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Builder: set the fill mode
    pub fn fill_mode(mut self, fill: FillMode) -> Self {
        self.fill_mode = Some(fill);
        self
    }

    /// Builder: set the schema name
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Builder: set the table name
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Builder: set the column name
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}

mod interval_ms {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = i64::deserialize(d)?;
        Ok(Duration::milliseconds(ms.max(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> TimeRange {
        TimeRange::from_millis(1_705_276_800_000, 1_705_363_200_000).unwrap()
    }

    #[test]
    fn test_with_sql_preserves_other_fields() {
        let ctx = QueryContext::new("SELECT $__table", range())
            .ref_id("A")
            .table("metrics")
            .interval(Duration::minutes(1))
            .max_rows(100);
        let rewritten = ctx.with_sql("SELECT metrics");

        assert_eq!(ctx.raw_sql, "SELECT $__table");
        assert_eq!(rewritten.raw_sql, "SELECT metrics");
        assert_eq!(rewritten.with_sql(ctx.raw_sql.clone()), ctx);
    }

    #[test]
    fn test_from_json() {
        let ctx = QueryContext::from_json(
            r#"{
                "rawSql": "SELECT * FROM $__table",
                "format": "table",
                "refId": "B",
                "intervalMs": 60000,
                "timeRange": {"from": "2024-01-15T00:00:00Z", "to": "2024-01-16T00:00:00Z"},
                "maxRows": 500,
                "fillMode": {"mode": "null"},
                "table": "metrics",
                "connectionArgs": {"timeout": 5}
            }"#,
        )
        .unwrap();

        assert_eq!(ctx.format, FormatMode::Table);
        assert_eq!(ctx.ref_id, "B");
        assert_eq!(ctx.interval, Duration::minutes(1));
        assert_eq!(ctx.time_range, range());
        assert_eq!(ctx.max_rows, 500);
        assert_eq!(ctx.fill_mode, Some(FillMode::Null));
        assert_eq!(ctx.table, "metrics");
        assert_eq!(ctx.connection_args["timeout"], 5);
    }

    #[test]
    fn test_from_json_defaults() {
        let ctx = QueryContext::from_json(
            r#"{"rawSql": "SELECT 1", "timeRange": {"from": "2024-01-15T00:00:00Z", "to": "2024-01-16T00:00:00Z"}}"#,
        )
        .unwrap();

        assert_eq!(ctx.format, FormatMode::TimeSeries);
        assert_eq!(ctx.interval, Duration::zero());
        assert_eq!(ctx.max_rows, 0);
        assert!(ctx.fill_mode.is_none());
        assert!(ctx.table.is_empty());
    }

    #[test]
    fn test_format_mode_parse() {
        assert_eq!(FormatMode::parse("Table"), Some(FormatMode::Table));
        assert_eq!(FormatMode::parse("time-series"), Some(FormatMode::TimeSeries));
        assert_eq!(FormatMode::parse("graph"), None);
    }
}
