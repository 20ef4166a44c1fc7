//! Query pipeline
//!
//! Runs the full query-to-frame path for one request:
//!
//! ```text
//! QueryContext ──interpolate──▶ SQL ──driver──▶ RowSource ──build──▶ Frames ──resample?──▶ Frames
//! ```
//!
//! A pipeline is immutable once configured and can be shared between
//! concurrent requests; each request brings its own context and cursor.

use std::sync::Arc;

use chrono::Duration;
use rusqlite::Connection;

use crate::convert::{build_frames, Converter, TypeRegistry};
use crate::error::Result;
use crate::frame::Frame;
use crate::query::{interpolate, FormatMode, MacroResult, MacroSet, QueryContext};
use crate::resample::resample;
use crate::source::{RowSource, SqliteRowSource};

/// Row cap used when neither the request nor the caller sets one
pub const DEFAULT_ROW_LIMIT: i64 = 1_000_000;

/// Configured query-to-frame pipeline
#[derive(Debug, Clone)]
pub struct QueryPipeline {
    registry: Arc<TypeRegistry>,
    macros: MacroSet,
    converters: Vec<Converter>,
    row_limit: i64,
    default_interval: Duration,
}

impl QueryPipeline {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(TypeRegistry::new()),
            macros: MacroSet::default(),
            converters: Vec::new(),
            row_limit: DEFAULT_ROW_LIMIT,
            default_interval: Duration::zero(),
        }
    }

    /// Builder: share a type registry
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Builder: replace the macro set
    pub fn with_macros(mut self, macros: MacroSet) -> Self {
        self.macros = macros;
        self
    }

    /// Builder: add an override converter
    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converters.push(converter);
        self
    }

    /// Builder: set the default row cap (negative for unlimited)
    pub fn row_limit(mut self, row_limit: i64) -> Self {
        self.row_limit = row_limit;
        self
    }

    /// Builder: interval used for resampling when the request has none
    pub fn default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    pub fn macros(&self) -> &MacroSet {
        &self.macros
    }

    pub fn converters(&self) -> &[Converter] {
        &self.converters
    }

    /// Row cap for a request: its own `maxRows` when positive, else the default
    pub fn effective_row_limit(&self, ctx: &QueryContext) -> i64 {
        if ctx.max_rows > 0 {
            ctx.max_rows
        } else {
            self.row_limit
        }
    }

    /// Resampling interval for a request
    pub fn effective_interval(&self, ctx: &QueryContext) -> Duration {
        if ctx.interval > Duration::zero() {
            ctx.interval
        } else {
            self.default_interval
        }
    }

    /// Interpolate macros, returning a copy of the context with the new SQL
    pub fn interpolate(&self, ctx: &QueryContext) -> MacroResult<QueryContext> {
        let sql = interpolate(ctx, &self.macros)?;
        Ok(ctx.with_sql(sql))
    }

    /// Build frames from a cursor opened for an already-interpolated context.
    ///
    /// Frames are named after the request's ref id and record the executed
    /// SQL. Time-series frames are resampled when the request sets a fill mode.
    pub fn frames_from_source<S: RowSource + ?Sized>(
        &self,
        ctx: &QueryContext,
        source: &mut S,
    ) -> Result<Vec<Frame>> {
        let row_cap = self.effective_row_limit(ctx);
        let frames = build_frames(source, row_cap, &self.converters, &self.registry)?;
        let count = frames.len();

        let mut out = Vec::with_capacity(count);
        for (i, mut frame) in frames.into_iter().enumerate() {
            frame.name = ctx.ref_id.clone();
            frame.set_executed_query(ctx.raw_sql.clone());
            if count > 1 {
                frame
                    .meta
                    .custom
                    .insert("resultSet".to_string(), serde_json::Value::from(i));
            }
            out.push(self.maybe_resample(ctx, frame)?);
        }

        tracing::debug!(ref_id = %ctx.ref_id, frames = out.len(), "Query produced frames");
        Ok(out)
    }

    fn maybe_resample(&self, ctx: &QueryContext, frame: Frame) -> Result<Frame> {
        let Some(fill) = ctx.fill_mode else {
            return Ok(frame);
        };
        if ctx.format != FormatMode::TimeSeries {
            return Ok(frame);
        }
        if frame.time_field_index().is_none() {
            tracing::debug!(frame = %frame.name, "No time field, skipping resample");
            return Ok(frame);
        }

        let interval = self.effective_interval(ctx);
        if interval <= Duration::zero() {
            tracing::debug!(frame = %frame.name, "No interval, skipping resample");
            return Ok(frame);
        }
        Ok(resample(&frame, fill, &ctx.time_range, interval)?)
    }

    /// Interpolate, execute against SQLite and build frames
    pub fn run_sqlite(&self, conn: &Connection, ctx: &QueryContext) -> Result<Vec<Frame>> {
        let interpolated = self.interpolate(ctx)?;
        tracing::info!(ref_id = %ctx.ref_id, sql = %interpolated.raw_sql, "Executing query");

        let mut stmt = conn.prepare(&interpolated.raw_sql)?;
        let mut source = SqliteRowSource::new(&mut stmt)?;
        self.frames_from_source(&interpolated, &mut source)
    }

    /// Parse a JSON request envelope and run it against SQLite
    pub fn run_sqlite_json(&self, conn: &Connection, request: &str) -> Result<Vec<Frame>> {
        let ctx = QueryContext::from_json(request)?;
        self.run_sqlite(conn, &ctx)
    }
}

impl Default for QueryPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::frame::{FieldType, FieldValue, TimeRange};
    use crate::query::MacroError;
    use crate::resample::FillMode;
    use crate::convert::ConvertError;
    use crate::source::{sqlite::sqlite_macros, ColumnMeta, MemoryRowSource, NativeKind, NativeValue};
    use chrono::{TimeZone, Utc};

    fn test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE metrics (ts DATETIME NOT NULL, host TEXT, value REAL);
             INSERT INTO metrics VALUES ('2024-01-15 14:00:00', 'a', 1.0);
             INSERT INTO metrics VALUES ('2024-01-15 14:00:30', 'a', 1.5);
             INSERT INTO metrics VALUES ('2024-01-15 14:03:00', 'a', 3.0);
             INSERT INTO metrics VALUES ('2024-01-15 15:00:00', 'b', 9.0);",
        )
        .unwrap();
        conn
    }

    fn range() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 14, 4, 0).unwrap(),
        )
    }

    fn pipeline() -> QueryPipeline {
        QueryPipeline::new().with_macros(sqlite_macros())
    }

    #[test]
    fn test_run_sqlite_table() {
        let conn = test_connection();
        let ctx = QueryContext::new(
            "SELECT ts, value FROM metrics WHERE $__timeFilter(ts) ORDER BY ts",
            range(),
        )
        .ref_id("A")
        .format(FormatMode::Table);

        let frames = pipeline().run_sqlite(&conn, &ctx).unwrap();
        assert_eq!(frames.len(), 1);

        let frame = &frames[0];
        assert_eq!(frame.name, "A");
        assert_eq!(frame.row_count(), 3);
        assert_eq!(frame.fields[0].field_type(), FieldType::Time);
        assert_eq!(frame.fields[1].field_type(), FieldType::Float64);
        assert_eq!(
            frame.meta.executed_query_string.as_deref(),
            Some("SELECT ts, value FROM metrics WHERE ts >= '2024-01-15 14:00:00' AND ts <= '2024-01-15 14:04:00' ORDER BY ts")
        );
    }

    #[test]
    fn test_run_sqlite_resamples_time_series() {
        let conn = test_connection();
        let ctx = QueryContext::new(
            "SELECT ts, value FROM metrics WHERE $__timeFilter(ts) ORDER BY ts",
            range(),
        )
        .interval(Duration::minutes(1))
        .fill_mode(FillMode::Previous);

        let frames = pipeline().run_sqlite(&conn, &ctx).unwrap();
        let values: Vec<Option<FieldValue>> =
            (0..5).map(|i| frames[0].fields[1].get(i)).collect();

        // 14:00 has two rows, the later one wins; 14:01 and 14:02 carry it forward.
        assert_eq!(
            values,
            vec![
                Some(FieldValue::Float64(1.5)),
                Some(FieldValue::Float64(1.5)),
                Some(FieldValue::Float64(1.5)),
                Some(FieldValue::Float64(3.0)),
                Some(FieldValue::Float64(3.0)),
            ]
        );
    }

    #[test]
    fn test_fill_without_interval_skips_resample() {
        let conn = test_connection();
        let ctx = QueryContext::new(
            "SELECT ts, value FROM metrics WHERE $__timeFilter(ts) ORDER BY ts",
            range(),
        )
        .fill_mode(FillMode::Null);

        let frames = pipeline().run_sqlite(&conn, &ctx).unwrap();
        assert_eq!(frames[0].row_count(), 3);
        assert_eq!(frames[0].fields[1].get(1), Some(FieldValue::Float64(1.5)));
    }

    #[test]
    fn test_out_of_range_integer_is_conversion_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE m (n INTEGER); INSERT INTO m VALUES (1e20);")
            .unwrap();
        let ctx = QueryContext::new("SELECT n FROM m", range()).format(FormatMode::Table);

        let err = pipeline().run_sqlite(&conn, &ctx).unwrap_err();
        match err {
            Error::Convert(ConvertError::Conversion { column, row, .. }) => {
                assert_eq!(column, "n");
                assert_eq!(row, 0);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_multiple_result_sets() {
        let columns = || vec![ColumnMeta::new("n", "INTEGER", NativeKind::Integer)];
        let mut source = MemoryRowSource::new(columns(), vec![vec![Some(NativeValue::Integer(1))]])
            .with_result_set(
                columns(),
                vec![
                    vec![Some(NativeValue::Integer(2))],
                    vec![Some(NativeValue::Integer(3))],
                ],
            );
        let ctx = QueryContext::new("SELECT n FROM a; SELECT n FROM b", range())
            .ref_id("R")
            .format(FormatMode::Table);

        let frames = pipeline().frames_from_source(&ctx, &mut source).unwrap();
        assert_eq!(frames.len(), 2);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.name, "R");
            assert_eq!(
                frame.meta.executed_query_string.as_deref(),
                Some("SELECT n FROM a; SELECT n FROM b")
            );
            assert_eq!(frame.meta.custom["resultSet"], serde_json::json!(i));
        }
        assert_eq!(frames[0].row_count(), 1);
        assert_eq!(frames[1].row_count(), 2);
    }

    #[test]
    fn test_single_result_set_has_no_result_set_meta() {
        let conn = test_connection();
        let ctx = QueryContext::new("SELECT value FROM metrics", range()).format(FormatMode::Table);

        let frames = pipeline().run_sqlite(&conn, &ctx).unwrap();
        assert!(!frames[0].meta.custom.contains_key("resultSet"));
    }

    #[test]
    fn test_row_limit_precedence() {
        let conn = test_connection();
        let base = QueryContext::new("SELECT value FROM metrics", range());

        let frames = pipeline().row_limit(2).run_sqlite(&conn, &base).unwrap();
        assert_eq!(frames[0].row_count(), 2);
        assert_eq!(frames[0].meta.notices.len(), 1);

        let frames = pipeline()
            .row_limit(2)
            .run_sqlite(&conn, &base.clone().max_rows(3))
            .unwrap();
        assert_eq!(frames[0].row_count(), 3);

        let frames = pipeline().row_limit(-1).run_sqlite(&conn, &base).unwrap();
        assert_eq!(frames[0].row_count(), 4);
        assert!(frames[0].meta.notices.is_empty());
    }

    #[test]
    fn test_time_group_with_time_converter() {
        let conn = test_connection();
        let time = TypeRegistry::converter_for(FieldType::Time)
            .for_column("time")
            .scan(NativeKind::Temporal);
        let ctx = QueryContext::new(
            "SELECT $__timeGroup(ts, 1m) AS time, avg(value) AS value FROM metrics \
             WHERE $__timeFilter(ts) GROUP BY 1 ORDER BY 1",
            range(),
        )
        .interval(Duration::minutes(1))
        .fill_mode(FillMode::Null);

        let frames = pipeline()
            .with_converter(time)
            .with_converter(Converter::dynamic())
            .run_sqlite(&conn, &ctx)
            .unwrap();
        let frame = &frames[0];

        assert_eq!(frame.row_count(), 5);
        assert_eq!(frame.fields[1].get(0), Some(FieldValue::Float64(1.25)));
        assert!(frame.fields[1].is_null(1));
        assert_eq!(frame.fields[1].get(3), Some(FieldValue::Float64(3.0)));
    }

    #[test]
    fn test_macro_error_surfaces() {
        let conn = test_connection();
        let ctx = QueryContext::new("SELECT * FROM $__nope", range());

        let err = pipeline().run_sqlite(&conn, &ctx).unwrap_err();
        assert!(matches!(err, Error::Macro(MacroError::UnknownMacro { .. })));
    }

    #[test]
    fn test_run_sqlite_json() {
        let conn = test_connection();
        let frames = pipeline()
            .run_sqlite_json(
                &conn,
                r#"{
                    "rawSql": "SELECT host, value FROM $__table ORDER BY ts",
                    "refId": "B",
                    "format": "table",
                    "table": "metrics",
                    "maxRows": 1,
                    "timeRange": {"from": "2024-01-15T14:00:00Z", "to": "2024-01-15T15:00:00Z"}
                }"#,
            )
            .unwrap();

        assert_eq!(frames[0].name, "B");
        assert_eq!(frames[0].row_count(), 1);
        assert_eq!(
            frames[0].fields[0].get(0),
            Some(FieldValue::String("a".to_string()))
        );

        let err = pipeline().run_sqlite_json(&conn, "{").unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
