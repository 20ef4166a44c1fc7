//! SQLite row source - `rusqlite` adapter
//!
//! Maps SQLite declared column types onto `NativeKind` using SQLite's own
//! affinity rules, and coerces stored values toward the requested scan kind
//! (text or integer timestamps to temporal, integers to booleans).

use rusqlite::types::ValueRef;
use rusqlite::{Params, Rows, Statement};

use super::{coerce, Cell, ColumnMeta, NativeKind, NativeValue, RowSource, SourceError, SourceResult};
use crate::query::{
    macros::{period_seconds, time_group_args, time_macros},
    MacroResult, MacroSet, QueryContext,
};

/// Row source over a running SQLite statement
pub struct SqliteRowSource<'stmt> {
    columns: Vec<ColumnMeta>,
    rows: Option<Rows<'stmt>>,
}

impl<'stmt> SqliteRowSource<'stmt> {
    /// Run a prepared statement without parameters
    pub fn new(stmt: &'stmt mut Statement<'_>) -> SourceResult<Self> {
        Self::with_params(stmt, [])
    }

    /// Run a prepared statement with bound parameters
    pub fn with_params<P: Params>(stmt: &'stmt mut Statement<'_>, params: P) -> SourceResult<Self> {
        let columns = stmt
            .columns()
            .iter()
            .map(|c| {
                let decl = c.decl_type().unwrap_or("");
                ColumnMeta::new(c.name(), decl, kind_for_decl_type(decl))
            })
            .collect();
        let rows = stmt.query(params)?;

        Ok(Self {
            columns,
            rows: Some(rows),
        })
    }
}

impl RowSource for SqliteRowSource<'_> {
    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn next_row(&mut self, scan: &[Option<NativeKind>]) -> SourceResult<Option<Vec<Cell>>> {
        let rows = self.rows.as_mut().ok_or(SourceError::Exhausted)?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut cells = Vec::with_capacity(self.columns.len());
        for i in 0..self.columns.len() {
            let value = match row.get_ref(i)? {
                ValueRef::Null => None,
                ValueRef::Integer(v) => Some(NativeValue::Integer(v)),
                ValueRef::Real(v) => Some(NativeValue::Floating(v)),
                ValueRef::Text(bytes) => {
                    Some(NativeValue::Text(String::from_utf8_lossy(bytes).into_owned()))
                }
                ValueRef::Blob(bytes) => Some(NativeValue::Bytes(bytes.to_vec())),
            };
            cells.push(value.map(|v| coerce(v, scan.get(i).copied().flatten())));
        }
        Ok(Some(cells))
    }

    fn next_result_set(&mut self) -> SourceResult<bool> {
        // A SQLite statement yields exactly one result set.
        self.rows = None;
        Ok(false)
    }
}

/// Map a declared SQLite column type to a native kind
pub fn kind_for_decl_type(decl: &str) -> NativeKind {
    let decl = decl.to_ascii_uppercase();

    if decl.is_empty() {
        NativeKind::Other
    } else if decl.contains("BOOL") {
        NativeKind::Boolean
    } else if decl.contains("DATE") || decl.contains("TIME") {
        NativeKind::Temporal
    } else if decl.contains("INT") {
        NativeKind::Integer
    } else if decl.contains("CHAR") || decl.contains("CLOB") || decl.contains("TEXT") {
        NativeKind::Text
    } else if decl.contains("BLOB") {
        NativeKind::Bytes
    } else if decl.contains("REAL")
        || decl.contains("FLOA")
        || decl.contains("DOUB")
        || decl.contains("NUMERIC")
        || decl.contains("DECIMAL")
    {
        NativeKind::Floating
    } else {
        NativeKind::Other
    }
}

/// SQLite timestamp literal format, matching `datetime()` output
pub const SQLITE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default macros with the time macros rewritten for SQLite.
///
/// Timestamps compare as `'YYYY-MM-DD HH:MM:SS'` text and `$__timeGroup`
/// renders through `strftime`/`datetime`, so grouped values stay parseable
/// as timestamps.
pub fn sqlite_macros() -> MacroSet {
    MacroSet::default()
        .merge(time_macros(SQLITE_TIME_FORMAT))
        .with("timeGroup", sqlite_time_group)
}

fn sqlite_time_group(_ctx: &QueryContext, args: &[String]) -> MacroResult<String> {
    let (col, period) = time_group_args("timeGroup", args)?;

    let pattern = match period {
        "year" => "%Y-01-01 00:00:00",
        "month" => "%Y-%m-01 00:00:00",
        "day" => "%Y-%m-%d 00:00:00",
        "hour" => "%Y-%m-%d %H:00:00",
        "minute" => "%Y-%m-%d %H:%M:00",
        _ => {
            let secs = period_seconds("timeGroup", period)?;
            return Ok(format!(
                "datetime((CAST(strftime('%s', {col}) AS INTEGER) / {secs}) * {secs}, 'unixepoch')"
            ));
        }
    };
    Ok(format!("strftime('{pattern}', {col})"))
}
