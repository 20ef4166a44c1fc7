//! Row Sources
//!
//! The boundary between a SQL driver and frame building. A row source reports
//! column metadata up front, then yields one row of tagged native values per
//! call until the current result set is exhausted.
//!
//! - **memory**: In-memory source for pre-fetched rows
//! - **sqlite**: `rusqlite` adapter
//!
//! Every scanned cell is an `Option<NativeValue>`: `None` is a SQL NULL, and
//! `Some` carries a value tagged with its `NativeKind`, so the converters never
//! need to introspect driver types.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRowSource;
pub use sqlite::SqliteRowSource;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of native value kinds a row source can produce
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NativeKind {
    Temporal,
    Integer,
    Floating,
    Text,
    Bytes,
    Boolean,
    Other,
}

impl NativeKind {
    pub fn all() -> &'static [NativeKind] {
        &[
            NativeKind::Temporal,
            NativeKind::Integer,
            NativeKind::Floating,
            NativeKind::Text,
            NativeKind::Bytes,
            NativeKind::Boolean,
            NativeKind::Other,
        ]
    }
}

impl std::fmt::Display for NativeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NativeKind::Temporal => write!(f, "temporal"),
            NativeKind::Integer => write!(f, "integer"),
            NativeKind::Floating => write!(f, "floating"),
            NativeKind::Text => write!(f, "text"),
            NativeKind::Bytes => write!(f, "bytes"),
            NativeKind::Boolean => write!(f, "boolean"),
            NativeKind::Other => write!(f, "other"),
        }
    }
}

/// A non-null value as scanned from the driver
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Temporal(DateTime<Utc>),
    Integer(i64),
    Floating(f64),
    Text(String),
    Bytes(Vec<u8>),
    Boolean(bool),
    /// Driver-specific value, pre-rendered as text
    Other(String),
}

impl NativeValue {
    /// The kind tag of this value
    pub fn kind(&self) -> NativeKind {
        match self {
            NativeValue::Temporal(_) => NativeKind::Temporal,
            NativeValue::Integer(_) => NativeKind::Integer,
            NativeValue::Floating(_) => NativeKind::Floating,
            NativeValue::Text(_) => NativeKind::Text,
            NativeValue::Bytes(_) => NativeKind::Bytes,
            NativeValue::Boolean(_) => NativeKind::Boolean,
            NativeValue::Other(_) => NativeKind::Other,
        }
    }
}

impl std::fmt::Display for NativeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NativeValue::Temporal(t) => write!(f, "{}", t.to_rfc3339()),
            NativeValue::Integer(v) => write!(f, "{}", v),
            NativeValue::Floating(v) => write!(f, "{}", v),
            NativeValue::Text(s) | NativeValue::Other(s) => write!(f, "{}", s),
            NativeValue::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            NativeValue::Boolean(v) => write!(f, "{}", v),
        }
    }
}

/// One scanned cell: `None` is a SQL NULL
pub type Cell = Option<NativeValue>;

/// Column metadata reported by a row source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column name as reported by the driver
    pub name: String,
    /// Declared database type name (e.g. "DECIMAL", "TIMESTAMP")
    pub type_name: String,
    /// Native kind the driver suggests scanning into
    pub scan_kind: NativeKind,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, scan_kind: NativeKind) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            scan_kind,
        }
    }
}

/// Errors raised by row sources
#[derive(Error, Debug)]
pub enum SourceError {
    /// SQLite driver failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Read attempted after the source was exhausted or closed
    #[error("Row source exhausted")]
    Exhausted,

    /// Row shape does not match the reported columns
    #[error("Invalid row: {0}")]
    Invalid(String),
}

/// Result type for row source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// A driver result cursor.
///
/// The caller owns the cursor and is responsible for releasing it; frame
/// building only reads from it.
pub trait RowSource {
    /// Column metadata of the current result set
    fn columns(&self) -> &[ColumnMeta];

    /// Read the next row of the current result set.
    ///
    /// `scan` holds one entry per column: the native kind the chosen converter
    /// wants to receive, or `None` to take whatever the driver produces.
    /// Returns `Ok(None)` once the result set is exhausted.
    fn next_row(&mut self, scan: &[Option<NativeKind>]) -> SourceResult<Option<Vec<Cell>>>;

    /// Advance to the next result set, returning false when there is none
    fn next_result_set(&mut self) -> SourceResult<bool>;
}

impl<T: RowSource + ?Sized> RowSource for &mut T {
    fn columns(&self) -> &[ColumnMeta] {
        (**self).columns()
    }

    fn next_row(&mut self, scan: &[Option<NativeKind>]) -> SourceResult<Option<Vec<Cell>>> {
        (**self).next_row(scan)
    }

    fn next_result_set(&mut self) -> SourceResult<bool> {
        (**self).next_result_set()
    }
}

/// Coerce a native value toward a requested scan kind.
///
/// Only lossless or conventional coercions are applied; anything else is
/// returned unchanged and left for the converter to accept or reject.
pub fn coerce(value: NativeValue, target: Option<NativeKind>) -> NativeValue {
    let Some(target) = target else {
        return value;
    };
    if value.kind() == target {
        return value;
    }

    match (value, target) {
        (NativeValue::Integer(v), NativeKind::Floating) => NativeValue::Floating(v as f64),
        (NativeValue::Integer(v), NativeKind::Boolean) => NativeValue::Boolean(v != 0),
        (NativeValue::Integer(v), NativeKind::Temporal) => match DateTime::<Utc>::from_timestamp(v, 0) {
            Some(t) => NativeValue::Temporal(t),
            None => NativeValue::Integer(v),
        },
        (NativeValue::Text(s), NativeKind::Temporal) => match parse_timestamp(&s) {
            Some(t) => NativeValue::Temporal(t),
            None => NativeValue::Text(s),
        },
        (NativeValue::Text(s), NativeKind::Integer) => match s.trim().parse::<i64>() {
            Ok(v) => NativeValue::Integer(v),
            Err(_) => NativeValue::Text(s),
        },
        (NativeValue::Text(s), NativeKind::Floating) => match s.trim().parse::<f64>() {
            Ok(v) => NativeValue::Floating(v),
            Err(_) => NativeValue::Text(s),
        },
        (NativeValue::Bytes(b), NativeKind::Text) => match String::from_utf8(b) {
            Ok(s) => NativeValue::Text(s),
            Err(e) => NativeValue::Bytes(e.into_bytes()),
        },
        (value, _) => value,
    }
}

/// Parse the timestamp text formats SQL databases commonly emit
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];
    for format in FORMATS {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
