//! # sqlframe
//!
//! Converts ad-hoc SQL query results into typed, columnar frames for
//! time-series and tabular visualization.
//!
//! ## Features
//!
//! - **Macro interpolation**: `$__timeFilter(ts)`, `$__timeGroup(ts, 5m)` and friends
//! - **Column conversion**: name, type and regex overrides over registry defaults
//! - **Dynamic typing**: sample rows to type columns drivers cannot describe
//! - **Resampling**: align time series on a fixed grid with fill policies
//!
//! ## Modules
//!
//! - [`query`]: Query context and macro interpolation
//! - [`source`]: Row sources (in-memory, SQLite)
//! - [`convert`]: Converter resolution and frame building
//! - [`frame`]: Typed columnar frames
//! - [`resample`]: Time-grid resampling
//! - [`pipeline`]: End-to-end query execution
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqlframe::source::sqlite::sqlite_macros;
//! use sqlframe::{QueryContext, QueryPipeline, TimeRange};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = rusqlite::Connection::open("metrics.db")?;
//!     let pipeline = QueryPipeline::new().with_macros(sqlite_macros());
//!
//!     let ctx = QueryContext::new(
//!         "SELECT ts, value FROM metrics WHERE $__timeFilter(ts) ORDER BY ts",
//!         TimeRange::last(chrono::Duration::hours(6)).ok_or("time range out of bounds")?,
//!     )
//!     .ref_id("A");
//!
//!     for frame in pipeline.run_sqlite(&conn, &ctx)? {
//!         println!("{}", frame.to_table_string());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod query;
pub mod resample;
pub mod source;

// Re-export top-level types for convenience
pub use frame::{Field, FieldType, FieldValue, Frame, FrameError, Notice, TimeRange};

pub use source::{
    ColumnMeta, MemoryRowSource, NativeKind, NativeValue, RowSource, SourceError, SqliteRowSource,
};

pub use query::{interpolate, FormatMode, MacroError, MacroSet, QueryContext};

pub use convert::{
    build_frame, build_frames, resolve_columns, ColumnBinding, ConvertError, Converter,
    TypeRegistry,
};

pub use resample::{resample, FillMode, ResampleError};

pub use pipeline::QueryPipeline;

pub use config::{generate_default_config, Config, ConfigError};

pub use error::{Error, Result};
