//! Query model and macro interpolation
//!
//! - **Context**: per-request record macros are evaluated against
//! - **Macros**: `$__name(args)` expansion over raw SQL
//! - **Duration**: compact duration literals (`5m`, `1h`, `250ms`)
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlframe::query::{interpolate, MacroSet, QueryContext};
//! use sqlframe::TimeRange;
//!
//! let ctx = QueryContext::new("SELECT * FROM t WHERE $__timeFilter(ts)", TimeRange::last_hours(6));
//! let sql = interpolate(&ctx, &MacroSet::default())?;
//! ```

mod context;
mod duration;
mod error;
pub mod macros;

pub use context::{FormatMode, QueryContext};
pub use duration::{format_duration, parse_duration};
pub use error::{MacroError, MacroResult};
pub use macros::{interpolate, MacroFn, MacroSet};
