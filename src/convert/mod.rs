//! Row-to-frame conversion
//!
//! - **Registry**: default converters keyed by native kind
//! - **Converter**: match keys plus a conversion function
//! - **Resolver**: one converter per column, first matching rule wins
//! - **Sampler**: data-driven typing for dynamic columns
//! - **Builder**: drives a row source into a typed frame
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlframe::convert::{build_frame, Converter, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! let overrides = vec![Converter::dynamic()];
//! let frame = build_frame(&mut source, 1000, &overrides, &registry)?;
//! ```

mod builder;
mod converter;
mod error;
mod registry;
mod resolver;
mod sampler;

pub use builder::{build_frame, build_frames, truncation_notice};
pub use converter::{ColumnConvertFn, ConvertFn, Converter, Matcher};
pub use error::{ConvertError, ConvertResult};
pub use registry::{to_bool, to_float64, to_int64, to_string_value, to_time, TypeRegistry};
pub use resolver::{resolve_columns, ColumnBinding, MatchRule};
pub use sampler::{inferred_converter, inferred_field_type, RowReader};
