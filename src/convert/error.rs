//! Conversion error types

use thiserror::Error;

use crate::frame::FrameError;
use crate::source::SourceError;

/// Errors raised while binding columns or building frames
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Two columns in one result set share a name
    #[error("Duplicate column name '{0}' in result set")]
    DuplicateColumnName(String),

    /// No converter (not even a fallback) applies to a column
    #[error("No converter for column '{column}' of type '{type_name}'")]
    UnresolvedColumnType { column: String, type_name: String },

    /// A converter rejected a value; the frame is abandoned
    #[error("Failed to convert column '{column}' ({type_name}) at row {row}: {cause}")]
    Conversion {
        column: String,
        type_name: String,
        row: usize,
        cause: String,
    },

    /// The row source failed mid-iteration
    #[error("Failed to read row {row}: {source}")]
    Read {
        row: usize,
        #[source]
        source: SourceError,
    },

    /// Row source failure outside row iteration
    #[error("Row source error: {0}")]
    Source(#[from] SourceError),

    /// Converter definition cannot be used as a match rule
    #[error("Invalid converter '{name}': {reason}")]
    InvalidConverter { name: String, reason: String },

    /// Frame storage rejected a value
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Result type for conversion operations
pub type ConvertResult<T> = Result<T, ConvertError>;
