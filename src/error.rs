//! Crate-level error type
//!
//! Wraps the per-module errors so pipeline callers can use a single `?`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::convert::ConvertError;
use crate::query::MacroError;
use crate::resample::ResampleError;
use crate::source::SourceError;

/// Any error raised by the query-to-frame pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Macro(#[from] MacroError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Resample(#[from] ResampleError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Request envelope could not be parsed
    #[error("Invalid query request: {0}")]
    InvalidRequest(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Source(SourceError::Sqlite(e))
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
