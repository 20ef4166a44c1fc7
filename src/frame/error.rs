//! Frame error types

use thiserror::Error;

use super::FieldType;

/// Errors raised while assembling or reading a frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// A value of one type was appended to a field of another
    #[error("Type mismatch in field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        actual: FieldType,
    },

    /// Fields in one frame disagree on their row count
    #[error("Field '{field}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
}

/// Result type for frame operations
pub type FrameResult<T> = Result<T, FrameError>;
