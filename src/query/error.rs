//! Query error types
//!
//! Defines the error conditions raised while interpolating macros into SQL.
//! All of them are fatal for the query: no partially interpolated text is
//! ever returned.

use thiserror::Error;

/// Errors that can occur during macro interpolation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MacroError {
    /// Invocation names a macro with no registered definition
    #[error("Unknown macro '$__{name}' at position {position}")]
    UnknownMacro { name: String, position: usize },

    /// A macro rejected its arguments
    #[error("Invalid arguments for macro '$__{name}': {reason}")]
    MacroArgument { name: String, reason: String },

    /// Invocation syntax could not be parsed (e.g. unbalanced parentheses)
    #[error("Malformed invocation of '$__{name}' at position {position}: {reason}")]
    MalformedInvocation {
        name: String,
        position: usize,
        reason: String,
    },
}

impl MacroError {
    /// Argument error for a macro
    pub fn argument(name: &str, reason: impl Into<String>) -> Self {
        MacroError::MacroArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Argument-count error for a macro
    pub fn argument_count(name: &str, expected: &str, actual: usize) -> Self {
        Self::argument(name, format!("expected {} argument(s), received {}", expected, actual))
    }
}

/// Result type for macro operations
pub type MacroResult<T> = Result<T, MacroError>;
