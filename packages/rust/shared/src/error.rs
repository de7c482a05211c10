//! Error types for genscribe.
//!
//! Library crates use [`GenscribeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Message carried by a content-validation failure in the code extractor.
pub const CONTENT_VALIDATION_MESSAGE: &str = "Content does not meet specified settings";

/// Top-level error type for all genscribe operations.
#[derive(Debug, thiserror::Error)]
pub enum GenscribeError {
    /// Settings loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Completion API error (transport, auth, status, or response shape).
    #[error("completion error: {0}")]
    Completion(String),

    /// No fenced segment of a completion carried the required payload.
    #[error("{message}")]
    ContentValidation { message: String },

    /// Structured data inside a completion could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (serialization, invalid values, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GenscribeError>;

impl GenscribeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// The content-validation error raised when extraction finds no usable segment.
    pub fn content_validation() -> Self {
        Self::ContentValidation {
            message: CONTENT_VALIDATION_MESSAGE.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = GenscribeError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = GenscribeError::parse("expected value at line 1 column 2");
        assert!(err.to_string().contains("line 1 column 2"));
    }

    #[test]
    fn content_validation_message_is_verbatim() {
        let err = GenscribeError::content_validation();
        assert_eq!(err.to_string(), "Content does not meet specified settings");
    }

    #[test]
    fn io_error_mentions_path() {
        let err = GenscribeError::io(
            "/tmp/x/welcome.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = err.to_string();
        assert!(text.contains("welcome.json"));
        assert!(text.contains("denied"));
    }
}
