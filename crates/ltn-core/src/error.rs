//! Unified error types for the LTN ecosystem
//!
//! This module provides a common error type [`LtnError`] that can represent
//! errors from any part of the system. Domain-specific failures are converted
//! to `LtnError` for uniform error handling at API boundaries.
//!
//! Two variants carry the pipeline's contract semantics:
//!
//! - [`LtnError::Precondition`] — an operation was invoked before the step it
//!   depends on (e.g. querying the canonical node ordering before a
//!   decomposition has run). The operation aborts without mutating state.
//! - [`LtnError::Validation`] — the input itself is unusable (malformed
//!   coordinates, negative edge weights, overlapping interior sets). The
//!   operation aborts without partial results.
//!
//! Structural inconsistency of a finished decomposition is deliberately *not*
//! an error; it is reported through [`crate::diagnostics::Diagnostics`] so
//! callers can proceed with degraded results.

use thiserror::Error;

/// Unified error type for all LTN operations.
#[derive(Error, Debug)]
pub enum LtnError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation invoked before a required prior step
    #[error("Precondition error: {0}")]
    Precondition(String),

    /// Network structure errors (dangling IDs, stale references)
    #[error("Network error: {0}")]
    Network(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using LtnError.
pub type LtnResult<T> = Result<T, LtnError>;

// Conversion from anyhow::Error
impl From<anyhow::Error> for LtnError {
    fn from(err: anyhow::Error) -> Self {
        LtnError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for LtnError {
    fn from(s: String) -> Self {
        LtnError::Other(s)
    }
}

impl From<&str> for LtnError {
    fn from(s: &str) -> Self {
        LtnError::Other(s.to_string())
    }
}

// JSON parsing errors
impl From<serde_json::Error> for LtnError {
    fn from(err: serde_json::Error) -> Self {
        LtnError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LtnError::Validation("latitude out of range".into());
        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("latitude out of range"));
    }

    #[test]
    fn test_precondition_display() {
        let err = LtnError::Precondition("decomposition has not run".into());
        assert!(err.to_string().contains("Precondition error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let ltn_err: LtnError = io_err.into();
        assert!(matches!(ltn_err, LtnError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> LtnResult<()> {
            Err(LtnError::Validation("test".into()))
        }

        fn outer() -> LtnResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
