//! Custom error types for taskloop.
//!
//! This module provides structured error types that separate input errors
//! (rejected synchronously, no state mutation) from the few genuinely
//! exceptional conditions that should propagate as hard failures.

use thiserror::Error;

/// Main error type for taskloop operations
#[derive(Error, Debug)]
pub enum TaskLoopError {
    // =========================================================================
    // Input Errors
    // =========================================================================
    /// The plan text contained no parseable tasks
    #[error("No tasks found in plan - expected unchecked checklist items under a 'Tasks' heading")]
    NoTasksFound,

    /// Plan identifier contains path-escaping characters
    #[error("Invalid plan identifier '{id}': identifiers must not contain path separators or '..'")]
    InvalidIdentifier { id: String },

    // =========================================================================
    // State Errors
    // =========================================================================
    /// No loop state is persisted for this project
    #[error("No active loop - run 'taskloop init' first")]
    NoActiveLoop,

    /// Summary requested but no state exists
    #[error("No data - nothing has been initialized for this project")]
    NoData,

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskLoopError {
    /// Create an invalid-identifier error
    pub fn invalid_identifier(id: impl Into<String>) -> Self {
        Self::InvalidIdentifier { id: id.into() }
    }

    /// Check if this error was caused by caller input rather than the system
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NoTasksFound | Self::InvalidIdentifier { .. } | Self::NoActiveLoop | Self::NoData
        )
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoTasksFound | Self::InvalidIdentifier { .. } => 2,
            Self::NoActiveLoop | Self::NoData => 3,
            _ => 1,
        }
    }
}

/// Type alias for taskloop results
pub type Result<T> = std::result::Result<T, TaskLoopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TaskLoopError::invalid_identifier("../escape");
        assert!(err.to_string().contains("../escape"));

        let err = TaskLoopError::NoActiveLoop;
        assert!(err.to_string().contains("taskloop init"));
    }

    #[test]
    fn test_is_user_error() {
        assert!(TaskLoopError::NoTasksFound.is_user_error());
        assert!(TaskLoopError::invalid_identifier("x/y").is_user_error());
        assert!(TaskLoopError::NoActiveLoop.is_user_error());
        assert!(TaskLoopError::NoData.is_user_error());

        let io_err: TaskLoopError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(!io_err.is_user_error());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(TaskLoopError::NoTasksFound.exit_code(), 2);
        assert_eq!(TaskLoopError::invalid_identifier("..").exit_code(), 2);
        assert_eq!(TaskLoopError::NoActiveLoop.exit_code(), 3);
        assert_eq!(TaskLoopError::NoData.exit_code(), 3);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TaskLoopError = io_err.into();
        assert!(matches!(err, TaskLoopError::Io(_)));
        assert!(err.to_string().contains("missing"));
        assert_eq!(err.exit_code(), 1);
    }
}
