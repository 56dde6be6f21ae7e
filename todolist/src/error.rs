//! Error types for the todo list.
//!
//! This module defines the error hierarchy shared by the task store, the HTTP
//! layer and the interactive prompt.
//!
//! # Error Types
//!
//! - [`TodoError::NotFound`] - No task carries the requested ID
//! - [`TodoError::Validation`] - Malformed input (dates, priorities, IDs, bodies)
//! - [`TodoError::Io`] - Reading or writing the backing file failed
//! - [`TodoError::Parse`] - The backing file holds malformed JSON
//! - [`TodoError::IdsExhausted`] - The highest task ID is already `u32::MAX`
//!
//! # Example
//!
//! ```rust
//! use todolist::error::TodoError;
//!
//! let err = TodoError::validation("Invalid date format");
//! assert!(err.is_client_error());
//! ```

use thiserror::Error;

/// Top-level error type for task list operations.
#[derive(Debug, Error)]
pub enum TodoError {
    /// No task with the given ID exists.
    #[error("task with ID {0} not found")]
    NotFound(u32),

    /// User-supplied input was rejected.
    ///
    /// Covers bad date formats, unknown priorities, non-numeric task IDs and
    /// undecodable request bodies.
    #[error("validation error: {0}")]
    Validation(String),

    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file could not be encoded or decoded as JSON.
    #[error("malformed task file: {0}")]
    Parse(#[from] serde_json::Error),

    /// No ID above the current maximum is left to assign.
    #[error("no task IDs left above {0}")]
    IdsExhausted(u32),
}

impl TodoError {
    /// Creates a new validation error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use todolist::error::TodoError;
    ///
    /// let err = TodoError::validation("unknown priority 'urgent'");
    /// assert!(matches!(err, TodoError::Validation(_)));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns `true` if this error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Validation(_))
    }

    /// Returns `true` if this error came from the backing file.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Parse(_))
    }
}

/// A specialized Result type for task list operations.
pub type Result<T> = std::result::Result<T, TodoError>;
