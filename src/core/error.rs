//! Unified error handling for the application kernel
//!
//! This module provides a centralized error type system so that the
//! registry, lifecycle, and component modules do not depend on each
//! other for error handling.

use std::fmt;

/// Unified error types for the application kernel
#[derive(Debug)]
pub enum AppError {
    /// Configuration and wiring errors (unknown component, bad runtime path)
    Configuration(String),

    /// Lifecycle phase-order violations
    Lifecycle(String),

    /// Errors raised by a component's own logic
    Component(String),

    /// Filesystem and I/O errors
    Io(std::io::Error),

    /// Configuration schema validation errors
    Validation(String),

    /// Internal system errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            AppError::Lifecycle(msg) => write!(f, "Lifecycle error: {msg}"),
            AppError::Component(msg) => write!(f, "Component error: {msg}"),
            AppError::Io(err) => write!(f, "I/O error: {err}"),
            AppError::Validation(msg) => write!(f, "Validation error: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

/// Result type alias for kernel operations
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> AppResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Internal(format!("{context}: {e}")))
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::AppError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::AppError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! lifecycle_error {
    ($msg:expr) => {
        $crate::core::error::AppError::Lifecycle($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::AppError::Lifecycle(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::core::error::AppError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::AppError::Internal(format!($fmt, $($arg)*))
    };
}
