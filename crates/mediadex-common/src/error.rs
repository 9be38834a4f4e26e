//! Common error types used throughout mediadex.
//!
//! This module provides a unified error type covering the failure cases the
//! engine surfaces: invalid arguments, missing rows, busy/locked databases,
//! and wrapped storage failures.

/// Common error type for mediadex.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An operation was invoked before open or after close.
    #[error("Database not connected")]
    NotConnected,

    /// Invalid input was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No row matched a by-id lookup. Empty-result searches return an empty
    /// slice instead of this error.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The engine reported the database as busy or locked.
    #[error("Database busy: {0}")]
    Busy(String),

    /// A storage operation failed. The message carries a short prefix naming
    /// the operation plus the wrapped engine error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The background optimization sequence ended in a terminal failure.
    #[error("Optimization failed: {0}")]
    OptimizationFailed(String),

    /// The operation was cancelled before completion.
    #[error("Operation cancelled")]
    Cancelled,

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new InvalidArgument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Busy error.
    pub fn busy<S: Into<String>>(msg: S) -> Self {
        Self::Busy(msg.into())
    }

    /// Create a new Storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new OptimizationFailed error.
    pub fn optimization_failed<S: Into<String>>(msg: S) -> Self {
        Self::OptimizationFailed(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
