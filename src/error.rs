use std::time::Duration;

use thiserror::Error;

/// The error type reported by [`Backend`](crate::Backend) calls.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Raised while constructing a [`SentryTransport`](crate::SentryTransport).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A level override was keyed by an empty source level.
    #[error("source level names must not be empty")]
    EmptyLevel,
    /// The backend rejected the severity name of a level override.
    #[error("invalid severity `{severity}` for level `{level}`")]
    InvalidSeverity {
        /// The source level that was overridden.
        level: String,
        /// The severity name the backend did not recognize.
        severity: String,
        /// The error returned by the backend.
        #[source]
        source: BackendError,
    },
}

/// Runtime errors of the transport.
#[derive(Debug, Error)]
pub enum Error {
    /// A capture, breadcrumb or scope call failed on the backend.
    #[error("backend call failed")]
    Backend(#[source] BackendError),
    /// Flushing the backend failed.
    #[error("flushing the backend failed")]
    Flush(#[source] BackendError),
    /// The record arrived after the transport was closed.
    #[error("transport is closed")]
    Closed,
    /// The record was logged from inside a scope capture on the same thread.
    #[error("record logged from within a scoped capture was dropped")]
    Reentrant,
}

/// Raised when a JSON value cannot be turned into a [`LogRecord`](crate::LogRecord).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// The record is not a JSON object.
    #[error("log record must be an object")]
    NotAnObject,
    /// The `level` field is missing, empty or not a string.
    #[error("log record is missing a level")]
    MissingLevel,
    /// The `message` field is missing.
    #[error("log record is missing a message")]
    MissingMessage,
}

/// A flush did not complete within its deadline.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("flush did not complete within {0:?}")]
pub struct FlushTimeout(pub Duration);
