//! Routes structured log records to Sentry.
//!
//! Each record is mapped from its source level (`silly`, `verbose`, `info`,
//! `debug`, `warn`, `error`) to a Sentry severity.  Records that end up at
//! `error` or `fatal` are captured as exceptions; everything else is reported
//! as a breadcrumb or a message event depending on the [`CaptureMode`].
//!
//! # Examples
//!
//! ```
//! use sentry_log_transport::{
//!     CaptureMode, LogRecord, SentryBackend, SentryTransport, TransportOptions,
//! };
//!
//! let options = TransportOptions::new()
//!     .level("verbose", "info")
//!     .capture_mode(CaptureMode::Messages);
//! let transport = SentryTransport::new(SentryBackend::new(), options).unwrap();
//!
//! let record = LogRecord::new("warn", "disk almost full")
//!     .with_tags(serde_json::json!({"host": "db-1"}))
//!     .with_field("free_bytes", 1024);
//! transport.log(record, |result| result.unwrap());
//!
//! transport.close().unwrap();
//! ```
//!
//! Records can also be deserialized from JSON, and the [`Logger`] forwards
//! records of the `log` crate.
//!
//! # Capture modes
//!
//! - [`CaptureMode::Breadcrumbs`]: non-exception records become breadcrumbs
//!   that are attached to the next event.
//! - [`CaptureMode::Messages`]: non-exception records become message events,
//!   all remaining record fields are attached as extra data.
//! - [`CaptureMode::Scope`]: the Sentry scope is cleared and filled with the
//!   record's tags, user and fields before every capture.
//!
//! # Features
//!
//! - `feature = "backtrace"` (default): parses stacks of error records into
//!   stack frames.
//! - `feature = "test"`: activates the [`test`] module with a backend that
//!   records all calls.

#![doc(html_favicon_url = "https://sentry-brand.storage.googleapis.com/favicon.ico")]
#![doc(html_logo_url = "https://sentry-brand.storage.googleapis.com/sentry-glyph-black.png")]
#![warn(missing_docs)]

// macros; these need to be first to be used by other modules
#[macro_use]
mod macros;

mod backend;
mod converters;
mod error;
mod hub;
mod levels;
mod logger;
mod options;
mod record;
mod transport;

pub use crate::backend::{Backend, BreadcrumbData, CaptureContext, ScopeWriter};
pub use crate::converters::{
    error_from_record, is_exception, route, BackendAction, Routing, ScopeUpdate,
};
pub use crate::error::{BackendError, ConfigError, Error, FlushTimeout, RecordError};
pub use crate::hub::{convert_severity, event_from_error_like, SentryBackend};
pub use crate::levels::{Severity, SeverityMap, DEFAULT_LEVELS};
pub use crate::logger::{convert_log_level, record_from_log, Logger};
pub use crate::options::{CaptureMode, TransportOptions};
pub use crate::record::{ErrorLike, LogRecord, MessageValue};
pub use crate::transport::{SentryTransport, TransportEvent};

// test utilities
#[cfg(any(test, feature = "test"))]
pub mod test;
