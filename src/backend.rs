use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::BackendError;
use crate::levels::Severity;
use crate::record::ErrorLike;

/// Tags and extra data sent along with a single capture call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CaptureContext {
    /// The record's tags, if any.
    pub tags: Option<Value>,
    /// The record's extra data, if any.
    pub extra: Option<Value>,
}

/// A breadcrumb produced from a non-exception record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BreadcrumbData {
    /// The rendered record message.
    pub message: String,
    /// The resolved severity, `None` for unmapped levels.
    pub level: Option<Severity>,
    /// The record's `category` field.
    pub category: Option<String>,
    /// The record's `type` field.
    pub ty: Option<String>,
    /// Holds `extra` and `tags` when the record carries them.
    pub data: Map<String, Value>,
}

/// Mutable access to the backend's ambient scope.
pub trait ScopeWriter {
    /// Removes everything from the scope.
    fn clear(&mut self);
    /// Sets the tags of the scope.
    fn set_tags(&mut self, tags: &Map<String, Value>);
    /// Sets the extra data of the scope.
    fn set_extras(&mut self, extras: &Map<String, Value>);
    /// Sets the user of the scope.
    fn set_user(&mut self, user: &Map<String, Value>);
}

/// The event-reporting backend records are routed to.
///
/// [`SentryBackend`](crate::SentryBackend) implements this for the Sentry
/// hub.  Implementations own transport, batching and retries; every method
/// is called synchronously from [`SentryTransport::log`](crate::SentryTransport::log).
pub trait Backend: Send + Sync {
    /// Resolves a severity name into the backend's vocabulary.
    ///
    /// Used once per level override while the transport is constructed.
    fn parse_severity(&self, name: &str) -> Result<Severity, BackendError>;

    /// Captures an error event at the given severity.
    fn capture_exception(
        &self,
        error: &ErrorLike,
        level: Option<&Severity>,
        context: Option<&CaptureContext>,
    ) -> Result<(), BackendError>;

    /// Captures a message event.
    fn capture_message(
        &self,
        message: &str,
        level: Option<&Severity>,
        context: Option<&CaptureContext>,
    ) -> Result<(), BackendError>;

    /// Records a breadcrumb.
    fn add_breadcrumb(&self, breadcrumb: BreadcrumbData) -> Result<(), BackendError>;

    /// Invokes `f` with the backend's ambient scope.
    fn configure_scope(&self, f: &mut dyn FnMut(&mut dyn ScopeWriter))
        -> Result<(), BackendError>;

    /// Blocks until pending submissions are sent or `timeout` expires.
    fn flush(&self, timeout: Duration) -> Result<(), BackendError>;
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn parse_severity(&self, name: &str) -> Result<Severity, BackendError> {
        (**self).parse_severity(name)
    }

    fn capture_exception(
        &self,
        error: &ErrorLike,
        level: Option<&Severity>,
        context: Option<&CaptureContext>,
    ) -> Result<(), BackendError> {
        (**self).capture_exception(error, level, context)
    }

    fn capture_message(
        &self,
        message: &str,
        level: Option<&Severity>,
        context: Option<&CaptureContext>,
    ) -> Result<(), BackendError> {
        (**self).capture_message(message, level, context)
    }

    fn add_breadcrumb(&self, breadcrumb: BreadcrumbData) -> Result<(), BackendError> {
        (**self).add_breadcrumb(breadcrumb)
    }

    fn configure_scope(
        &self,
        f: &mut dyn FnMut(&mut dyn ScopeWriter),
    ) -> Result<(), BackendError> {
        (**self).configure_scope(f)
    }

    fn flush(&self, timeout: Duration) -> Result<(), BackendError> {
        (**self).flush(timeout)
    }
}
