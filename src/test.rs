//! This provides testing functionality for building tests.
//!
//! **Feature:** `test` (*disabled by default*)
//!
//! The [`RecordingBackend`] records every call the transport makes instead
//! of reporting anything, and keeps an in-memory scope so scope handling
//! can be inspected.
//!
//! # Example usage
//!
//! ```ignore
//! use sentry_log_transport::test::{BackendCall, RecordingBackend};
//! use sentry_log_transport::{LogRecord, SentryTransport, TransportOptions};
//!
//! let backend = RecordingBackend::new();
//! let transport = SentryTransport::new(backend.clone(), TransportOptions::default()).unwrap();
//! transport.log(LogRecord::new("error", "boom"), |_| {});
//!
//! let calls = backend.fetch_and_clear_calls();
//! assert!(matches!(calls[0], BackendCall::CaptureException { .. }));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::backend::{Backend, BreadcrumbData, CaptureContext, ScopeWriter};
use crate::error::BackendError;
use crate::levels::Severity;
use crate::record::ErrorLike;

/// A call made on a [`RecordingBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    /// `capture_exception` was called.
    CaptureException {
        /// The captured error.
        error: ErrorLike,
        /// The severity of the error.
        level: Option<Severity>,
        /// The capture context.
        context: Option<CaptureContext>,
    },
    /// `capture_message` was called.
    CaptureMessage {
        /// The captured message.
        message: String,
        /// The severity of the message.
        level: Option<Severity>,
        /// The capture context.
        context: Option<CaptureContext>,
    },
    /// `add_breadcrumb` was called.
    AddBreadcrumb(BreadcrumbData),
    /// The scope was cleared.
    ClearScope,
    /// Tags were set on the scope.
    SetTags(Map<String, Value>),
    /// Extras were set on the scope.
    SetExtras(Map<String, Value>),
    /// The user was set on the scope.
    SetUser(Map<String, Value>),
    /// `flush` was called.
    Flush,
}

impl BackendCall {
    /// Whether this call captured an event or recorded a breadcrumb.
    pub fn is_capture(&self) -> bool {
        matches!(
            self,
            BackendCall::CaptureException { .. }
                | BackendCall::CaptureMessage { .. }
                | BackendCall::AddBreadcrumb(_)
        )
    }
}

/// The in-memory scope of a [`RecordingBackend`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeState {
    /// The tags currently set.
    pub tags: Map<String, Value>,
    /// The extras currently set.
    pub extras: Map<String, Value>,
    /// The user currently set.
    pub user: Option<Map<String, Value>>,
}

struct RecordingScope<'a> {
    state: &'a mut ScopeState,
    calls: &'a mut Vec<BackendCall>,
}

impl ScopeWriter for RecordingScope<'_> {
    fn clear(&mut self) {
        *self.state = ScopeState::default();
        self.calls.push(BackendCall::ClearScope);
    }

    fn set_tags(&mut self, tags: &Map<String, Value>) {
        self.state
            .tags
            .extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.calls.push(BackendCall::SetTags(tags.clone()));
    }

    fn set_extras(&mut self, extras: &Map<String, Value>) {
        self.state
            .extras
            .extend(extras.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.calls.push(BackendCall::SetExtras(extras.clone()));
    }

    fn set_user(&mut self, user: &Map<String, Value>) {
        self.state.user = Some(user.clone());
        self.calls.push(BackendCall::SetUser(user.clone()));
    }
}

type CaptureHook = Arc<dyn Fn(&BackendCall) + Send + Sync>;

/// Records backend calls instead of sending them.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<BackendCall>>,
    scope: Mutex<ScopeState>,
    captured_scopes: Mutex<Vec<ScopeState>>,
    capture_hook: Mutex<Option<CaptureHook>>,
    fail_captures: AtomicBool,
    fail_flush: AtomicBool,
}

impl std::fmt::Debug for RecordingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingBackend")
            .field("calls", &self.calls)
            .field("scope", &self.scope)
            .field("fail_captures", &self.fail_captures)
            .field("fail_flush", &self.fail_flush)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingBackend {
    /// Creates a new recording backend.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> Arc<RecordingBackend> {
        Arc::new(RecordingBackend::default())
    }

    /// Makes every capture, breadcrumb and scope call fail.
    pub fn fail_captures(&self, fail: bool) {
        self.fail_captures.store(fail, Ordering::SeqCst);
    }

    /// Makes `flush` fail.
    pub fn fail_flush(&self, fail: bool) {
        self.fail_flush.store(fail, Ordering::SeqCst);
    }

    /// Returns the calls recorded so far.
    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }

    /// Fetches and clears the recorded calls.
    pub fn fetch_and_clear_calls(&self) -> Vec<BackendCall> {
        std::mem::take(&mut *lock(&self.calls))
    }

    /// Sets a function that runs after every recorded capture or breadcrumb.
    ///
    /// The hook runs on the capturing thread while the transport is still
    /// inside the backend call, the way Sentry runs `before_send`.
    pub fn set_capture_hook<F>(&self, hook: F)
    where
        F: Fn(&BackendCall) + Send + Sync + 'static,
    {
        *lock(&self.capture_hook) = Some(Arc::new(hook));
    }

    /// Returns the scope as it was at every captured event, in order.
    pub fn captured_scopes(&self) -> Vec<ScopeState> {
        lock(&self.captured_scopes).clone()
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.fail_captures.load(Ordering::SeqCst) {
            Err("backend unavailable".into())
        } else {
            Ok(())
        }
    }

    fn record_capture(&self, call: BackendCall) {
        let scope = lock(&self.scope).clone();
        lock(&self.captured_scopes).push(scope);
        self.record(call);
    }

    fn record(&self, call: BackendCall) {
        lock(&self.calls).push(call.clone());
        let hook = lock(&self.capture_hook).clone();
        if let Some(hook) = hook {
            hook(&call);
        }
    }
}

impl Backend for RecordingBackend {
    fn parse_severity(&self, name: &str) -> Result<Severity, BackendError> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            Err(format!("unknown severity `{}`", name).into())
        } else {
            Ok(Severity::new(name.to_owned()))
        }
    }

    fn capture_exception(
        &self,
        error: &ErrorLike,
        level: Option<&Severity>,
        context: Option<&CaptureContext>,
    ) -> Result<(), BackendError> {
        self.check()?;
        self.record_capture(BackendCall::CaptureException {
            error: error.clone(),
            level: level.cloned(),
            context: context.cloned(),
        });
        Ok(())
    }

    fn capture_message(
        &self,
        message: &str,
        level: Option<&Severity>,
        context: Option<&CaptureContext>,
    ) -> Result<(), BackendError> {
        self.check()?;
        self.record_capture(BackendCall::CaptureMessage {
            message: message.to_owned(),
            level: level.cloned(),
            context: context.cloned(),
        });
        Ok(())
    }

    fn add_breadcrumb(&self, breadcrumb: BreadcrumbData) -> Result<(), BackendError> {
        self.check()?;
        self.record(BackendCall::AddBreadcrumb(breadcrumb));
        Ok(())
    }

    fn configure_scope(
        &self,
        f: &mut dyn FnMut(&mut dyn ScopeWriter),
    ) -> Result<(), BackendError> {
        self.check()?;
        let mut state = lock(&self.scope);
        let mut calls = lock(&self.calls);
        f(&mut RecordingScope {
            state: &mut state,
            calls: &mut calls,
        });
        Ok(())
    }

    fn flush(&self, _timeout: Duration) -> Result<(), BackendError> {
        lock(&self.calls).push(BackendCall::Flush);
        if self.fail_flush.load(Ordering::SeqCst) {
            Err("flush failed".into())
        } else {
            Ok(())
        }
    }
}
