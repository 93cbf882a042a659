use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tokio::sync::broadcast;

use crate::backend::Backend;
use crate::converters::{route, BackendAction, Routing};
use crate::error::{ConfigError, Error};
use crate::levels::{Severity, SeverityMap};
use crate::options::TransportOptions;
use crate::record::LogRecord;

const EVENT_CAPACITY: usize = 128;

/// Notifications sent to [`SentryTransport::subscribe`] receivers.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// A record went through [`SentryTransport::log`].
    Logged(Arc<LogRecord>),
    /// [`SentryTransport::close`] finished flushing the backend.
    Finished,
}

/// Routes log records to a [`Backend`].
///
/// Every record is resolved to a backend severity, classified as exception
/// or not, and reported according to the configured
/// [`CaptureMode`](crate::CaptureMode).
///
/// # Examples
///
/// ```
/// use sentry_log_transport::{LogRecord, SentryBackend, SentryTransport, TransportOptions};
///
/// let transport = SentryTransport::new(SentryBackend::new(), TransportOptions::default()).unwrap();
/// transport.log(LogRecord::new("info", "Generates a breadcrumb"), |result| {
///     assert!(result.is_ok());
/// });
/// transport.close().unwrap();
/// ```
pub struct SentryTransport<B> {
    backend: B,
    levels: SeverityMap,
    options: TransportOptions,
    scope_lock: Mutex<()>,
    scope_owner: Mutex<Option<ThreadId>>,
    closed: AtomicBool,
    events: broadcast::Sender<TransportEvent>,
}

/// Holds the scope lock and remembers the thread holding it.
struct ScopeGuard<'a> {
    owner: &'a Mutex<Option<ThreadId>>,
    _lock: MutexGuard<'a, ()>,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        *lock(self.owner) = None;
    }
}

/// Sends [`TransportEvent::Logged`] when dropped, also while unwinding.
struct LoggedNotification<'a> {
    events: &'a broadcast::Sender<TransportEvent>,
    record: Arc<LogRecord>,
}

impl Drop for LoggedNotification<'_> {
    fn drop(&mut self) {
        // no receivers is fine
        self.events
            .send(TransportEvent::Logged(self.record.clone()))
            .ok();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<B: Backend> SentryTransport<B> {
    /// Creates a transport reporting to `backend`.
    ///
    /// Level overrides are resolved through the backend right away; an
    /// override it does not recognize fails construction.
    pub fn new(backend: B, options: TransportOptions) -> Result<Self, ConfigError> {
        let levels = match options.levels_map {
            Some(ref overrides) => {
                SeverityMap::with_overrides(overrides, |name| backend.parse_severity(name))?
            }
            None => SeverityMap::default(),
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        transport_debug!(
            options,
            "transport created (mode: {:?}, silent: {})",
            options.capture_mode,
            options.silent
        );

        Ok(SentryTransport {
            backend,
            levels,
            options,
            scope_lock: Mutex::new(()),
            scope_owner: Mutex::new(None),
            closed: AtomicBool::new(false),
            events,
        })
    }

    /// Returns the options of the transport.
    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Resolves the backend severity of a source level.
    pub fn severity(&self, level: &str) -> Option<&Severity> {
        self.levels.resolve(level)
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Subscribes to [`TransportEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    /// Translates a record without reporting it.
    pub fn translate(&self, record: &LogRecord) -> Routing {
        route(
            self.options.capture_mode,
            record,
            self.levels.resolve(&record.level),
        )
    }

    /// Reports a record.
    ///
    /// `callback` is invoked exactly once with the outcome: immediately in
    /// silent mode, otherwise once the backend calls returned.  Backend
    /// failures are handed to the callback rather than propagated.
    ///
    /// The [`TransportEvent::Logged`] notification for the record is sent
    /// before `log` returns, once the callback returned or unwound, whatever
    /// the outcome.  Receivers observe it on their next `recv`.
    ///
    /// In [`CaptureMode::Scope`](crate::CaptureMode::Scope) a record logged
    /// from inside a backend call of the same thread, for example from a
    /// `before_send` hook, cannot touch the scope that is being set up for
    /// the outer record.  It is dropped with [`Error::Reentrant`].
    pub fn log<F>(&self, record: LogRecord, callback: F)
    where
        F: FnOnce(Result<(), Error>),
    {
        let logged = LoggedNotification {
            events: &self.events,
            record: Arc::new(record),
        };

        let result = if self.is_closed() {
            Err(Error::Closed)
        } else if self.options.silent {
            Ok(())
        } else {
            self.dispatch(self.translate(&logged.record))
        };

        if let Err(ref err) = result {
            transport_debug!(self.options, "failed to report record: {}", err);
        }
        callback(result);
        drop(logged);
    }

    /// Blocks until the backend sent all pending submissions.
    pub fn flush(&self) -> Result<(), Error> {
        self.backend
            .flush(self.options.shutdown_timeout)
            .map_err(Error::Flush)
    }

    /// Closes the transport.
    ///
    /// Blocks until the backend is flushed and only then sends
    /// [`TransportEvent::Finished`].  Records logged afterwards are
    /// rejected with [`Error::Closed`].
    pub fn close(&self) -> Result<(), Error> {
        self.closed.store(true, Ordering::SeqCst);
        transport_debug!(self.options, "closing transport");

        self.flush()?;
        self.notify(TransportEvent::Finished);
        Ok(())
    }

    fn dispatch(&self, routing: Routing) -> Result<(), Error> {
        // scope setup and the capture that reads it must not interleave
        let _guard = match routing.scope {
            Some(ref update) => {
                let guard = self.lock_scope()?;
                self.backend
                    .configure_scope(&mut |scope| update.apply(scope))
                    .map_err(Error::Backend)?;
                Some(guard)
            }
            None => None,
        };

        match routing.action {
            BackendAction::Exception {
                error,
                level,
                context,
            } => self
                .backend
                .capture_exception(&error, level.as_ref(), context.as_ref()),
            BackendAction::Message {
                message,
                level,
                context,
            } => self
                .backend
                .capture_message(&message, level.as_ref(), context.as_ref()),
            BackendAction::Breadcrumb(breadcrumb) => self.backend.add_breadcrumb(breadcrumb),
        }
        .map_err(Error::Backend)
    }

    fn lock_scope(&self) -> Result<ScopeGuard<'_>, Error> {
        let current = thread::current().id();
        if *lock(&self.scope_owner) == Some(current) {
            return Err(Error::Reentrant);
        }
        let guard = lock(&self.scope_lock);
        *lock(&self.scope_owner) = Some(current);
        Ok(ScopeGuard {
            owner: &self.scope_owner,
            _lock: guard,
        })
    }

    fn notify(&self, event: TransportEvent) {
        // no receivers is fine
        self.events.send(event).ok();
    }
}

impl<B> std::fmt::Debug for SentryTransport<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentryTransport")
            .field("levels", &self.levels)
            .field("options", &self.options)
            .field("closed", &self.closed)
            .finish()
    }
}
