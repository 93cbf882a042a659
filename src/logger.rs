use std::sync::Arc;

use log::kv::{self, Source, VisitSource};
use serde_json::{Map, Value};

use crate::backend::Backend;
use crate::record::LogRecord;
use crate::transport::SentryTransport;

/// Converts a [`log::Level`] to the name the level map is keyed by.
pub fn convert_log_level(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "error",
        log::Level::Warn => "warn",
        log::Level::Info => "info",
        log::Level::Debug => "debug",
        log::Level::Trace => "silly",
    }
}

/// Creates a [`LogRecord`] from a given [`log::Record`].
///
/// Key-values prefixed with `tags.` become tags, those prefixed with `user.`
/// become user fields and all others are kept as record fields.  The target
/// is used as `category` unless one is given.
pub fn record_from_log(record: &log::Record<'_>) -> LogRecord {
    let mut visitor = FieldVisitor::default();
    // the visitor never fails
    record.key_values().visit(&mut visitor).ok();

    let mut log_record = LogRecord::new(
        convert_log_level(record.level()),
        record.args().to_string(),
    );
    if !visitor.tags.is_empty() {
        log_record.tags = Some(Value::Object(visitor.tags));
    }
    if !visitor.user.is_empty() {
        log_record.user = Some(Value::Object(visitor.user));
    }
    log_record.fields = visitor.fields;
    log_record
        .fields
        .entry("category")
        .or_insert_with(|| record.target().into());
    log_record
}

#[derive(Default)]
struct FieldVisitor {
    tags: Map<String, Value>,
    user: Map<String, Value>,
    fields: Map<String, Value>,
}

impl<'kvs> VisitSource<'kvs> for FieldVisitor {
    fn visit_pair(&mut self, key: kv::Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        let key = key.as_str();
        let value = convert_kv_value(&value);
        if let Some(tag) = key.strip_prefix("tags.") {
            self.tags.insert(tag.to_owned(), value);
        } else if let Some(field) = key.strip_prefix("user.") {
            self.user.insert(field.to_owned(), value);
        } else {
            self.fields.insert(key.to_owned(), value);
        }
        Ok(())
    }
}

fn convert_kv_value(value: &kv::Value<'_>) -> Value {
    if let Some(b) = value.to_bool() {
        b.into()
    } else if let Some(n) = value.to_i64() {
        n.into()
    } else if let Some(n) = value.to_u64() {
        n.into()
    } else if let Some(n) = value.to_f64() {
        n.into()
    } else {
        value.to_string().into()
    }
}

/// A [`log::Log`] that hands records to a [`SentryTransport`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sentry_log_transport::{Logger, SentryBackend, SentryTransport, TransportOptions};
///
/// let transport = SentryTransport::new(SentryBackend::new(), TransportOptions::default()).unwrap();
/// let logger = Logger::new(Arc::new(transport));
/// log::set_boxed_logger(Box::new(logger)).unwrap();
/// log::set_max_level(log::LevelFilter::Info);
///
/// log::info!("Generates a breadcrumb");
/// ```
pub struct Logger<B> {
    transport: Arc<SentryTransport<B>>,
    filter: log::LevelFilter,
    dest_log: Option<Box<dyn log::Log>>,
}

impl<B: Backend> Logger<B> {
    /// Creates a logger forwarding `Info` and more severe records.
    pub fn new(transport: Arc<SentryTransport<B>>) -> Self {
        Logger {
            transport,
            filter: log::LevelFilter::Info,
            dest_log: None,
        }
    }

    /// Sets the most verbose level that is forwarded to the transport.
    #[must_use]
    pub fn filter(mut self, filter: log::LevelFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets a logger that receives every record as well.
    #[must_use]
    pub fn dest_log<L: log::Log + 'static>(mut self, logger: L) -> Self {
        self.dest_log = Some(Box::new(logger));
        self
    }
}

impl<B> std::fmt::Debug for Logger<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        #[derive(Debug)]
        struct DestLog;
        let dest_log = self.dest_log.as_ref().map(|_| DestLog);

        f.debug_struct("Logger")
            .field("filter", &self.filter)
            .field("dest_log", &dest_log)
            .finish()
    }
}

impl<B: Backend> log::Log for Logger<B> {
    fn enabled(&self, md: &log::Metadata<'_>) -> bool {
        md.level() <= self.filter || self.dest_log.as_ref().map_or(false, |x| x.enabled(md))
    }

    fn log(&self, record: &log::Record<'_>) {
        if record.level() <= self.filter {
            let options = self.transport.options();
            self.transport.log(record_from_log(record), |result| {
                if let Err(err) = result {
                    transport_debug!(options, "dropped log record: {}", err);
                }
            });
        }
        if let Some(ref log) = self.dest_log {
            if log.enabled(record.metadata()) {
                log.log(record);
            }
        }
    }

    fn flush(&self) {
        if let Err(err) = self.transport.flush() {
            transport_debug!(self.transport.options(), "flush failed: {}", err);
        }
        if let Some(ref log) = self.dest_log {
            log.flush();
        }
    }
}
