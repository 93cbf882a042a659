use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use sentry_core::protocol::{Event, Exception, IpAddress, Level, User};
use sentry_core::{Breadcrumb, Hub, Scope};

use crate::backend::{Backend, BreadcrumbData, CaptureContext, ScopeWriter};
use crate::error::{BackendError, FlushTimeout};
use crate::levels::Severity;
use crate::record::ErrorLike;

/// A [`Backend`] that reports to a Sentry [`Hub`].
///
/// By default the hub of the calling thread is used, which is what
/// `sentry::init` binds.  A specific hub can be bound with
/// [`SentryBackend::with_hub`].
#[derive(Clone, Default)]
pub struct SentryBackend {
    hub: Option<Arc<Hub>>,
}

impl SentryBackend {
    /// Creates a backend reporting to the current hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend reporting to the given hub.
    pub fn with_hub(hub: Arc<Hub>) -> Self {
        SentryBackend { hub: Some(hub) }
    }

    fn with_hub_ref<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Hub) -> R,
    {
        match self.hub {
            Some(ref hub) => f(hub),
            None => Hub::with(|hub| f(hub)),
        }
    }
}

impl std::fmt::Debug for SentryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentryBackend")
            .field("bound_hub", &self.hub.is_some())
            .finish()
    }
}

impl Backend for SentryBackend {
    fn parse_severity(&self, name: &str) -> Result<Severity, BackendError> {
        Ok(name.parse::<Level>()?.into())
    }

    fn capture_exception(
        &self,
        error: &ErrorLike,
        level: Option<&Severity>,
        context: Option<&CaptureContext>,
    ) -> Result<(), BackendError> {
        let mut event = event_from_error_like(error, level);
        if let Some(context) = context {
            apply_context(&mut event, context);
        }
        self.with_hub_ref(|hub| hub.capture_event(event));
        Ok(())
    }

    fn capture_message(
        &self,
        message: &str,
        level: Option<&Severity>,
        context: Option<&CaptureContext>,
    ) -> Result<(), BackendError> {
        let mut event = Event {
            message: Some(message.to_owned()),
            level: convert_severity(level),
            ..Default::default()
        };
        if let Some(context) = context {
            apply_context(&mut event, context);
        }
        self.with_hub_ref(|hub| hub.capture_event(event));
        Ok(())
    }

    fn add_breadcrumb(&self, breadcrumb: BreadcrumbData) -> Result<(), BackendError> {
        let breadcrumb = Breadcrumb {
            ty: breadcrumb.ty.unwrap_or_else(|| "default".into()),
            category: breadcrumb.category,
            level: convert_severity(breadcrumb.level.as_ref()),
            message: Some(breadcrumb.message),
            data: breadcrumb.data.into_iter().collect(),
            ..Default::default()
        };
        self.with_hub_ref(|hub| hub.add_breadcrumb(breadcrumb));
        Ok(())
    }

    fn configure_scope(
        &self,
        f: &mut dyn FnMut(&mut dyn ScopeWriter),
    ) -> Result<(), BackendError> {
        self.with_hub_ref(|hub| hub.configure_scope(|scope| f(scope)));
        Ok(())
    }

    fn flush(&self, timeout: Duration) -> Result<(), BackendError> {
        let client = match self.with_hub_ref(|hub| hub.client()) {
            Some(client) => client,
            None => return Ok(()),
        };
        if client.flush(Some(timeout)) {
            Ok(())
        } else {
            Err(Box::new(FlushTimeout(timeout)))
        }
    }
}

impl ScopeWriter for Scope {
    fn clear(&mut self) {
        Scope::clear(self);
    }

    fn set_tags(&mut self, tags: &Map<String, Value>) {
        for (key, value) in tags {
            self.set_tag(key, tag_value(value));
        }
    }

    fn set_extras(&mut self, extras: &Map<String, Value>) {
        for (key, value) in extras {
            self.set_extra(key, value.clone());
        }
    }

    fn set_user(&mut self, user: &Map<String, Value>) {
        Scope::set_user(self, Some(user_from_map(user)));
    }
}

/// Converts a severity into a Sentry [`Level`].
///
/// Unmapped levels and names Sentry does not know end up as `Info`.
pub fn convert_severity(severity: Option<&Severity>) -> Level {
    severity
        .and_then(|severity| severity.as_str().parse().ok())
        .unwrap_or(Level::Info)
}

/// Creates an exception [`Event`] from an [`ErrorLike`].
///
/// The event level follows `level`, falling back to `Error` when it is
/// missing or not a Sentry level.  The raw stack is kept verbatim in the
/// `stack` extra, frames are only attached when the stack parses as a
/// backtrace.
pub fn event_from_error_like(error: &ErrorLike, level: Option<&Severity>) -> Event<'static> {
    let stacktrace = error.stack.as_deref().and_then(parse_stack);
    let mut event = Event {
        level: level
            .and_then(|level| level.as_str().parse().ok())
            .unwrap_or(Level::Error),
        ..Default::default()
    };
    if let Some(ref stack) = error.stack {
        event.extra.insert("stack".into(), stack.clone().into());
    }
    event.exception = vec![Exception {
        ty: error.name.clone(),
        value: Some(error.message.clone()),
        stacktrace,
        ..Default::default()
    }]
    .into();
    event
}

#[cfg(feature = "backtrace")]
fn parse_stack(stack: &str) -> Option<sentry_core::protocol::Stacktrace> {
    sentry_backtrace::parse_stacktrace(stack)
}

#[cfg(not(feature = "backtrace"))]
fn parse_stack(_stack: &str) -> Option<sentry_core::protocol::Stacktrace> {
    None
}

fn apply_context(event: &mut Event<'static>, context: &CaptureContext) {
    if let Some(Value::Object(ref tags)) = context.tags {
        for (key, value) in tags {
            event.tags.insert(key.clone(), tag_value(value));
        }
    }
    match context.extra {
        Some(Value::Object(ref extra)) => {
            for (key, value) in extra {
                event.extra.insert(key.clone(), value.clone());
            }
        }
        Some(Value::Null) | None => {}
        Some(ref other) => {
            event.extra.insert("extra".into(), other.clone());
        }
    }
}

fn tag_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn user_from_map(map: &Map<String, Value>) -> User {
    let mut user = User::default();
    for (key, value) in map {
        match (key.as_str(), value) {
            ("id", Value::String(_)) | ("id", Value::Number(_)) => user.id = Some(tag_value(value)),
            ("email", Value::String(email)) => user.email = Some(email.clone()),
            ("username", Value::String(username)) => user.username = Some(username.clone()),
            ("ip_address", Value::String(ip)) => match ip.parse::<IpAddress>() {
                Ok(ip) => user.ip_address = Some(ip),
                Err(_) => {
                    user.other.insert(key.clone(), value.clone());
                }
            },
            _ => {
                user.other.insert(key.clone(), value.clone());
            }
        }
    }
    user
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_severity() {
        let backend = SentryBackend::new();
        assert_eq!(backend.parse_severity("warning").unwrap().as_str(), "warning");
        assert_eq!(backend.parse_severity("fatal").unwrap().as_str(), "fatal");
        assert!(backend.parse_severity("critical").is_err());
        assert!(backend.parse_severity("").is_err());
    }

    #[test]
    fn test_convert_severity() {
        assert_eq!(convert_severity(Some(&Severity::new("warning"))), Level::Warning);
        assert_eq!(convert_severity(Some(&Severity::new("fatal"))), Level::Fatal);
        assert_eq!(convert_severity(Some(&Severity::new("critical"))), Level::Info);
        assert_eq!(convert_severity(None), Level::Info);
    }

    #[test]
    fn test_event_from_error_like() {
        let event = event_from_error_like(
            &ErrorLike {
                name: "TypeError".into(),
                message: "x is undefined".into(),
                stack: Some("TypeError: x is undefined\n    at foo (app.js:1:2)".into()),
            },
            Some(&Severity::new("error")),
        );

        assert_eq!(event.level, Level::Error);
        let exception = &event.exception.values[0];
        assert_eq!(exception.ty, "TypeError");
        assert_eq!(exception.value.as_deref(), Some("x is undefined"));
        assert_eq!(
            event.extra["stack"],
            json!("TypeError: x is undefined\n    at foo (app.js:1:2)")
        );
    }

    #[test]
    fn test_event_without_stack() {
        let event = event_from_error_like(&ErrorLike::new("boom"), None);
        assert!(event.extra.is_empty());
        assert_eq!(event.exception.values[0].ty, "Error");
        assert_eq!(event.level, Level::Error);
    }

    #[test]
    fn test_fatal_exception_level() {
        let event = event_from_error_like(&ErrorLike::new("dead"), Some(&Severity::new("fatal")));
        assert_eq!(event.level, Level::Fatal);

        let event = event_from_error_like(&ErrorLike::new("dead"), Some(&Severity::new("critical")));
        assert_eq!(event.level, Level::Error);
    }

    #[test]
    fn test_apply_context() {
        let mut event = Event::default();
        apply_context(
            &mut event,
            &CaptureContext {
                tags: Some(json!({"region": "eu", "shard": 3})),
                extra: Some(json!({"job": "sync"})),
            },
        );
        assert_eq!(event.tags["region"], "eu");
        assert_eq!(event.tags["shard"], "3");
        assert_eq!(event.extra["job"], json!("sync"));

        let mut event = Event::default();
        apply_context(
            &mut event,
            &CaptureContext {
                tags: Some(json!("plain")),
                extra: Some(json!([1, 2])),
            },
        );
        assert!(event.tags.is_empty());
        assert_eq!(event.extra["extra"], json!([1, 2]));
    }

    #[test]
    fn test_user_from_map() {
        let user = user_from_map(
            json!({
                "id": 42,
                "email": "jane@example.com",
                "username": "jane",
                "ip_address": "127.0.0.1",
                "plan": "pro"
            })
            .as_object()
            .unwrap(),
        );

        assert_eq!(user.id.as_deref(), Some("42"));
        assert_eq!(user.email.as_deref(), Some("jane@example.com"));
        assert_eq!(user.username.as_deref(), Some("jane"));
        assert!(user.ip_address.is_some());
        assert_eq!(user.other["plan"], json!("pro"));
    }
}
