use serde_json::{Map, Value};

use crate::backend::{BreadcrumbData, CaptureContext, ScopeWriter};
use crate::levels::Severity;
use crate::options::CaptureMode;
use crate::record::{as_object, is_truthy, ErrorLike, LogRecord, MessageValue};

/// The backend call a record translates into.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendAction {
    /// Capture an error event.
    Exception {
        /// The error to report.
        error: ErrorLike,
        /// The resolved severity, `error` or `fatal`.
        level: Option<Severity>,
        /// Tags and extra data for this capture only.
        context: Option<CaptureContext>,
    },
    /// Capture a message event.
    Message {
        /// The rendered record message.
        message: String,
        /// The resolved severity.
        level: Option<Severity>,
        /// Tags and extra data for this capture only.
        context: Option<CaptureContext>,
    },
    /// Record a breadcrumb.
    Breadcrumb(BreadcrumbData),
}

/// Replaces the backend's ambient scope before a capture.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeUpdate {
    /// The record's tags, when they are an object.
    pub tags: Option<Map<String, Value>>,
    /// All remaining record fields.
    pub extras: Map<String, Value>,
    /// The record's user, when it is an object.
    pub user: Option<Map<String, Value>>,
}

impl ScopeUpdate {
    /// Clears the scope and sets the new values.
    pub fn apply(&self, scope: &mut dyn ScopeWriter) {
        scope.clear();
        if let Some(ref tags) = self.tags {
            scope.set_tags(tags);
        }
        scope.set_extras(&self.extras);
        if let Some(ref user) = self.user {
            scope.set_user(user);
        }
    }
}

/// The translation of a single record.
#[derive(Clone, Debug, PartialEq)]
pub struct Routing {
    /// Scope changes to apply before `action`.
    pub scope: Option<ScopeUpdate>,
    /// The capture call to make.
    pub action: BackendAction,
}

/// Checks if a record with this severity is captured as an exception.
pub fn is_exception(level: Option<&Severity>) -> bool {
    level.map_or(false, Severity::is_exception)
}

/// Creates the [`ErrorLike`] reported for an exception record.
///
/// Errors pass through untouched.  Text messages are wrapped, taking the
/// name and stack from the record's `name` and `stack` fields.
pub fn error_from_record(record: &LogRecord) -> ErrorLike {
    match record.message {
        MessageValue::Error(ref error) => error.clone(),
        MessageValue::Text(ref text) => ErrorLike {
            name: record
                .field_str("name")
                .filter(|name| !name.is_empty())
                .unwrap_or("Error")
                .to_owned(),
            message: text.clone(),
            stack: record.field_str("stack").map(ToOwned::to_owned),
        },
    }
}

/// Translates a record according to the capture mode.
pub fn route(mode: CaptureMode, record: &LogRecord, level: Option<&Severity>) -> Routing {
    match mode {
        CaptureMode::Breadcrumbs => route_breadcrumbs(record, level),
        CaptureMode::Messages => route_messages(record, level),
        CaptureMode::Scope => route_scope(record, level),
    }
}

fn route_breadcrumbs(record: &LogRecord, level: Option<&Severity>) -> Routing {
    let tags = record.tags.clone();
    let extra = record.field("extra").cloned();

    let action = if is_exception(level) {
        BackendAction::Exception {
            error: error_from_record(record),
            level: level.cloned(),
            context: Some(CaptureContext { tags, extra }),
        }
    } else {
        let mut data = Map::new();
        if let Some(extra) = extra.filter(is_truthy) {
            data.insert("extra".into(), extra);
        }
        if let Some(tags) = tags.filter(is_truthy) {
            data.insert("tags".into(), tags);
        }
        BackendAction::Breadcrumb(BreadcrumbData {
            message: record.message.to_text(),
            level: level.cloned(),
            category: record.field_str("category").map(ToOwned::to_owned),
            ty: record.field_str("type").map(ToOwned::to_owned),
            data,
        })
    };

    Routing {
        scope: None,
        action,
    }
}

fn route_messages(record: &LogRecord, level: Option<&Severity>) -> Routing {
    let mut extra = record.fields.clone();
    if let Some(ref user) = record.user {
        extra.insert("user".into(), user.clone());
    }
    let context = CaptureContext {
        tags: record.tags.clone(),
        extra: Some(Value::Object(extra)),
    };

    let action = if is_exception(level) {
        BackendAction::Exception {
            error: error_from_record(record),
            level: level.cloned(),
            context: Some(context),
        }
    } else {
        BackendAction::Message {
            message: record.message.to_text(),
            level: level.cloned(),
            context: Some(context),
        }
    };

    Routing {
        scope: None,
        action,
    }
}

fn route_scope(record: &LogRecord, level: Option<&Severity>) -> Routing {
    let scope = ScopeUpdate {
        tags: as_object(record.tags.as_ref()).cloned(),
        extras: record.fields.clone(),
        user: as_object(record.user.as_ref()).cloned(),
    };

    let action = if is_exception(level) {
        BackendAction::Exception {
            error: error_from_record(record),
            level: level.cloned(),
            context: None,
        }
    } else {
        BackendAction::Message {
            message: record.message.to_text(),
            level: level.cloned(),
            context: None,
        }
    };

    Routing {
        scope: Some(scope),
        action,
    }
}
