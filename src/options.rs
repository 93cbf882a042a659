use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// How records that are not exceptions reach the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Records become breadcrumbs attached to the next event.
    #[default]
    Breadcrumbs,
    /// Records become message events carrying all fields as extra data.
    Messages,
    /// Records reset the ambient scope and become message events.
    Scope,
}

/// Configuration of a [`SentryTransport`](crate::SentryTransport).
///
/// Can be deserialized from the camelCase keys `levelsMap`, `silent`,
/// `captureMode`, `debug` and `shutdownTimeoutMs`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransportOptions {
    /// Overrides of the default level mapping, source level to severity name.
    pub levels_map: Option<BTreeMap<String, String>>,
    /// Drops every record without contacting the backend.
    pub silent: bool,
    /// How non-exception records are reported.
    pub capture_mode: CaptureMode,
    /// Prints diagnostics to stderr.
    pub debug: bool,
    /// How long [`close`](crate::SentryTransport::close) waits for the flush.
    #[serde(rename = "shutdownTimeoutMs", deserialize_with = "deserialize_millis")]
    pub shutdown_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> TransportOptions {
        TransportOptions {
            levels_map: None,
            silent: false,
            capture_mode: CaptureMode::default(),
            debug: false,
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

impl TransportOptions {
    /// Creates the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps the source level `level` to the backend severity `severity`.
    pub fn level<L: Into<String>, S: Into<String>>(mut self, level: L, severity: S) -> Self {
        self.levels_map
            .get_or_insert_with(BTreeMap::new)
            .insert(level.into(), severity.into());
        self
    }

    /// Enables or disables silent mode.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Sets the capture mode.
    pub fn capture_mode(mut self, mode: CaptureMode) -> Self {
        self.capture_mode = mode;
        self
    }

    /// Enables or disables debug output.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the shutdown timeout.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

fn deserialize_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}
