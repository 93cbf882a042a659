use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{BackendError, ConfigError};

/// The built-in mapping of source levels to backend severities.
pub const DEFAULT_LEVELS: &[(&str, &str)] = &[
    ("silly", "debug"),
    ("verbose", "debug"),
    ("info", "info"),
    ("debug", "debug"),
    ("warn", "warning"),
    ("error", "error"),
];

/// A severity in the backend's vocabulary, e.g. `warning` or `fatal`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Severity(Cow<'static, str>);

impl Severity {
    /// Creates a severity from a backend severity name.
    pub fn new<S: Into<Cow<'static, str>>>(name: S) -> Severity {
        Severity(name.into())
    }

    /// Returns the severity name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether records of this severity are captured as exceptions.
    pub fn is_exception(&self) -> bool {
        matches!(self.as_str(), "fatal" | "error")
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<sentry_core::Level> for Severity {
    fn from(level: sentry_core::Level) -> Severity {
        Severity::new(level.to_string())
    }
}

/// Resolves source level names to backend severities.
///
/// The map starts out with [`DEFAULT_LEVELS`].  Overrides replace defaults
/// key by key and are resolved through the backend once, when the map is
/// built; the result is never modified afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct SeverityMap {
    levels: HashMap<String, Severity>,
}

impl Default for SeverityMap {
    fn default() -> SeverityMap {
        SeverityMap {
            levels: DEFAULT_LEVELS
                .iter()
                .map(|&(level, severity)| (level.to_owned(), Severity::new(severity)))
                .collect(),
        }
    }
}

impl SeverityMap {
    /// Builds the map from the defaults and a set of overrides.
    ///
    /// Every override value goes through `parse`; the first name it rejects
    /// fails the whole construction.
    pub fn with_overrides<F>(
        overrides: &BTreeMap<String, String>,
        mut parse: F,
    ) -> Result<SeverityMap, ConfigError>
    where
        F: FnMut(&str) -> Result<Severity, BackendError>,
    {
        let mut map = SeverityMap::default();
        for (level, severity) in overrides {
            if level.is_empty() {
                return Err(ConfigError::EmptyLevel);
            }
            let resolved = parse(severity).map_err(|source| ConfigError::InvalidSeverity {
                level: level.clone(),
                severity: severity.clone(),
                source,
            })?;
            map.levels.insert(level.clone(), resolved);
        }
        Ok(map)
    }

    /// Looks up the severity for a source level.
    ///
    /// Unknown levels yield `None`, which callers treat as "no severity".
    pub fn resolve(&self, level: &str) -> Option<&Severity> {
        self.levels.get(level)
    }
}
