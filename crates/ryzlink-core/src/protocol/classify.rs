//! Response line classification
//!
//! Decides what a received line means to the transaction that is waiting for
//! it. The checks run in a fixed order: the expected substring wins over the
//! error marker, and both win over the notification filter. A line that
//! matches none of them is ordinary response payload.

use serde::{Deserialize, Serialize};

use super::{DEFAULT_NOTIFICATION_PREFIXES, ERROR_MARKER};

/// What a line means to the pending transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Contains the awaited completion marker
    Expected,
    /// Contains the error marker (and not the expected marker)
    Error,
    /// Unsolicited status report, dropped without touching the response
    Notification,
    /// Anything else: part of the response body
    Payload,
}

/// Prefixes of unsolicited lines that are ignored while waiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationFilter {
    prefixes: Vec<String>,
}

impl NotificationFilter {
    /// Build a filter from a list of prefixes
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Add another prefix
    pub fn push(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        if !self.prefixes.contains(&prefix) {
            self.prefixes.push(prefix);
        }
    }

    /// Configured prefixes
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether `line` is an unsolicited notification
    pub fn is_notification(&self, line: &str) -> bool {
        let line = line.trim_start();
        self.prefixes
            .iter()
            .any(|p| !p.is_empty() && line.starts_with(p.as_str()))
    }
}

impl Default for NotificationFilter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_PREFIXES.iter().copied())
    }
}

/// Classifier for one pending transaction
#[derive(Debug, Clone, Copy)]
pub struct LineClassifier<'a> {
    expected: &'a str,
    error_marker: &'a str,
    notifications: &'a NotificationFilter,
}

impl<'a> LineClassifier<'a> {
    /// Classifier for `expected` with an explicit error marker and filter
    pub fn new(
        expected: &'a str,
        error_marker: &'a str,
        notifications: &'a NotificationFilter,
    ) -> Self {
        Self {
            expected,
            error_marker,
            notifications,
        }
    }

    /// Classifier using the standard `ERROR` marker
    pub fn with_defaults(expected: &'a str, notifications: &'a NotificationFilter) -> Self {
        Self::new(expected, ERROR_MARKER, notifications)
    }

    /// Classify one line.
    ///
    /// Containment, not equality, is used for both markers: `+CME ERROR: 4`
    /// counts as an error and `+SQNHTTPRING: 1,200,...` matches `+SQNHTTPRING`.
    pub fn classify(&self, line: &str) -> LineClass {
        if line.contains(self.expected) {
            LineClass::Expected
        } else if !self.error_marker.is_empty() && line.contains(self.error_marker) {
            LineClass::Error
        } else if self.notifications.is_notification(line) {
            LineClass::Notification
        } else {
            LineClass::Payload
        }
    }
}
