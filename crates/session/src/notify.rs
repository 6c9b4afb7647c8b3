//! Notification Sink Capability
//!
//! The controller never surfaces alerts itself; it forwards them through
//! this interface to whatever presentation layer the embedding application
//! provides.

use tracing::warn;

/// A user-facing alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Destination for user-facing alerts. Fire-and-forget: the controller
/// never consumes a return value and never retries delivery.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// A sink that logs notices through `tracing`.
///
/// Useful as a default in headless embeddings and in tests that only care
/// that a notice was produced.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notice: Notice) {
        warn!(title = %notice.title, description = %notice.description, "session notice");
    }
}
