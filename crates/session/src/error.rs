//! Session Error Classification
//!
//! Failures from the startup chain are classified by the stage they
//! occurred in and rendered into a single user-facing notice. Nothing in
//! the chain is retried; every real error returns the controller to idle.

use crate::notify::Notice;

/// Guidance shown instead of raw timeout/signalling errors. Those almost
/// always mean the server URL or agent dispatch is misconfigured, and the
/// raw message is useless to an end user.
const TIMEOUT_GUIDANCE: &str = "The session could not be established in time. \
    Verify the server address and that an agent is configured to join this sandbox.";

/// An error from one stage of the session startup chain.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The credential endpoint could not be reached or rejected the
    /// request.
    #[error("credential fetch failed: {0}")]
    CredentialFetch(anyhow::Error),
    /// The transport handshake failed, including timeouts.
    #[error("connect failed: {0}")]
    Connect(anyhow::Error),
    /// The capture device could not be enabled.
    #[error("capture device enable failed: {0}")]
    DeviceEnable(anyhow::Error),
    /// A completion from a chain that was overtaken by disposal or a state
    /// change. Suppressed, never reported.
    #[error("stale completion ignored")]
    Stale,
}

impl SessionError {
    /// Renders this error into the notice forwarded to the sink.
    ///
    /// Returns `None` for [`SessionError::Stale`], which by contract is
    /// never user-visible.
    pub fn notice(&self) -> Option<Notice> {
        // `{:#}` keeps the cause chain, e.g. "request failed: connection
        // refused" instead of the outermost context alone.
        let (title, detail) = match self {
            SessionError::CredentialFetch(err) => {
                ("Failed to fetch connection details", format!("{:#}", err))
            }
            SessionError::Connect(err) => ("Failed to connect to session", format!("{:#}", err)),
            SessionError::DeviceEnable(err) => {
                ("Microphone could not be enabled", format!("{:#}", err))
            }
            SessionError::Stale => return None,
        };

        let description = rewrite_timeout_message(detail);
        Some(Notice::new(title, description))
    }
}

/// Replaces timeout- and signalling-flavored messages with configuration
/// guidance. Presentation only; the original error is still logged by the
/// caller.
fn rewrite_timeout_message(detail: String) -> String {
    let lowered = detail.to_lowercase();
    if lowered.contains("timeout") || lowered.contains("signal") {
        TIMEOUT_GUIDANCE.to_string()
    } else {
        detail
    }
}
