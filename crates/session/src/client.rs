//! Session Client Capability Set
//!
//! This module defines the contract the controller consumes to drive the
//! live connection to a remote agent room. The transport itself (media
//! encoding, signalling, reconnection internals) lives behind this trait;
//! the controller only sequences it.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Coarse connection state reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection is established.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The connection is established and usable.
    Connected,
    /// The transport lost the connection and is re-establishing it on its
    /// own. Not session-ending.
    Reconnecting,
}

/// Lifecycle events emitted by the transport.
///
/// Consumers subscribe through [`SessionClient::subscribe`]; each receiver
/// observes the full event stream from the point of subscription.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The transport finished connecting. May arrive after `connect`
    /// already resolved; the two are not guaranteed synchronous.
    Connected,
    /// The transport disconnected and will not recover on its own.
    Disconnected,
    /// A capture or playback device failed. The connection itself may
    /// still be alive.
    MediaDeviceError { message: String },
    /// The transport moved between connection states.
    ConnectionStateChanged(ConnectionState),
}

/// Options applied when establishing the connection.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Automatically subscribe to remote tracks as they are published.
    pub auto_subscribe: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self { auto_subscribe: true }
    }
}

/// Options applied when enabling the local capture device.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Buffer audio captured before the remote agent has joined, so the
    /// first utterance is not lost.
    pub pre_connect_buffer: bool,
}

/// The live connection to a remote agent room.
///
/// An implementation owns exactly one underlying transport connection at a
/// time. Only the owning controller calls `connect`/`disconnect`; a second
/// `connect` while one is outstanding is meaningless and is guarded
/// against upstream.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Establishes the connection to `url` authorized by `token`.
    async fn connect(&self, url: &str, token: &str, options: ConnectOptions) -> Result<()>;

    /// Tears down the connection. Safe to call when already disconnected.
    async fn disconnect(&self) -> Result<()>;

    /// Enables or disables the local capture device.
    ///
    /// `device_id` selects a specific input; `None` uses the platform
    /// default.
    async fn enable_capture(
        &self,
        enabled: bool,
        device_id: Option<&str>,
        options: CaptureOptions,
    ) -> Result<()>;

    /// The transport's current connection state.
    fn connection_state(&self) -> ConnectionState;

    /// Subscribes to the transport's lifecycle event stream.
    fn subscribe(&self) -> broadcast::Receiver<ClientEvent>;
}
