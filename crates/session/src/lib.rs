//! Parley Session Library Crate
//!
//! Client-side session lifecycle controller for real-time voice agent
//! connections. The controller owns the sequence from idle to actively
//! streaming capture audio: fetching short-lived connection credentials,
//! establishing the transport session, waiting for the transport to report
//! ready, and enabling the local capture device. It also owns the reverse
//! path on stop, error, and disposal.
//!
//! The transport, the credential endpoint, and the alert presentation are
//! all consumed through capability traits ([`SessionClient`],
//! [`CredentialSource`], [`NotificationSink`]); this crate implements only
//! the orchestration between them and the HTTP credential adapter.
//!
//! ```no_run
//! use std::sync::Arc;
//! use parley_session::{
//!     HttpCredentialSource, SessionConfig, SessionController, TracingSink,
//! };
//! # fn demo(client: Arc<dyn parley_session::SessionClient>) {
//! let config = SessionConfig::new(
//!     "https://sandbox.example.com/api/connection-details".parse().unwrap(),
//!     "sbx-1",
//! );
//! let controller = SessionController::new(
//!     config,
//!     Arc::new(HttpCredentialSource::new()),
//!     client,
//!     Arc::new(TracingSink),
//! );
//! controller.start();
//! # }
//! ```

pub mod client;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod notify;

pub use client::{CaptureOptions, ClientEvent, ConnectOptions, ConnectionState, SessionClient};
pub use config::{ConfigError, SessionConfig};
pub use controller::{ControllerState, SessionController};
pub use credentials::{ConnectionDescriptor, CredentialSource, HttpCredentialSource};
pub use error::SessionError;
pub use notify::{Notice, NotificationSink, TracingSink};
