//! Session Lifecycle Controller
//!
//! This module implements the core state machine that takes a session from
//! idle to actively streaming capture audio and back. It coordinates three
//! asynchronous sub-protocols: fetching short-lived connection credentials,
//! establishing and monitoring the transport session, and enabling the
//! local capture device only once the session is confirmed ready.

use crate::client::{CaptureOptions, ClientEvent, ConnectOptions, ConnectionState, SessionClient};
use crate::config::SessionConfig;
use crate::credentials::CredentialSource;
use crate::error::SessionError;
use crate::notify::{Notice, NotificationSink};
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

/// How long to wait for the transport's `Connected` event after `connect`
/// resolves. Connect resolving and the event firing are not synchronous;
/// enabling capture before the transport is ready can drop the first audio
/// frames, while waiting forever would hang the startup chain if the event
/// was missed.
const CONNECTED_EVENT_FALLBACK: Duration = Duration::from_millis(5000);

/// Lifecycle phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No session and no attempt in flight.
    Idle,
    /// A startup chain is running.
    Starting,
    /// The session is connected and capture is enabled.
    Active,
    /// Disposal teardown is in progress.
    Stopping,
}

/// Cancellation context for in-flight startup continuations.
///
/// Set exactly once at disposal and never reset. Continuations check it
/// before mutating state or reporting errors, turning "cancel" into
/// "ignore stale results": the underlying network operations cannot be
/// aborted mid-flight.
#[derive(Clone, Default)]
struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct Inner {
    config: SessionConfig,
    credentials: Arc<dyn CredentialSource>,
    client: Arc<dyn SessionClient>,
    sink: Arc<dyn NotificationSink>,
    state: watch::Sender<ControllerState>,
    active: watch::Sender<bool>,
    cancel: CancelToken,
    disposed: AtomicBool,
    bridge: Mutex<Option<JoinHandle<()>>>,
}

/// Orchestrates the session lifecycle: credential fetch, transport
/// connect, readiness wait, capture enable, and teardown.
///
/// The caller-facing surface is deliberately narrow: [`start`], [`stop`],
/// the observable active flag, and [`close`] for disposal. Failures are
/// never returned to the caller; they are reported once through the
/// [`NotificationSink`].
///
/// [`start`]: SessionController::start
/// [`stop`]: SessionController::stop
/// [`close`]: SessionController::close
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Creates a controller around the given collaborators and starts the
    /// transport event bridge.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: SessionConfig,
        credentials: Arc<dyn CredentialSource>,
        client: Arc<dyn SessionClient>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let (state, _) = watch::channel(ControllerState::Idle);
        let (active, _) = watch::channel(false);
        let inner = Arc::new(Inner {
            config,
            credentials,
            client,
            sink,
            state,
            active,
            cancel: CancelToken::default(),
            disposed: AtomicBool::new(false),
            bridge: Mutex::new(None),
        });

        let bridge = tokio::spawn(run_event_bridge(inner.clone()));
        if let Ok(mut slot) = inner.bridge.lock() {
            *slot = Some(bridge);
        }

        Self { inner }
    }

    /// Begins a session if none is starting or active.
    ///
    /// The active flag flips to `true` before credentials are even
    /// fetched, so the caller observes activity immediately. Idempotent
    /// while a chain is in flight: repeated calls issue no second
    /// credential fetch and no second connect. Failures surface through
    /// the notification sink, never here.
    pub fn start(&self) {
        if self.inner.cancel.is_cancelled() {
            warn!("start called on a disposed controller");
            return;
        }

        let launched = self.inner.state.send_if_modified(|state| match *state {
            ControllerState::Starting | ControllerState::Active => false,
            _ => {
                *state = ControllerState::Starting;
                true
            }
        });
        if !launched {
            debug!("start ignored; a session is already starting or active");
            return;
        }

        self.inner.active.send_replace(true);

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let result = inner.run_startup().await;
            inner.finish_startup(result).await;
        });
    }

    /// Signals that the caller no longer wants the session.
    ///
    /// Synchronously returns the controller to idle and clears the active
    /// flag. Does not disconnect the transport; that is disposal's job.
    pub fn stop(&self) {
        info!("session stop requested");
        self.inner.enter_idle();
    }

    /// Current value of the active flag.
    pub fn is_active(&self) -> bool {
        *self.inner.active.borrow()
    }

    /// Current lifecycle phase, for observability.
    pub fn state(&self) -> ControllerState {
        *self.inner.state.borrow()
    }

    /// Subscribes to changes of the active flag.
    pub fn watch_active(&self) -> watch::Receiver<bool> {
        self.inner.active.subscribe()
    }

    /// Disposes the controller: silences in-flight continuations, stops
    /// the event bridge, and disconnects the transport unconditionally.
    ///
    /// The disconnect happens exactly once no matter how often `close` is
    /// called or in which state the controller is.
    pub async fn close(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.bridge.lock().ok().and_then(|mut slot| slot.take()) {
            handle.abort();
        }

        self.inner.state.send_replace(ControllerState::Stopping);
        self.inner.active.send_replace(false);

        if let Err(err) = self.inner.client.disconnect().await {
            warn!(error = %err, "disconnect during disposal failed");
        }

        self.inner.state.send_replace(ControllerState::Idle);
        info!("session controller disposed");
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        // Last-resort teardown for callers that never reached close():
        // silence stale continuations and stop the bridge task. The
        // transport disconnect needs the async close() path.
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.bridge.lock().ok().and_then(|mut slot| slot.take()) {
            handle.abort();
        }
    }
}

impl Inner {
    /// Runs the startup chain: fetch credentials, connect, wait for the
    /// transport to report ready, enable capture.
    ///
    /// The cancellation token is checked after every suspension point so a
    /// chain overtaken by disposal stops mutating anything.
    #[instrument(name = "session_startup", skip_all, fields(sandbox = %self.config.sandbox_id))]
    async fn run_startup(&self) -> Result<(), SessionError> {
        let descriptor = self
            .credentials
            .fetch(&self.config)
            .await
            .map_err(SessionError::CredentialFetch)?;
        if self.cancel.is_cancelled() {
            return Err(SessionError::Stale);
        }

        self.client
            .connect(
                &descriptor.server_url,
                descriptor.participant_token.expose_secret(),
                ConnectOptions::default(),
            )
            .await
            .map_err(SessionError::Connect)?;
        if self.cancel.is_cancelled() {
            return Err(SessionError::Stale);
        }

        self.wait_until_connected().await;
        if self.cancel.is_cancelled() {
            return Err(SessionError::Stale);
        }

        self.client
            .enable_capture(
                true,
                self.config.capture_device_id.as_deref(),
                CaptureOptions {
                    pre_connect_buffer: self.config.pre_connect_buffer,
                },
            )
            .await
            .map_err(SessionError::DeviceEnable)?;

        Ok(())
    }

    /// Settles the outcome of a startup chain: promote to active, discard
    /// a stale completion, or report the failure and force teardown.
    async fn finish_startup(&self, result: Result<(), SessionError>) {
        match result {
            Ok(()) => {
                if self.cancel.is_cancelled()
                    || !self.transition_if(ControllerState::Starting, ControllerState::Active)
                {
                    trace!("discarding stale startup completion");
                    return;
                }
                info!("session active");
            }
            Err(SessionError::Stale) => {
                trace!("discarding stale startup completion");
            }
            Err(err) => {
                if self.cancel.is_cancelled() {
                    trace!("suppressing startup error after disposal");
                    return;
                }
                warn!(error = %err, "session startup failed");
                if let Some(notice) = err.notice() {
                    self.sink.notify(notice);
                }
                // No half-open sessions: tear the transport down even if
                // it was only partially connected.
                if let Err(disconnect_err) = self.client.disconnect().await {
                    warn!(error = %disconnect_err, "disconnect after failed startup also failed");
                }
                self.enter_idle();
            }
        }
    }

    /// Waits until the transport reports connected, bounded by
    /// [`CONNECTED_EVENT_FALLBACK`].
    ///
    /// Subscribes before checking the state accessor so an event firing in
    /// between cannot be missed. Whichever of event and timer fires first
    /// wins; the wait's subscription is dropped either way.
    async fn wait_until_connected(&self) {
        let mut events = self.client.subscribe();
        if self.client.connection_state() == ConnectionState::Connected {
            return;
        }

        let fallback = tokio::time::sleep(CONNECTED_EVENT_FALLBACK);
        tokio::pin!(fallback);
        loop {
            tokio::select! {
                _ = &mut fallback => {
                    warn!(
                        waited_ms = CONNECTED_EVENT_FALLBACK.as_millis() as u64,
                        "connected event not observed; enabling capture anyway"
                    );
                    return;
                }
                event = events.recv() => match event {
                    Ok(ClientEvent::Connected) => {
                        debug!("transport reported connected");
                        return;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "event stream lagged during connected wait");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // No events will ever arrive; honor the bounded
                        // wait before proceeding.
                        fallback.as_mut().await;
                        return;
                    }
                },
            }
        }
    }

    fn handle_client_event(&self, event: ClientEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        match event {
            ClientEvent::Disconnected => {
                info!("transport disconnected");
                self.enter_idle();
            }
            ClientEvent::MediaDeviceError { message } => {
                // The connection may still be alive; report without
                // touching it.
                warn!(error = %message, "media device error");
                self.sink.notify(Notice::new("Media device error", message));
            }
            ClientEvent::ConnectionStateChanged(ConnectionState::Disconnected) => {
                info!("connection state moved to disconnected");
                self.enter_idle();
            }
            ClientEvent::ConnectionStateChanged(state) => {
                debug!(?state, "connection state changed");
            }
            ClientEvent::Connected => {}
        }
    }

    fn enter_idle(&self) {
        self.state.send_replace(ControllerState::Idle);
        self.active.send_replace(false);
    }

    fn transition_if(&self, from: ControllerState, to: ControllerState) -> bool {
        let mut moved = false;
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                moved = true;
                true
            } else {
                false
            }
        });
        moved
    }
}

/// Forwards transport lifecycle events into the controller for the
/// client's full lifetime. Aborted at disposal.
async fn run_event_bridge(inner: Arc<Inner>) {
    let mut events = inner.client.subscribe();
    loop {
        match events.recv().await {
            Ok(event) => inner.handle_client_event(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "dropped transport events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
