//! WebSocket connection, event loop and reconnection.
//!
//! [`Connection`] owns one socket at a time. A spawned supervisor task
//! opens it, runs the read/write loop, and on close asks the
//! [`Reconnector`] whether and when to try again.
//!
//! # Event Loop
//!
//! The supervisor task handles:
//!
//! - Incoming frames (fanned out as events, then correlated by action)
//! - Outgoing frames queued by [`Connection::send`]
//! - Backoff sleeps between reconnect attempts
//! - Shutdown requested by [`Connection::close`] or by dropping the last
//!   handle
//!
//! # Shared State
//!
//! The socket itself only lives inside the task. Connection state and the
//! pending-request table are shared with callers behind `parking_lot`
//! locks that are never held across an `.await` or while calling
//! subscribers.
//!
//! # Lifecycle Events
//!
//! Every `connect` and `close` starts a new epoch. `Connected`,
//! `Disconnected`, `Error` and `ReconnectFailed` are only emitted by the
//! supervisor whose epoch is current, and the epoch check, the state change
//! and the emission happen under one re-entrant lock. Subscribers therefore
//! see lifecycle events in the order the state changed: a replaced socket's
//! `Disconnected` always precedes the new socket's `Connected`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde_json::to_string;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::events::{ClientEvent, EventBus};
use crate::identifiers::RequestToken;
use crate::protocol::{Request, Response};

use super::correlator::Correlator;
use super::reconnect::{ReconnectPhase, ReconnectPolicy, Reconnector};

// ============================================================================
// Constants
// ============================================================================

/// Default time to wait for a matching response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type WsSink = futures_util::stream::SplitSink<WsStream, Message>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle of the underlying socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connect has been requested yet.
    Idle,
    /// Socket is being opened.
    Connecting,
    /// Socket is open; requests can be sent.
    Open,
    /// Close requested; socket is shutting down.
    Closing,
    /// Socket is closed (possibly waiting to reconnect).
    Closed,
}

// ============================================================================
// Internal Types
// ============================================================================

/// A serialized frame queued for the event loop.
struct Outbound {
    text: String,
    /// Set when a pending request waits on this frame.
    pending: Option<(String, RequestToken)>,
}

/// Socket bookkeeping guarded by one lock.
struct Link {
    /// Incremented by every `connect` and `close`; stale supervisors compare
    /// against it.
    epoch: u64,
    state: ConnectionState,
    /// Present only while the socket is open.
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
}

/// State shared between handles and the supervisor task.
struct Shared {
    link: Mutex<Link>,
    /// Held while a lifecycle transition is applied and announced.
    lifecycle: ReentrantMutex<()>,
    url: RwLock<Option<String>>,
    correlator: Mutex<Correlator>,
    reconnector: Mutex<Reconnector>,
    events: EventBus,
}

/// Running supervisor task.
struct Supervisor {
    shutdown_tx: watch::Sender<bool>,
}

/// Owned by the handles; dropping the last one drops `shutdown_tx`, which
/// stops the task.
struct ConnectionInner {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<Supervisor>>,
}

/// Why one socket's event loop ended.
enum LoopExit {
    /// Close requested locally.
    Shutdown,
    /// Peer closed or the socket failed.
    Lost(Option<String>),
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to the window service.
///
/// Handles request/response correlation, lifecycle events and automatic
/// reconnection. All methods are non-blocking; only [`request`] and
/// [`request_with_timeout`] suspend.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and cheap to clone; clones share the same
/// socket. The socket closes when the last clone is dropped.
///
/// [`request`]: Connection::request
/// [`request_with_timeout`]: Connection::request_with_timeout
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url())
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates an idle connection that reports to `events`.
    #[must_use]
    pub fn new(events: EventBus, policy: ReconnectPolicy) -> Self {
        let shared = Arc::new(Shared {
            link: Mutex::new(Link {
                epoch: 0,
                state: ConnectionState::Idle,
                outbound: None,
            }),
            lifecycle: ReentrantMutex::new(()),
            url: RwLock::new(None),
            correlator: Mutex::new(Correlator::new()),
            reconnector: Mutex::new(Reconnector::new(policy)),
            events,
        });

        Self {
            inner: Arc::new(ConnectionInner {
                shared,
                supervisor: Mutex::new(None),
            }),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Starts connecting to `url`.
    ///
    /// Returns once the supervisor task is spawned; the outcome arrives as
    /// a `Connected` or `Error` + `Disconnected` event. A malformed URL
    /// fails the same way a refused connection does and enters backoff.
    ///
    /// Any previous socket is closed first and the attempt counter resets.
    /// If it was open, `Disconnected` is emitted before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when called outside a Tokio runtime.
    pub fn connect(&self, url: impl Into<String>) -> Result<()> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::config("Connection::connect requires a Tokio runtime"))?;
        let url = url.into();
        let shared = &self.inner.shared;
        let _order = shared.lifecycle.lock();

        let (epoch, was_open) = self.retire(ConnectionState::Connecting);
        shared.correlator.lock().fail_all();
        shared.reconnector.lock().reset();
        *shared.url.write() = Some(url.clone());

        if was_open {
            shared
                .events
                .emit(&ClientEvent::Disconnected { reason: None });
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        runtime.spawn(run_supervisor(
            Arc::clone(shared),
            epoch,
            url.clone(),
            shutdown_rx,
        ));

        *self.inner.supervisor.lock() = Some(Supervisor { shutdown_tx });

        debug!(%url, epoch, "Connect requested");
        Ok(())
    }

    /// Reconnects to the last URL with a fresh attempt counter.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `connect` was never called
    /// - [`Error::Config`] when called outside a Tokio runtime
    pub fn reconnect(&self) -> Result<()> {
        let url = self
            .url()
            .ok_or_else(|| Error::config("No URL to reconnect to; call connect first"))?;
        self.connect(url)
    }

    /// Closes the socket and cancels any scheduled reconnect.
    ///
    /// Safe to call repeatedly and from any state. Outstanding requests are
    /// rejected with [`Error::ConnectionClosed`]. If the socket was open,
    /// `Disconnected` is emitted before this returns; nothing is emitted by
    /// the stopped task afterwards.
    pub fn close(&self) {
        let shared = &self.inner.shared;
        let _order = shared.lifecycle.lock();

        let (epoch, was_open) = self.retire(ConnectionState::Closing);
        shared.correlator.lock().fail_all();
        shared.reconnector.lock().reset();

        if was_open {
            info!("Connection closed by client");
            shared
                .events
                .emit(&ClientEvent::Disconnected { reason: None });
        }

        // A subscriber may have reconnected from inside the emit above.
        shared.with_current_link(epoch, |link| link.state = ConnectionState::Closed);
    }

    /// Stops the running supervisor and starts a new epoch in `next` state.
    ///
    /// Returns the new epoch and whether the socket was open.
    fn retire(&self, next: ConnectionState) -> (u64, bool) {
        if let Some(supervisor) = self.inner.supervisor.lock().take() {
            let _ = supervisor.shutdown_tx.send(true);
        }

        let mut link = self.inner.shared.link.lock();
        let was_open = link.state == ConnectionState::Open;
        link.epoch += 1;
        link.state = next;
        link.outbound = None;
        (link.epoch, was_open)
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Returns `true` if the socket is open right now.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Returns the socket state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.link.lock().state
    }

    /// Returns the reconnect state machine's phase.
    #[inline]
    #[must_use]
    pub fn reconnect_phase(&self) -> ReconnectPhase {
        self.inner.shared.reconnector.lock().phase()
    }

    /// Returns the URL last passed to `connect`.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.inner.shared.url.read().clone()
    }

    /// Returns the number of outstanding requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.shared.correlator.lock().len()
    }

    /// Returns the event bus this connection reports to.
    #[inline]
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.shared.events
    }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Serializes `request` and queues it on the open socket.
    ///
    /// No response is awaited. Nothing is buffered while disconnected.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the socket is not open
    /// - [`Error::Json`] if serialization fails
    pub fn send(&self, request: &Request) -> Result<()> {
        let text = to_string(request)?;
        self.enqueue(Outbound {
            text,
            pending: None,
        })
    }

    fn enqueue(&self, outbound: Outbound) -> Result<()> {
        let link = self.inner.shared.link.lock();
        if link.state != ConnectionState::Open {
            return Err(Error::NotConnected);
        }

        let sender = link.outbound.as_ref().ok_or(Error::NotConnected)?;
        sender.send(outbound).map_err(|_| Error::NotConnected)
    }

    /// Sends a request and waits for the response with the default
    /// timeout (10s).
    ///
    /// # Errors
    ///
    /// See [`request_with_timeout`](Connection::request_with_timeout).
    pub async fn request(&self, request: Request) -> Result<Response> {
        self.request_with_timeout(request, DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Sends a request and waits for the response with its action.
    ///
    /// A `success: false` response resolves normally.
    ///
    /// Do not issue two concurrent requests with the same action: the
    /// protocol cannot tell their responses apart, so the earlier one
    /// will time out.
    ///
    /// # Arguments
    ///
    /// * `request` - The request to send
    /// * `request_timeout` - Maximum time to wait for response
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] immediately if the socket is not open
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::ConnectionClosed`] if the socket closes first
    pub async fn request_with_timeout(
        &self,
        request: Request,
        request_timeout: Duration,
    ) -> Result<Response> {
        let shared = &self.inner.shared;
        let action = request.action.clone();
        let text = to_string(&request)?;

        let (token, response_rx) = shared.correlator.lock().register(&action);
        let guard = PendingGuard {
            shared,
            action: &action,
            token,
        };

        self.enqueue(Outbound {
            text,
            pending: Some((action.clone(), token)),
        })?;

        trace!(%action, %token, "Request sent");

        let result = match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                debug!(%action, %token, "Request timed out");
                Err(Error::request_timeout(
                    action.as_str(),
                    request_timeout.as_millis() as u64,
                ))
            }
        };

        drop(guard);
        result
    }
}

// ============================================================================
// PendingGuard
// ============================================================================

/// Removes a pending registration when the waiting caller leaves early
/// (timeout, send failure, or the future being dropped).
struct PendingGuard<'a> {
    shared: &'a Shared,
    action: &'a str,
    token: RequestToken,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.shared.correlator.lock().remove(self.action, self.token) {
            trace!(action = self.action, token = %self.token, "Pending request withdrawn");
        }
    }
}

// ============================================================================
// Shared
// ============================================================================

impl Shared {
    /// Runs `f` on the link if `epoch` is still current.
    fn with_current_link<T>(&self, epoch: u64, f: impl FnOnce(&mut Link) -> T) -> Option<T> {
        let mut link = self.link.lock();
        (link.epoch == epoch).then(|| f(&mut link))
    }

    fn mark_connecting(&self, epoch: u64) -> bool {
        let current = self
            .with_current_link(epoch, |link| link.state = ConnectionState::Connecting)
            .is_some();
        if current {
            self.reconnector.lock().on_connecting();
        }
        current
    }

    /// Publishes the open socket and announces `Connected`.
    fn open(&self, epoch: u64, outbound: mpsc::UnboundedSender<Outbound>, url: &str) -> bool {
        let _order = self.lifecycle.lock();
        let current = self
            .with_current_link(epoch, |link| {
                link.state = ConnectionState::Open;
                link.outbound = Some(outbound);
            })
            .is_some();
        if current {
            self.reconnector.lock().on_open();
            info!(%url, "WebSocket connected");
            self.events.emit(&ClientEvent::Connected {
                url: url.to_string(),
            });
        }
        current
    }

    /// Marks the socket closed, fails pending requests and announces
    /// `events`, all only if `epoch` is still current.
    fn close_with(&self, epoch: u64, events: &[ClientEvent]) -> bool {
        let _order = self.lifecycle.lock();
        let current = self
            .with_current_link(epoch, |link| {
                link.state = ConnectionState::Closed;
                link.outbound = None;
            })
            .is_some();
        if current {
            self.correlator.lock().fail_all();
            for event in events {
                self.events.emit(event);
            }
        }
        current
    }

    /// Emits `event` only if `epoch` is still current.
    fn emit_current(&self, epoch: u64, event: &ClientEvent) -> bool {
        let _order = self.lifecycle.lock();
        let current = self.link.lock().epoch == epoch;
        if current {
            self.events.emit(event);
        }
        current
    }

    /// Asks the reconnector for the next delay if `epoch` is still current.
    ///
    /// `None` means the epoch is stale; `Some(None)` means attempts ran out.
    fn next_attempt(&self, epoch: u64) -> Option<Option<Duration>> {
        let link = self.link.lock();
        (link.epoch == epoch).then(|| self.reconnector.lock().on_disconnected())
    }

    /// Parses one inbound frame, fans it out, then correlates it.
    fn handle_incoming(&self, text: &str) {
        let response = match Response::parse(text) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Dropping unparseable frame");
                return;
            }
        };

        trace!(action = %response.action, success = response.success, "Frame received");

        self.events.emit(&ClientEvent::Message(response.clone()));
        self.correlator.lock().resolve(response);
    }
}

// ============================================================================
// Supervisor Task
// ============================================================================

/// Connect, run, back off, repeat until shutdown or attempts run out.
async fn run_supervisor(
    shared: Arc<Shared>,
    epoch: u64,
    url: String,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if !shared.mark_connecting(epoch) {
            break;
        }

        let attempt = tokio::select! {
            result = connect_async(url.as_str()) => result,
            _ = shutdown_requested(&mut shutdown_rx) => {
                shared.close_with(epoch, &[]);
                break;
            }
        };

        match attempt {
            Ok((ws_stream, _)) => {
                let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
                if !shared.open(epoch, outbound_tx, &url) {
                    break;
                }

                let exit = run_event_loop(
                    &shared,
                    epoch,
                    ws_stream,
                    &mut outbound_rx,
                    &mut shutdown_rx,
                )
                .await;

                match exit {
                    LoopExit::Shutdown => {
                        // Only reached as current when the last handle was dropped.
                        shared.close_with(epoch, &[ClientEvent::Disconnected { reason: None }]);
                        break;
                    }
                    LoopExit::Lost(reason) => {
                        info!(reason = reason.as_deref().unwrap_or(""), "WebSocket disconnected");
                        if !shared.close_with(epoch, &[ClientEvent::Disconnected { reason }]) {
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(%url, error = %e, "WebSocket connection failed");
                let events = [
                    ClientEvent::Error {
                        message: Error::from(e).to_string(),
                    },
                    ClientEvent::Disconnected { reason: None },
                ];
                if !shared.close_with(epoch, &events) {
                    break;
                }
            }
        }

        if *shutdown_rx.borrow() {
            break;
        }

        let Some(next) = shared.next_attempt(epoch) else {
            break;
        };
        let Some(delay) = next else {
            let attempts = shared.reconnector.lock().attempt();
            error!(attempts, "Reconnect attempts exhausted; giving up");
            shared.emit_current(epoch, &ClientEvent::ReconnectFailed { attempts });
            break;
        };

        info!(
            attempt = shared.reconnector.lock().attempt(),
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        tokio::select! {
            () = sleep(delay) => {}
            _ = shutdown_requested(&mut shutdown_rx) => {
                debug!("Reconnect cancelled");
                break;
            }
        }
    }

    debug!(epoch, "Supervisor terminated");
}

/// Resolves once shutdown is signalled or every sender is gone.
async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

/// Read/write loop for one open socket.
async fn run_event_loop(
    shared: &Shared,
    epoch: u64,
    ws_stream: WsStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<Outbound>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> LoopExit {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            // Incoming frames from the server
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        shared.handle_incoming(&text);
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!("WebSocket closed by remote");
                        let reason = frame
                            .map(|f| f.reason.as_str().to_string())
                            .filter(|r| !r.is_empty());
                        return LoopExit::Lost(reason);
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        let message = Error::from(e).to_string();
                        let event = ClientEvent::Error {
                            message: message.clone(),
                        };
                        shared.emit_current(epoch, &event);
                        return LoopExit::Lost(Some(message));
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        return LoopExit::Lost(None);
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Frames queued by callers
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(outbound) => {
                        handle_outbound(shared, outbound, &mut ws_write).await;
                    }

                    // Link cleared by close() or a newer connect()
                    None => {
                        send_close(&mut ws_write).await;
                        return LoopExit::Shutdown;
                    }
                }
            }

            _ = shutdown_requested(shutdown_rx) => {
                debug!("Shutdown requested");
                send_close(&mut ws_write).await;
                return LoopExit::Shutdown;
            }
        }
    }
}

/// Writes one queued frame; a write failure rejects its pending request.
async fn handle_outbound(shared: &Shared, outbound: Outbound, ws_write: &mut WsSink) {
    if let Err(e) = ws_write.send(Message::Text(outbound.text.into())).await {
        warn!(error = %e, "Failed to write frame");
        if let Some((action, token)) = outbound.pending {
            shared.correlator.lock().fail(&action, token, Error::from(e));
        }
    }
}

/// Sends a Close frame, ignoring write errors.
async fn send_close(ws_write: &mut WsSink) {
    let _ = ws_write.send(Message::Close(None)).await;
    let _ = ws_write.close().await;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn idle() -> Connection {
        Connection::new(EventBus::new(), ReconnectPolicy::default())
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_REQUEST_TIMEOUT.as_secs(), 10);
    }

    #[test]
    fn test_new_connection_is_idle() {
        let connection = idle();
        assert_eq!(connection.state(), ConnectionState::Idle);
        assert_eq!(connection.reconnect_phase(), ReconnectPhase::Idle);
        assert!(!connection.is_connected());
        assert_eq!(connection.url(), None);
    }

    #[test]
    fn test_send_while_idle_fails_immediately() {
        let connection = idle();
        let err = connection.send(&Request::ping()).unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[test]
    fn test_connect_outside_runtime_fails() {
        let err = idle().connect("ws://127.0.0.1:1/ws").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_reconnect_without_url_fails() {
        assert!(matches!(idle().reconnect(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_close_is_idempotent() {
        let connection = idle();
        connection.close();
        connection.close();
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_close_retires_current_epoch() {
        let connection = idle();
        let shared = &connection.inner.shared;
        let before = shared.link.lock().epoch;

        connection.close();

        // A supervisor from the previous epoch can no longer open the link,
        // close it again, or emit anything.
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        shared
            .events
            .subscribe(crate::EventKind::Connected, move |_| *counter.lock() += 1);

        let (outbound_tx, _outbound_rx) = mpsc::unbounded_channel();
        assert!(!shared.open(before, outbound_tx, "ws://127.0.0.1:1/ws"));
        assert!(!shared.close_with(before, &[]));
        assert!(!shared.emit_current(before, &ClientEvent::ReconnectFailed { attempts: 5 }));
        assert_eq!(shared.next_attempt(before), None);

        assert_eq!(connection.state(), ConnectionState::Closed);
        assert!(!connection.is_connected());
        assert_eq!(*hits.lock(), 0);
        assert_eq!(connection.reconnect_phase(), ReconnectPhase::Idle);
    }

    #[tokio::test]
    async fn test_request_while_disconnected_rejects_without_waiting() {
        let connection = idle();

        let started = tokio::time::Instant::now();
        let err = connection
            .request_with_timeout(Request::ping(), Duration::from_secs(30))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotConnected));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(connection.pending_count(), 0);
    }
}
