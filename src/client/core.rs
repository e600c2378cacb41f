//! Window client facade.
//!
//! [`WindowClient`] is the public surface: one method per window action,
//! each building a canonical [`Request`] and awaiting the matching
//! [`Response`] through the shared [`Connection`].
//!
//! No retries happen at this layer. A failed or timed-out request is
//! returned as-is, and a `success: false` response is returned as `Ok`.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use window_relay::{EventKind, WindowClient};
//!
//! # async fn example() -> window_relay::Result<()> {
//! let client = WindowClient::builder().build().await?;
//! client.wait_connected(Duration::from_secs(5)).await?;
//!
//! client.subscribe(EventKind::Message, |event| println!("{event:?}"));
//!
//! let response = client.create_window("notes", "https://example.com", true).await?;
//! if !response.is_success() {
//!     eprintln!("create failed: {}", response.message);
//! }
//!
//! for window in client.windows().await? {
//!     println!("{} -> {}", window.label, window.url);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::{ClientEvent, EventBus, EventKind};
use crate::identifiers::SubscriptionId;
use crate::protocol::{Request, Response, WindowInfo};
use crate::transport::{Connection, ConnectionState, ReconnectPhase};

use super::builder::ClientBuilder;
use super::options::ClientOptions;

// ============================================================================
// WindowClient
// ============================================================================

/// Client for the window management service.
///
/// Cheap to clone; clones share one socket, one pending table and one
/// event bus. The socket closes when the last clone is dropped or on
/// [`close`](WindowClient::close).
///
/// # Concurrency
///
/// Requests for different actions may run concurrently. Two concurrent
/// requests with the same action cannot be told apart on the wire: the
/// later one receives the response and the earlier one times out.
#[derive(Clone)]
pub struct WindowClient {
    connection: Connection,
    options: ClientOptions,
    url: String,
}

impl fmt::Debug for WindowClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowClient")
            .field("url", &self.url)
            .field("state", &self.connection_state())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// WindowClient - Construction
// ============================================================================

impl WindowClient {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates an unconnected client for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the options are invalid.
    pub fn new(url: impl Into<String>, options: ClientOptions, events: EventBus) -> Result<Self> {
        options.validate()?;
        let policy = options.reconnect_policy()?;

        Ok(Self {
            connection: Connection::new(events, policy),
            options,
            url: url.into(),
        })
    }

    /// Returns the URL this client connects to.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the client options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns the underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

// ============================================================================
// WindowClient - Lifecycle
// ============================================================================

impl WindowClient {
    /// Starts connecting in the background.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) outside a Tokio runtime.
    pub fn connect(&self) -> Result<()> {
        debug!(url = %self.url, "Connecting");
        self.connection.connect(self.url.as_str())
    }

    /// Restarts the connection with a fresh attempt counter.
    ///
    /// Use after a `ReconnectFailed` event or an explicit close.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) outside a Tokio runtime.
    pub fn reconnect(&self) -> Result<()> {
        debug!(url = %self.url, "Reconnecting");
        self.connection.connect(self.url.as_str())
    }

    /// Waits until the socket is open.
    ///
    /// `build()` and [`connect`](WindowClient::connect) return before the
    /// socket opens; await this before the first request. Returns at once
    /// if the socket is already open. Keeps waiting through backoff.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no connect is in progress or the client was closed
    /// - [`Error::Connection`] if reconnection gave up
    /// - [`Error::RequestTimeout`] if the socket is not open within `wait`
    pub async fn wait_connected(&self, wait: Duration) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let kinds = [EventKind::Connected, EventKind::Disconnected];
        let ids = kinds.map(|kind| {
            let tx = tx.clone();
            self.subscribe(kind, move |_| {
                let _ = tx.send(());
            })
        });
        drop(tx);

        // Subscribed before the first check so no transition is missed.
        let outcome = timeout(wait, async {
            loop {
                if let Some(outcome) = self.connect_outcome() {
                    return outcome;
                }
                if rx.recv().await.is_none() {
                    return Err(Error::NotConnected);
                }
            }
        })
        .await;

        for (kind, id) in kinds.into_iter().zip(ids) {
            self.unsubscribe(kind, id);
        }

        outcome.unwrap_or_else(|_| {
            Err(Error::request_timeout("connect", wait.as_millis() as u64))
        })
    }

    /// Settled result of the current connect, or `None` while in progress.
    fn connect_outcome(&self) -> Option<Result<()>> {
        match (self.connection_state(), self.reconnect_phase()) {
            (ConnectionState::Open, _) => Some(Ok(())),
            (_, ReconnectPhase::GivenUp) => {
                Some(Err(Error::connection("Reconnect attempts exhausted")))
            }
            (ConnectionState::Idle | ConnectionState::Closing, _)
            | (ConnectionState::Closed, ReconnectPhase::Idle) => Some(Err(Error::NotConnected)),
            _ => None,
        }
    }

    /// Closes the socket and cancels any pending reconnect.
    ///
    /// Safe to call repeatedly.
    #[inline]
    pub fn close(&self) {
        self.connection.close();
    }

    /// Returns `true` if the socket is open. No network round trip.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Returns the socket state.
    #[inline]
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Returns the reconnect phase.
    #[inline]
    #[must_use]
    pub fn reconnect_phase(&self) -> ReconnectPhase {
        self.connection.reconnect_phase()
    }

    /// Returns the number of requests awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.connection.pending_count()
    }
}

// ============================================================================
// WindowClient - Events
// ============================================================================

impl WindowClient {
    /// Returns the event bus.
    #[inline]
    #[must_use]
    pub fn events(&self) -> &EventBus {
        self.connection.events()
    }

    /// Registers a callback for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.events().subscribe(kind, callback)
    }

    /// Removes a callback. Unknown ids are ignored.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.events().unsubscribe(kind, id)
    }
}

// ============================================================================
// WindowClient - Requests
// ============================================================================

impl WindowClient {
    /// Sends any request with the configured timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`](crate::Error::NotConnected) if the socket is not open
    /// - [`Error::RequestTimeout`](crate::Error::RequestTimeout) if no response arrives in time
    /// - [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if the socket closes first
    pub async fn request(&self, request: Request) -> Result<Response> {
        self.connection
            .request_with_timeout(request, self.options.request_timeout)
            .await
    }

    /// Sends any request with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Same as [`request`](WindowClient::request).
    pub async fn request_with_timeout(
        &self,
        request: Request,
        request_timeout: Duration,
    ) -> Result<Response> {
        self.connection
            .request_with_timeout(request, request_timeout)
            .await
    }

    /// Opens a new window.
    ///
    /// # Arguments
    ///
    /// * `label` - Unique window label
    /// * `url` - Page to load
    /// * `transparent` - Create with a transparent background
    ///
    /// # Errors
    ///
    /// Transport failures only; see [`request`](WindowClient::request).
    pub async fn create_window(
        &self,
        label: &str,
        url: &str,
        transparent: bool,
    ) -> Result<Response> {
        debug!(label, url, transparent, "Creating window");
        self.request(Request::create_window(label, url, transparent)).await
    }

    /// Opens a new transparent window.
    ///
    /// # Errors
    ///
    /// Transport failures only; see [`request`](WindowClient::request).
    pub async fn create_window_default(&self, label: &str, url: &str) -> Result<Response> {
        self.create_window(label, url, true).await
    }

    /// Closes a window.
    ///
    /// # Errors
    ///
    /// Transport failures only; see [`request`](WindowClient::request).
    pub async fn close_window(&self, label: &str) -> Result<Response> {
        debug!(label, "Closing window");
        self.request(Request::close_window(label)).await
    }

    /// Brings a window to the front.
    ///
    /// # Errors
    ///
    /// Transport failures only; see [`request`](WindowClient::request).
    pub async fn focus_window(&self, label: &str) -> Result<Response> {
        self.request(Request::focus_window(label)).await
    }

    /// Lists all windows.
    ///
    /// # Errors
    ///
    /// Transport failures only; see [`request`](WindowClient::request).
    pub async fn list_windows(&self) -> Result<Response> {
        self.request(Request::list_windows()).await
    }

    /// Fetches one window's details.
    ///
    /// # Errors
    ///
    /// Transport failures only; see [`request`](WindowClient::request).
    pub async fn get_window_info(&self, label: &str) -> Result<Response> {
        self.request(Request::get_window_info(label)).await
    }

    /// Reloads a window's page.
    ///
    /// # Errors
    ///
    /// Transport failures only; see [`request`](WindowClient::request).
    pub async fn reload_window(&self, label: &str) -> Result<Response> {
        self.request(Request::reload_window(label)).await
    }

    /// Points a window at a new URL.
    ///
    /// # Errors
    ///
    /// Transport failures only; see [`request`](WindowClient::request).
    pub async fn navigate_window(&self, label: &str, url: &str) -> Result<Response> {
        debug!(label, url, "Navigating window");
        self.request(Request::navigate_window(label, url)).await
    }

    /// Flips a window's transparency.
    ///
    /// # Errors
    ///
    /// Transport failures only; see [`request`](WindowClient::request).
    pub async fn toggle_transparency(&self, label: &str) -> Result<Response> {
        self.request(Request::toggle_transparency(label)).await
    }

    /// Flips a window's always-on-top flag.
    ///
    /// # Errors
    ///
    /// Transport failures only; see [`request`](WindowClient::request).
    pub async fn toggle_always_on_top(&self, label: &str) -> Result<Response> {
        self.request(Request::toggle_always_on_top(label)).await
    }

    /// Sets a window's always-on-top flag.
    ///
    /// # Errors
    ///
    /// Transport failures only; see [`request`](WindowClient::request).
    pub async fn set_always_on_top(
        &self,
        label: &str,
        always_on_top: bool,
    ) -> Result<Response> {
        self.request(Request::set_always_on_top(label, always_on_top)).await
    }

    /// Round-trips a `ping`.
    ///
    /// # Errors
    ///
    /// Transport failures only; see [`request`](WindowClient::request).
    pub async fn ping(&self) -> Result<Response> {
        self.request(Request::ping()).await
    }
}

// ============================================================================
// WindowClient - Typed Views
// ============================================================================

impl WindowClient {
    /// Lists windows and decodes them, preserving server order.
    ///
    /// # Errors
    ///
    /// - Any error from [`list_windows`](WindowClient::list_windows)
    /// - [`Error::Rejected`](crate::Error::Rejected) if the server reported failure
    /// - [`Error::Protocol`](crate::Error::Protocol) if the payload is malformed
    pub async fn windows(&self) -> Result<Vec<WindowInfo>> {
        self.list_windows().await?.into_result()?.windows()
    }

    /// Fetches and decodes one window.
    ///
    /// # Errors
    ///
    /// - Any error from [`get_window_info`](WindowClient::get_window_info)
    /// - [`Error::Rejected`](crate::Error::Rejected) if the server reported failure
    /// - [`Error::Protocol`](crate::Error::Protocol) if the payload is malformed
    pub async fn window_info(&self, label: &str) -> Result<WindowInfo> {
        self.get_window_info(label).await?.into_result()?.window()
    }
}

// ============================================================================
// Tests
// ============================================================================
