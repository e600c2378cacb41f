//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`WindowClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use window_relay::WindowClient;
//!
//! # async fn example() -> window_relay::Result<()> {
//! let client = WindowClient::builder()
//!     .url("ws://127.0.0.1:8080/ws")
//!     .request_timeout(Duration::from_secs(5))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::Result;
use crate::events::EventBus;

use super::core::WindowClient;
use super::discovery::{HostInvoke, ServerSource};
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`WindowClient`] instance.
///
/// Use [`WindowClient::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Where the server URL comes from.
    source: ServerSource,
    /// Timing and reconnection options.
    options: ClientOptions,
    /// Externally owned event bus, if any.
    events: Option<EventBus>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder targeting the development server with default
    /// options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects to a fixed URL.
    ///
    /// # Arguments
    ///
    /// * `url` - WebSocket URL (e.g., "ws://127.0.0.1:8080/ws")
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.source = ServerSource::explicit(url);
        self
    }

    /// Asks the native host shell for the URL.
    #[inline]
    #[must_use]
    pub fn host(mut self, invoke: impl HostInvoke + 'static) -> Self {
        self.source = ServerSource::host(invoke);
        self
    }

    /// Derives the URL from the serving page's origin.
    ///
    /// # Arguments
    ///
    /// * `origin` - Page origin (e.g., "https://app.example.com")
    #[inline]
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.source = ServerSource::origin(origin);
        self
    }

    /// Sets the URL source directly.
    #[inline]
    #[must_use]
    pub fn source(mut self, source: ServerSource) -> Self {
        self.source = source;
        self
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the default request timeout.
    #[inline]
    #[must_use]
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.options = self.options.with_request_timeout(request_timeout);
        self
    }

    /// Sets the delay before the first reconnect attempt.
    #[inline]
    #[must_use]
    pub fn reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.options = self.options.with_reconnect_base_delay(delay);
        self
    }

    /// Sets how many reconnect attempts are made before giving up.
    #[inline]
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.options = self.options.with_max_reconnect_attempts(attempts);
        self
    }

    /// Builds the client without connecting.
    #[inline]
    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.options = self.options.without_auto_connect();
        self
    }

    /// Reports to an existing event bus instead of a fresh one.
    #[inline]
    #[must_use]
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Resolves the URL, builds the client and, unless [`lazy`] was set,
    /// starts connecting.
    ///
    /// Returns as soon as the connection task is spawned; subscribe to
    /// [`EventKind::Connected`](crate::EventKind::Connected) on a shared
    /// bus to learn when the socket opens.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if the options are invalid
    /// - [`Error::Discovery`](crate::Error::Discovery) if the URL cannot be resolved
    /// - [`Error::Config`](crate::Error::Config) if auto-connecting outside a Tokio runtime
    ///
    /// [`lazy`]: ClientBuilder::lazy
    pub async fn build(self) -> Result<WindowClient> {
        self.options.validate()?;
        let url = self.source.resolve().await?;
        let events = self.events.unwrap_or_default();

        let client = WindowClient::new(url, self.options, events)?;
        if client.options().auto_connect {
            client.connect()?;
        }

        Ok(client)
    }
}

// ============================================================================
// Tests
// ============================================================================
