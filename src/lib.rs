//! Window Relay - WebSocket client for a native window management service.
//!
//! This library talks to a backend that creates, focuses, navigates and
//! closes native windows. Requests and responses are JSON text frames on a
//! single WebSocket.
//!
//! # Architecture
//!
//! - **Transport**: one socket at a time, owned by a background task
//! - **Reconnector**: bounded exponential backoff (1s, 2s, 4s, 8s, 16s)
//! - **Correlator**: matches responses to requests by their `action` tag
//! - **EventBus**: fans lifecycle and message events out to subscribers
//! - **WindowClient**: typed operations on top of all of the above
//!
//! The protocol carries no request id. Responses are matched by action
//! alone, so do not run two requests with the same action concurrently.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use window_relay::{EventKind, Result, WindowClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = WindowClient::builder()
//!         .url("ws://127.0.0.1:8080/ws")
//!         .build()
//!         .await?;
//!     client.wait_connected(Duration::from_secs(5)).await?;
//!
//!     client.subscribe(EventKind::Connected, |event| println!("{event:?}"));
//!
//!     let response = client.create_window("notes", "https://example.com", true).await?;
//!     println!("{}: {}", response.success, response.message);
//!
//!     for window in client.windows().await? {
//!         println!("{} ({})", window.label, window.title);
//!     }
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`WindowClient`], builder, options, URL discovery |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`events`] | [`EventBus`] and [`ClientEvent`] |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire message types |
//! | [`transport`] | WebSocket connection, correlation, reconnection |

// ============================================================================
// Modules
// ============================================================================

/// Window client facade and configuration.
///
/// Use [`WindowClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Lifecycle and message events.
pub mod events;

/// Type-safe identifiers.
pub mod identifiers;

/// WebSocket protocol message types.
///
/// Request/response frames and the window record.
pub mod protocol;

/// WebSocket transport layer.
///
/// Socket ownership, request correlation and reconnection.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    ClientBuilder, ClientOptions, DEFAULT_SERVER_URL, HostInvoke, ServerSource, WindowClient,
};

// Error types
pub use error::{Error, Result};

// Event types
pub use events::{ClientEvent, EventBus, EventCallback, EventKind};

// Identifier types
pub use identifiers::{RequestToken, SubscriptionId};

// Protocol types
pub use protocol::{Action, Request, Response, WindowInfo};

// Transport types
pub use transport::{
    Connection, ConnectionState, DEFAULT_REQUEST_TIMEOUT, ReconnectPhase, ReconnectPolicy,
};
