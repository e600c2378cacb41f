//! Error types for the window-relay client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use window_relay::{Result, WindowClient};
//!
//! async fn example(client: &WindowClient) -> Result<()> {
//!     let response = client.focus_window("main").await?;
//!     println!("{}", response.message);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Discovery`] |
//! | Connection | [`Error::Connection`], [`Error::NotConnected`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::Rejected`] |
//! | Execution | [`Error::RequestTimeout`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |
//!
//! A response carrying `success: false` is not an error at this layer. It
//! resolves the request normally; [`Response::into_result`] turns it into
//! [`Error::Rejected`] when the caller wants that.
//!
//! [`Response::into_result`]: crate::protocol::Response::into_result

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Server URL discovery failed.
    ///
    /// Returned when the host shell cannot provide a URL or the page
    /// origin cannot be turned into a WebSocket URL.
    #[error("URL discovery failed: {message}")]
    Discovery {
        /// Description of the discovery failure.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the socket cannot be created or opened. Also emitted
    /// as an error event, after which the reconnect flow takes over.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Send attempted while the socket is not open.
    ///
    /// Surfaced synchronously; requests are never queued.
    #[error("WebSocket is not connected")]
    NotConnected,

    /// WebSocket connection closed while a request was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected payload shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Server answered with `success: false`.
    ///
    /// Only produced by [`Response::into_result`](crate::protocol::Response::into_result).
    #[error("Request {action} rejected: {message}")]
    Rejected {
        /// Action tag of the rejected request.
        action: String,
        /// Message supplied by the server.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// No matching response arrived in time.
    #[error("Request {action} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Action tag the request was correlated under.
        action: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    ///
    /// Handshake, read or write failure reported by the socket.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a discovery error.
    #[inline]
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a rejected-request error.
    #[inline]
    pub fn rejected(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(action: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            action: action.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::NotConnected
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed if the caller retries later. The
    /// client itself never retries a request.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RequestTimeout { .. } | Self::NotConnected | Self::ConnectionClosed
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
