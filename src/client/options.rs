//! Client timing and reconnection options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use window_relay::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_request_timeout(Duration::from_secs(5))
//!     .with_max_reconnect_attempts(3);
//!
//! let policy = options.reconnect_policy()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::DEFAULT_REQUEST_TIMEOUT;
use crate::transport::ReconnectPolicy;
use crate::transport::reconnect::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};

// ============================================================================
// ClientOptions
// ============================================================================

/// Tunables for a [`WindowClient`](crate::WindowClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Time to wait for a matching response.
    pub request_timeout: Duration,

    /// Delay before the first reconnect attempt; doubles each attempt.
    pub reconnect_base_delay: Duration,

    /// Reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,

    /// Connect as soon as the client is built.
    pub auto_connect: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    ///
    /// 10s request timeout, 1s base delay, 5 attempts, auto-connect.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect_base_delay: DEFAULT_BASE_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_ATTEMPTS,
            auto_connect: true,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the request timeout.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Sets the base reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect_base_delay = delay;
        self
    }

    /// Sets the reconnect attempt budget. Zero disables reconnection.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Defers connecting until [`WindowClient::connect`](crate::WindowClient::connect).
    #[inline]
    #[must_use]
    pub fn without_auto_connect(mut self) -> Self {
        self.auto_connect = false;
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl ClientOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the request timeout or the base delay
    /// is zero.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(Error::config("Request timeout must be greater than zero"));
        }
        self.reconnect_policy().map(|_| ())
    }

    /// Builds the reconnect policy these options describe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base delay is zero.
    pub fn reconnect_policy(&self) -> Result<ReconnectPolicy> {
        ReconnectPolicy::new(self.reconnect_base_delay, self.max_reconnect_attempts)
    }
}

// ============================================================================
// Tests
// ============================================================================
