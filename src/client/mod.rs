//! Window client: the public entry point.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WindowClient`] | Typed window operations over one connection |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Timeout and reconnect settings |
//! | [`ServerSource`] | Where the server URL comes from |
//! | [`HostInvoke`] | Native shell bridge for URL discovery |
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use window_relay::{Result, WindowClient};
//!
//! # async fn example() -> Result<()> {
//! let client = WindowClient::builder()
//!     .origin("http://localhost:1420")
//!     .build()
//!     .await?;
//! client.wait_connected(Duration::from_secs(5)).await?;
//!
//! let response = client.ping().await?;
//! assert!(response.is_success());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Server URL discovery.
pub mod discovery;

/// Timeout and reconnect options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::WindowClient;
pub use discovery::{DEFAULT_SERVER_URL, HostInvoke, ServerSource};
pub use options::ClientOptions;
