//! WebSocket transport layer.
//!
//! This module owns the socket to the window service, matches responses
//! to requests, and keeps the socket alive across drops.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐                     ┌─────────────────┐
//! │  WindowClient            │                     │  Window service │
//! │    │                     │      WebSocket      │                 │
//! │  Connection ─ Correlator │◄───────────────────►│  /ws endpoint   │
//! │    │          Reconnector│   JSON text frames  │                 │
//! │  EventBus                │                     │                 │
//! └──────────────────────────┘                     └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::connect` - Spawn the supervisor task for a URL
//! 2. Supervisor opens the socket and emits `Connected`
//! 3. `Connection::request` - Send frames, await responses by action
//! 4. On close: emit `Disconnected`, back off, retry (bounded)
//! 5. `Connection::close` - Stop the task and cancel any backoff
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Socket ownership, event loop, supervisor task |
//! | `correlator` | Pending requests keyed by action |
//! | `reconnect` | Backoff policy and reconnect state machine |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Response correlation by action tag.
pub mod correlator;

/// Reconnect backoff policy and state machine.
pub mod reconnect;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, ConnectionState, DEFAULT_REQUEST_TIMEOUT};
pub use correlator::{Correlator, PendingRequest, Resolution};
pub use reconnect::{ReconnectPhase, ReconnectPolicy, Reconnector};
