//! Lifecycle and message fan-out.
//!
//! The [`EventBus`] delivers connection lifecycle events and every inbound
//! frame to any number of subscribers, independently of request
//! correlation.
//!
//! # Event Kinds
//!
//! | Kind | Events |
//! |------|--------|
//! | `Connected` | [`ClientEvent::Connected`] |
//! | `Disconnected` | [`ClientEvent::Disconnected`], [`ClientEvent::ReconnectFailed`] |
//! | `Error` | [`ClientEvent::Error`] |
//! | `Message` | [`ClientEvent::Message`] |
//!
//! # Dispatch Rules
//!
//! - Callbacks for a kind run in registration order.
//! - The subscriber list is snapshotted before dispatch, so subscribing or
//!   unsubscribing from inside a callback takes effect on the next event.
//! - A panicking callback is logged and skipped; later callbacks still run.
//! - Callbacks run on the connection task and must not block.
//!
//! # Example
//!
//! ```ignore
//! use window_relay::{ClientEvent, EventKind};
//!
//! let id = client.events().subscribe(EventKind::Message, |event| {
//!     if let ClientEvent::Message(response) = event {
//!         println!("{} -> {}", response.action, response.message);
//!     }
//! });
//!
//! client.events().unsubscribe(EventKind::Message, id);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{error, trace};

use crate::identifiers::SubscriptionId;
use crate::protocol::Response;

// ============================================================================
// Types
// ============================================================================

/// Subscriber callback type.
pub type EventCallback = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

// ============================================================================
// EventKind
// ============================================================================

/// Subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Socket opened.
    Connected,
    /// Socket closed, or reconnection gave up.
    Disconnected,
    /// Socket-level error.
    Error,
    /// Any parsed inbound frame.
    Message,
}

// ============================================================================
// ClientEvent
// ============================================================================

/// Event delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Socket is open.
    Connected {
        /// URL the socket is connected to.
        url: String,
    },

    /// Socket closed.
    Disconnected {
        /// Close reason, if the peer gave one.
        reason: Option<String>,
    },

    /// Reconnection stopped after exhausting its attempts.
    ///
    /// Emitted once; the client stays passive until
    /// [`WindowClient::reconnect`](crate::WindowClient::reconnect).
    ReconnectFailed {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Socket could not be opened or failed while open.
    Error {
        /// Description of the failure.
        message: String,
    },

    /// Inbound frame, including responses and server broadcasts.
    Message(Response),
}

impl ClientEvent {
    /// Returns the kind subscribers register for.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Connected { .. } => EventKind::Connected,
            Self::Disconnected { .. } | Self::ReconnectFailed { .. } => EventKind::Disconnected,
            Self::Error { .. } => EventKind::Error,
            Self::Message(_) => EventKind::Message,
        }
    }
}

// ============================================================================
// EventBus
// ============================================================================

struct Subscriber {
    id: SubscriptionId,
    callback: EventCallback,
}

/// Ordered publish/subscribe registry.
///
/// Cheap to clone; clones share the same subscriber lists.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<FxHashMap<EventKind, Vec<Subscriber>>>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.subscribers.read();
        let counts: Vec<_> = subscribers
            .iter()
            .map(|(kind, list)| (*kind, list.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("subscribers", &counts)
            .finish()
    }
}

impl EventBus {
    /// Creates an empty bus.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for events of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::generate();
        self.subscribers
            .write()
            .entry(kind)
            .or_default()
            .push(Subscriber {
                id,
                callback: Arc::new(callback),
            });

        trace!(%id, ?kind, "Subscribed");
        id
    }

    /// Removes a registration.
    ///
    /// Returns `false` if it was not registered; that is not an error.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let Some(list) = subscribers.get_mut(&kind) else {
            return false;
        };

        let before = list.len();
        list.retain(|subscriber| subscriber.id != id);
        let removed = list.len() != before;

        if removed {
            trace!(%id, ?kind, "Unsubscribed");
        }
        removed
    }

    /// Returns the number of callbacks registered for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Delivers `event` to every subscriber of its kind.
    ///
    /// Returns how many callbacks completed without panicking.
    pub fn emit(&self, event: &ClientEvent) -> usize {
        let kind = event.kind();

        // Snapshot so callbacks can (un)subscribe without deadlocking.
        let callbacks: Vec<EventCallback> = match self.subscribers.read().get(&kind) {
            Some(list) => list.iter().map(|s| Arc::clone(&s.callback)).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for callback in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(?kind, panic = %message, "Event subscriber panicked");
                }
            }
        }

        delivered
    }
}

// ============================================================================
// Tests
// ============================================================================
