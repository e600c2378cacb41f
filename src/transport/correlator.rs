//! Response correlation by action tag.
//!
//! The protocol has no request id, so each outstanding request is keyed by
//! its `action`. The [`Correlator`] owns those entries from send until a
//! matching response, a timeout, or connection loss settles them.
//!
//! # Same-Action Requests
//!
//! Only one entry can occupy an action key. When a second request with the
//! same action is registered before the first settles, the newer one takes
//! the key and the older one is moved aside as *superseded*. A superseded
//! request never receives a response; it settles when its timeout fires or
//! the connection closes. Callers should not issue two concurrent requests
//! with the same action.
//!
//! # Settlement
//!
//! Every entry holds a `oneshot` sender, so it can be settled at most once.
//! Removal and settlement happen under the same lock.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestToken;
use crate::protocol::{Action, Response};

// ============================================================================
// Types
// ============================================================================

/// Receiving half handed to the waiting caller.
pub type ResponseReceiver = oneshot::Receiver<Result<Response>>;

// ============================================================================
// PendingRequest
// ============================================================================

/// One outstanding request.
#[derive(Debug)]
pub struct PendingRequest {
    /// Correlation key.
    action: String,
    /// Registration identity.
    token: RequestToken,
    /// When the request was registered.
    created_at: Instant,
    /// Settles the waiting caller.
    tx: oneshot::Sender<Result<Response>>,
}

impl PendingRequest {
    /// Returns the correlation key.
    #[inline]
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns how long the request has been outstanding.
    #[inline]
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    fn settle(self, result: Result<Response>) -> bool {
        self.tx.send(result).is_ok()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Outcome of feeding an inbound response to the correlator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Delivered to the caller waiting on this action.
    Delivered,
    /// Matched an entry whose caller had already gone away.
    Abandoned,
    /// Known server broadcast; nothing was waiting.
    Broadcast,
    /// Nothing was waiting for this action.
    Orphaned,
}

// ============================================================================
// Correlator
// ============================================================================

/// Pending-request table keyed by action.
#[derive(Debug, Default)]
pub struct Correlator {
    /// Active entries, one per action.
    pending: FxHashMap<String, PendingRequest>,
    /// Entries displaced by a newer request with the same action.
    superseded: Vec<PendingRequest>,
}

impl Correlator {
    /// Creates an empty correlator.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a request under `action`.
    ///
    /// Returns the token identifying this registration and the receiver the
    /// caller awaits. An existing entry for the same action is superseded.
    pub fn register(&mut self, action: &str) -> (RequestToken, ResponseReceiver) {
        let (tx, rx) = oneshot::channel();
        let token = RequestToken::generate();

        let entry = PendingRequest {
            action: action.to_string(),
            token,
            created_at: Instant::now(),
            tx,
        };

        if let Some(previous) = self.pending.insert(action.to_string(), entry) {
            warn!(
                action,
                superseded = %previous.token,
                age_ms = previous.age().as_millis() as u64,
                "Concurrent request with same action; earlier request will not be matched"
            );
            self.superseded.push(previous);
        }

        trace!(action, %token, "Pending request registered");
        (token, rx)
    }

    /// Matches an inbound response to the entry registered under its action.
    ///
    /// Business failures (`success: false`) resolve like any other response.
    pub fn resolve(&mut self, response: Response) -> Resolution {
        let Some(entry) = self.pending.remove(&response.action) else {
            if Action::is_broadcast_tag(&response.action) {
                debug!(action = %response.action, "Broadcast received");
                return Resolution::Broadcast;
            }
            warn!(action = %response.action, "Orphaned response dropped");
            return Resolution::Orphaned;
        };

        let token = entry.token;
        let action = response.action.clone();
        if entry.settle(Ok(response)) {
            trace!(%action, %token, "Pending request resolved");
            Resolution::Delivered
        } else {
            warn!(%action, %token, "Orphaned response dropped; caller gone");
            Resolution::Abandoned
        }
    }

    /// Removes the registration identified by `token` without settling it.
    ///
    /// Used when the caller stops waiting (timeout or cancellation). Returns
    /// `false` if the registration is already gone.
    pub fn remove(&mut self, action: &str, token: RequestToken) -> bool {
        self.take(action, token).is_some()
    }

    /// Removes the registration identified by `token` and rejects it.
    ///
    /// Returns `false` if the registration is already gone.
    pub fn fail(&mut self, action: &str, token: RequestToken, error: Error) -> bool {
        match self.take(action, token) {
            Some(entry) => {
                entry.settle(Err(error));
                true
            }
            None => false,
        }
    }

    /// Rejects every outstanding request with [`Error::ConnectionClosed`].
    ///
    /// Returns how many entries were failed.
    pub fn fail_all(&mut self) -> usize {
        let entries: Vec<_> = self
            .pending
            .drain()
            .map(|(_, entry)| entry)
            .chain(self.superseded.drain(..))
            .collect();
        let count = entries.len();

        for entry in entries {
            entry.settle(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on disconnect");
        }
        count
    }

    /// Returns `true` if a request is registered under `action`.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, action: &str) -> bool {
        self.pending.contains_key(action)
    }

    /// Returns the number of outstanding requests, superseded ones included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len() + self.superseded.len()
    }

    /// Returns `true` if nothing is outstanding.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&mut self, action: &str, token: RequestToken) -> Option<PendingRequest> {
        if self
            .pending
            .get(action)
            .is_some_and(|entry| entry.token == token)
        {
            return self.pending.remove(action);
        }

        let index = self.superseded.iter().position(|entry| entry.token == token)?;
        Some(self.superseded.swap_remove(index))
    }
}

// ============================================================================
// Tests
// ============================================================================
