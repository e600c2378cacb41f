//! Type-safe identifiers.
//!
//! Newtype wrappers keep subscription handles and pending-request tokens
//! from being mixed up with plain integers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Counters
// ============================================================================

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_REQUEST_TOKEN: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// SubscriptionId
// ============================================================================

/// Handle returned by [`EventBus::subscribe`](crate::events::EventBus::subscribe).
///
/// Pass it back to `unsubscribe` to remove the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Generates a new process-unique subscription ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ============================================================================
// RequestToken
// ============================================================================

/// Identifies one registration in the correlator.
///
/// The wire protocol has no request id, so pending requests are keyed by
/// action. The token lets a timeout remove only its own registration and
/// never one that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Generates a new process-unique token.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_REQUEST_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
