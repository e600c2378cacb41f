//! Reconnection policy and state machine.
//!
//! The connection task consults a [`Reconnector`] every time the socket
//! closes. It answers with the delay before the next attempt, or with
//! `None` once the attempt budget is spent.
//!
//! # States
//!
//! ```text
//!            connect()
//!   Idle ─────────────► Connecting ──open──► Open
//!                         ▲     │              │
//!                  timer  │     │ closed       │ closed
//!                         │     ▼              ▼
//!                        Backoff ◄─────────────┘
//!                           │
//!                           │ attempts exhausted
//!                           ▼
//!                        GivenUp
//! ```
//!
//! Delays grow as `base_delay * 2^attempt`: with the defaults that is
//! 1s, 2s, 4s, 8s, 16s, then nothing. A successful open resets the counter.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default number of reconnect attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Exponential backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first attempt.
    pub base_delay: Duration,
    /// Attempts allowed before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Creates a policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `base_delay` is zero.
    pub fn new(base_delay: Duration, max_attempts: u32) -> Result<Self> {
        if base_delay.is_zero() {
            return Err(Error::config("Reconnect base delay must be non-zero"));
        }
        Ok(Self {
            base_delay,
            max_attempts,
        })
    }

    /// Policy that never reconnects.
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_attempts: 0,
        }
    }

    /// Returns the delay scheduled after `attempt` failures (0-based).
    ///
    /// Saturates instead of overflowing for large attempt numbers.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier)
    }
}

// ============================================================================
// ReconnectPhase
// ============================================================================

/// Where the reconnect state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPhase {
    /// Never connected, or reset by an explicit connect/close.
    Idle,
    /// A connection attempt is in progress.
    Connecting,
    /// Socket is open.
    Open,
    /// Waiting before the next attempt.
    Backoff {
        /// Attempt number about to run (1-based).
        attempt: u32,
        /// Delay being waited out.
        delay: Duration,
    },
    /// Attempts exhausted; waits for an explicit reconnect.
    GivenUp,
}

// ============================================================================
// Reconnector
// ============================================================================

/// Attempt counter and phase tracking.
#[derive(Debug, Clone)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    attempt: u32,
    phase: ReconnectPhase,
}

impl Reconnector {
    /// Creates a reconnector in the `Idle` phase.
    #[inline]
    #[must_use]
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            phase: ReconnectPhase::Idle,
        }
    }

    /// Returns the policy.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// Returns how many reconnect attempts have been scheduled since the
    /// last successful open.
    #[inline]
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the current phase.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> ReconnectPhase {
        self.phase
    }

    /// Marks a connection attempt as started.
    pub fn on_connecting(&mut self) {
        self.phase = ReconnectPhase::Connecting;
    }

    /// Marks the socket as open and resets the attempt counter.
    pub fn on_open(&mut self) {
        self.attempt = 0;
        self.phase = ReconnectPhase::Open;
    }

    /// Handles a close and decides what happens next.
    ///
    /// Returns the delay before the next attempt, or `None` when the
    /// budget is spent (phase becomes `GivenUp`).
    pub fn on_disconnected(&mut self) -> Option<Duration> {
        if self.phase == ReconnectPhase::GivenUp {
            return None;
        }

        if self.attempt >= self.policy.max_attempts {
            self.phase = ReconnectPhase::GivenUp;
            return None;
        }

        let delay = self.policy.delay_for(self.attempt);
        self.attempt += 1;
        self.phase = ReconnectPhase::Backoff {
            attempt: self.attempt,
            delay,
        };
        Some(delay)
    }

    /// Returns to `Idle` with a fresh attempt counter.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.phase = ReconnectPhase::Idle;
    }
}

impl Default for Reconnector {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn drain(reconnector: &mut Reconnector) -> Vec<u64> {
        std::iter::from_fn(|| reconnector.on_disconnected())
            .map(|d| d.as_millis() as u64)
            .collect()
    }

    #[test]
    fn test_default_schedule() {
        let mut reconnector = Reconnector::default();
        reconnector.on_connecting();

        assert_eq!(drain(&mut reconnector), vec![1000, 2000, 4000, 8000, 16000]);
        assert_eq!(reconnector.phase(), ReconnectPhase::GivenUp);
        assert_eq!(reconnector.attempt(), 5);
    }

    #[test]
    fn test_given_up_is_terminal() {
        let mut reconnector = Reconnector::default();
        drain(&mut reconnector);

        assert_eq!(reconnector.on_disconnected(), None);
        assert_eq!(reconnector.on_disconnected(), None);
        assert_eq!(reconnector.phase(), ReconnectPhase::GivenUp);
    }

    #[test]
    fn test_open_resets_counter() {
        let mut reconnector = Reconnector::default();

        assert_eq!(reconnector.on_disconnected(), Some(Duration::from_millis(1000)));
        assert_eq!(reconnector.on_disconnected(), Some(Duration::from_millis(2000)));

        reconnector.on_connecting();
        reconnector.on_open();
        assert_eq!(reconnector.attempt(), 0);
        assert_eq!(reconnector.phase(), ReconnectPhase::Open);

        assert_eq!(reconnector.on_disconnected(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_backoff_phase_reports_attempt() {
        let mut reconnector = Reconnector::default();
        reconnector.on_disconnected();

        assert_eq!(
            reconnector.phase(),
            ReconnectPhase::Backoff {
                attempt: 1,
                delay: Duration::from_millis(1000)
            }
        );
    }

    #[test]
    fn test_reset_after_given_up() {
        let mut reconnector = Reconnector::default();
        drain(&mut reconnector);

        reconnector.reset();
        assert_eq!(reconnector.phase(), ReconnectPhase::Idle);
        assert_eq!(reconnector.on_disconnected(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_disabled_policy_never_schedules() {
        let mut reconnector = Reconnector::new(ReconnectPolicy::disabled());
        assert_eq!(reconnector.on_disconnected(), None);
        assert_eq!(reconnector.phase(), ReconnectPhase::GivenUp);
    }

    #[test]
    fn test_zero_base_delay_rejected() {
        assert!(ReconnectPolicy::new(Duration::ZERO, 5).is_err());
    }

    #[test]
    fn test_delay_saturates() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(64), policy.base_delay.saturating_mul(u32::MAX));
    }

    proptest! {
        #[test]
        fn prop_schedule_is_doubling_and_bounded(
            base_ms in 1u64..5_000,
            max_attempts in 0u32..12,
        ) {
            let policy = ReconnectPolicy::new(Duration::from_millis(base_ms), max_attempts)
                .expect("valid policy");
            let mut reconnector = Reconnector::new(policy);
            let delays = drain(&mut reconnector);

            prop_assert_eq!(delays.len() as u32, max_attempts);
            for (attempt, delay) in delays.iter().enumerate() {
                prop_assert_eq!(*delay, base_ms << attempt);
            }
            prop_assert_eq!(reconnector.phase(), ReconnectPhase::GivenUp);
        }
    }
}
