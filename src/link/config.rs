//! Timing and retry policy for the link driver.
//!
//! Every deadline the driver honors lives here as a named field instead of
//! a literal buried in protocol logic, so policy can be tuned (or loaded
//! from a config file) without touching the driver.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeouts and retry counts for transactions and the default handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Wait for the first two response bytes of an authoritative transaction.
    pub header_wait: Duration,
    /// Wait for the remainder of the response.
    pub payload_wait: Duration,
    /// Granularity of the byte-receive polling loop. Each blocking wait
    /// passed to the transport is at most this long.
    pub poll_slice: Duration,
    /// Pause after a completed reset exchange, before draining, so the
    /// peer can finish its own reset processing.
    pub settle_delay: Duration,
    /// Window during which residual bytes are drained after a reset.
    pub drain_window: Duration,
    /// Per-byte wait inside the drain window.
    pub drain_byte_wait: Duration,
    /// Attempts made by the retrying read/write wrappers before giving up.
    pub retries: u32,
    /// Policy for the full handshake run between retry attempts.
    pub handshake: HandshakePolicy,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            header_wait: Duration::from_millis(500),
            payload_wait: Duration::from_millis(500),
            poll_slice: Duration::from_millis(20),
            settle_delay: Duration::from_millis(125),
            drain_window: Duration::from_millis(200),
            drain_byte_wait: Duration::from_millis(20),
            retries: 3,
            handshake: HandshakePolicy::default(),
        }
    }
}

/// Attempt counts and pacing for one handshake run.
///
/// The handshake has two branches tried in order: first *answer* a reset
/// the device may be emitting, then *initiate* one ourselves. Each branch
/// gets its own attempt budget and inter-attempt gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakePolicy {
    /// Attempts spent waiting for a device-initiated reset.
    pub answer_attempts: u32,
    /// Attempts spent initiating a reset ourselves.
    pub initiate_attempts: u32,
    /// Delay between answer attempts.
    pub answer_gap: Duration,
    /// Delay between initiate attempts.
    pub initiate_gap: Duration,
    /// Per-read wait while expecting the device's reset.
    pub answer_wait: Duration,
    /// Wait for the acknowledgement after initiating. Generous, since the
    /// device may be mid-boot when our reset arrives.
    pub initiate_wait: Duration,
}

impl Default for HandshakePolicy {
    fn default() -> Self {
        Self {
            answer_attempts: 20,
            initiate_attempts: 20,
            answer_gap: Duration::from_millis(25),
            initiate_gap: Duration::from_millis(100),
            answer_wait: Duration::from_millis(50),
            initiate_wait: Duration::from_millis(500),
        }
    }
}

impl HandshakePolicy {
    /// Low-attempt, low-delay resync used between stages of a convergence
    /// ladder, where a full-budget handshake would dominate the ladder's
    /// own time budget.
    pub fn quick() -> Self {
        Self {
            answer_attempts: 3,
            initiate_attempts: 3,
            answer_gap: Duration::from_millis(25),
            initiate_gap: Duration::from_millis(80),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let config = LinkConfig::default();
        assert_eq!(config.header_wait, Duration::from_millis(500));
        assert_eq!(config.poll_slice, Duration::from_millis(20));
        assert_eq!(config.retries, 3);
        assert_eq!(config.handshake.answer_attempts, 20);
        assert_eq!(config.handshake.initiate_attempts, 20);
    }

    #[test]
    fn test_quick_policy_shrinks_attempts_not_waits() {
        let quick = HandshakePolicy::quick();
        let full = HandshakePolicy::default();
        assert!(quick.answer_attempts < full.answer_attempts);
        assert!(quick.initiate_attempts < full.initiate_attempts);
        assert_eq!(quick.answer_wait, full.answer_wait);
        assert_eq!(quick.initiate_wait, full.initiate_wait);
    }
}
