//! Two-branch link resynchronization.
//!
//! After power-up, a device-side reset, or any corrupted exchange, the two
//! peers may disagree about frame boundaries. The handshake restores a
//! known idle state:
//!
//! 1. **Answer branch** — listen briefly for a reset the device is
//!    emitting (it sends one on boot) and acknowledge it.
//! 2. **Initiate branch** — send a reset ourselves and wait for the
//!    device's acknowledgement.
//!
//! Whichever branch completes, the driver then pauses for the settle delay
//! and drains any residual bytes so the next transaction starts clean. The
//! exchange is idempotent: running it on an already-synchronized link
//! leaves the link synchronized.

use std::time::Duration;

use tokio::time::{sleep, Instant};

use super::{HandshakePolicy, Link};
use crate::error::{LinkError, Result};
use crate::protocol::{Frame, FrameType, FRAME_OVERHEAD, HEADER_SIZE};
use crate::transport::Transport;

impl<T: Transport> Link<T> {
    /// Run the full handshake with the configured default policy.
    pub async fn handshake(&mut self) -> Result<()> {
        let policy = self.config.handshake.clone();
        self.handshake_with(&policy).await
    }

    /// Run the handshake with caller-supplied attempt counts and pacing.
    ///
    /// Tries the answer branch for its whole attempt budget, then the
    /// initiate branch. Returns [`LinkError::HandshakeFailed`] only after
    /// both budgets are exhausted.
    pub async fn handshake_with(&mut self, policy: &HandshakePolicy) -> Result<()> {
        for attempt in 0..policy.answer_attempts {
            if self.answer_device_reset(policy.answer_wait).await {
                tracing::debug!("synchronized by answering a device reset (attempt {attempt})");
                return Ok(());
            }
            sleep(policy.answer_gap).await;
        }
        for attempt in 0..policy.initiate_attempts {
            if self.initiate_reset(policy.initiate_wait).await {
                tracing::debug!("synchronized by initiating a reset (attempt {attempt})");
                return Ok(());
            }
            sleep(policy.initiate_gap).await;
        }
        tracing::warn!(
            "handshake failed after {}+{} attempts",
            policy.answer_attempts,
            policy.initiate_attempts
        );
        Err(LinkError::HandshakeFailed)
    }

    /// Answer branch: wait for a reset frame from the device and
    /// acknowledge it. Any deviation fails the attempt silently.
    async fn answer_device_reset(&mut self, wait: Duration) -> bool {
        let mut buf = [0u8; FRAME_OVERHEAD];
        if self.read_exact(&mut buf[..HEADER_SIZE], wait).await.is_err() {
            return false;
        }
        if buf[0] != u8::from(FrameType::Reset) || usize::from(buf[1]) != FRAME_OVERHEAD {
            return false;
        }
        if self.read_exact(&mut buf[HEADER_SIZE..], wait).await.is_err() {
            return false;
        }
        if Frame::decode(&buf).is_err() {
            return false;
        }
        let Ok(reply) = Frame::encode(FrameType::ResetResponse, &[]) else {
            return false;
        };
        if self.transport.send(&reply).await.is_err() {
            return false;
        }
        self.settle_and_drain().await;
        true
    }

    /// Initiate branch: send a reset and wait for the acknowledgement.
    async fn initiate_reset(&mut self, wait: Duration) -> bool {
        let Ok(reset) = Frame::encode(FrameType::Reset, &[]) else {
            return false;
        };
        if self.transport.send(&reset).await.is_err() {
            return false;
        }
        let mut buf = [0u8; FRAME_OVERHEAD];
        if self.read_exact(&mut buf[..HEADER_SIZE], wait).await.is_err() {
            return false;
        }
        if buf[0] != u8::from(FrameType::ResetResponse) || usize::from(buf[1]) != FRAME_OVERHEAD {
            return false;
        }
        if self.read_exact(&mut buf[HEADER_SIZE..], wait).await.is_err() {
            return false;
        }
        if Frame::decode(&buf).is_err() {
            return false;
        }
        self.settle_and_drain().await;
        true
    }

    /// Give the device time to settle, then swallow residual bytes until
    /// the line has been quiet for one byte-wait or the window closes.
    async fn settle_and_drain(&mut self) {
        sleep(self.config.settle_delay).await;
        let deadline = Instant::now() + self.config.drain_window;
        let mut drained = 0usize;
        while Instant::now() < deadline {
            if self
                .transport
                .recv_byte(self.config.drain_byte_wait)
                .await
                .is_err()
            {
                break;
            }
            drained += 1;
        }
        if drained > 0 {
            tracing::debug!("drained {drained} residual bytes after reset");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::test_support::ScriptedTransport;
    use super::*;
    use crate::link::LinkConfig;

    fn one_shot_policy() -> HandshakePolicy {
        HandshakePolicy {
            answer_attempts: 1,
            initiate_attempts: 1,
            answer_gap: Duration::from_millis(25),
            initiate_gap: Duration::from_millis(80),
            answer_wait: Duration::from_millis(50),
            initiate_wait: Duration::from_millis(500),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_branch_acknowledges_device_reset() {
        let mut transport = ScriptedTransport::silent();
        transport.queue(&Frame::encode(FrameType::Reset, &[]).unwrap());
        let mut link = Link::new(transport);

        link.handshake_with(&one_shot_policy()).await.unwrap();

        let sent = &link.transport().sent;
        assert_eq!(sent.len(), 1);
        let reply = Frame::decode(&sent[0]).unwrap();
        assert_eq!(reply.frame_type(), FrameType::ResetResponse);
        assert_eq!(reply.payload_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initiate_branch_when_device_is_quiet() {
        let policy = HandshakePolicy {
            answer_attempts: 0,
            ..one_shot_policy()
        };
        let mut transport = ScriptedTransport::silent();
        transport.queue(&Frame::encode(FrameType::ResetResponse, &[]).unwrap());
        let mut link = Link::new(transport);

        link.handshake_with(&policy).await.unwrap();

        let sent = &link.transport().sent;
        assert_eq!(sent.len(), 1);
        let reset = Frame::decode(&sent[0]).unwrap();
        assert_eq!(reset.frame_type(), FrameType::Reset);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_branches_exhausted_fails() {
        let mut link = Link::new(ScriptedTransport::silent());
        let policy = HandshakePolicy {
            answer_attempts: 2,
            initiate_attempts: 2,
            ..one_shot_policy()
        };
        let err = link.handshake_with(&policy).await.unwrap_err();
        assert!(matches!(err, LinkError::HandshakeFailed));
        // One reset frame sent per initiate attempt, none for answer attempts.
        assert_eq!(link.transport().sent.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_branch_validates_reset_crc() {
        let mut frame = Frame::encode(FrameType::Reset, &[]).unwrap();
        frame[2] ^= 0x01;
        let mut transport = ScriptedTransport::silent();
        transport.queue(&frame);
        let mut link = Link::new(transport);

        let err = link.handshake_with(&one_shot_policy()).await.unwrap_err();
        assert!(matches!(err, LinkError::HandshakeFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_residual_bytes_are_drained() {
        let mut transport = ScriptedTransport::silent();
        transport.queue(&Frame::encode(FrameType::ResetResponse, &[]).unwrap());
        transport.queue(&[0xDE, 0xAD, 0xBE, 0xEF]); // stale bytes after the ack
        let policy = HandshakePolicy {
            answer_attempts: 0,
            ..one_shot_policy()
        };
        let mut link = Link::with_config(transport, LinkConfig::default());

        link.handshake_with(&policy).await.unwrap();
        assert!(link.transport().incoming.is_empty());
    }
}
