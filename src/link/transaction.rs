//! Register read/write transactions.
//!
//! A transaction is strictly request-then-response over a synchronized
//! link. Response bytes are collected one at a time under an overall
//! deadline, sliced into short per-byte waits so a stalled device is
//! detected quickly. Every response is validated end to end: frame CRC,
//! zero status, and an address/length echo matching the request.

use std::time::Duration;

use tokio::time::Instant;

use super::Link;
use crate::error::{LinkError, Result};
use crate::protocol::{
    Frame, FrameType, FRAME_OVERHEAD, HEADER_SIZE, MAX_FRAME, MAX_READ_DATA, MAX_WRITE_DATA,
};
use crate::transport::Transport;

impl<T: Transport> Link<T> {
    /// Read `len` bytes from register address `addr`.
    ///
    /// `header_wait` bounds the arrival of the response header,
    /// `payload_wait` the remainder. Returns the data bytes only; the
    /// status/address/length echo is validated and stripped.
    pub async fn read(
        &mut self,
        addr: u16,
        len: u8,
        header_wait: Duration,
        payload_wait: Duration,
    ) -> Result<Vec<u8>> {
        if usize::from(len) > MAX_READ_DATA {
            return Err(LinkError::BadArguments(format!(
                "read length {len} exceeds the {MAX_READ_DATA}-byte maximum"
            )));
        }
        let mut request = [0u8; 3];
        request[..2].copy_from_slice(&addr.to_le_bytes());
        request[2] = len;
        let frame = Frame::encode(FrameType::ReadRequest, &request)?;
        self.transport.send(&frame).await?;

        let response = self
            .recv_frame(FrameType::ReadResponse, header_wait, payload_wait)
            .await?;
        let body = response.payload();
        if body.len() != 4 + usize::from(len) {
            return Err(LinkError::InvalidResponse(format!(
                "read response carries {} payload bytes for a {len}-byte read",
                body.len()
            )));
        }
        Self::check_echo(body, addr, len)?;
        Ok(body[4..].to_vec())
    }

    /// Write `data` to register address `addr`.
    ///
    /// At most [`MAX_WRITE_DATA`] bytes per write. The device's response
    /// must echo the address and length with zero status.
    pub async fn write(
        &mut self,
        addr: u16,
        data: &[u8],
        header_wait: Duration,
        payload_wait: Duration,
    ) -> Result<()> {
        if data.len() > MAX_WRITE_DATA {
            return Err(LinkError::BadArguments(format!(
                "write length {} exceeds the {MAX_WRITE_DATA}-byte maximum",
                data.len()
            )));
        }
        let mut request = Vec::with_capacity(3 + data.len());
        request.extend_from_slice(&addr.to_le_bytes());
        request.push(data.len() as u8);
        request.extend_from_slice(data);
        let frame = Frame::encode(FrameType::WriteRequest, &request)?;
        self.transport.send(&frame).await?;

        let response = self
            .recv_frame(FrameType::WriteResponse, header_wait, payload_wait)
            .await?;
        let body = response.payload();
        if body.len() != 4 {
            return Err(LinkError::InvalidResponse(format!(
                "write response carries {} payload bytes, expected 4",
                body.len()
            )));
        }
        Self::check_echo(body, addr, data.len() as u8)?;
        Ok(())
    }

    /// [`Link::read`] with the configured authoritative waits, retried up
    /// to the configured attempt count with a full handshake between
    /// failures.
    pub async fn read_retry(&mut self, addr: u16, len: u8) -> Result<Vec<u8>> {
        let (header_wait, payload_wait) = (self.config.header_wait, self.config.payload_wait);
        let attempts = self.config.retries.max(1);
        let mut last = LinkError::Timeout;
        for attempt in 0..attempts {
            match self.read(addr, len, header_wait, payload_wait).await {
                Ok(data) => return Ok(data),
                Err(e) => {
                    tracing::debug!("read 0x{addr:04X} attempt {attempt} failed: {e}");
                    last = e;
                }
            }
            if attempt + 1 < attempts {
                if let Err(e) = self.handshake().await {
                    tracing::debug!("resync between read attempts failed: {e}");
                }
            }
        }
        Err(last)
    }

    /// [`Link::write`] with the configured authoritative waits, retried up
    /// to the configured attempt count with a full handshake between
    /// failures.
    pub async fn write_retry(&mut self, addr: u16, data: &[u8]) -> Result<()> {
        let (header_wait, payload_wait) = (self.config.header_wait, self.config.payload_wait);
        let attempts = self.config.retries.max(1);
        let mut last = LinkError::Timeout;
        for attempt in 0..attempts {
            match self.write(addr, data, header_wait, payload_wait).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!("write 0x{addr:04X} attempt {attempt} failed: {e}");
                    last = e;
                }
            }
            if attempt + 1 < attempts {
                if let Err(e) = self.handshake().await {
                    tracing::debug!("resync between write attempts failed: {e}");
                }
            }
        }
        Err(last)
    }

    /// Validate the status/address/length echo at the head of a response
    /// payload.
    fn check_echo(body: &[u8], addr: u16, len: u8) -> Result<()> {
        let status = body[0];
        let echoed_addr = u16::from_le_bytes([body[1], body[2]]);
        let echoed_len = body[3];
        if status != 0 || echoed_addr != addr || echoed_len != len {
            return Err(LinkError::InvalidResponse(format!(
                "echo mismatch: status {status}, addr 0x{echoed_addr:04X} (sent 0x{addr:04X}), \
                 len {echoed_len} (sent {len})"
            )));
        }
        Ok(())
    }

    /// Receive one complete frame of the expected type.
    async fn recv_frame(
        &mut self,
        expected: FrameType,
        header_wait: Duration,
        payload_wait: Duration,
    ) -> Result<Frame> {
        let mut buf = [0u8; MAX_FRAME];
        self.read_exact(&mut buf[..HEADER_SIZE], header_wait).await?;
        if buf[0] != u8::from(expected) {
            return Err(LinkError::InvalidResponse(format!(
                "expected frame type 0x{:02X}, got 0x{:02X}",
                u8::from(expected),
                buf[0]
            )));
        }
        let total = usize::from(buf[1]);
        if !(FRAME_OVERHEAD..=MAX_FRAME).contains(&total) {
            return Err(LinkError::InvalidResponse(format!(
                "declared frame length {total} out of bounds"
            )));
        }
        self.read_exact(&mut buf[HEADER_SIZE..total], payload_wait)
            .await?;
        Frame::decode(&buf[..total])
    }

    /// Fill `buf` from the transport under a single overall deadline,
    /// waiting at most one poll slice per receive call.
    pub(crate) async fn read_exact(&mut self, buf: &mut [u8], overall: Duration) -> Result<()> {
        let deadline = Instant::now() + overall;
        for slot in buf.iter_mut() {
            loop {
                let now = Instant::now();
                if now >= deadline {
                    return Err(LinkError::Timeout);
                }
                let wait = (deadline - now).min(self.config.poll_slice);
                match self.transport.recv_byte(wait).await {
                    Ok(byte) => {
                        *slot = byte;
                        break;
                    }
                    Err(LinkError::Timeout) => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::test_support::ScriptedTransport;
    use super::*;
    use crate::link::{HandshakePolicy, LinkConfig};

    const WAIT: Duration = Duration::from_millis(500);

    fn response(frame_type: FrameType, status: u8, addr: u16, len: u8, data: &[u8]) -> Vec<u8> {
        let mut payload = vec![status, addr.to_le_bytes()[0], addr.to_le_bytes()[1], len];
        payload.extend_from_slice(data);
        Frame::encode(frame_type, &payload).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_returns_data_and_sends_well_formed_request() {
        let mut transport = ScriptedTransport::silent();
        transport.queue(&response(
            FrameType::ReadResponse,
            0,
            0x0118,
            4,
            &[0x90, 0x01, 0x80, 0x00],
        ));
        let mut link = Link::new(transport);

        let data = link.read(0x0118, 4, WAIT, WAIT).await.unwrap();
        assert_eq!(data, [0x90, 0x01, 0x80, 0x00]);

        let sent = &link.transport().sent;
        assert_eq!(sent.len(), 1);
        let request = Frame::decode(&sent[0]).unwrap();
        assert_eq!(request.frame_type(), FrameType::ReadRequest);
        assert_eq!(request.payload(), &[0x18, 0x01, 0x04]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_validates_echo() {
        let mut transport = ScriptedTransport::silent();
        transport.queue(&response(FrameType::WriteResponse, 0, 0x800C, 1, &[]));
        let mut link = Link::new(transport);

        link.write(0x800C, &[1], WAIT, WAIT).await.unwrap();

        let request = Frame::decode(&link.transport().sent[0]).unwrap();
        assert_eq!(request.frame_type(), FrameType::WriteRequest);
        assert_eq!(request.payload(), &[0x0C, 0x80, 0x01, 0x01]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nonzero_status_rejected() {
        let mut transport = ScriptedTransport::silent();
        transport.queue(&response(FrameType::WriteResponse, 1, 0x8108, 1, &[]));
        let mut link = Link::new(transport);

        let err = link.write(0x8108, &[48], WAIT, WAIT).await.unwrap_err();
        assert!(matches!(err, LinkError::InvalidResponse(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_address_echo_mismatch_rejected() {
        let mut transport = ScriptedTransport::silent();
        transport.queue(&response(FrameType::ReadResponse, 0, 0x0009, 2, &[0, 0]));
        let mut link = Link::new(transport);

        let err = link.read(0x0008, 2, WAIT, WAIT).await.unwrap_err();
        assert!(matches!(err, LinkError::InvalidResponse(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_response_type_rejected() {
        let mut transport = ScriptedTransport::silent();
        transport.queue(&response(FrameType::WriteResponse, 0, 0x0000, 8, &[]));
        let mut link = Link::new(transport);

        let err = link.read(0x0000, 8, WAIT, WAIT).await.unwrap_err();
        assert!(matches!(err, LinkError::InvalidResponse(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_device_times_out() {
        let mut link = Link::new(ScriptedTransport::silent());
        let err = link.read(0x0000, 8, WAIT, WAIT).await.unwrap_err();
        assert!(matches!(err, LinkError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_write_rejected_before_sending() {
        let mut link = Link::new(ScriptedTransport::silent());
        let data = vec![0u8; MAX_WRITE_DATA + 1];
        let err = link.write(0x8200, &data, WAIT, WAIT).await.unwrap_err();
        assert!(matches!(err, LinkError::BadArguments(_)));
        assert!(link.transport().sent.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bound_and_intervening_handshakes() {
        // Three read attempts against a silent device, with exactly one
        // initiate-branch reset per intervening handshake and none after
        // the final attempt.
        let config = LinkConfig {
            retries: 3,
            handshake: HandshakePolicy {
                answer_attempts: 0,
                initiate_attempts: 1,
                ..HandshakePolicy::quick()
            },
            ..LinkConfig::default()
        };
        let mut link = Link::with_config(ScriptedTransport::silent(), config);

        let err = link.read_retry(0x0000, 8).await.unwrap_err();
        assert!(matches!(err, LinkError::Timeout));

        let kinds: Vec<FrameType> = link
            .transport()
            .sent
            .iter()
            .map(|bytes| Frame::decode(bytes).unwrap().frame_type())
            .collect();
        assert_eq!(
            kinds,
            [
                FrameType::ReadRequest,
                FrameType::Reset,
                FrameType::ReadRequest,
                FrameType::Reset,
                FrameType::ReadRequest,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_after_one_dropped_response() {
        let config = LinkConfig {
            handshake: HandshakePolicy {
                answer_attempts: 0,
                initiate_attempts: 1,
                ..HandshakePolicy::quick()
            },
            ..LinkConfig::default()
        };
        let mut link = Link::with_config(ScriptedTransport::silent(), config);

        // First attempt sees nothing; the handshake's reset is answered;
        // the second attempt succeeds.
        let err = link.read(0x8200, 4, WAIT, WAIT).await.unwrap_err();
        assert!(matches!(err, LinkError::Timeout));

        link.transport_mut()
            .queue(&Frame::encode(FrameType::ResetResponse, &[]).unwrap());
        link.handshake_with(&HandshakePolicy {
            answer_attempts: 0,
            initiate_attempts: 1,
            ..HandshakePolicy::quick()
        })
        .await
        .unwrap();

        link.transport_mut().queue(&response(
            FrameType::ReadResponse,
            0,
            0x8200,
            4,
            &[0x01, 0x02, 0x03, 0x04],
        ));
        let data = link.read(0x8200, 4, WAIT, WAIT).await.unwrap();
        assert_eq!(data, [0x01, 0x02, 0x03, 0x04]);
    }
}
