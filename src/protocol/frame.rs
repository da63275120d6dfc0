//! Frame encoding and decoding with integrity validation.

use bytes::Bytes;

use super::wire_format::{FrameType, CRC_SIZE, FRAME_OVERHEAD, HEADER_SIZE, MAX_PAYLOAD};
use crate::crc;
use crate::error::{LinkError, Result};

/// A decoded, integrity-checked protocol frame.
///
/// The payload is the frame body between the header and the CRC trailer;
/// for requests and responses it starts with the address/length echo, for
/// resets it is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    frame_type: FrameType,
    payload: Bytes,
}

impl Frame {
    /// Encode a complete frame: header, payload, little-endian CRC trailer.
    ///
    /// # Example
    ///
    /// ```
    /// use oceanlink::protocol::{Frame, FrameType};
    ///
    /// let bytes = Frame::encode(FrameType::ReadRequest, &[0x18, 0x01, 0x02]).unwrap();
    /// assert_eq!(bytes[0], 0x02);          // type
    /// assert_eq!(bytes[1] as usize, bytes.len());
    /// let decoded = Frame::decode(&bytes).unwrap();
    /// assert_eq!(decoded.payload(), &[0x18, 0x01, 0x02]);
    /// ```
    pub fn encode(frame_type: FrameType, payload: &[u8]) -> Result<Vec<u8>> {
        if payload.len() > MAX_PAYLOAD {
            return Err(LinkError::BadArguments(format!(
                "payload length {} exceeds the {MAX_PAYLOAD}-byte maximum",
                payload.len()
            )));
        }
        let total = FRAME_OVERHEAD + payload.len();
        let mut buf = Vec::with_capacity(total);
        buf.push(frame_type.into());
        buf.push(total as u8);
        buf.extend_from_slice(payload);
        let checksum = crc::compute(&buf, crc::INIT);
        buf.extend_from_slice(&checksum.to_le_bytes());
        Ok(buf)
    }

    /// Decode and validate one complete frame.
    ///
    /// Rejects frames whose declared total length disagrees with the bytes
    /// at hand, whose CRC does not fold to zero, or whose type byte is
    /// unknown.
    pub fn decode(bytes: &[u8]) -> Result<Frame> {
        if bytes.len() < FRAME_OVERHEAD {
            return Err(LinkError::InvalidResponse(format!(
                "frame of {} bytes is shorter than the {FRAME_OVERHEAD}-byte minimum",
                bytes.len()
            )));
        }
        let declared = usize::from(bytes[1]);
        if declared != bytes.len() {
            return Err(LinkError::InvalidResponse(format!(
                "declared length {declared} does not match {} received bytes",
                bytes.len()
            )));
        }
        if crc::compute(bytes, crc::INIT) != 0 {
            return Err(LinkError::InvalidResponse("CRC mismatch".into()));
        }
        let frame_type = FrameType::from_byte(bytes[0]).ok_or_else(|| {
            LinkError::InvalidResponse(format!("unknown frame type 0x{:02X}", bytes[0]))
        })?;
        Ok(Frame {
            frame_type,
            payload: Bytes::copy_from_slice(&bytes[HEADER_SIZE..bytes.len() - CRC_SIZE]),
        })
    }

    /// Frame type discriminant.
    #[inline]
    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    /// Frame body between the header and the CRC trailer.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length in bytes.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}
