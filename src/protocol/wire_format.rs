//! Wire format constants and frame type discriminants.

/// Frame header size in bytes: type byte plus total-length byte.
pub const HEADER_SIZE: usize = 2;

/// CRC trailer size in bytes (CRC16, little-endian).
pub const CRC_SIZE: usize = 2;

/// Non-payload overhead of every frame. Also the size of a payload-less
/// frame such as a reset or its acknowledgement.
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + CRC_SIZE;

/// Most data bytes a single write request may carry.
pub const MAX_WRITE_DATA: usize = 32;

/// Most data bytes a single read request may ask for. Bounded so the
/// response still fits in [`MAX_FRAME`] alongside its 4-byte echo header.
pub const MAX_READ_DATA: usize = MAX_PAYLOAD - 4;

/// Largest payload either peer emits: a write request's 3-byte
/// address/length header plus [`MAX_WRITE_DATA`] data bytes.
pub const MAX_PAYLOAD: usize = 3 + MAX_WRITE_DATA;

/// Largest complete frame on the wire.
pub const MAX_FRAME: usize = MAX_PAYLOAD + FRAME_OVERHEAD;

/// Frame type discriminants.
///
/// Requests flow host → device; each has a response type with the high
/// bit set. Resets may be initiated by either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// Write request: apply contiguous bytes at a register address.
    WriteRequest = 0x01,
    /// Read request: fetch contiguous bytes from a register address.
    ReadRequest = 0x02,
    /// Link reset, issued by either peer to resynchronize.
    Reset = 0x7F,
    /// Acknowledges a write request, echoing status/address/length.
    WriteResponse = 0x81,
    /// Answers a read request with status/address/length and the data.
    ReadResponse = 0x82,
    /// Acknowledges a reset.
    ResetResponse = 0xFF,
}

impl FrameType {
    /// Decode a raw type byte, `None` for anything unrecognized.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(FrameType::WriteRequest),
            0x02 => Some(FrameType::ReadRequest),
            0x7F => Some(FrameType::Reset),
            0x81 => Some(FrameType::WriteResponse),
            0x82 => Some(FrameType::ReadResponse),
            0xFF => Some(FrameType::ResetResponse),
            _ => None,
        }
    }
}

impl From<FrameType> for u8 {
    #[inline]
    fn from(frame_type: FrameType) -> u8 {
        frame_type as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_type_round_trips_through_byte() {
        let all = [
            FrameType::WriteRequest,
            FrameType::ReadRequest,
            FrameType::Reset,
            FrameType::WriteResponse,
            FrameType::ReadResponse,
            FrameType::ResetResponse,
        ];
        for frame_type in all {
            assert_eq!(FrameType::from_byte(u8::from(frame_type)), Some(frame_type));
        }
    }

    #[test]
    fn test_unknown_type_bytes_rejected() {
        for byte in [0x00, 0x03, 0x7E, 0x80, 0x83, 0xFE] {
            assert_eq!(FrameType::from_byte(byte), None);
        }
    }

    #[test]
    fn test_size_constants_are_consistent() {
        assert_eq!(FRAME_OVERHEAD, HEADER_SIZE + CRC_SIZE);
        assert_eq!(MAX_PAYLOAD, 3 + MAX_WRITE_DATA);
        assert_eq!(MAX_FRAME, MAX_PAYLOAD + FRAME_OVERHEAD);
        assert!(MAX_READ_DATA + 4 <= MAX_PAYLOAD);
        // Every frame length fits the one-byte total_len field.
        assert!(MAX_FRAME <= u8::MAX as usize);
    }
}
