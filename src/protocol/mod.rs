//! Frame-level protocol: wire format constants and the frame codec.
//!
//! Everything the two peers put on the wire is a frame:
//!
//! ```text
//! ┌────────┬───────────┬──────────────┬────────┬────────┐
//! │ type   │ total_len │ payload      │ crc_lo │ crc_hi │
//! │ 1 byte │ 1 byte    │ 0..=35 bytes │ 1 byte │ 1 byte │
//! └────────┴───────────┴──────────────┴────────┴────────┘
//! ```
//!
//! `total_len` counts the entire frame, header and CRC included. The CRC16
//! trailer is little-endian and computed over the whole frame, so a receiver
//! validates integrity by folding the complete frame and checking for zero.

mod frame;
mod wire_format;

pub use frame::Frame;
pub use wire_format::{
    FrameType, CRC_SIZE, FRAME_OVERHEAD, HEADER_SIZE, MAX_FRAME, MAX_PAYLOAD, MAX_READ_DATA,
    MAX_WRITE_DATA,
};
