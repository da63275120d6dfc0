//! Transport boundary: the raw byte channel underneath the link protocol.
//!
//! The link driver never touches a serial port directly; it speaks to a
//! [`Transport`], which is the whole environment seam. Production code uses
//! [`SerialTransport`]; tests substitute in-memory implementations.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

mod serial;

pub use serial::SerialTransport;

/// Raw byte channel between the host and the device.
///
/// Implementations own their timeout behavior: `recv_byte` must give up
/// after `wait` with [`LinkError::Timeout`](crate::LinkError::Timeout)
/// rather than blocking indefinitely.
#[async_trait]
pub trait Transport: Send {
    /// Transmit `bytes`, bounded by the transport's own short timeout.
    async fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Receive exactly one byte, waiting at most `wait` for it.
    async fn recv_byte(&mut self, wait: Duration) -> Result<u8>;
}
