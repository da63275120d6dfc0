//! Serial (UART) transport over `tokio-serial`.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use super::Transport;
use crate::error::{LinkError, Result};

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(50);

/// [`Transport`] over a local serial port, 8N1 framing.
pub struct SerialTransport {
    port: SerialStream,
    send_timeout: Duration,
}

impl SerialTransport {
    /// Open the serial device at `path` with the given baud rate.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> oceanlink::Result<()> {
    /// use oceanlink::SerialTransport;
    ///
    /// let transport = SerialTransport::open("/dev/ttyUSB0", 115_200)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = tokio_serial::new(path, baud_rate)
            .open_native_async()
            .map_err(|e| LinkError::Link(io::Error::new(io::ErrorKind::Other, e)))?;
        Ok(Self {
            port,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        })
    }

    /// Override the transmit timeout (default 50 ms).
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        match timeout(self.send_timeout, self.port.write_all(bytes)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LinkError::Link(e)),
            Err(_) => Err(LinkError::Timeout),
        }
    }

    async fn recv_byte(&mut self, wait: Duration) -> Result<u8> {
        let mut byte = [0u8; 1];
        match timeout(wait, self.port.read_exact(&mut byte)).await {
            Ok(Ok(_)) => Ok(byte[0]),
            Ok(Err(e)) => Err(LinkError::Link(e)),
            Err(_) => Err(LinkError::Timeout),
        }
    }
}
